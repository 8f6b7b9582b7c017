use thiserror::Error;

#[derive(Debug, Error)]
pub enum CldError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid diagram json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid diagram json5: {0}")]
    Json5(#[from] json5::Error),
    #[error("unknown polarity {0:?}")]
    UnknownPolarity(String),
}

pub type Result<T> = std::result::Result<T, CldError>;
