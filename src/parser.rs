use crate::error::Result;
use crate::ir::Diagram;

pub struct ParseOutput {
    pub diagram: Diagram,
    /// Inline `"config"` object, merged over the loaded config by the CLI.
    pub init_config: Option<serde_json::Value>,
}

fn parse_value(input: &str) -> Result<serde_json::Value> {
    let text = input.trim_start_matches('\u{feff}').trim();
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => Ok(value),
        Err(strict_err) => match json5::from_str::<serde_json::Value>(text) {
            Ok(value) => Ok(value),
            Err(_) if text.starts_with(['{', '[']) => Err(strict_err.into()),
            Err(lenient_err) => Err(lenient_err.into()),
        },
    }
}

fn diagram_from_value(mut value: serde_json::Value) -> Result<ParseOutput> {
    let init_config = value
        .as_object_mut()
        .and_then(|object| object.remove("config"))
        .filter(|config| config.is_object());
    let diagram: Diagram = serde_json::from_value(value)?;

    Ok(ParseOutput {
        diagram,
        init_config,
    })
}

/// Reads a diagram document. Strict JSON is tried first, then JSON5 so that
/// hand-edited files with comments or trailing commas still load.
pub fn parse_diagram(input: &str) -> Result<ParseOutput> {
    diagram_from_value(parse_value(input)?)
}

/// Like [`parse_diagram`], but also accepts a top-level array of diagrams.
pub fn parse_diagrams(input: &str) -> Result<Vec<ParseOutput>> {
    match parse_value(input)? {
        serde_json::Value::Array(items) => items.into_iter().map(diagram_from_value).collect(),
        value => Ok(vec![diagram_from_value(value)?]),
    }
}
