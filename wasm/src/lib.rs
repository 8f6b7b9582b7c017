use cld_render::{RenderOptions, render_with_options};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CldRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    fast_text: Option<bool>,
    label_max_chars: Option<usize>,
    redistribute: Option<bool>,
}

fn build_render_options(options: CldRenderOptions) -> RenderOptions {
    let mut render_options = if options.theme.as_deref() == Some("modern") {
        RenderOptions::modern()
    } else {
        RenderOptions::classic()
    };

    if let Some(font_family) = options.font_family {
        render_options.theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        render_options.theme.font_size = font_size;
    }
    // No system fonts in the browser sandbox.
    render_options.layout.fast_text_metrics = options.fast_text.unwrap_or(true);
    if let Some(max_chars) = options.label_max_chars {
        render_options.layout.label_max_chars = max_chars;
    }
    render_options.redistribute = options.redistribute.unwrap_or(false);

    render_options
}

#[wasm_bindgen]
pub fn render_cld_svg(diagram_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let options = if let Some(raw_options) = options_json {
        serde_json::from_str::<CldRenderOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?
    } else {
        CldRenderOptions::default()
    };

    let render_options = build_render_options(options);
    render_with_options(diagram_json, render_options)
        .map_err(|error| JsValue::from_str(&error.to_string()))
}
