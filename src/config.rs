use crate::layout::{OverlapConfig, RedistributeConfig};
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub label_max_chars: usize,
    pub label_max_lines: usize,
    pub label_line_height: f32,
    /// Skip font lookups and use the built-in width table.
    pub fast_text_metrics: bool,
    pub glyph_width: f32,
    pub glyph_height: f32,
    pub glyph_border_width: f32,
    pub node_margin: f32,
    pub node_max_width: f32,
    pub contrast_min_distance: f64,
    pub overlap: OverlapConfig,
    pub redistribute: RedistributeConfig,
    pub zoom_step: f64,
    pub zoom_min: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            label_max_chars: 20,
            label_max_lines: 3,
            label_line_height: 1.2,
            fast_text_metrics: false,
            glyph_width: 180.0,
            glyph_height: 80.0,
            glyph_border_width: 2.0,
            node_margin: 10.0,
            node_max_width: 200.0,
            contrast_min_distance: 0.30,
            overlap: OverlapConfig::default(),
            redistribute: RedistributeConfig::default(),
            zoom_step: 0.1,
            zoom_min: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::classic(),
            layout: LayoutConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    font_color: Option<String>,
    node_background: Option<String>,
    node_border: Option<String>,
    node_highlight_background: Option<String>,
    node_highlight_border: Option<String>,
    glyph_border: Option<String>,
    glyph_default_fill: Option<String>,
    positive_edge_color: Option<String>,
    negative_edge_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    label_max_chars: Option<usize>,
    label_max_lines: Option<usize>,
    label_line_height: Option<f32>,
    fast_text_metrics: Option<bool>,
    glyph_width: Option<f32>,
    glyph_height: Option<f32>,
    glyph_border_width: Option<f32>,
    contrast_min_distance: Option<f64>,
    overlap: Option<OverlapConfig>,
    redistribute: Option<RedistributeConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };
    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;
    Ok(apply_config_file(config, parsed))
}

/// Merges an inline `"config"` object from a diagram document.
pub fn merge_init_config(config: Config, init: serde_json::Value) -> anyhow::Result<Config> {
    let parsed: ConfigFile = serde_json::from_value(init)?;
    Ok(apply_config_file(config, parsed))
}

fn apply_config_file(mut config: Config, parsed: ConfigFile) -> Config {
    match parsed.theme.as_deref() {
        Some("modern") => config.theme = Theme::modern(),
        Some("classic") | Some("default") => config.theme = Theme::classic(),
        _ => {}
    }

    if let Some(vars) = parsed.theme_variables {
        let theme = &mut config.theme;
        if let Some(v) = vars.font_family {
            theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            theme.font_size = v;
        }
        if let Some(v) = vars.font_color {
            theme.font_color = v;
        }
        if let Some(v) = vars.node_background {
            theme.node_background = v;
        }
        if let Some(v) = vars.node_border {
            theme.node_border = v;
        }
        if let Some(v) = vars.node_highlight_background {
            theme.node_highlight_background = v;
        }
        if let Some(v) = vars.node_highlight_border {
            theme.node_highlight_border = v;
        }
        if let Some(v) = vars.glyph_border {
            theme.glyph_border = v;
        }
        if let Some(v) = vars.glyph_default_fill {
            theme.glyph_default_fill = v;
        }
        if let Some(v) = vars.positive_edge_color {
            theme.positive_edge.base = v;
        }
        if let Some(v) = vars.negative_edge_color {
            theme.negative_edge.base = v;
        }
        if let Some(v) = vars.background {
            theme.background = v;
        }
    }

    if let Some(layout) = parsed.layout {
        let target = &mut config.layout;
        if let Some(v) = layout.label_max_chars {
            target.label_max_chars = v;
        }
        if let Some(v) = layout.label_max_lines {
            target.label_max_lines = v;
        }
        if let Some(v) = layout.label_line_height {
            target.label_line_height = v;
        }
        if let Some(v) = layout.fast_text_metrics {
            target.fast_text_metrics = v;
        }
        if let Some(v) = layout.glyph_width {
            target.glyph_width = v;
        }
        if let Some(v) = layout.glyph_height {
            target.glyph_height = v;
        }
        if let Some(v) = layout.glyph_border_width {
            target.glyph_border_width = v;
        }
        if let Some(v) = layout.contrast_min_distance {
            target.contrast_min_distance = v;
        }
        if let Some(v) = layout.overlap {
            target.overlap = v;
        }
        if let Some(v) = layout.redistribute {
            target.redistribute = v;
        }
    }
    config
}
