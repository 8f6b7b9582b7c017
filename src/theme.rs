use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EdgeColors {
    pub base: String,
    pub highlight: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub font_color: String,
    /// Fill of variables outside any archetype. Also the reference color
    /// archetype instance colors are pushed away from.
    pub node_background: String,
    pub node_border: String,
    pub node_highlight_background: String,
    pub node_highlight_border: String,
    pub glyph_border: String,
    /// Fill used when a multi-membership glyph has no resolvable colors.
    pub glyph_default_fill: String,
    pub positive_edge: EdgeColors,
    pub negative_edge: EdgeColors,
    pub edge_font_size: f32,
    pub legend_text_color: String,
    pub background: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "Arial, sans-serif".to_string(),
            font_size: 18.0,
            font_color: "#000000".to_string(),
            node_background: "#FFF0CE".to_string(),
            node_border: "#FFF0CE".to_string(),
            node_highlight_background: "#C3A869".to_string(),
            node_highlight_border: "#C3A869".to_string(),
            glyph_border: "#333333".to_string(),
            glyph_default_fill: "#BED7ED".to_string(),
            positive_edge: EdgeColors {
                base: "#388E3C".to_string(),
                highlight: "#4CAF50".to_string(),
            },
            negative_edge: EdgeColors {
                base: "#D32F2F".to_string(),
                highlight: "#F44336".to_string(),
            },
            edge_font_size: 22.0,
            legend_text_color: "#333333".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 15.0,
            font_color: "#1C2430".to_string(),
            glyph_border: "#7A8AA6".to_string(),
            legend_text_color: "#1C2430".to_string(),
            background: "#F8FAFF".to_string(),
            ..Self::classic()
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}
