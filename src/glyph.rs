//! Node glyphs: standalone SVG ellipses whose fill encodes archetype
//! membership, one equal pie slice per color.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::f32::consts::PI;

use crate::config::LayoutConfig;
use crate::theme::Theme;

#[derive(Debug, Clone)]
pub struct GlyphStyle {
    pub width: f32,
    pub height: f32,
    pub border_width: f32,
    pub border_color: String,
    pub font_color: String,
    pub font_family: String,
    pub font_size: f32,
    pub line_height: f32,
    pub default_fill: String,
}

impl GlyphStyle {
    pub fn new(theme: &Theme, config: &LayoutConfig) -> Self {
        Self {
            width: config.glyph_width,
            height: config.glyph_height,
            border_width: config.glyph_border_width,
            border_color: theme.glyph_border.clone(),
            font_color: theme.font_color.clone(),
            font_family: theme.font_family.clone(),
            font_size: theme.font_size,
            line_height: config.label_line_height,
            default_fill: theme.glyph_default_fill.clone(),
        }
    }
}

/// A rendered glyph document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    pub svg: String,
}

impl Glyph {
    /// The glyph as an addressable image resource for the render spec.
    pub fn data_uri(&self) -> String {
        format!("data:image/svg+xml;base64,{}", STANDARD.encode(&self.svg))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct EllipseGeometry {
    pub cx: f32,
    pub cy: f32,
    pub rx: f32,
    pub ry: f32,
}

impl EllipseGeometry {
    pub fn inset(width: f32, height: f32, border_width: f32) -> Self {
        Self {
            cx: (width / 2.0).round(),
            cy: (height / 2.0).round(),
            rx: ((width - border_width * 2.0) / 2.0).round().max(10.0),
            ry: ((height - border_width * 2.0) / 2.0).round().max(10.0),
        }
    }

    pub fn centered_at(self, x: f32, y: f32) -> Self {
        Self { cx: x, cy: y, ..self }
    }
}

/// Pie ellipse split into one equal slice per color, starting at 12 o'clock.
/// With no colors this degrades to a solid ellipse in the default fill.
pub fn pie_ellipse(label: &str, colors: &[String], style: &GlyphStyle) -> Glyph {
    let colors: Vec<&str> = colors
        .iter()
        .map(String::as_str)
        .filter(|color| !color.is_empty())
        .collect();
    if colors.is_empty() {
        return solid_ellipse(label, &style.default_fill, style);
    }

    let geometry = EllipseGeometry::inset(style.width, style.height, style.border_width);
    let EllipseGeometry { cx, cy, rx, ry } = geometry;
    let mut body = String::new();
    body.push_str(&format!(
        "<defs><clipPath id=\"clip\"><ellipse cx=\"{cx:.2}\" cy=\"{cy:.2}\" rx=\"{rx:.2}\" ry=\"{ry:.2}\"/></clipPath></defs>"
    ));
    body.push_str("<g clip-path=\"url(#clip)\">");
    body.push_str(&slice_paths(geometry, &colors));
    body.push_str("</g>");
    body.push_str(&format!(
        "<ellipse cx=\"{cx:.2}\" cy=\"{cy:.2}\" rx=\"{rx:.2}\" ry=\"{ry:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"/>",
        style.border_color, style.border_width
    ));
    body.push_str(&label_svg(label, cx, cy, style));
    Glyph {
        svg: wrap_document(&body, style),
    }
}

pub fn solid_ellipse(label: &str, fill: &str, style: &GlyphStyle) -> Glyph {
    let EllipseGeometry { cx, cy, rx, ry } =
        EllipseGeometry::inset(style.width, style.height, style.border_width);
    let mut body = format!(
        "<ellipse cx=\"{cx:.2}\" cy=\"{cy:.2}\" rx=\"{rx:.2}\" ry=\"{ry:.2}\" fill=\"{fill}\" stroke=\"{}\" stroke-width=\"{}\"/>",
        style.border_color, style.border_width
    );
    body.push_str(&label_svg(label, cx, cy, style));
    Glyph {
        svg: wrap_document(&body, style),
    }
}

fn wrap_document(body: &str, style: &GlyphStyle) -> String {
    let (w, h) = (style.width, style.height);
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">{body}</svg>"
    )
}

/// One `<path>` wedge per color. A single color yields a full ellipse.
pub(crate) fn slice_paths(geometry: EllipseGeometry, colors: &[&str]) -> String {
    let EllipseGeometry { cx, cy, rx, ry } = geometry;
    if colors.len() == 1 {
        return format!(
            "<ellipse cx=\"{cx:.2}\" cy=\"{cy:.2}\" rx=\"{rx:.2}\" ry=\"{ry:.2}\" fill=\"{}\"/>",
            colors[0]
        );
    }
    let slice = 2.0 * PI / colors.len() as f32;
    let start = -PI / 2.0;
    let mut out = String::new();
    for (idx, color) in colors.iter().enumerate() {
        let a1 = start + idx as f32 * slice;
        let a2 = a1 + slice;
        let (x1, y1) = (cx + rx * a1.cos(), cy + ry * a1.sin());
        let (x2, y2) = (cx + rx * a2.cos(), cy + ry * a2.sin());
        let large_arc = if slice > PI { 1 } else { 0 };
        out.push_str(&format!(
            "<path d=\"M {cx:.2} {cy:.2} L {x1:.2} {y1:.2} A {rx:.2} {ry:.2} 0 {large_arc} 1 {x2:.2} {y2:.2} Z\" fill=\"{color}\"/>"
        ));
    }
    out
}

pub(crate) fn label_svg(label: &str, cx: f32, cy: f32, style: &GlyphStyle) -> String {
    let lines: Vec<&str> = label.split('\n').collect();
    let step = style.font_size * style.line_height;
    // Baseline of the first row so the block is centered on cy.
    let first_y = cy - step * (lines.len() as f32 - 1.0) / 2.0 + style.font_size * 0.35;
    let mut text = format!(
        "<text x=\"{cx:.2}\" y=\"{first_y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">",
        escape_xml(&style.font_family),
        style.font_size,
        style.font_color
    );
    for (idx, line) in lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { step };
        text.push_str(&format!(
            "<tspan x=\"{cx:.2}\" dy=\"{dy:.2}\">{}</tspan>",
            escape_xml(line)
        ));
    }
    text.push_str("</text>");
    text
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
