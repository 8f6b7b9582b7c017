use crate::assemble::{EdgeSpec, LaidOutDiagram, LegendEntry, NodeSpec, NodeVisual};
use crate::config::LayoutConfig;
#[cfg(feature = "png")]
use crate::config::RenderConfig;
use crate::glyph::{EllipseGeometry, GlyphStyle, escape_xml, label_svg, slice_paths};
use crate::ir::Polarity;
use crate::layout::Point;
use crate::layout::text::text_width;
use crate::theme::Theme;
use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

const PADDING: f32 = 40.0;
const LEGEND_GAP: f32 = 48.0;
const LEGEND_SWATCH: f32 = 14.0;
const LEGEND_ROW: f32 = 24.0;
const LEGEND_FONT_SIZE: f32 = 14.0;
const LABEL_OFFSET: f32 = 14.0;

type Bounds = (f32, f32, f32, f32);

#[derive(Debug, Clone, Copy)]
struct Placed {
    x: f32,
    y: f32,
    rx: f32,
    ry: f32,
}

impl Placed {
    /// Distance from the center to the ellipse edge along unit vector `(ux, uy)`.
    fn reach(&self, ux: f32, uy: f32) -> f32 {
        let denom = ((ux / self.rx).powi(2) + (uy / self.ry).powi(2)).sqrt();
        if denom <= f32::EPSILON { 0.0 } else { 1.0 / denom }
    }
}

fn place(node: &NodeSpec, at: Point, offset: (f32, f32)) -> Placed {
    Placed {
        x: at.x as f32 + offset.0,
        y: at.y as f32 + offset.1,
        rx: (node.width as f32 / 2.0).max(1.0),
        ry: (node.height as f32 / 2.0).max(1.0),
    }
}

fn diagram_bounds(layout: &LaidOutDiagram) -> Option<Bounds> {
    layout
        .spec
        .nodes
        .iter()
        .filter_map(|node| {
            let at = layout.position(&node.id)?;
            let (hw, hh) = (node.width as f32 / 2.0, node.height as f32 / 2.0);
            Some((at.x as f32 - hw, at.y as f32 - hh, at.x as f32 + hw, at.y as f32 + hh))
        })
        .reduce(|a, b| (a.0.min(b.0), a.1.min(b.1), a.2.max(b.2), a.3.max(b.3)))
}

fn legend_size(legend: &[LegendEntry], theme: &Theme, config: &LayoutConfig) -> (f32, f32) {
    if legend.is_empty() {
        return (0.0, 0.0);
    }
    let text = legend
        .iter()
        .map(|entry| {
            text_width(
                &entry.label,
                LEGEND_FONT_SIZE,
                &theme.font_family,
                config.fast_text_metrics,
            )
        })
        .fold(0.0, f32::max);
    (LEGEND_SWATCH + 8.0 + text, legend.len() as f32 * LEGEND_ROW)
}

/// Standalone SVG of a laid-out diagram with the legend to its right.
pub fn render_svg(layout: &LaidOutDiagram, theme: &Theme, config: &LayoutConfig) -> String {
    let (min_x, min_y, max_x, max_y) = diagram_bounds(layout).unwrap_or((0.0, 0.0, 0.0, 0.0));
    let (legend_w, legend_h) = legend_size(&layout.legend, theme, config);
    let diagram_w = max_x - min_x;
    let diagram_h = max_y - min_y;
    let legend_block = if legend_w > 0.0 { LEGEND_GAP + legend_w } else { 0.0 };
    let width = (diagram_w + legend_block + PADDING * 2.0).max(200.0);
    let height = (diagram_h.max(legend_h) + PADDING * 2.0).max(200.0);
    let offset = (PADDING - min_x, PADDING - min_y);

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width:.0}\" height=\"{height:.0}\" viewBox=\"0 0 {width:.2} {height:.2}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    svg.push_str("<defs>");
    for (name, colors) in [
        ("positive", &theme.positive_edge),
        ("negative", &theme.negative_edge),
    ] {
        svg.push_str(&format!(
            "<marker id=\"arrow-{name}\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"8\" markerHeight=\"8\" orient=\"auto\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
            colors.base
        ));
    }
    svg.push_str("</defs>");

    let placed: HashMap<&str, Placed> = layout
        .spec
        .nodes
        .iter()
        .filter_map(|node| {
            let at = layout.position(&node.id)?;
            Some((node.id.as_str(), place(node, at, offset)))
        })
        .collect();

    let mut occupied: Vec<Bounds> = placed
        .values()
        .map(|p| (p.x - p.rx, p.y - p.ry, p.rx * 2.0, p.ry * 2.0))
        .collect();
    for edge in &layout.spec.edges {
        let (Some(from), Some(to)) = (placed.get(edge.from.as_str()), placed.get(edge.to.as_str()))
        else {
            debug!(edge = %edge.id, "edge endpoint has no position, skipping");
            continue;
        };
        svg.push_str(&edge_svg(edge, from, to, theme, &mut occupied));
    }

    let style = GlyphStyle::new(theme, config);
    for (idx, node) in layout.spec.nodes.iter().enumerate() {
        let Some(p) = placed.get(node.id.as_str()) else {
            continue;
        };
        svg.push_str(&node_svg(idx, node, p, theme, &style));
    }

    if !layout.legend.is_empty() {
        let legend_x = PADDING + diagram_w + LEGEND_GAP;
        svg.push_str(&legend_svg(&layout.legend, legend_x, PADDING, theme));
    }

    svg.push_str("</svg>");
    svg
}

fn marker_for(polarity: Polarity) -> &'static str {
    match polarity {
        Polarity::Positive => "arrow-positive",
        Polarity::Negative => "arrow-negative",
    }
}

fn edge_svg(
    edge: &EdgeSpec,
    from: &Placed,
    to: &Placed,
    theme: &Theme,
    occupied: &mut Vec<Bounds>,
) -> String {
    let (d, mid, normal) = if edge.from == edge.to {
        let top = from.y - from.ry;
        let d = format!(
            "M {:.2} {top:.2} C {:.2} {:.2} {:.2} {:.2} {:.2} {top:.2}",
            from.x - 12.0,
            from.x - 40.0,
            top - 60.0,
            from.x + 40.0,
            top - 60.0,
            from.x + 12.0,
        );
        (d, (from.x, top - 45.0), (0.0, -1.0))
    } else {
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let len = dx.hypot(dy).max(f32::EPSILON);
        let (ux, uy) = (dx / len, dy / len);
        let start = (from.x + ux * from.reach(ux, uy), from.y + uy * from.reach(ux, uy));
        let end = (to.x - ux * to.reach(ux, uy), to.y - uy * to.reach(ux, uy));
        let d = format!(
            "M {:.2} {:.2} L {:.2} {:.2}",
            start.0, start.1, end.0, end.1
        );
        (
            d,
            ((start.0 + end.0) / 2.0, (start.1 + end.1) / 2.0),
            (-uy, ux),
        )
    };

    let mut out = format!(
        "<path d=\"{d}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" marker-end=\"url(#{})\"/>",
        edge.color,
        edge.width,
        marker_for(edge.polarity)
    );
    let (x, y) = place_sign(mid, normal, edge.font_size, occupied);
    out.push_str(&format!(
        "<text x=\"{x:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" font-weight=\"bold\" fill=\"{}\">{}</text>",
        y + edge.font_size * 0.35,
        escape_xml(&theme.font_family),
        edge.font_size,
        edge.color,
        escape_xml(&edge.label)
    ));
    out
}

/// Moves the sign along the edge normal, alternating sides, until its box is
/// clear of nodes and earlier signs. Falls back to the first slot.
fn place_sign(
    mid: (f32, f32),
    normal: (f32, f32),
    font_size: f32,
    occupied: &mut Vec<Bounds>,
) -> (f32, f32) {
    let half = font_size * 0.5;
    let mut chosen = None;
    for step in 0..6 {
        let distance = LABEL_OFFSET + (step / 2) as f32 * (font_size + 4.0);
        let side = if step % 2 == 0 { 1.0 } else { -1.0 };
        let x = mid.0 + normal.0 * distance * side;
        let y = mid.1 + normal.1 * distance * side;
        let rect = (x - half, y - half, font_size, font_size);
        if !collides(&rect, occupied) {
            chosen = Some((x, y, rect));
            break;
        }
    }
    let (x, y, rect) = chosen.unwrap_or_else(|| {
        let x = mid.0 + normal.0 * LABEL_OFFSET;
        let y = mid.1 + normal.1 * LABEL_OFFSET;
        (x, y, (x - half, y - half, font_size, font_size))
    });
    occupied.push(rect);
    (x, y)
}

fn collides(rect: &Bounds, occupied: &[Bounds]) -> bool {
    occupied.iter().any(|(x, y, w, h)| {
        rect.0 < x + w && rect.0 + rect.2 > *x && rect.1 < y + h && rect.1 + rect.3 > *y
    })
}

fn node_svg(idx: usize, node: &NodeSpec, p: &Placed, theme: &Theme, style: &GlyphStyle) -> String {
    let mut out = format!(
        "<g class=\"node node-{}\"><title>{}</title>",
        node.visual.kind(),
        escape_xml(&node.title)
    );
    let (cx, cy, rx, ry) = (p.x, p.y, p.rx, p.ry);
    match &node.visual {
        NodeVisual::Plain {
            background, border, ..
        } => out.push_str(&format!(
            "<ellipse cx=\"{cx:.2}\" cy=\"{cy:.2}\" rx=\"{rx:.2}\" ry=\"{ry:.2}\" fill=\"{background}\" stroke=\"{border}\" stroke-width=\"{}\"/>",
            style.border_width
        )),
        NodeVisual::SingleMembership { color } => out.push_str(&format!(
            "<ellipse cx=\"{cx:.2}\" cy=\"{cy:.2}\" rx=\"{rx:.2}\" ry=\"{ry:.2}\" fill=\"{color}\" stroke=\"{color}\" stroke-width=\"{}\"/>",
            style.border_width
        )),
        NodeVisual::MultiMembership { colors, .. } => {
            let geometry =
                EllipseGeometry::inset(rx * 2.0, ry * 2.0, style.border_width).centered_at(cx, cy);
            let colors: Vec<&str> = colors.iter().map(String::as_str).collect();
            let clip = format!("clip-node-{idx}");
            out.push_str(&format!(
                "<clipPath id=\"{clip}\"><ellipse cx=\"{cx:.2}\" cy=\"{cy:.2}\" rx=\"{:.2}\" ry=\"{:.2}\"/></clipPath>",
                geometry.rx, geometry.ry
            ));
            out.push_str(&format!("<g clip-path=\"url(#{clip})\">"));
            out.push_str(&slice_paths(geometry, &colors));
            out.push_str("</g>");
            out.push_str(&format!(
                "<ellipse cx=\"{cx:.2}\" cy=\"{cy:.2}\" rx=\"{:.2}\" ry=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"/>",
                geometry.rx, geometry.ry, theme.glyph_border, style.border_width
            ));
        }
    }
    out.push_str(&label_svg(&node.lines.join("\n"), cx, cy, style));
    out.push_str("</g>");
    out
}

fn legend_svg(legend: &[LegendEntry], x: f32, y: f32, theme: &Theme) -> String {
    let mut out = String::from("<g class=\"legend\">");
    for (row, entry) in legend.iter().enumerate() {
        let top = y + row as f32 * LEGEND_ROW;
        out.push_str(&format!(
            "<rect x=\"{x:.2}\" y=\"{top:.2}\" width=\"{LEGEND_SWATCH}\" height=\"{LEGEND_SWATCH}\" rx=\"3\" ry=\"3\" fill=\"{}\" stroke=\"{}\" stroke-width=\"0.8\"/>",
            entry.color, theme.glyph_border
        ));
        out.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{LEGEND_FONT_SIZE}\" fill=\"{}\">{}</text>",
            x + LEGEND_SWATCH + 8.0,
            top + LEGEND_SWATCH - 2.0,
            escape_xml(&theme.font_family),
            theme.legend_text_color,
            escape_xml(&entry.label)
        ));
    }
    out.push_str("</g>");
    out
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Arial".to_string();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("invalid output size"))?;

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::assemble;
    use crate::ir::Diagram;
    use crate::layout::Positions;

    fn config() -> LayoutConfig {
        LayoutConfig {
            fast_text_metrics: true,
            ..Default::default()
        }
    }

    fn laid_out(diagram: &Diagram, positions: &[(&str, f64, f64)]) -> LaidOutDiagram {
        let positions: Positions = positions
            .iter()
            .map(|(id, x, y)| (id.to_string(), Point::new(*x, *y)))
            .collect();
        let (snapshot, spec) = assemble(diagram, Some(&positions), &Theme::classic(), &config());
        LaidOutDiagram {
            spec,
            positions,
            legend: snapshot.legend(),
        }
    }

    fn sample() -> Diagram {
        let mut diagram = Diagram::new("d1");
        diagram.add_node("a", "Quality & cost");
        diagram.add_node("b", "Sales");
        diagram.add_node("c", "Backlog");
        diagram.add_edge("a", "b", Polarity::Positive);
        diagram.add_edge("b", "c", Polarity::Negative);
        diagram.add_archetype("x1", "FIXES_THAT_FAIL", &["a", "b"]);
        diagram.add_archetype("x2", "FIXES_THAT_FAIL", &["b", "c"]);
        diagram
    }

    #[test]
    fn renders_edges_nodes_and_legend() {
        let layout = laid_out(&sample(), &[("a", 0.0, 0.0), ("b", 300.0, 0.0), ("c", 300.0, 300.0)]);
        let svg = render_svg(&layout, &Theme::classic(), &config());
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("url(#arrow-positive)"));
        assert!(svg.contains("url(#arrow-negative)"));
        assert!(svg.contains(">+</text>"));
        assert!(svg.contains(">\u{2212}</text>"));
        assert!(svg.contains("Quality &amp; cost"));
        assert!(svg.contains("clip-node-1"));
        assert!(svg.contains("Fixes That Fail I</text>"));
        assert!(svg.contains("Fixes That Fail II</text>"));
    }

    #[test]
    fn edges_without_positions_are_skipped() {
        let layout = laid_out(&sample(), &[("a", 0.0, 0.0), ("b", 300.0, 0.0)]);
        let svg = render_svg(&layout, &Theme::classic(), &config());
        assert_eq!(svg.matches("marker-end").count(), 1);
    }

    #[test]
    fn signs_on_parallel_edges_do_not_stack() {
        let mut diagram = Diagram::new("d1");
        diagram.add_node("a", "A");
        diagram.add_node("b", "B");
        diagram.add_edge("a", "b", Polarity::Positive);
        diagram.add_edge("a", "b", Polarity::Positive);
        let layout = laid_out(&diagram, &[("a", 0.0, 0.0), ("b", 400.0, 0.0)]);
        let svg = render_svg(&layout, &Theme::classic(), &config());
        let ys: Vec<&str> = svg
            .split("<text x=\"")
            .skip(1)
            .filter(|chunk| chunk.contains(">+</text>"))
            .map(|chunk| chunk.split('"').nth(2).unwrap_or_default())
            .collect();
        assert_eq!(ys.len(), 2);
        assert_ne!(ys[0], ys[1]);
    }

    #[test]
    fn self_loop_draws_a_curve() {
        let mut diagram = Diagram::new("d1");
        diagram.add_node("a", "A");
        diagram.add_edge("a", "a", Polarity::Negative);
        let layout = laid_out(&diagram, &[("a", 0.0, 0.0)]);
        let svg = render_svg(&layout, &Theme::classic(), &config());
        assert!(svg.contains(" C "));
    }

    #[test]
    fn empty_diagram_still_renders() {
        let layout = laid_out(&Diagram::new("d1"), &[]);
        let svg = render_svg(&layout, &Theme::classic(), &config());
        assert!(svg.contains("width=\"200\""));
        assert!(!svg.contains("class=\"legend\""));
    }
}
