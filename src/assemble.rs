//! Turns a domain graph into what the rendering engine consumes: a render
//! spec of visual nodes and edges, plus an immutable snapshot of archetype
//! instance metadata used by the legend and by selection lookups.

use serde::Serialize;
use std::collections::HashMap;

use crate::category::{humanize, normalize_key};
use crate::color::{TONE_SCALE_MAX, instance_color};
use crate::config::LayoutConfig;
use crate::glyph::{GlyphStyle, pie_ellipse};
use crate::ir::{Diagram, Polarity};
use crate::layout::text::measure_label;
use crate::layout::{Point, Positions, wrap_label};
use crate::theme::{EdgeColors, Theme};

/// Per-diagram metadata for one archetype instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchetypeInstance {
    pub archetype_id: String,
    #[serde(rename = "type")]
    pub archetype_type: String,
    /// Zero-based rank among archetypes of the same type, in input order.
    pub index: usize,
    pub color: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    pub archetype_id: String,
    pub label: String,
    pub color: String,
}

/// Rebuilt on every render and threaded into selection projection.
#[derive(Debug, Clone, Default)]
pub struct DiagramSnapshot {
    diagram_id: String,
    instances: Vec<ArchetypeInstance>,
    by_id: HashMap<String, usize>,
    memberships: HashMap<String, Vec<String>>,
}

impl DiagramSnapshot {
    pub fn diagram_id(&self) -> &str {
        &self.diagram_id
    }

    pub fn instance(&self, archetype_id: &str) -> Option<&ArchetypeInstance> {
        self.by_id.get(archetype_id).map(|&i| &self.instances[i])
    }

    pub fn instances(&self) -> &[ArchetypeInstance] {
        &self.instances
    }

    /// Archetype ids the node belongs to, in archetype order.
    pub fn memberships(&self, node_id: &str) -> &[String] {
        self.memberships
            .get(node_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Membership colors for a node, deduplicated in first-seen order.
    pub fn membership_colors(&self, node_id: &str) -> Vec<String> {
        let mut colors: Vec<String> = Vec::new();
        for archetype_id in self.memberships(node_id) {
            if let Some(instance) = self.instance(archetype_id)
                && !colors.contains(&instance.color)
            {
                colors.push(instance.color.clone());
            }
        }
        colors
    }

    pub fn legend(&self) -> Vec<LegendEntry> {
        self.instances
            .iter()
            .map(|instance| LegendEntry {
                archetype_id: instance.archetype_id.clone(),
                label: instance.label.clone(),
                color: instance.color.clone(),
            })
            .collect()
    }
}

const ROMAN_TABLE: [(usize, &str); 10] = [
    (10, "X"),
    (9, "IX"),
    (8, "VIII"),
    (7, "VII"),
    (6, "VI"),
    (5, "V"),
    (4, "IV"),
    (3, "III"),
    (2, "II"),
    (1, "I"),
];

/// Roman numeral for `n`, clamped to 1..=20.
pub fn roman_numeral(n: usize) -> String {
    let mut remaining = n.clamp(1, TONE_SCALE_MAX);
    let mut out = String::new();
    for (value, symbol) in ROMAN_TABLE {
        while remaining >= value {
            out.push_str(symbol);
            remaining -= value;
        }
    }
    out
}

fn type_display_name(archetype_type: &str) -> String {
    let key = normalize_key(archetype_type);
    if key.is_empty() {
        humanize(archetype_type)
    } else {
        humanize(&key)
    }
}

/// Counts instances per type, then assigns index, color and label in one
/// ordered pass over the archetype list.
pub fn build_snapshot(diagram: &Diagram, theme: &Theme, config: &LayoutConfig) -> DiagramSnapshot {
    let mut totals: HashMap<String, usize> = HashMap::new();
    for archetype in &diagram.archetypes {
        *totals
            .entry(normalize_key(&archetype.archetype_type))
            .or_default() += 1;
    }

    let mut next_index: HashMap<String, usize> = HashMap::new();
    let mut snapshot = DiagramSnapshot {
        diagram_id: diagram.id.clone(),
        ..Default::default()
    };
    for archetype in &diagram.archetypes {
        let key = normalize_key(&archetype.archetype_type);
        let total = totals.get(&key).copied().unwrap_or(1);
        let slot = next_index.entry(key).or_default();
        let index = *slot;
        *slot += 1;

        let color = instance_color(
            &archetype.archetype_type,
            index,
            total,
            &theme.node_background,
            config.contrast_min_distance,
        );
        let name = type_display_name(&archetype.archetype_type);
        let label = if total == 1 {
            name
        } else {
            format!("{name} {}", roman_numeral(index + 1))
        };

        if snapshot.by_id.contains_key(&archetype.id) {
            tracing::debug!(archetype = %archetype.id, "duplicate archetype id, keeping first");
        } else {
            snapshot
                .by_id
                .insert(archetype.id.clone(), snapshot.instances.len());
        }
        snapshot.instances.push(ArchetypeInstance {
            archetype_id: archetype.id.clone(),
            archetype_type: archetype.archetype_type.clone(),
            index,
            color,
            label,
        });

        for member in &archetype.variables {
            let members = snapshot
                .memberships
                .entry(member.id().to_string())
                .or_default();
            if !members.contains(&archetype.id) {
                members.push(archetype.id.clone());
            }
        }
    }
    snapshot
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NodeVisual {
    #[serde(rename_all = "camelCase")]
    Plain {
        background: String,
        border: String,
        highlight_background: String,
        highlight_border: String,
    },
    SingleMembership { color: String },
    /// `image` is a `data:` URI of the pie glyph, which carries the label.
    MultiMembership { colors: Vec<String>, image: String },
}

impl NodeVisual {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Plain { .. } => "plain",
            Self::SingleMembership { .. } => "single",
            Self::MultiMembership { .. } => "multi",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub id: String,
    /// Label the engine draws; empty when the glyph image carries it.
    pub label: String,
    pub lines: Vec<String>,
    pub original_label: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Point>,
    pub width: f64,
    pub height: f64,
    pub visual: NodeVisual,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeSpec {
    pub id: String,
    pub from: String,
    pub to: String,
    pub polarity: Polarity,
    /// `+` or `−`.
    pub label: String,
    pub color: String,
    pub highlight: String,
    pub font_size: f32,
    pub width: f32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FontOptions {
    pub size: f32,
    pub face: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOptions {
    pub shape: &'static str,
    pub shadow: bool,
    pub border_width: f32,
    pub margin: f32,
    pub max_width: f32,
    pub font: FontOptions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeOptions {
    pub smooth: &'static str,
    pub roundness: f32,
    pub width: f32,
    pub font_size: f32,
    pub arrows: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarnesHut {
    pub gravitational_constant: f64,
    pub central_gravity: f64,
    pub spring_length: f64,
    pub spring_constant: f64,
    pub damping: f64,
    pub avoid_overlap: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicsOptions {
    /// Off until the layout controller asks for a stabilization run.
    pub enabled: bool,
    pub stabilization_iterations: u32,
    pub barnes_hut: BarnesHut,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionOptions {
    pub hover: bool,
    pub navigation_buttons: bool,
    pub keyboard: bool,
    pub multiselect: bool,
    pub drag_nodes: bool,
    pub zoom_view: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineOptions {
    pub nodes: NodeOptions,
    pub edges: EdgeOptions,
    pub physics: PhysicsOptions,
    pub interaction: InteractionOptions,
    pub random_seed: u64,
}

impl EngineOptions {
    pub fn new(theme: &Theme, config: &LayoutConfig) -> Self {
        Self {
            nodes: NodeOptions {
                shape: "ellipse",
                shadow: true,
                border_width: config.glyph_border_width,
                margin: config.node_margin,
                max_width: config.node_max_width,
                font: FontOptions {
                    size: theme.font_size,
                    face: theme.font_family.clone(),
                    color: theme.font_color.clone(),
                },
            },
            edges: EdgeOptions {
                smooth: "curvedCW",
                roundness: 0.2,
                width: 2.0,
                font_size: theme.edge_font_size,
                arrows: "to",
            },
            physics: PhysicsOptions {
                enabled: false,
                stabilization_iterations: 100,
                barnes_hut: BarnesHut {
                    gravitational_constant: -2000.0,
                    central_gravity: 0.05,
                    spring_length: 150.0,
                    spring_constant: 0.04,
                    damping: 0.5,
                    avoid_overlap: 1.0,
                },
            },
            interaction: InteractionOptions {
                hover: true,
                navigation_buttons: true,
                keyboard: true,
                multiselect: false,
                drag_nodes: true,
                zoom_view: true,
            },
            random_seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSpec {
    pub diagram_id: String,
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<EdgeSpec>,
    pub options: EngineOptions,
}

impl RenderSpec {
    pub fn node(&self, id: &str) -> Option<&NodeSpec> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

/// A render spec together with the positions the engine settled on.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LaidOutDiagram {
    pub spec: RenderSpec,
    pub positions: Positions,
    pub legend: Vec<LegendEntry>,
}

impl LaidOutDiagram {
    pub fn position(&self, node_id: &str) -> Option<Point> {
        self.positions.get(node_id).copied()
    }
}

pub fn edge_colors(polarity: Polarity, theme: &Theme) -> &EdgeColors {
    match polarity {
        Polarity::Positive => &theme.positive_edge,
        Polarity::Negative => &theme.negative_edge,
    }
}

fn node_visual(
    snapshot: &DiagramSnapshot,
    node_id: &str,
    wrapped: &str,
    theme: &Theme,
    style: &GlyphStyle,
) -> NodeVisual {
    let colors = snapshot.membership_colors(node_id);
    match colors.len() {
        0 => NodeVisual::Plain {
            background: theme.node_background.clone(),
            border: theme.node_border.clone(),
            highlight_background: theme.node_highlight_background.clone(),
            highlight_border: theme.node_highlight_border.clone(),
        },
        1 => NodeVisual::SingleMembership {
            color: colors[0].clone(),
        },
        _ => {
            let image = pie_ellipse(wrapped, &colors, style).data_uri();
            NodeVisual::MultiMembership { colors, image }
        }
    }
}

/// Builds the snapshot and the render spec in one go. Saved positions are
/// applied to the nodes they name; other nodes are left for the engine.
pub fn assemble(
    diagram: &Diagram,
    saved: Option<&Positions>,
    theme: &Theme,
    config: &LayoutConfig,
) -> (DiagramSnapshot, RenderSpec) {
    let snapshot = build_snapshot(diagram, theme, config);
    let style = GlyphStyle::new(theme, config);
    let margin = f64::from(config.node_margin);

    let nodes = diagram
        .nodes
        .iter()
        .map(|node| {
            let wrapped = wrap_label(&node.name, config.label_max_chars, config.label_max_lines);
            let visual = node_visual(&snapshot, &node.id, &wrapped, theme, &style);
            let block = measure_label(&wrapped, theme, config);
            let (width, height) = match visual {
                NodeVisual::MultiMembership { .. } => {
                    (f64::from(style.width), f64::from(style.height))
                }
                _ => (
                    (f64::from(block.width) + 2.0 * margin).min(f64::from(config.node_max_width)),
                    f64::from(block.height) + 2.0 * margin,
                ),
            };
            let label = match visual {
                NodeVisual::MultiMembership { .. } => String::new(),
                _ => wrapped,
            };
            NodeSpec {
                id: node.id.clone(),
                label,
                lines: block.lines,
                original_label: node.name.clone(),
                title: node.name.clone(),
                position: saved.and_then(|positions| positions.get(&node.id).copied()),
                width,
                height,
                visual,
            }
        })
        .collect();

    let edges = diagram
        .edges
        .iter()
        .map(|edge| {
            let colors = edge_colors(edge.polarity, theme);
            EdgeSpec {
                id: edge.id.clone(),
                from: edge.source.clone(),
                to: edge.target.clone(),
                polarity: edge.polarity,
                label: edge.polarity.sign().to_string(),
                color: colors.base.clone(),
                highlight: colors.highlight.clone(),
                font_size: theme.edge_font_size,
                width: 2.0,
            }
        })
        .collect();

    let spec = RenderSpec {
        diagram_id: diagram.id.clone(),
        nodes,
        edges,
        options: EngineOptions::new(theme, config),
    };
    (snapshot, spec)
}

pub fn build_render_spec(
    diagram: &Diagram,
    saved: Option<&Positions>,
    theme: &Theme,
    config: &LayoutConfig,
) -> RenderSpec {
    assemble(diagram, saved, theme, config).1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> LayoutConfig {
        LayoutConfig {
            fast_text_metrics: true,
            ..Default::default()
        }
    }

    fn fixes_that_fail() -> Diagram {
        let mut diagram = Diagram::new("d1");
        diagram.add_node("A", "A");
        diagram.add_node("B", "B");
        diagram.add_node("C", "C");
        diagram.add_archetype("Arch1", "FIXES_THAT_FAIL", &["A", "B"]);
        diagram.add_archetype("Arch2", "FIXES_THAT_FAIL", &["B", "C"]);
        diagram
    }

    #[test]
    fn roman_numerals_cover_one_to_twenty() {
        assert_eq!(roman_numeral(1), "I");
        assert_eq!(roman_numeral(4), "IV");
        assert_eq!(roman_numeral(9), "IX");
        assert_eq!(roman_numeral(14), "XIV");
        assert_eq!(roman_numeral(19), "XIX");
        assert_eq!(roman_numeral(20), "XX");
        assert_eq!(roman_numeral(0), "I");
        assert_eq!(roman_numeral(35), "XX");
    }

    #[test]
    fn legend_numbers_repeated_types_only() {
        let mut diagram = Diagram::new("d1");
        diagram.add_archetype("a1", "FIXES_THAT_FAIL", &[]);
        diagram.add_archetype("a2", "LIMITS_TO_SUCCESS", &[]);
        diagram.add_archetype("a3", "Fixes that Fail", &[]);
        diagram.add_archetype("a4", "fixes-that-fail", &[]);
        let snapshot = build_snapshot(&diagram, &Theme::classic(), &config());
        let labels: Vec<String> = snapshot.legend().into_iter().map(|e| e.label).collect();
        assert_eq!(
            labels,
            [
                "Fixes That Fail I",
                "Limits To Success",
                "Fixes That Fail II",
                "Fixes That Fail III"
            ]
        );
        assert_eq!(snapshot.instance("a4").map(|i| i.index), Some(2));
    }

    #[test]
    fn shared_node_gets_a_two_slice_glyph() {
        let (snapshot, spec) = assemble(&fixes_that_fail(), None, &Theme::classic(), &config());
        assert_eq!(snapshot.instance("Arch1").unwrap().color, "#efd9f2");
        assert_eq!(snapshot.instance("Arch2").unwrap().color, "#be65cd");

        match &spec.node("B").unwrap().visual {
            NodeVisual::MultiMembership { colors, image } => {
                assert_eq!(colors, &["#efd9f2", "#be65cd"]);
                assert!(image.starts_with("data:image/svg+xml;base64,"));
            }
            other => panic!("expected multi membership, got {other:?}"),
        }
        assert_eq!(spec.node("B").unwrap().label, "");
        assert_eq!(
            spec.node("A").unwrap().visual,
            NodeVisual::SingleMembership {
                color: "#efd9f2".into()
            }
        );
        assert_eq!(
            spec.node("C").unwrap().visual,
            NodeVisual::SingleMembership {
                color: "#be65cd".into()
            }
        );
    }

    #[test]
    fn nodes_outside_archetypes_use_the_regular_palette() {
        let mut diagram = fixes_that_fail();
        diagram.add_node("D", "Demand");
        let spec = build_render_spec(&diagram, None, &Theme::classic(), &config());
        match &spec.node("D").unwrap().visual {
            NodeVisual::Plain {
                background,
                highlight_background,
                ..
            } => {
                assert_eq!(background, "#FFF0CE");
                assert_eq!(highlight_background, "#C3A869");
            }
            other => panic!("expected plain, got {other:?}"),
        }
    }

    #[test]
    fn saved_positions_apply_only_to_named_nodes() {
        let mut saved = Positions::new();
        saved.insert("A".into(), Point::new(5.0, 6.0));
        let spec = build_render_spec(&fixes_that_fail(), Some(&saved), &Theme::classic(), &config());
        assert_eq!(spec.node("A").unwrap().position, Some(Point::new(5.0, 6.0)));
        assert_eq!(spec.node("B").unwrap().position, None);
    }

    #[test]
    fn edges_carry_polarity_colors_and_signs() {
        let mut diagram = fixes_that_fail();
        diagram.add_edge("A", "B", Polarity::Positive);
        diagram.add_edge("B", "C", Polarity::Negative);
        let spec = build_render_spec(&diagram, None, &Theme::classic(), &config());
        assert_eq!(spec.edges[0].label, "+");
        assert_eq!(spec.edges[0].color, "#388E3C");
        assert_eq!(spec.edges[1].label, "\u{2212}");
        assert_eq!(spec.edges[1].highlight, "#F44336");
    }

    #[test]
    fn labels_wrap_and_widths_respect_the_cap() {
        let mut diagram = Diagram::new("d1");
        diagram.add_node("n", "Number of customers waiting in line for service");
        let spec = build_render_spec(&diagram, None, &Theme::classic(), &config());
        let node = spec.node("n").unwrap();
        assert_eq!(node.lines.len(), 3);
        assert!(node.width <= 200.0);
        assert_eq!(node.title, "Number of customers waiting in line for service");
    }

    #[test]
    fn engine_options_start_with_physics_off() {
        let spec = build_render_spec(&fixes_that_fail(), None, &Theme::classic(), &config());
        let json = serde_json::to_value(&spec.options).unwrap();
        assert_eq!(json["physics"]["enabled"], false);
        assert_eq!(json["physics"]["barnesHut"]["gravitationalConstant"], -2000.0);
        assert_eq!(json["randomSeed"], 42);
        assert_eq!(json["edges"]["smooth"], "curvedCW");
    }
}
