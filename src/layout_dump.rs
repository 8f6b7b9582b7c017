use crate::assemble::{LaidOutDiagram, LegendEntry, NodeVisual};
use crate::ir::Polarity;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub diagram_id: String,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub legend: Vec<LegendEntry>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub visual: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: f64,
    pub height: f64,
    pub label_lines: Vec<String>,
    pub colors: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub id: String,
    pub from: String,
    pub to: String,
    pub polarity: Polarity,
    pub sign: String,
    pub color: String,
}

fn visual_colors(visual: &NodeVisual) -> Vec<String> {
    match visual {
        NodeVisual::Plain { background, .. } => vec![background.clone()],
        NodeVisual::SingleMembership { color } => vec![color.clone()],
        NodeVisual::MultiMembership { colors, .. } => colors.clone(),
    }
}

impl LayoutDump {
    pub fn from_layout(layout: &LaidOutDiagram) -> Self {
        let nodes = layout
            .spec
            .nodes
            .iter()
            .map(|node| {
                let at = layout.position(&node.id);
                NodeDump {
                    id: node.id.clone(),
                    visual: node.visual.kind().to_string(),
                    x: at.map(|p| p.x),
                    y: at.map(|p| p.y),
                    width: node.width,
                    height: node.height,
                    label_lines: node.lines.clone(),
                    colors: visual_colors(&node.visual),
                }
            })
            .collect();

        let edges = layout
            .spec
            .edges
            .iter()
            .map(|edge| EdgeDump {
                id: edge.id.clone(),
                from: edge.from.clone(),
                to: edge.to.clone(),
                polarity: edge.polarity,
                sign: edge.label.clone(),
                color: edge.color.clone(),
            })
            .collect();

        LayoutDump {
            diagram_id: layout.spec.diagram_id.clone(),
            nodes,
            edges,
            legend: layout.legend.clone(),
        }
    }
}

/// Pretty JSON to `path`, or stdout when no path is given.
pub fn write_layout_dump(path: Option<&Path>, layout: &LaidOutDiagram) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout);
    match path {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writer.flush()?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &dump)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
