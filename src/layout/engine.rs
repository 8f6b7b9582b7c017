//! The graph-rendering engine seam. A real deployment drives a physics
//! engine in the UI; [`StaticEngine`] is a deterministic headless stand-in
//! used by the CLI, the wasm wrapper and tests.

use std::collections::HashMap;

use super::redistribute::{RedistributeConfig, circular};
use super::{Point, Positions, Rect};
use crate::assemble::RenderSpec;

/// Events the engine reports back, tagged with the diagram they belong to so
/// late callbacks from a replaced diagram can be dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    SelectNode { diagram_id: String, node_id: String },
    /// Canvas click; `nodes` is empty when the click hit nothing.
    Click { diagram_id: String, nodes: Vec<String> },
    DragEnd { diagram_id: String },
    StabilizationDone { diagram_id: String },
}

impl EngineEvent {
    pub fn diagram_id(&self) -> &str {
        match self {
            Self::SelectNode { diagram_id, .. }
            | Self::Click { diagram_id, .. }
            | Self::DragEnd { diagram_id }
            | Self::StabilizationDone { diagram_id } => diagram_id,
        }
    }
}

pub trait RenderEngine {
    /// Node ids in render spec order.
    fn node_ids(&self) -> Vec<String>;
    fn positions(&self) -> Positions;
    fn move_node(&mut self, id: &str, at: Point);
    fn bounding_box(&self, id: &str) -> Option<Rect>;
    fn set_physics(&mut self, enabled: bool);
    /// Starts a stabilization run; completion arrives as
    /// [`EngineEvent::StabilizationDone`].
    fn stabilize(&mut self);
    fn stop_simulation(&mut self);
    fn fit(&mut self);
    fn set_scale(&mut self, scale: f64);
    fn unselect_all(&mut self);
}

/// Union of every node's bounding box.
pub fn layout_bounds<E: RenderEngine + ?Sized>(engine: &E) -> Option<Rect> {
    engine
        .node_ids()
        .iter()
        .filter_map(|id| engine.bounding_box(id))
        .reduce(Rect::union)
}

#[derive(Debug, Clone)]
pub struct StaticEngine {
    diagram_id: String,
    order: Vec<String>,
    positions: Positions,
    sizes: HashMap<String, (f64, f64)>,
    physics: bool,
    stabilizing: bool,
    scale: f64,
    viewport: Option<Rect>,
    fit_count: usize,
}

impl StaticEngine {
    /// Nodes the render spec leaves unpositioned start on their slot of a circle.
    pub fn new(spec: &RenderSpec) -> Self {
        let order: Vec<String> = spec.nodes.iter().map(|node| node.id.clone()).collect();
        let seed = circular(&order, &RedistributeConfig::default());
        let positions = spec
            .nodes
            .iter()
            .map(|node| {
                let at = node
                    .position
                    .or_else(|| seed.get(&node.id).copied())
                    .unwrap_or_default();
                (node.id.clone(), at)
            })
            .collect();
        let sizes = spec
            .nodes
            .iter()
            .map(|node| (node.id.clone(), (node.width, node.height)))
            .collect();
        Self {
            diagram_id: spec.diagram_id.clone(),
            order,
            positions,
            sizes,
            physics: spec.options.physics.enabled,
            stabilizing: false,
            scale: 1.0,
            viewport: None,
            fit_count: 0,
        }
    }

    pub fn physics_enabled(&self) -> bool {
        self.physics
    }

    pub fn stabilization_pending(&self) -> bool {
        self.stabilizing
    }

    /// Completes a pending stabilization run. There is no simulation, so
    /// nodes stay where they are.
    pub fn finish_stabilization(&mut self) -> Option<EngineEvent> {
        if !std::mem::take(&mut self.stabilizing) {
            return None;
        }
        Some(EngineEvent::StabilizationDone {
            diagram_id: self.diagram_id.clone(),
        })
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn viewport(&self) -> Option<Rect> {
        self.viewport
    }

    pub fn fit_count(&self) -> usize {
        self.fit_count
    }
}

impl RenderEngine for StaticEngine {
    fn node_ids(&self) -> Vec<String> {
        self.order.clone()
    }

    fn positions(&self) -> Positions {
        self.positions.clone()
    }

    fn move_node(&mut self, id: &str, at: Point) {
        if let Some(slot) = self.positions.get_mut(id) {
            *slot = at;
        }
    }

    fn bounding_box(&self, id: &str) -> Option<Rect> {
        let center = self.positions.get(id)?;
        let (width, height) = self.sizes.get(id).copied().unwrap_or((0.0, 0.0));
        Some(Rect {
            x: center.x - width / 2.0,
            y: center.y - height / 2.0,
            width,
            height,
        })
    }

    fn set_physics(&mut self, enabled: bool) {
        self.physics = enabled;
    }

    fn stabilize(&mut self) {
        self.stabilizing = true;
    }

    fn stop_simulation(&mut self) {
        self.stabilizing = false;
    }

    fn fit(&mut self) {
        self.viewport = layout_bounds(self);
        self.fit_count += 1;
    }

    fn set_scale(&mut self, scale: f64) {
        self.scale = scale;
    }

    fn unselect_all(&mut self) {}
}
