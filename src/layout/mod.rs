pub mod engine;
pub mod overlap;
pub mod redistribute;
pub mod text;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::LayoutConfig;
use crate::store::LayoutStore;

pub use engine::{EngineEvent, RenderEngine, StaticEngine};
pub use overlap::{OverlapConfig, OverlapReport, resolve_overlaps};
pub use redistribute::RedistributeConfig;
pub use text::wrap_label;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Node id to center position. Ordered so persisted records are stable.
pub type Positions = BTreeMap<String, Point>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn union(self, other: Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        Rect {
            x,
            y,
            width: right - x,
            height: bottom - y,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutPhase {
    Init,
    Stabilizing,
    Correcting,
    Settled,
}

/// Sequences placement for one open diagram:
/// `Init -> Stabilizing -> Correcting -> Settled`.
///
/// A saved layout skips straight to `Correcting`, since nodes added after the
/// save may sit on top of others. `Correcting` is passed through
/// synchronously: overlap resolution, physics off, viewport fit, then the
/// settled positions are persisted.
#[derive(Debug, Clone)]
pub struct LayoutController {
    diagram_id: String,
    phase: LayoutPhase,
    overlap: OverlapConfig,
    redistribute: RedistributeConfig,
    last_report: Option<OverlapReport>,
}

impl LayoutController {
    pub fn new(diagram_id: &str, config: &LayoutConfig) -> Self {
        Self {
            diagram_id: diagram_id.to_string(),
            phase: LayoutPhase::Init,
            overlap: config.overlap.clone(),
            redistribute: config.redistribute.clone(),
            last_report: None,
        }
    }

    pub fn diagram_id(&self) -> &str {
        &self.diagram_id
    }

    pub fn phase(&self) -> LayoutPhase {
        self.phase
    }

    pub fn last_report(&self) -> Option<OverlapReport> {
        self.last_report
    }

    /// Entry point once the engine holds the render spec. `restored` tells
    /// whether saved positions were applied to the spec.
    pub fn open<E, S>(&mut self, engine: &mut E, store: &mut S, restored: bool)
    where
        E: RenderEngine + ?Sized,
        S: LayoutStore + ?Sized,
    {
        if self.phase != LayoutPhase::Init {
            debug!(diagram = %self.diagram_id, phase = ?self.phase, "layout already opened");
            return;
        }
        if restored {
            self.correct(engine, store);
        } else {
            self.phase = LayoutPhase::Stabilizing;
            engine.set_physics(true);
            engine.stabilize();
        }
    }

    pub fn on_stabilized<E, S>(&mut self, engine: &mut E, store: &mut S)
    where
        E: RenderEngine + ?Sized,
        S: LayoutStore + ?Sized,
    {
        if self.phase != LayoutPhase::Stabilizing {
            debug!(diagram = %self.diagram_id, phase = ?self.phase, "ignoring stabilization signal");
            return;
        }
        self.correct(engine, store);
    }

    pub fn on_drag_end<E, S>(&mut self, engine: &mut E, store: &mut S)
    where
        E: RenderEngine + ?Sized,
        S: LayoutStore + ?Sized,
    {
        if self.phase == LayoutPhase::Settled {
            store.save(&self.diagram_id, &engine.positions());
        }
    }

    /// Lays nodes out afresh on a circle or grid, then waits for a short
    /// physics run before correcting again. Allowed in any phase.
    pub fn redistribute<E>(&mut self, engine: &mut E)
    where
        E: RenderEngine + ?Sized,
    {
        let ids = engine.node_ids();
        if ids.len() <= 1 {
            return;
        }
        engine.set_physics(true);
        for (id, at) in redistribute::redistribute(&ids, &self.redistribute) {
            engine.move_node(&id, at);
        }
        self.phase = LayoutPhase::Stabilizing;
        engine.stabilize();
    }

    fn correct<E, S>(&mut self, engine: &mut E, store: &mut S)
    where
        E: RenderEngine + ?Sized,
        S: LayoutStore + ?Sized,
    {
        self.phase = LayoutPhase::Correcting;
        let order = engine.node_ids();
        let mut positions = engine.positions();
        let report = resolve_overlaps(&order, &mut positions, &self.overlap);
        if report.moved_any() {
            for id in &order {
                if let Some(at) = positions.get(id) {
                    engine.move_node(id, *at);
                }
            }
        }
        engine.set_physics(false);
        engine.stop_simulation();
        engine.fit();
        self.last_report = Some(report);

        self.phase = LayoutPhase::Settled;
        store.save(&self.diagram_id, &engine.positions());
    }
}
