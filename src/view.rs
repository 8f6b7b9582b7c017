//! The command surface a UI binds to: one open diagram at a time, its
//! engine, layout controller, legend and current selection.

use tracing::debug;

use crate::assemble::{DiagramSnapshot, LaidOutDiagram, LegendEntry, RenderSpec, assemble};
use crate::config::LayoutConfig;
use crate::ir::Diagram;
use crate::layout::{EngineEvent, LayoutController, LayoutPhase, RenderEngine, StaticEngine};
use crate::selection::{SelectionDetail, project_selection};
use crate::store::LayoutStore;
use crate::theme::Theme;

const DEFAULT_SCALE: f64 = 1.0;

struct Session<E> {
    diagram: Diagram,
    snapshot: DiagramSnapshot,
    spec: RenderSpec,
    engine: E,
    controller: LayoutController,
}

pub struct DiagramView<E, S> {
    factory: Box<dyn FnMut(&RenderSpec) -> E>,
    store: S,
    theme: Theme,
    config: LayoutConfig,
    session: Option<Session<E>>,
    selection: Option<SelectionDetail>,
    zoom: f64,
}

impl<E: RenderEngine, S: LayoutStore> DiagramView<E, S> {
    pub fn new(
        store: S,
        theme: Theme,
        config: LayoutConfig,
        factory: impl FnMut(&RenderSpec) -> E + 'static,
    ) -> Self {
        Self {
            factory: Box::new(factory),
            store,
            theme,
            config,
            session: None,
            selection: None,
            zoom: DEFAULT_SCALE,
        }
    }

    /// Replaces whatever diagram was open. Events still in flight for the
    /// previous diagram are dropped by [`Self::handle`].
    pub fn render(&mut self, diagram: Diagram) {
        let saved = self.store.load(&diagram.id);
        let (snapshot, spec) = assemble(&diagram, saved.as_ref(), &self.theme, &self.config);
        let restored = spec.nodes.iter().any(|node| node.position.is_some());
        let mut engine = (self.factory)(&spec);
        let mut controller = LayoutController::new(&diagram.id, &self.config);

        self.selection = None;
        self.zoom = DEFAULT_SCALE;
        controller.open(&mut engine, &mut self.store, restored);
        self.session = Some(Session {
            diagram,
            snapshot,
            spec,
            engine,
            controller,
        });
    }

    pub fn handle(&mut self, event: EngineEvent) {
        let Some(session) = self.session.as_mut() else {
            debug!(diagram = event.diagram_id(), "no diagram open, dropping event");
            return;
        };
        if event.diagram_id() != session.diagram.id {
            debug!(
                diagram = event.diagram_id(),
                current = %session.diagram.id,
                "dropping stale engine event"
            );
            return;
        }
        match event {
            EngineEvent::SelectNode { node_id, .. } => self.select(&node_id),
            EngineEvent::Click { nodes, .. } => match nodes.first() {
                Some(node_id) => self.select(node_id),
                None => self.clear_selection(),
            },
            EngineEvent::DragEnd { .. } => session
                .controller
                .on_drag_end(&mut session.engine, &mut self.store),
            EngineEvent::StabilizationDone { .. } => session
                .controller
                .on_stabilized(&mut session.engine, &mut self.store),
        }
    }

    fn select(&mut self, node_id: &str) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        match project_selection(&session.snapshot, &session.diagram, node_id) {
            Some(detail) => self.selection = Some(detail),
            None => debug!(node = node_id, "selected node is not in the open diagram"),
        }
    }

    pub fn clear_selection(&mut self) {
        if self.selection.is_none() {
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.engine.unselect_all();
        }
        self.selection = None;
    }

    pub fn zoom_in(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        self.zoom += self.config.zoom_step;
        session.engine.set_scale(self.zoom);
    }

    /// Steps out until the scale reaches the configured floor.
    pub fn zoom_out(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if self.zoom <= self.config.zoom_min + 1e-9 {
            return;
        }
        self.zoom -= self.config.zoom_step;
        session.engine.set_scale(self.zoom);
    }

    pub fn redistribute(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.controller.redistribute(&mut session.engine);
        }
    }

    pub fn legend(&self) -> Vec<LegendEntry> {
        self.session
            .as_ref()
            .map(|session| session.snapshot.legend())
            .unwrap_or_default()
    }

    pub fn selection(&self) -> Option<&SelectionDetail> {
        self.selection.as_ref()
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn phase(&self) -> Option<LayoutPhase> {
        self.session.as_ref().map(|session| session.controller.phase())
    }

    pub fn diagram(&self) -> Option<&Diagram> {
        self.session.as_ref().map(|session| &session.diagram)
    }

    pub fn snapshot(&self) -> Option<&DiagramSnapshot> {
        self.session.as_ref().map(|session| &session.snapshot)
    }

    pub fn engine(&self) -> Option<&E> {
        self.session.as_ref().map(|session| &session.engine)
    }

    pub fn engine_mut(&mut self) -> Option<&mut E> {
        self.session.as_mut().map(|session| &mut session.engine)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// The open diagram with the positions its engine currently holds.
    pub fn laid_out(&self) -> Option<LaidOutDiagram> {
        let session = self.session.as_ref()?;
        Some(LaidOutDiagram {
            spec: session.spec.clone(),
            positions: session.engine.positions(),
            legend: session.snapshot.legend(),
        })
    }
}

impl<S: LayoutStore> DiagramView<StaticEngine, S> {
    pub fn headless(store: S, theme: Theme, config: LayoutConfig) -> Self {
        Self::new(store, theme, config, StaticEngine::new)
    }

    /// Feeds pending stabilization completions back until the layout settles.
    pub fn run_until_settled(&mut self) {
        loop {
            let Some(event) = self
                .engine_mut()
                .and_then(StaticEngine::finish_stabilization)
            else {
                break;
            };
            self.handle(event);
        }
    }
}

/// Lays a diagram out headlessly: restore or place, optionally
/// redistribute, settle.
pub fn lay_out<S: LayoutStore>(
    diagram: Diagram,
    store: S,
    theme: &Theme,
    config: &LayoutConfig,
    redistribute: bool,
) -> (Option<LaidOutDiagram>, S) {
    let mut view = DiagramView::headless(store, theme.clone(), config.clone());
    view.render(diagram);
    view.run_until_settled();
    if redistribute {
        view.redistribute();
        view.run_until_settled();
    }
    (view.laid_out(), view.into_store())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Point;
    use crate::store::MemoryLayoutStore;
    use tracing_test::traced_test;

    fn config() -> LayoutConfig {
        LayoutConfig {
            fast_text_metrics: true,
            ..Default::default()
        }
    }

    fn diagram(id: &str) -> Diagram {
        let mut diagram = Diagram::new(id);
        diagram.add_node("a", "Effort");
        diagram.add_node("b", "Results");
        diagram.add_loop("L1", "REINFORCING", &["a", "b"]);
        diagram.add_archetype("X1", "LIMITS_TO_SUCCESS", &["a", "b"]);
        diagram
    }

    fn view() -> DiagramView<StaticEngine, MemoryLayoutStore> {
        DiagramView::headless(MemoryLayoutStore::default(), Theme::classic(), config())
    }

    fn select(id: &str, node: &str) -> EngineEvent {
        EngineEvent::SelectNode {
            diagram_id: id.into(),
            node_id: node.into(),
        }
    }

    #[test]
    fn render_then_settle_persists_layout() {
        let mut view = view();
        view.render(diagram("d1"));
        assert_eq!(view.phase(), Some(LayoutPhase::Stabilizing));
        view.run_until_settled();
        assert_eq!(view.phase(), Some(LayoutPhase::Settled));
        assert!(view.store().raw("d1").is_some());
        assert_eq!(view.legend().len(), 1);
        assert_eq!(view.legend()[0].label, "Limits To Success");
    }

    #[test]
    fn reopening_restores_saved_positions() {
        let mut view = view();
        view.render(diagram("d1"));
        view.run_until_settled();
        let before = view.laid_out().unwrap().positions;

        view.render(diagram("d1"));
        assert_eq!(view.phase(), Some(LayoutPhase::Settled));
        assert_eq!(view.laid_out().unwrap().positions, before);
    }

    #[test]
    fn click_selects_and_empty_click_clears() {
        let mut view = view();
        view.render(diagram("d1"));
        view.handle(select("d1", "a"));
        assert_eq!(view.selection().unwrap().node_name, "Effort");

        view.handle(EngineEvent::Click {
            diagram_id: "d1".into(),
            nodes: vec!["b".into()],
        });
        assert_eq!(view.selection().unwrap().node_name, "Results");

        view.handle(EngineEvent::Click {
            diagram_id: "d1".into(),
            nodes: vec![],
        });
        assert!(view.selection().is_none());
    }

    #[traced_test]
    #[test]
    fn events_for_a_replaced_diagram_are_ignored() {
        let mut view = view();
        view.render(diagram("old"));
        view.render(diagram("new"));
        view.handle(select("old", "a"));
        assert!(view.selection().is_none());
        assert!(logs_contain("dropping stale engine event"));

        view.handle(EngineEvent::StabilizationDone {
            diagram_id: "old".into(),
        });
        assert_eq!(view.phase(), Some(LayoutPhase::Stabilizing));
    }

    #[test]
    fn unknown_node_leaves_selection_unchanged() {
        let mut view = view();
        view.render(diagram("d1"));
        view.handle(select("d1", "a"));
        view.handle(select("d1", "ghost"));
        assert_eq!(view.selection().unwrap().node_name, "Effort");
    }

    #[test]
    fn zoom_steps_and_stops_at_the_floor() {
        let mut view = view();
        view.render(diagram("d1"));
        view.zoom_in();
        assert!((view.engine().unwrap().scale() - 1.1).abs() < 1e-9);
        for _ in 0..20 {
            view.zoom_out();
        }
        assert!((view.zoom() - 0.2).abs() < 1e-9);
        assert!((view.engine().unwrap().scale() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn redistribute_then_settle_saves_new_positions() {
        let mut view = view();
        view.render(diagram("d1"));
        view.run_until_settled();
        view.redistribute();
        assert_eq!(view.phase(), Some(LayoutPhase::Stabilizing));
        view.run_until_settled();
        let saved = view.laid_out().unwrap().positions;
        assert_eq!(saved["a"], Point::new(300.0, 0.0));
        assert_eq!(view.phase(), Some(LayoutPhase::Settled));
    }

    #[test]
    fn lay_out_runs_the_whole_lifecycle() {
        let (laid_out, store) = lay_out(
            diagram("d1"),
            MemoryLayoutStore::default(),
            &Theme::classic(),
            &config(),
            false,
        );
        assert_eq!(laid_out.unwrap().positions.len(), 2);
        assert!(store.raw("d1").is_some());
    }
}
