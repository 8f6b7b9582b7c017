pub mod assemble;
pub mod category;
#[cfg(feature = "cli")]
pub mod cli;
pub mod color;
pub mod config;
pub mod error;
pub mod glyph;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod render;
pub mod selection;
pub mod store;
pub mod text_metrics;
pub mod theme;
pub mod view;

#[cfg(feature = "cli")]
pub use cli::run;

pub use assemble::{LaidOutDiagram, LegendEntry, NodeVisual, RenderSpec, assemble};
pub use config::{Config, LayoutConfig};
pub use error::{CldError, Result};
pub use ir::Diagram;
pub use layout::{EngineEvent, LayoutController, LayoutPhase, RenderEngine, StaticEngine};
pub use selection::{SelectionDetail, project_selection};
pub use store::{FileLayoutStore, LayoutStore, MemoryLayoutStore};
pub use theme::Theme;
pub use view::{DiagramView, lay_out};

/// Theme and layout settings for one-shot rendering.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub redistribute: bool,
}

impl RenderOptions {
    pub fn classic() -> Self {
        Self::default()
    }

    pub fn modern() -> Self {
        Self {
            theme: Theme::modern(),
            ..Self::default()
        }
    }
}

/// Parses a diagram document, lays it out headlessly and returns the SVG.
/// Nothing is persisted between calls.
pub fn render_with_options(input: &str, options: RenderOptions) -> anyhow::Result<String> {
    let parsed = parser::parse_diagram(input)?;
    let mut config = Config {
        theme: options.theme,
        layout: options.layout,
        ..Config::default()
    };
    if let Some(init) = parsed.init_config {
        config = config::merge_init_config(config, init)?;
    }
    let (layout, _) = lay_out(
        parsed.diagram,
        MemoryLayoutStore::default(),
        &config.theme,
        &config.layout,
        options.redistribute,
    );
    let layout = layout.ok_or_else(|| anyhow::anyhow!("Layout produced no diagram"))?;
    Ok(render::render_svg(&layout, &config.theme, &config.layout))
}

pub fn render(input: &str) -> anyhow::Result<String> {
    render_with_options(input, RenderOptions::default())
}
