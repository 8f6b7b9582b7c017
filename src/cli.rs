use crate::config::{Config, load_config, merge_init_config};
use crate::layout_dump::write_layout_dump;
use crate::parser::parse_diagrams;
#[cfg(feature = "png")]
use crate::render::write_output_png;
use crate::render::{render_svg, write_output_svg};
use crate::store::{FileLayoutStore, LayoutStore, MemoryLayoutStore};
use crate::view::lay_out;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cldr", version, about = "Causal loop diagram renderer")]
pub struct Args {
    /// Input diagram (.json / .json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG and JSON if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme preset, themeVariables, layout overrides)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Directory holding saved node positions, one file per diagram id
    #[arg(long = "layout-dir")]
    pub layout_dir: Option<PathBuf>,

    /// Discard the current placement and lay nodes out on a circle or grid
    #[arg(long = "redistribute")]
    pub redistribute: bool,

    /// Width
    #[arg(short = 'w', long = "width", default_value_t = 1200.0)]
    pub width: f32,

    /// Height
    #[arg(short = 'H', long = "height", default_value_t = 800.0)]
    pub height: f32,

    /// Log layout decisions to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    Json,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
            OutputFormat::Json => "json",
        }
    }
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    if args.verbose {
        init_tracing();
    }
    let mut base_config = load_config(args.config.as_deref())?;
    base_config.render.width = args.width;
    base_config.render.height = args.height;

    match args.layout_dir.clone() {
        Some(dir) => render_all(&args, &base_config, FileLayoutStore::new(dir)),
        None => render_all(&args, &base_config, MemoryLayoutStore::default()),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn render_all<S: LayoutStore>(args: &Args, base_config: &Config, mut store: S) -> Result<()> {
    let input = read_input(args.input.as_deref())?;
    let parsed = parse_diagrams(&input)?;
    if parsed.is_empty() {
        return Err(anyhow::anyhow!("No diagrams found in input"));
    }

    let outputs = if parsed.len() == 1 {
        vec![args.output.clone()]
    } else {
        resolve_multi_outputs(args.output.as_deref(), args.output_format, parsed.len())?
            .into_iter()
            .map(Some)
            .collect()
    };

    for (parsed, output) in parsed.into_iter().zip(outputs) {
        let mut config = base_config.clone();
        if let Some(init_cfg) = parsed.init_config {
            config = merge_init_config(config, init_cfg)?;
        }
        let (layout, returned) = lay_out(
            parsed.diagram,
            store,
            &config.theme,
            &config.layout,
            args.redistribute,
        );
        store = returned;
        let layout = layout.ok_or_else(|| anyhow::anyhow!("Layout produced no diagram"))?;

        match args.output_format {
            OutputFormat::Svg => {
                let svg = render_svg(&layout, &config.theme, &config.layout);
                write_output_svg(&svg, output.as_deref())?;
            }
            OutputFormat::Png => {
                let output = ensure_output(&output, "png")?;
                let svg = render_svg(&layout, &config.theme, &config.layout);
                write_png(&svg, &output, &config)?;
            }
            OutputFormat::Json => {
                write_layout_dump(output.as_deref(), &layout)?;
            }
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, config: &Config) -> Result<()> {
    write_output_png(svg, output, &config.render)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _config: &Config) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

/// Output paths for an input holding several diagrams: numbered files inside
/// `output` when it is a directory, otherwise numbered siblings of it.
fn resolve_multi_outputs(
    output: Option<&Path>,
    format: OutputFormat,
    count: usize,
) -> Result<Vec<PathBuf>> {
    let ext = format.extension();
    let base = output
        .ok_or_else(|| anyhow::anyhow!("Output path required for input with several diagrams"))?;
    if base.is_dir() {
        return Ok((0..count)
            .map(|idx| base.join(format!("diagram-{}.{}", idx + 1, ext)))
            .collect());
    }
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("diagram");
    let parent = base.parent().unwrap_or_else(|| Path::new("."));
    Ok((0..count)
        .map(|idx| parent.join(format!("{}-{}.{}", stem, idx + 1, ext)))
        .collect())
}
