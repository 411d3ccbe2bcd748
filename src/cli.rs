use crate::config::load_config;
use crate::marks_dump::{MarksDump, write_marks_dump};
use crate::overlay::SetOfMarks;
use crate::render::{render_svg, write_output_svg};
use crate::scene::{Scene, SceneProvider};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(
    name = "som",
    version,
    about = "Set-of-Marks overlay for interactive elements of a rendered scene"
)]
pub struct Args {
    /// Scene snapshot (.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. JSON and SVG default to stdout if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Config JSON file (pipeline thresholds, themeVariables, render options)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Print the node resolved for this index instead of an overlay
    #[arg(long = "resolve")]
    pub resolve: Option<usize>,

    /// Render the overlay hidden (root only, no marks)
    #[arg(long = "hidden")]
    pub hidden: bool,

    /// Verbose logging to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config(args.config.as_deref())?;
    let input = read_input(args.input.as_deref())?;
    let scene = Scene::from_json(&input)?;

    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    let mut som = SetOfMarks::new(config.som.clone(), config.theme.clone());
    runtime.block_on(som.display(&scene))?;
    if args.hidden {
        som.hide();
    }

    if let Some(index) = args.resolve {
        let node = som
            .resolve(index)
            .ok_or_else(|| anyhow::anyhow!("No element has index {index}"))?;
        let element = scene.element(node);
        println!(
            "{}",
            serde_json::json!({
                "index": index,
                "node": node,
                "tag": element.tag,
                "elementId": element.element_id,
                "box": scene.shape(node).rect,
            })
        );
        return Ok(());
    }

    match args.output_format {
        OutputFormat::Json => {
            let dump = MarksDump::from_marks(&scene, som.marks(), som.is_hidden());
            write_marks_dump(&dump, args.output.as_deref())?;
        }
        OutputFormat::Svg => {
            let svg = render_svg(
                som.marks(),
                &scene.viewport_bound(),
                som.theme(),
                &config.render,
                som.is_hidden(),
            );
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => write_png(&som, &scene, &config.render, &args.output)?,
    }
    Ok(())
}

#[cfg(feature = "png")]
fn write_png(
    som: &SetOfMarks,
    scene: &Scene,
    render: &crate::config::RenderConfig,
    output: &Option<PathBuf>,
) -> Result<()> {
    let output = ensure_output(output, "png")?;
    let svg = render_svg(
        som.marks(),
        &scene.viewport_bound(),
        som.theme(),
        render,
        som.is_hidden(),
    );
    crate::render::write_output_png(&svg, &output, som.theme())
}

#[cfg(not(feature = "png"))]
fn write_png(
    _som: &SetOfMarks,
    _scene: &Scene,
    _render: &crate::config::RenderConfig,
    _output: &Option<PathBuf>,
) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
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

#[cfg_attr(not(feature = "png"), allow(dead_code))]
fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
