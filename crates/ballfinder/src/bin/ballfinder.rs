//! ballfinder CLI: single-image detection, pipeline replay, parameter editing.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use ballfinder::core::{PixelBuffer, Target};
use ballfinder::detect::{detect_path, target_bearing};
use ballfinder::detection::{DebugStage, Orientation, Parameters, Strategy, TeamColor};
use ballfinder::pipeline::{
    apply_to, hsv_source, render_preview, ImageSequenceSource, JsonLinesSink, ParameterStore,
    ParameterUpdate, Pipeline, PipelineConfig, DEFAULT_HALF_FOV_RAD, DEFAULT_JPEG_QUALITY,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "ballfinder")]
#[command(about = "Find a single colored ball in camera frames and stream its position")]
#[command(version)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit structured JSON logs (requires the `tracing` feature).
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the target in one image and print it as JSON.
    Detect(DetectArgs),

    /// Run the full pipeline over a sequence of images, one telemetry line per frame.
    Replay(ReplayArgs),

    /// Print the effective parameters after applying `--set` updates.
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Args)]
struct DetectArgs {
    /// Input image (RGB; converted to HSV before detection).
    image: PathBuf,

    /// Parameters JSON file; missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the detection strategy.
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Override the team color.
    #[arg(long, value_enum)]
    team: Option<TeamArg>,

    /// Treat the image as captured by an upside-down camera.
    #[arg(long)]
    upside_down: bool,

    /// Intermediate stage to write with `--debug-out`.
    #[arg(long, value_enum)]
    debug_stage: Option<DebugStageArg>,

    /// Write the selected debug stage as an image (defaults to the annotated stage).
    #[arg(long)]
    debug_out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct ReplayArgs {
    /// Image files replayed in order as camera frames.
    #[arg(required = true)]
    images: Vec<PathBuf>,

    /// Parameters JSON file; created with defaults when missing.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frame rate; 0 replays as fast as frames are read.
    #[arg(long, default_value_t = 30.0)]
    fps: f32,

    /// Worker threads (default: available cores - 1).
    #[arg(long)]
    workers: Option<usize>,

    /// Write a JPEG preview of the last accepted frame when the replay ends.
    #[arg(long)]
    preview_out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    /// Parameters JSON file to start from.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dotted-path update, e.g. `--set hough.param2=40` (repeatable).
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Persist the result back to `--config`.
    #[arg(long, requires = "config")]
    write: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Circle,
    Ellipse,
}

impl From<StrategyArg> for Strategy {
    fn from(v: StrategyArg) -> Self {
        match v {
            StrategyArg::Circle => Strategy::Circle,
            StrategyArg::Ellipse => Strategy::Ellipse,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TeamArg {
    Red,
    Blue,
}

impl From<TeamArg> for TeamColor {
    fn from(v: TeamArg) -> Self {
        match v {
            TeamArg::Red => TeamColor::Red,
            TeamArg::Blue => TeamColor::Blue,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DebugStageArg {
    ColorFilter,
    Morphology,
    MedianBlur,
    Annotated,
}

impl From<DebugStageArg> for DebugStage {
    fn from(v: DebugStageArg) -> Self {
        match v {
            DebugStageArg::ColorFilter => DebugStage::ColorFilter,
            DebugStageArg::Morphology => DebugStage::Morphology,
            DebugStageArg::MedianBlur => DebugStage::MedianBlur,
            DebugStageArg::Annotated => DebugStage::Annotated,
        }
    }
}

#[derive(Debug, Serialize)]
struct DetectReport {
    image: PathBuf,
    width: u32,
    height: u32,
    target: Option<Target>,
    /// Horizontal bearing in degrees.
    bearing: Option<f32>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    let outcome = match cli.command {
        Commands::Detect(args) => run_detect(&args),
        Commands::Replay(args) => run_replay(&args),
        Commands::Config(args) => run_config(&args),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn verbosity_level(verbose: u8) -> log::LevelFilter {
    match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn init_logging(verbose: u8, json: bool) {
    let level = verbosity_level(verbose);
    #[cfg(feature = "tracing")]
    {
        let _ = tracing_log::LogTracer::init();
        ballfinder::core::init_tracing(json, level);
    }
    #[cfg(not(feature = "tracing"))]
    {
        if let Err(e) = ballfinder::core::init_with_level(level) {
            eprintln!("logger already installed: {e}");
        }
        if json {
            log::warn!("--json-logs needs the `tracing` feature; using plain logs");
        }
    }
}

fn load_params(path: Option<&Path>) -> CliResult<Parameters> {
    let params = match path {
        Some(p) => Parameters::load_json(p)?,
        None => Parameters::default(),
    };
    Ok(params)
}

// ── detect ─────────────────────────────────────────────────────────────

fn run_detect(args: &DetectArgs) -> CliResult<()> {
    let mut params = load_params(args.config.as_deref())?;
    if let Some(s) = args.strategy {
        params.strategy = s.into();
    }
    if let Some(t) = args.team {
        params.color.team = t.into();
    }
    if args.upside_down {
        params.orientation = Orientation::UpsideDown;
    }
    params.debug_stage = match (args.debug_stage, &args.debug_out) {
        (Some(stage), _) => stage.into(),
        (None, Some(_)) => DebugStage::Annotated,
        (None, None) => DebugStage::None,
    };
    params.validate()?;

    log::info!("detecting in {}", args.image.display());
    let result = detect_path(&args.image, &params)?;
    let (width, height) = result
        .frame
        .as_ref()
        .map(|f| (f.width(), f.height()))
        .unwrap_or_default();

    if let Some(out) = &args.debug_out {
        match &result.debug_frame {
            Some(PixelBuffer::Mask(mask)) => mask.save(out)?,
            Some(PixelBuffer::Color(rgb)) => rgb.save(out)?,
            None => log::warn!("no debug frame produced"),
        }
        log::info!("debug frame written to {}", out.display());
    }

    let report = DetectReport {
        image: args.image.clone(),
        width,
        height,
        bearing: target_bearing(&result, DEFAULT_HALF_FOV_RAD),
        target: result.target,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// ── replay ─────────────────────────────────────────────────────────────

fn run_replay(args: &ReplayArgs) -> CliResult<()> {
    let store = match &args.config {
        Some(path) => ParameterStore::open(path)?,
        None => ParameterStore::default(),
    };
    let config = PipelineConfig {
        workers: args.workers,
        ..PipelineConfig::default()
    };
    let source = hsv_source(ImageSequenceSource::open(&args.images)?.with_fps(args.fps));
    let sink = JsonLinesSink::new(std::io::stdout());

    let handle = Pipeline::new(config, Arc::new(store)).spawn(source, sink)?;
    let last_seen = Arc::clone(handle.last_seen());
    let report = handle.join()?;
    log::info!(
        "replayed {} frames: {} published, {} stale, {} dropped",
        report.frames_ingested,
        report.dispatcher.published,
        report.dispatcher.stale,
        report.ingest_dropped + report.ready_dropped
    );

    if let Some(out) = &args.preview_out {
        match render_preview(&last_seen.snapshot(), DEFAULT_JPEG_QUALITY)? {
            Some(jpeg) => {
                std::fs::write(out, jpeg)?;
                log::info!("preview written to {}", out.display());
            }
            None => log::warn!("no frame accepted; preview not written"),
        }
    }
    Ok(())
}

// ── config ─────────────────────────────────────────────────────────────

fn run_config(args: &ConfigArgs) -> CliResult<()> {
    let base = match &args.config {
        Some(p) if p.exists() => Parameters::load_json(p)?,
        _ => Parameters::default(),
    };
    let updates = args
        .set
        .iter()
        .map(|raw| ParameterUpdate::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;
    let params = apply_to(&base, &updates)?;

    if args.write {
        if let Some(path) = &args.config {
            params.write_json(path)?;
            log::info!("parameters written to {}", path.display());
        }
    }
    println!("{}", serde_json::to_string_pretty(&params)?);
    Ok(())
}
