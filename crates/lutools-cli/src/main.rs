//! lutools - colour grading from the command line
//!
//! Thin front-end over `lutools-core`: every subcommand drives the engine
//! façade and prints its log and progress events.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lutools_core::{AdjustmentParams, Engine, EngineConfig};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "lutools")]
#[command(author, version, about = "Apply, preview and create .cube LUTs")]
#[command(long_about = "
Colour grading with .cube 3D LUTs.

Examples:
  lutools apply photo.jpg -o graded.jpg -l film.cube --blend 0.8
  lutools apply a.png b.png --out-dir graded/ -l film.cube --contrast 0.2
  lutools preview photo.jpg -o preview.png -l BW6.cube --max 800x600
  lutools resize photo.jpg -o small.png --size 640x480
  lutools create-lut before.png after.png -o looks/match -s 33 -s 65
  lutools info film.cube
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,

    /// JSON engine configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply LUTs and adjustments at full resolution
    #[command(visible_alias = "a")]
    Apply(ApplyArgs),

    /// Write a downscaled, graded preview
    #[command(visible_alias = "p")]
    Preview(PreviewArgs),

    /// Resize an image
    #[command(visible_alias = "r")]
    Resize(ResizeArgs),

    /// Fit LUTs from a before/after image pair
    #[command(visible_alias = "c")]
    CreateLut(CreateLutArgs),

    /// Show LUT information as JSON
    #[command(visible_alias = "i")]
    Info(InfoArgs),
}

/// LUT stack shared by grading commands.
#[derive(Args, Clone, Debug, Default)]
struct LutArgs {
    /// `.cube` LUT to apply; repeat to chain in order
    #[arg(short = 'l', long = "lut")]
    luts: Vec<PathBuf>,

    /// Blend for the LUT at the same position (default 1.0)
    #[arg(short = 'b', long = "blend")]
    blends: Vec<f32>,
}

/// The five adjustment sliders, each in [-1, 1].
#[derive(Args, Clone, Debug, Default)]
struct AdjustArgs {
    /// White balance (negative cool, positive warm)
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    white_balance: f32,

    /// Tint (negative magenta, positive green)
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    tint: f32,

    /// Brightness offset
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    brightness: f32,

    /// Contrast around mid-gray
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    contrast: f32,

    /// Saturation (-1 grayscale)
    #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
    saturation: f32,
}

impl AdjustArgs {
    fn params(&self) -> AdjustmentParams {
        AdjustmentParams {
            white_balance: self.white_balance,
            tint: self.tint,
            brightness: self.brightness,
            contrast: self.contrast,
            saturation: self.saturation,
        }
    }
}

/// Arguments for the `apply` command.
#[derive(Args)]
struct ApplyArgs {
    /// Input image(s)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output image (single input)
    #[arg(short, long, conflicts_with = "out_dir")]
    output: Option<PathBuf>,

    /// Output directory (any number of inputs, names kept)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    #[command(flatten)]
    luts: LutArgs,

    #[command(flatten)]
    adjust: AdjustArgs,
}

/// Arguments for the `preview` command.
#[derive(Args)]
struct PreviewArgs {
    /// Input image
    input: PathBuf,

    /// Output image
    #[arg(short, long)]
    output: PathBuf,

    /// Bounding box WxH (default from configuration)
    #[arg(long, value_parser = parse_size, conflicts_with = "size")]
    max: Option<(u32, u32)>,

    /// Exact output size WxH
    #[arg(long, value_parser = parse_size)]
    size: Option<(u32, u32)>,

    #[command(flatten)]
    luts: LutArgs,

    #[command(flatten)]
    adjust: AdjustArgs,
}

/// Arguments for the `resize` command.
#[derive(Args)]
struct ResizeArgs {
    /// Input image
    input: PathBuf,

    /// Output image
    #[arg(short, long)]
    output: PathBuf,

    /// Exact output size WxH
    #[arg(long, value_parser = parse_size, required_unless_present = "fit")]
    size: Option<(u32, u32)>,

    /// Fit within WxH, keeping the aspect ratio
    #[arg(long, value_parser = parse_size, conflicts_with = "size")]
    fit: Option<(u32, u32)>,
}

/// Arguments for the `create-lut` command.
#[derive(Args)]
struct CreateLutArgs {
    /// Ungraded image
    before: PathBuf,

    /// Graded image, same dimensions
    after: PathBuf,

    /// Output prefix; writes <prefix>_<size>.cube
    #[arg(short, long)]
    output: PathBuf,

    /// Lattice size; repeat for several
    #[arg(short, long = "size", default_value = "33")]
    sizes: Vec<usize>,
}

/// Arguments for the `info` command.
#[derive(Args)]
struct InfoArgs {
    /// `.cube` file(s)
    #[arg(required = true)]
    luts: Vec<PathBuf>,
}

fn parse_size(text: &str) -> Result<(u32, u32), String> {
    lutools_core::config::parse_dimensions(text)
        .ok_or_else(|| format!("expected WxH with non-zero sides, got {text:?}"))
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "lutools=info",
        1 => "lutools=debug,lutools_core=debug",
        _ => "lutools=trace,lutools_core=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Configure thread pool
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    let config = EngineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    tracing::debug!(?config, "engine configuration");

    let engine = Engine::new(config);
    // Subscribed before init so every engine log line reaches the terminal.
    let mut events = engine.subscribe();
    engine.init();

    let result = match cli.command {
        Commands::Apply(args) => commands::apply::run(&engine, &mut events, args),
        Commands::Preview(args) => commands::preview::run(&engine, &mut events, args),
        Commands::Resize(args) => commands::resize::run(&engine, &mut events, args),
        Commands::CreateLut(args) => commands::create_lut::run(&engine, &mut events, args),
        Commands::Info(args) => commands::info::run(&engine, &mut events, args),
    };

    engine.shutdown();
    commands::print_events(&mut events);
    result
}
