//! colorop - DRM color pipeline test runner
//!
//! Maps colorop lists onto the color pipelines of a virtual display, runs
//! them through the writeback output and compares against the software
//! reference.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "colorop")]
#[command(author, version, about = "DRM color pipeline test runner")]
#[command(long_about = "
Runs color pipeline tests on a virtual display with a writeback connector.

Examples:
  colorop list                              # Catalog and default tests
  colorop list --pipelines                  # Hardware pipelines of the display
  colorop eval --ops srgb_eotf --pixel 0.5,0.5,0.5
  colorop run                               # Default test plan
  colorop run -c plan.yaml --filter ctm_3x4
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog colorops, plan tests and hardware pipelines
    #[command(visible_alias = "ls")]
    List(ListArgs),

    /// Evaluate a colorop list on one pixel in software
    Eval(EvalArgs),

    /// Run a test plan
    #[command(visible_alias = "r")]
    Run(RunArgs),
}

#[derive(Args)]
struct ListArgs {
    /// Test plan (default plan when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Show the display's color pipelines
    #[arg(short, long)]
    pipelines: bool,
}

#[derive(Args)]
struct EvalArgs {
    /// Colorop names, comma separated
    #[arg(short, long, required = true, value_delimiter = ',')]
    ops: Vec<String>,

    /// Input pixel as r,g,b in [0, 1]
    #[arg(short, long, value_delimiter = ',', default_values_t = [0.5, 0.5, 0.5])]
    pixel: Vec<f32>,

    /// Framebuffer format used for quantization
    #[arg(short, long, default_value = "XRGB8888")]
    format: String,
}

#[derive(Args)]
struct RunArgs {
    /// Test plan (default plan when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only run tests whose name contains this string
    #[arg(short, long)]
    filter: Option<String>,

    /// Override framebuffer width
    #[arg(short = 'W', long)]
    width: Option<u32>,

    /// Override framebuffer height
    #[arg(short = 'H', long)]
    height: Option<u32>,

    /// Write input, output and reference PNGs of mismatching tests here
    #[arg(short, long)]
    dump_dir: Option<PathBuf>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::List(args) => commands::list::run(args),
        Commands::Eval(args) => commands::eval::run(args, cli.verbose),
        Commands::Run(args) => commands::run::run(args),
    }
}
