//! superres CLI - up-scale images with a super-resolution network.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use superres::{Config, Pipeline};

/// Up-scale low-resolution images through a pre-trained super-resolution
/// network executed by ONNX Runtime.
#[derive(Parser, Debug)]
#[command(name = "superres")]
#[command(version, about, long_about = None)]
struct Args {
    /// Input image files, or directories to scan for images.
    #[arg(short, long, value_name = "PATH", required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Path to the ONNX super-resolution model.
    #[arg(short, long, value_name = "PATH")]
    model: PathBuf,

    /// Inference device: cpu, cuda (alias gpu) or tensorrt.
    #[arg(short, long, default_value = "cpu", value_name = "DEVICE")]
    device: String,

    /// Shared library with custom operator implementations.
    #[arg(long, value_name = "PATH")]
    ops_library: Option<PathBuf>,

    /// Number of timed inference iterations.
    #[arg(short = 'n', long, default_value = "1", value_name = "INT")]
    iterations: u32,

    /// Write a runtime performance trace and report its path.
    #[arg(long)]
    profile: bool,

    /// Open the up-scaled images in the system image viewer.
    #[arg(long)]
    show: bool,

    /// Directory that receives the output images.
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    output_dir: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("superres={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Err(err) = run(&args) {
        tracing::error!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run(args: &Args) -> Result<()> {
    // Validate model file exists
    if !args.model.exists() {
        anyhow::bail!("Model file does not exist: {}", args.model.display());
    }

    // Build configuration
    let config = Config {
        device: args.device.parse()?,
        iterations: args.iterations,
        ops_library: args.ops_library.clone(),
        profiling: args.profile,
        show: args.show,
        output_dir: args.output_dir.clone(),
    };

    // Create and run pipeline
    let mut pipeline =
        Pipeline::new(&args.model, config).context("Failed to initialize pipeline")?;

    let written = pipeline
        .process(&args.input)
        .context("Failed to up-scale images")?;

    println!(
        "Successfully wrote {} image(s) to {}",
        written.len(),
        args.output_dir.display()
    );

    Ok(())
}
