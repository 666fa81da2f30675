//! cimetal-compiler - builds one merged Core Image .metallib
//!
//! Invoked by build commands planned by `cimetal`:
//!
//! ```bash
//! cimetal-compiler --output work/default.ci.metallib --cache work/cache a.metal b.metal
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use cimetal_compiler::{ensure_supported_platform, Pipeline, PipelineRequest, ProcessRunner, Xcrun};

#[derive(Parser)]
#[command(name = "cimetal-compiler")]
#[command(about = "Compile and merge Core Image Metal kernels into a .metallib")]
#[command(version)]
struct Cli {
    /// Path to the final merged .metallib output
    #[arg(long)]
    output: PathBuf,

    /// Directory for intermediate .air and .metallib files
    #[arg(long)]
    cache: PathBuf,

    /// xcrun executable (defaults to xcrun on PATH, then /usr/bin/xcrun)
    #[arg(long)]
    xcrun: Option<PathBuf>,

    /// Verbose output (prints every toolchain command line)
    #[arg(short, long)]
    verbose: bool,

    /// Input .metal source files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_target(false)
        .init();

    ensure_supported_platform()?;

    let xcrun = cli.xcrun.map(Xcrun::new).unwrap_or_else(Xcrun::locate);
    let request = PipelineRequest {
        output: cli.output,
        cache: cli.cache,
        inputs: cli.inputs,
    };

    Pipeline::new(xcrun, ProcessRunner).run(&request)?;
    Ok(())
}
