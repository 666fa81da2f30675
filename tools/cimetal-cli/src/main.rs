//! cimetal - Core Image Metal kernel build planner
//!
//! # Commands
//!
//! - `cimetal plan` - Print the build commands for a target directory
//! - `cimetal build` - Plan, then run every out-of-date command
//!
//! # Usage
//!
//! ```bash
//! # Show what would be compiled
//! cimetal plan --target Sources/Filters --work-dir .build/kernels
//!
//! # Machine-readable plan for another build system
//! cimetal plan --target Sources/Filters --work-dir .build/kernels --json
//!
//! # Compile everything that changed
//! cimetal build --target Sources/Filters --work-dir .build/kernels
//! ```
//!
//! # Config (cimetal.toml)
//!
//! ```toml
//! [default]
//! output = "default.ci.metallib"
//!
//! [[special]]
//! file = "SpryColorKernels.ci.metal"
//! cache = "SpryColorKernelsCache"
//! output = "SpryColorKernels.ci.metallib"
//! label = "Compile SpryColorKernels"
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};

use cimetal::{build, plan};

/// cimetal - Core Image Metal kernel build planner
#[derive(Parser)]
#[command(name = "cimetal")]
#[command(about = "Plan and run Core Image Metal kernel library builds")]
#[command(version)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the build commands for a target directory
    Plan(plan::PlanCommandArgs),

    /// Plan, then run every out-of-date command
    Build(build::BuildArgs),
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
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Plan(args) => plan::execute(args),
        Commands::Build(args) => build::execute(args),
    }
}
