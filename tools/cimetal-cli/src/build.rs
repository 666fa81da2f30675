//! Build command - plan, then run out-of-date commands
//!
//! A minimal host build system: a command runs when its declared output is
//! missing or older than one of its declared inputs. Independent commands
//! run in parallel, each as a separate compiler process.

use anyhow::{Context, Result};
use clap::Args;
use rayon::prelude::*;
use std::path::Path;
use std::process::Command;
use std::time::SystemTime;

use cimetal_shared::{BuildCommand, TracingSink};

use crate::plan::{plan_from_args, PlanArgs};

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Maximum number of compiler processes to run at once
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Rebuild even when outputs are up to date
    #[arg(long)]
    pub force: bool,
}

/// Result of one build command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Built,
    UpToDate,
    Failed(String),
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Whether every declared output exists and is newer than every declared input.
pub fn is_up_to_date(cmd: &BuildCommand) -> bool {
    let Some(oldest_output) = cmd
        .output_files
        .iter()
        .map(|p| modified(p))
        .collect::<Option<Vec<_>>>()
        .and_then(|times| times.into_iter().min())
    else {
        return false;
    };

    cmd.input_files.iter().all(|input| match modified(input) {
        Some(t) => t <= oldest_output,
        None => false,
    })
}

/// Run one command to completion, inheriting stdio.
pub fn run_command(cmd: &BuildCommand) -> CommandOutcome {
    tracing::info!("{}", cmd.display_name);
    let status = Command::new(&cmd.executable)
        .args(&cmd.arguments)
        .envs(&cmd.environment)
        .status();

    match status {
        Ok(status) if status.success() => CommandOutcome::Built,
        Ok(status) => CommandOutcome::Failed(format!(
            "exit code: {}",
            status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unknown".to_string())
        )),
        Err(e) => CommandOutcome::Failed(format!(
            "failed to launch {}: {}",
            cmd.executable.display(),
            e
        )),
    }
}

/// Run every out-of-date command, in parallel.
pub fn run_commands(commands: &[BuildCommand], force: bool) -> Vec<CommandOutcome> {
    commands
        .par_iter()
        .map(|cmd| {
            if !force && is_up_to_date(cmd) {
                CommandOutcome::UpToDate
            } else {
                run_command(cmd)
            }
        })
        .collect()
}

/// Execute the build command
pub fn execute(args: BuildArgs) -> Result<()> {
    let plan = plan_from_args(&args.plan, &mut TracingSink)?;
    if plan.commands.is_empty() {
        println!("Nothing to build.");
        return Ok(());
    }

    std::fs::create_dir_all(&args.plan.work_dir).with_context(|| {
        format!(
            "Failed to create work directory: {}",
            args.plan.work_dir.display()
        )
    })?;

    let outcomes = match args.jobs {
        Some(jobs) => rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("Failed to create build thread pool")?
            .install(|| run_commands(&plan.commands, args.force)),
        None => run_commands(&plan.commands, args.force),
    };

    let mut built = 0;
    let mut up_to_date = 0;
    let mut failed = 0;
    for (cmd, outcome) in plan.commands.iter().zip(&outcomes) {
        match outcome {
            CommandOutcome::Built => {
                println!("  ✓ {}", cmd.display_name);
                built += 1;
            }
            CommandOutcome::UpToDate => {
                println!("  ⊘ {} (up to date)", cmd.display_name);
                up_to_date += 1;
            }
            CommandOutcome::Failed(reason) => {
                println!("  ✗ {} ({})", cmd.display_name, reason);
                failed += 1;
            }
        }
    }

    println!();
    println!(
        "Built: {}, Up to date: {}, Failed: {}",
        built, up_to_date, failed
    );

    if failed > 0 {
        anyhow::bail!("{} build command(s) failed", failed);
    }
    Ok(())
}
