//! Plan command - discover, classify and emit build commands
//!
//! This is the part a host build system calls: given a target directory and a
//! work directory it returns the commands to schedule. Nothing is compiled.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};

use cimetal_shared::{
    BuildCommand, CollectingSink, Diagnostic, DiagnosticSink, KernelConfig, KernelGroup,
    SourceFile, TracingSink, CI_METAL_FORMAT,
};

use crate::classify::classify;
use crate::discovery::{discover_sources, DiscoveryError};
use crate::emit::{emit_commands, resolve_compiler, EmitError};

/// Options shared by `plan` and `build`
#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Directory to search for .metal sources
    #[arg(short, long, default_value = ".")]
    pub target: PathBuf,

    /// Directory receiving final libraries and cache directories
    #[arg(short, long)]
    pub work_dir: PathBuf,

    /// Kernel grouping config (defaults to <target>/cimetal.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the cimetal-compiler executable
    #[arg(long)]
    pub compiler: Option<PathBuf>,
}

/// Arguments for the plan command
#[derive(Args, Debug)]
pub struct PlanCommandArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    /// Print the commands and diagnostics as JSON
    #[arg(long)]
    pub json: bool,
}

/// Output of one planning pass.
#[derive(Debug, Clone)]
pub struct Plan {
    pub sources: Vec<SourceFile>,
    pub groups: Vec<KernelGroup>,
    pub commands: Vec<BuildCommand>,
}

/// Planning failure
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// Run discovery → classification → emission.
pub fn plan(
    target: &Path,
    work_dir: &Path,
    config: &KernelConfig,
    compiler: &Path,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<Plan, PlanError> {
    let sources = discover_sources(target, &CI_METAL_FORMAT, diagnostics)?;
    if sources.is_empty() {
        return Ok(Plan {
            sources,
            groups: Vec::new(),
            commands: Vec::new(),
        });
    }
    let groups = classify(&sources, config, diagnostics);
    let commands = emit_commands(&groups, work_dir, compiler)?;
    Ok(Plan {
        sources,
        groups,
        commands,
    })
}

/// Resolve config and compiler from CLI options, then plan.
pub fn plan_from_args(args: &PlanArgs, diagnostics: &mut dyn DiagnosticSink) -> Result<Plan> {
    let config = match &args.config {
        Some(path) => KernelConfig::load(path)?,
        None => KernelConfig::load_or_default(&args.target)?,
    };
    let compiler = resolve_compiler(args.compiler.as_deref())?;
    let work_dir = absolute(&args.work_dir)?;

    let plan = plan(&args.target, &work_dir, &config, &compiler, diagnostics)
        .with_context(|| format!("Failed to plan builds for {}", args.target.display()))?;
    Ok(plan)
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        Ok(cwd.join(path))
    }
}

#[derive(Serialize)]
struct JsonPlan<'a> {
    commands: &'a [BuildCommand],
    diagnostics: &'a [Diagnostic],
}

/// Execute the plan command
pub fn execute(args: PlanCommandArgs) -> Result<()> {
    if args.json {
        let mut sink = CollectingSink::new();
        let result = plan_from_args(&args.plan, &mut sink);
        // Logs go to stderr; stdout carries only the JSON
        sink.forward_to(&mut TracingSink);
        let plan = result?;
        let json = serde_json::to_string_pretty(&JsonPlan {
            commands: &plan.commands,
            diagnostics: &sink.diagnostics,
        })?;
        println!("{json}");
        return Ok(());
    }

    let plan = plan_from_args(&args.plan, &mut TracingSink)?;
    if plan.commands.is_empty() {
        println!("Nothing to build.");
        return Ok(());
    }
    for cmd in &plan.commands {
        println!("{}", cmd.display_name);
        println!("  exec: {} {}", cmd.executable.display(), cmd.arguments.join(" "));
        for output in &cmd.output_files {
            println!("  output: {}", output.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cimetal_shared::SpecialKernel;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn test_plan_end_to_end() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("Sources");
        touch(&target.join("Foo.metal"));
        touch(&target.join("Filters/Bar.metal"));

        let config = KernelConfig {
            special: vec![SpecialKernel::new("Foo.metal", "FooCache", "Foo.out", "Compile Foo")],
            ..Default::default()
        };
        let work = dir.path().join("work");
        let mut sink = CollectingSink::new();
        let plan = plan(&target, &work, &config, Path::new("/bin/cimetal-compiler"), &mut sink).unwrap();

        assert_eq!(plan.sources.len(), 2);
        assert_eq!(plan.groups.len(), 2);
        assert_eq!(plan.commands.len(), 2);
        assert_eq!(plan.commands[0].output_files, vec![work.join("Foo.out")]);
        assert_eq!(plan.commands[1].input_files.len(), 1);
        assert!(plan.commands[1].input_files[0].ends_with("Filters/Bar.metal"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_special_kernel_matches_by_link_name() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("Sources");
        let shared = dir.path().join("vendor/color.metal");
        touch(&shared);
        touch(&target.join("Blur.metal"));
        std::os::unix::fs::symlink(&shared, target.join("Foo.metal")).unwrap();

        let config = KernelConfig {
            special: vec![SpecialKernel::new("Foo.metal", "FooCache", "Foo.out", "Compile Foo")],
            ..Default::default()
        };
        let plan = plan(
            &target,
            &dir.path().join("work"),
            &config,
            Path::new("/bin/cimetal-compiler"),
            &mut CollectingSink::new(),
        )
        .unwrap();

        assert_eq!(plan.groups.len(), 2);
        assert!(plan.groups[0].is_special());
        assert_eq!(plan.groups[0].sources[0].file_name, "Foo.metal");
        assert_eq!(plan.groups[1].sources[0].file_name, "Blur.metal");
    }

    #[test]
    fn test_plan_empty_target() {
        let dir = tempdir().unwrap();
        let plan = plan(
            dir.path(),
            &dir.path().join("work"),
            &KernelConfig::default(),
            Path::new("/bin/cimetal-compiler"),
            &mut CollectingSink::new(),
        )
        .unwrap();
        assert!(plan.groups.is_empty());
        assert!(plan.commands.is_empty());
    }

    #[test]
    fn test_plan_from_args_reads_target_config() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("Sources");
        touch(&target.join("Foo.metal"));
        std::fs::write(
            target.join("cimetal.toml"),
            "[default]\noutput = \"Mine.ci.metallib\"\n",
        )
        .unwrap();
        let compiler = dir.path().join("cimetal-compiler");
        touch(&compiler);

        let args = PlanArgs {
            target: target.clone(),
            work_dir: dir.path().join("work"),
            config: None,
            compiler: Some(compiler),
        };
        let plan = plan_from_args(&args, &mut CollectingSink::new()).unwrap();
        assert_eq!(plan.commands.len(), 1);
        assert_eq!(
            plan.commands[0].output_files,
            vec![dir.path().join("work/Mine.ci.metallib")]
        );
    }
}
