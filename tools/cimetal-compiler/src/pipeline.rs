//! Three-stage kernel library build.
//!
//! ```text
//! inputs (.metal)
//!     │  compile, one call per input
//!     ▼
//! cache/<stem>.air
//!     │  link, one call per intermediate
//!     ▼
//! cache/<stem>.metallib        (unit libraries, not merged)
//!
//! cache/<stem>.air ...
//!     │  merge, one call
//!     ▼
//! output (.metallib)
//! ```
//!
//! Stages run strictly in order and the first failure aborts the run.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use cimetal_shared::{stem_of, ShaderFormat, CI_METAL_FORMAT};

use crate::error::{PipelineError, StageKind};
use crate::invoker::{ToolInvocation, ToolRunner};
use crate::toolchain::Toolchain;

/// What to build: the pipeline executable's command line.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub output: PathBuf,
    pub cache: PathBuf,
    pub inputs: Vec<PathBuf>,
}

/// Files produced by a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub intermediates: Vec<PathBuf>,
    pub unit_libraries: Vec<PathBuf>,
    pub output: PathBuf,
}

pub struct Pipeline<T, R> {
    toolchain: T,
    runner: R,
    format: ShaderFormat,
}

impl<T: Toolchain, R: ToolRunner> Pipeline<T, R> {
    pub fn new(toolchain: T, runner: R) -> Self {
        Self {
            toolchain,
            runner,
            format: CI_METAL_FORMAT,
        }
    }

    /// Hand back the runner, e.g. to inspect a recording double.
    pub fn into_runner(self) -> R {
        self.runner
    }

    pub fn run(&mut self, request: &PipelineRequest) -> Result<PipelineReport, PipelineError> {
        if request.inputs.is_empty() {
            return Err(PipelineError::NoInputs);
        }
        let inputs = unique_inputs(&request.inputs);
        check_name_collisions(&inputs)?;

        tracing::info!("=== [cimetal-compiler] Starting compilation ===");
        tracing::info!("Output: {}", request.output.display());
        tracing::info!("Cache directory: {}", request.cache.display());
        tracing::info!("Inputs: {}", join_paths(&inputs));

        std::fs::create_dir_all(&request.cache).map_err(|source| PipelineError::Prepare {
            path: request.cache.clone(),
            source,
        })?;

        let intermediates = self.compile_all(&request.cache, &inputs)?;
        let unit_libraries = self.link_all(&request.cache, &intermediates)?;
        self.merge(&intermediates, &request.output)?;

        tracing::info!("==== [cimetal-compiler] Completed successfully ====");
        tracing::info!("Final metallib: {}", request.output.display());

        Ok(PipelineReport {
            intermediates,
            unit_libraries,
            output: request.output.clone(),
        })
    }

    fn compile_all(
        &mut self,
        cache: &Path,
        inputs: &[PathBuf],
    ) -> Result<Vec<PathBuf>, PipelineError> {
        tracing::info!(
            "--- Step 1: Compiling .{} files to .{} ---",
            self.format.source_ext,
            self.format.intermediate_ext
        );
        let total = inputs.len();
        let mut intermediates = Vec::with_capacity(total);

        for (i, input) in inputs.iter().enumerate() {
            let intermediate = self.format.intermediate_path(cache, input);
            let invocation = self.toolchain.compile(input, &intermediate);
            self.invoke(StageKind::Compile, &invocation, i + 1, total, Some(input), &intermediate)?;
            tracing::info!("[OK] Compiled {} → {}", input.display(), intermediate.display());
            intermediates.push(intermediate);
        }
        Ok(intermediates)
    }

    fn link_all(
        &mut self,
        cache: &Path,
        intermediates: &[PathBuf],
    ) -> Result<Vec<PathBuf>, PipelineError> {
        tracing::info!(
            "--- Step 2: Linking .{} files to individual .{} ---",
            self.format.intermediate_ext,
            self.format.library_ext
        );
        let total = intermediates.len();
        let mut libraries = Vec::with_capacity(total);

        for (i, intermediate) in intermediates.iter().enumerate() {
            let library = self.format.unit_library_path(cache, intermediate);
            tracing::info!("Linking {} → {}", intermediate.display(), library.display());
            let invocation = self.toolchain.link(intermediate, &library);
            self.invoke(StageKind::Link, &invocation, i + 1, total, Some(intermediate), &library)?;
            tracing::info!("[OK] Linked {} → {}", intermediate.display(), library.display());
            libraries.push(library);
        }
        Ok(libraries)
    }

    // Merges the intermediates, not the unit libraries.
    fn merge(&mut self, intermediates: &[PathBuf], output: &Path) -> Result<(), PipelineError> {
        tracing::info!(
            "--- Step 3: Merging all {} files into final {} ---",
            self.format.intermediate_ext.to_uppercase(),
            self.format.library_ext
        );
        tracing::info!(
            "Merging {} {} files → {}",
            intermediates.len(),
            self.format.intermediate_ext.to_uppercase(),
            output.display()
        );
        let invocation = self.toolchain.merge(intermediates, output);
        self.invoke(StageKind::Merge, &invocation, 1, intermediates.len(), None, output)
    }

    fn invoke(
        &mut self,
        stage: StageKind,
        invocation: &ToolInvocation,
        index: usize,
        total: usize,
        input: Option<&PathBuf>,
        output: &Path,
    ) -> Result<(), PipelineError> {
        let exit = self
            .runner
            .run(invocation)
            .map_err(|source| PipelineError::Launch {
                stage,
                program: invocation.program.clone(),
                source,
            })?;

        if exit.success() {
            Ok(())
        } else {
            Err(PipelineError::Stage {
                stage,
                index,
                total,
                input: input.cloned(),
                output: output.to_path_buf(),
                exit,
            })
        }
    }
}

/// Drop repeats of an identical path, keeping the first occurrence.
///
/// Merging the same intermediate twice would define every kernel twice.
fn unique_inputs(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(inputs.len());
    for input in inputs {
        if seen.insert(input) {
            unique.push(input.clone());
        } else {
            tracing::warn!("Ignoring repeated input {}", input.display());
        }
    }
    unique
}

/// Two different inputs with the same stem would share cache paths.
fn check_name_collisions(inputs: &[PathBuf]) -> Result<(), PipelineError> {
    let mut seen: HashMap<String, &PathBuf> = HashMap::new();
    for input in inputs {
        let stem = stem_of(input);
        match seen.get(&stem) {
            Some(first) if *first != input => {
                return Err(PipelineError::NameCollision {
                    stem,
                    first: (*first).clone(),
                    second: input.clone(),
                });
            }
            Some(_) => {}
            None => {
                seen.insert(stem, input);
            }
        }
    }
    Ok(())
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
