//! Pipeline failures and the stage-labelled messages printed for them.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::invoker::ToolExit;

/// Pipeline stage that invoked the toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Compile,
    Link,
    Merge,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StageKind::Compile => "compile",
            StageKind::Link => "link",
            StageKind::Merge => "merge",
        })
    }
}

/// Failure of a single pipeline run. Every variant is fatal.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("[ERROR] cimetal-compiler is not supported on this platform ({0}); xcrun is only available on macOS")]
    UnsupportedPlatform(&'static str),

    #[error("[ERROR] No input .metal files were given")]
    NoInputs,

    #[error(
        "[ERROR] Inputs share the base name '{stem}' and would overwrite each other's cache files:\n{}\n{}",
        .first.display(),
        .second.display()
    )]
    NameCollision {
        stem: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("[ERROR] Failed to create cache directory {}: {source}", .path.display())]
    Prepare {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("[ERROR] Failed to launch {} during {stage} stage: {source}", .program.display())]
    Launch {
        stage: StageKind,
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}", stage_failure_message(.stage, .index, .total, .input, .output, .exit))]
    Stage {
        stage: StageKind,
        /// 1-based position of the failing input (always 1 for merge)
        index: usize,
        total: usize,
        input: Option<PathBuf>,
        output: PathBuf,
        exit: ToolExit,
    },
}

impl PipelineError {
    /// Exit status reported by the toolchain, for stage failures.
    pub fn tool_exit(&self) -> Option<ToolExit> {
        match self {
            PipelineError::Stage { exit, .. } => Some(*exit),
            _ => None,
        }
    }
}

fn stage_failure_message(
    stage: &StageKind,
    index: &usize,
    total: &usize,
    input: &Option<PathBuf>,
    output: &PathBuf,
    exit: &ToolExit,
) -> String {
    let headline = match stage {
        StageKind::Compile => {
            format!("[ERROR] Failed to compile .metal file (input #{index} of {total}):")
        }
        StageKind::Link => format!("[ERROR] Failed to link .air file (input #{index} of {total}):"),
        StageKind::Merge => {
            format!("[ERROR] Failed to merge {total} AIR file(s) into final metallib:")
        }
    };
    let mut msg = headline;
    if let Some(input) = input {
        msg.push_str(&format!("\nInput: {}", input.display()));
    }
    msg.push_str(&format!("\nOutput: {}", output.display()));
    msg.push_str(&format!("\nExit code: {exit}"));
    msg
}
