//! xcrun argument shapes for Core Image kernels
//!
//! - `xcrun metal -c -fcikernel` : .metal → .air
//! - `xcrun metallib --cikernel` : .air → .metallib
//! - `xcrun metal -fcikernel`    : .air... → merged .metallib

use std::path::{Path, PathBuf};

use crate::invoker::ToolInvocation;

/// Fallback location of xcrun on macOS
pub const DEFAULT_XCRUN: &str = "/usr/bin/xcrun";

/// Builds invocations for the three pipeline operations.
pub trait Toolchain {
    /// Compile one source into an intermediate
    fn compile(&self, source: &Path, intermediate: &Path) -> ToolInvocation;

    /// Link one intermediate into a unit library
    fn link(&self, intermediate: &Path, library: &Path) -> ToolInvocation;

    /// Merge many intermediates into the final library
    fn merge(&self, intermediates: &[PathBuf], output: &Path) -> ToolInvocation;
}

/// Apple's xcrun driver with Core Image kernel flags.
#[derive(Debug, Clone)]
pub struct Xcrun {
    pub program: PathBuf,
}

impl Xcrun {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Resolve xcrun from PATH, falling back to `/usr/bin/xcrun`.
    pub fn locate() -> Self {
        match which::which("xcrun") {
            Ok(path) => Self::new(path),
            Err(_) => Self::new(DEFAULT_XCRUN),
        }
    }
}

impl Toolchain for Xcrun {
    fn compile(&self, source: &Path, intermediate: &Path) -> ToolInvocation {
        ToolInvocation::new(&self.program)
            .args(["metal", "-c", "-fcikernel"])
            .arg(source)
            .arg("-o")
            .arg(intermediate)
            // Clang modules break in sandboxed CI builds
            .arg("-fmodules=none")
    }

    fn link(&self, intermediate: &Path, library: &Path) -> ToolInvocation {
        ToolInvocation::new(&self.program)
            .args(["metallib", "--cikernel"])
            .arg(intermediate)
            .arg("-o")
            .arg(library)
    }

    fn merge(&self, intermediates: &[PathBuf], output: &Path) -> ToolInvocation {
        ToolInvocation::new(&self.program)
            .args(["metal", "-fcikernel", "-o"])
            .arg(output)
            .args(intermediates)
    }
}
