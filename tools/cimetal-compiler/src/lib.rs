//! cimetal-compiler library
//!
//! Drives the external Metal toolchain through compile → link → merge for one
//! kernel group. The binary wraps [`Pipeline`] with a [`ProcessRunner`] and
//! [`Xcrun`]; tests substitute their own [`ToolRunner`].

pub mod error;
pub mod invoker;
pub mod pipeline;
pub mod toolchain;

pub use error::{PipelineError, StageKind};
pub use invoker::{ProcessRunner, ToolExit, ToolInvocation, ToolRunner};
pub use pipeline::{Pipeline, PipelineReport, PipelineRequest};
pub use toolchain::{Toolchain, Xcrun, DEFAULT_XCRUN};

/// Fail fast on hosts without the Apple toolchain.
pub fn ensure_supported_platform() -> Result<(), PipelineError> {
    if cfg!(target_os = "macos") {
        Ok(())
    } else {
        Err(PipelineError::UnsupportedPlatform(std::env::consts::OS))
    }
}
