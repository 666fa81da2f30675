//! Shared types for the cimetal Core Image kernel build tools.
//!
//! Used by both the planning side (`cimetal`) and the pipeline executable
//! (`cimetal-compiler`).

pub mod config;
pub mod diagnostics;
pub mod model;
pub mod shader_format;

pub use config::{ConfigError, DefaultGroup, KernelConfig, SpecialKernel, CONFIG_FILE_NAME};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, Severity, Stage, TracingSink};
pub use model::{BuildCommand, GroupId, KernelGroup, SourceFile};
pub use shader_format::{stem_of, ShaderFormat, CI_METAL_FORMAT};

/// Name of the pipeline executable the emitted build commands invoke.
pub const COMPILER_TOOL_NAME: &str = "cimetal-compiler";
