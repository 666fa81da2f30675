//! cimetal library
//!
//! Planning half of the kernel build: finds `.metal` sources, groups them and
//! emits one `cimetal-compiler` command per group. Host build integrations
//! call [`plan::plan`] directly; the `cimetal` binary wraps it in `plan` and
//! `build` subcommands.

pub mod build;
pub mod classify;
pub mod discovery;
pub mod emit;
pub mod plan;

pub use classify::classify;
pub use discovery::{discover_sources, DiscoveryError};
pub use emit::{emit_commands, resolve_compiler, EmitError};
pub use plan::{plan, Plan, PlanError};
