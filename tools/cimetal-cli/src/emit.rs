//! Build command emission
//!
//! Turns kernel groups into declarative commands for the host build system.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use cimetal_shared::{BuildCommand, KernelGroup, COMPILER_TOOL_NAME};

/// Emission failure
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// Build command arguments are UTF-8 strings
    #[error("Path is not valid UTF-8 and cannot be passed to the compiler: {}", .0.display())]
    NonUtf8Path(PathBuf),
}

fn utf8_arg(path: &Path) -> Result<String, EmitError> {
    path.to_str()
        .map(str::to_owned)
        .ok_or_else(|| EmitError::NonUtf8Path(path.to_path_buf()))
}

/// One command per group: `--output <work>/<output> --cache <work>/<cache> <sources...>`.
///
/// Inputs are the group's sources and the only output is its final library.
pub fn emit_commands(
    groups: &[KernelGroup],
    work_dir: &Path,
    executable: &Path,
) -> Result<Vec<BuildCommand>, EmitError> {
    groups
        .iter()
        .map(|group| -> Result<BuildCommand, EmitError> {
            let output = work_dir.join(&group.output_name);
            let cache = work_dir.join(&group.cache_name);

            let mut arguments = vec![
                "--output".to_string(),
                utf8_arg(&output)?,
                "--cache".to_string(),
                utf8_arg(&cache)?,
            ];
            for source in &group.sources {
                arguments.push(utf8_arg(&source.path)?);
            }

            Ok(BuildCommand {
                display_name: group.display_name(),
                executable: executable.to_path_buf(),
                arguments,
                environment: BTreeMap::new(),
                input_files: group.sources.iter().map(|s| s.path.clone()).collect(),
                output_files: vec![output],
            })
        })
        .collect()
}

/// Find the `cimetal-compiler` executable
///
/// Lookup order: explicit path, PATH, then next to the running binary.
pub fn resolve_compiler(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("Compiler executable not found: {}", path.display());
        }
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = which::which(COMPILER_TOOL_NAME) {
        return Ok(path);
    }

    let exe_name = if cfg!(windows) {
        format!("{COMPILER_TOOL_NAME}.exe")
    } else {
        COMPILER_TOOL_NAME.to_string()
    };
    if let Ok(current_exe) = std::env::current_exe() {
        if let Some(exe_dir) = current_exe.parent() {
            let sibling = exe_dir.join(&exe_name);
            if sibling.exists() {
                return Ok(sibling);
            }
        }
    }

    anyhow::bail!(
        "Could not find {COMPILER_TOOL_NAME}.\n\
        Options:\n\
        - Install it to PATH: cargo install --path tools/cimetal-compiler\n\
        - Place {COMPILER_TOOL_NAME} next to the cimetal binary\n\
        - Pass --compiler <path>"
    )
}
