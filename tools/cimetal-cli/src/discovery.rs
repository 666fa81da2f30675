//! Shader source discovery
//!
//! Walks a target directory and returns every shader source below it,
//! sorted by full path string. Paths reaching the same file through
//! symlinks are collapsed to the first one in that order. Returned paths
//! always sit under the (canonicalized) root, even when a symlink points
//! outside it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use cimetal_shared::{Diagnostic, DiagnosticSink, ShaderFormat, SourceFile, Stage};
use walkdir::{DirEntry, WalkDir};

/// Fatal discovery failure. Errors below the root are reported as warnings instead.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Could not read target directory {}: {source}", .path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Target path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// Dotfiles and dot-directories are skipped; the root itself never is.
fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().as_encoded_bytes().starts_with(b".")
}

/// Regular file, or a symlink that resolves to one.
fn is_regular_file(entry: &DirEntry) -> bool {
    let file_type = entry.file_type();
    file_type.is_file() || (file_type.is_symlink() && entry.path().is_file())
}

/// Find all shader sources under `root`.
pub fn discover_sources(
    root: &Path,
    format: &ShaderFormat,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<Vec<SourceFile>, DiscoveryError> {
    let unreadable = |source| DiscoveryError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    };
    let root = root.canonicalize().map_err(unreadable)?;
    if !root.is_dir() {
        return Err(DiscoveryError::NotADirectory(root));
    }
    // Walkdir reports an unopenable root as an ordinary entry error
    std::fs::read_dir(&root).map_err(|source| DiscoveryError::RootUnreadable {
        path: root.clone(),
        source,
    })?;

    // Discovered path, canonical target
    let mut found: Vec<(PathBuf, PathBuf)> = Vec::new();

    let walker = WalkDir::new(&root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(&root).to_path_buf();
                diagnostics.emit(
                    Diagnostic::warning(
                        Stage::Discovery,
                        format!("Failed to enumerate {}: {}", path.display(), err),
                    )
                    .with_path(&path),
                );
                continue;
            }
        };

        if !is_regular_file(&entry) || !format.is_source(entry.path()) {
            continue;
        }

        match entry.path().canonicalize() {
            Ok(canonical) => found.push((entry.into_path(), canonical)),
            Err(err) => {
                diagnostics.emit(
                    Diagnostic::warning(
                        Stage::Discovery,
                        format!("Failed to resolve {}: {}", entry.path().display(), err),
                    )
                    .with_path(entry.path()),
                );
            }
        }
    }

    // Sorted by the full path string; the first path reaching a target wins
    found.sort_by(|(a, _), (b, _)| a.as_os_str().cmp(b.as_os_str()));
    let mut targets = HashSet::new();
    let sources: Vec<SourceFile> = found
        .into_iter()
        .filter(|(_, canonical)| targets.insert(canonical.clone()))
        .filter_map(|(path, _)| SourceFile::from_path(path))
        .collect();

    if sources.is_empty() {
        diagnostics.emit(
            Diagnostic::remark(
                Stage::Discovery,
                format!(
                    "No .{} files found in {}. Skipping {}.",
                    format.source_ext,
                    root.display(),
                    cimetal_shared::COMPILER_TOOL_NAME
                ),
            )
            .with_path(&root),
        );
    } else {
        let names: Vec<&str> = sources.iter().map(|s| s.file_name.as_str()).collect();
        diagnostics.emit(Diagnostic::remark(
            Stage::Discovery,
            format!(
                "Found {} .{} file(s): {}",
                sources.len(),
                format.source_ext,
                names.join(", ")
            ),
        ));
    }

    Ok(sources)
}
