//! Shader file format constants for the Core Image Metal toolchain.
//!
//! `ShaderFormat` is the single source of truth for every file extension the
//! tools read or write.
//!
//! # Example
//!
//! ```
//! use cimetal_shared::CI_METAL_FORMAT;
//!
//! assert_eq!(CI_METAL_FORMAT.source_ext, "metal");
//! assert_eq!(CI_METAL_FORMAT.intermediate_ext, "air");
//! assert_eq!(CI_METAL_FORMAT.library_ext, "metallib");
//! ```

use std::path::{Path, PathBuf};

/// File extensions used by one shader toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderFormat {
    /// Shader source extension without dot (e.g., "metal")
    pub source_ext: &'static str,

    /// Compiled-but-unlinked extension (e.g., "air")
    pub intermediate_ext: &'static str,

    /// Linked library extension, shared by unit and final libraries (e.g., "metallib")
    pub library_ext: &'static str,
}

impl ShaderFormat {
    /// Create a new shader format.
    pub const fn new(
        source_ext: &'static str,
        intermediate_ext: &'static str,
        library_ext: &'static str,
    ) -> Self {
        Self {
            source_ext,
            intermediate_ext,
            library_ext,
        }
    }

    /// Whether `path` carries this format's source extension.
    pub fn is_source(&self, path: &Path) -> bool {
        path.extension().and_then(|e| e.to_str()) == Some(self.source_ext)
    }

    /// `{cache_dir}/{stem}.{intermediate_ext}`
    pub fn intermediate_path(&self, cache_dir: &Path, source: &Path) -> PathBuf {
        cache_dir.join(format!("{}.{}", stem_of(source), self.intermediate_ext))
    }

    /// `{cache_dir}/{stem}.{library_ext}`
    pub fn unit_library_path(&self, cache_dir: &Path, intermediate: &Path) -> PathBuf {
        cache_dir.join(format!("{}.{}", stem_of(intermediate), self.library_ext))
    }
}

/// Last path component with only the final extension removed.
///
/// `Kernels/Foo.ci.metal` becomes `Foo.ci`.
pub fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Core Image Metal kernels:
/// - Sources: `.metal`
/// - Intermediates: `.air`
/// - Unit and final libraries: `.metallib`
pub const CI_METAL_FORMAT: ShaderFormat = ShaderFormat::new("metal", "air", "metallib");
