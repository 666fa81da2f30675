//! `cimetal.toml` kernel grouping configuration.
//!
//! ```toml
//! [default]
//! output = "default.ci.metallib"
//! cache = "cache"
//! label = "Compile Default CI Kernels"
//!
//! [[special]]
//! file = "SpryColorKernels.ci.metal"
//! cache = "SpryColorKernelsCache"
//! output = "SpryColorKernels.ci.metallib"
//! label = "Compile SpryColorKernels"
//! ```
//!
//! Every section is optional. Without `[[special]]` entries all sources are
//! batched into the default library.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default config file name looked up in the target directory
pub const CONFIG_FILE_NAME: &str = "cimetal.toml";

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse cimetal.toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("special kernel '{0}' is listed more than once")]
    DuplicateFile(String),

    #[error("cache directory '{0}' is shared by more than one group")]
    SharedCache(String),

    #[error("output library '{0}' is produced by more than one group")]
    SharedOutput(String),

    #[error("{field} must not be empty (in group '{group}')")]
    EmptyField { group: String, field: &'static str },
}

/// Kernel grouping policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KernelConfig {
    #[serde(default)]
    pub default: DefaultGroup,
    #[serde(default)]
    pub special: Vec<SpecialKernel>,
}

/// Settings for the batch group that collects every unclaimed source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultGroup {
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default = "default_cache")]
    pub cache: String,
    #[serde(default = "default_label")]
    pub label: String,
}

impl Default for DefaultGroup {
    fn default() -> Self {
        Self {
            output: default_output(),
            cache: default_cache(),
            label: default_label(),
        }
    }
}

fn default_output() -> String {
    "default.ci.metallib".to_string()
}

fn default_cache() -> String {
    "cache".to_string()
}

fn default_label() -> String {
    "Compile Default CI Kernels".to_string()
}

/// A source singled out by exact file name to get its own library.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecialKernel {
    /// Exact file name to match (not a path)
    pub file: String,
    /// Cache subdirectory name
    pub cache: String,
    /// Output library file name
    pub output: String,
    /// Human-readable label for the build command
    pub label: String,
}

impl SpecialKernel {
    pub fn new(
        file: impl Into<String>,
        cache: impl Into<String>,
        output: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            cache: cache.into(),
            output: output.into(),
            label: label.into(),
        }
    }
}

impl KernelConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Load `cimetal.toml` from `dir` if present, defaults otherwise
    pub fn load_or_default(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate config text
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject tables whose groups would share a cache directory or an output.
    ///
    /// Concurrent pipeline runs are only safe when these are distinct.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut files = HashSet::new();
        let mut caches = HashSet::new();
        let mut outputs = HashSet::new();

        let default = &self.default;
        let groups = self
            .special
            .iter()
            .map(|s| (s.label.as_str(), Some(s.file.as_str()), &s.cache, &s.output))
            .chain(std::iter::once((
                default.label.as_str(),
                None,
                &default.cache,
                &default.output,
            )));

        for (label, file, cache, output) in groups {
            if let Some(file) = file {
                if file.is_empty() {
                    return Err(empty(label, "file"));
                }
                if !files.insert(file) {
                    return Err(ConfigError::DuplicateFile(file.to_string()));
                }
            }
            if cache.is_empty() {
                return Err(empty(label, "cache"));
            }
            if output.is_empty() {
                return Err(empty(label, "output"));
            }
            if !caches.insert(cache.as_str()) {
                return Err(ConfigError::SharedCache(cache.clone()));
            }
            if !outputs.insert(output.as_str()) {
                return Err(ConfigError::SharedOutput(output.clone()));
            }
        }
        Ok(())
    }
}

fn empty(group: &str, field: &'static str) -> ConfigError {
    ConfigError::EmptyField {
        group: group.to_string(),
        field,
    }
}
