//! Planning data model: discovered sources, kernel groups and build commands.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// One discovered shader source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceFile {
    /// Absolute path as found below the discovery root
    pub path: PathBuf,
    pub file_name: String,
    pub extension: String,
}

impl SourceFile {
    /// Build a record from a path. Returns `None` for paths without a file name.
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let file_name = path.file_name()?.to_string_lossy().into_owned();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        Some(Self {
            path,
            file_name,
            extension,
        })
    }
}

/// Ordered by the full path string, so `a-b/x` sorts before `a/y`.
impl Ord for SourceFile {
    fn cmp(&self, other: &Self) -> Ordering {
        self.path
            .as_os_str()
            .cmp(other.path.as_os_str())
            .then_with(|| self.file_name.cmp(&other.file_name))
            .then_with(|| self.extension.cmp(&other.extension))
    }
}

impl PartialOrd for SourceFile {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Identifier of a kernel group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupId {
    /// Single-file group keyed by the matched source file name
    Special(String),
    Default,
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupId::Special(name) => write!(f, "special:{name}"),
            GroupId::Default => f.write_str("default"),
        }
    }
}

/// A named unit of compilation producing one final library.
///
/// Never empty. Special groups hold exactly one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelGroup {
    pub id: GroupId,
    pub label: String,
    pub sources: Vec<SourceFile>,
    /// Final library file name, relative to the work directory
    pub output_name: String,
    /// Cache subdirectory name, relative to the work directory
    pub cache_name: String,
}

impl KernelGroup {
    pub fn is_special(&self) -> bool {
        matches!(self.id, GroupId::Special(_))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Label shown by the host while the group's command runs.
    pub fn display_name(&self) -> String {
        match self.id {
            GroupId::Special(_) => self.label.clone(),
            GroupId::Default => format!("{} ({} file(s))", self.label, self.sources.len()),
        }
    }
}

/// Declarative build action handed to the host build system.
///
/// The host re-runs the command only when an input changed or an output is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildCommand {
    pub display_name: String,
    pub executable: PathBuf,
    pub arguments: Vec<String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    pub input_files: Vec<PathBuf>,
    pub output_files: Vec<PathBuf>,
}
