//! Candidate source identity and classification.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// What shape of container a candidate is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// A single compiled unit on disk.
    SingleUnit,
    /// An archive holding zero or more compiled units.
    Archive,
    /// A directory tree holding zero or more compiled units.
    DirectoryTree,
}

/// A filesystem location suspected of containing plugin types.
///
/// Identity is the absolute normalized path: two candidates are the same
/// candidate exactly when their paths are equal, and the resolver keeps
/// only the first occurrence. Candidates are immutable once created and
/// are shared by `Arc` between the resolver, driver, and index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateSource {
    path: PathBuf,
    kind: ContainerKind,
    base_runtime: bool,
    primary_path: bool,
}

impl CandidateSource {
    /// New candidate at `path`, normalized to its absolute form. Both
    /// flags default to off.
    #[must_use]
    pub fn new(path: impl AsRef<Path>, kind: ContainerKind) -> Self {
        Self {
            path: normalize_path(path.as_ref()),
            kind,
            base_runtime: false,
            primary_path: false,
        }
    }

    /// Mark whether this candidate is part of the base runtime.
    #[must_use]
    pub fn with_base_runtime(mut self, base_runtime: bool) -> Self {
        self.base_runtime = base_runtime;
        self
    }

    /// Mark whether this candidate sits on the primary search path.
    #[must_use]
    pub fn with_primary_path(mut self, primary_path: bool) -> Self {
        self.primary_path = primary_path;
        self
    }

    /// The normalized path that is this candidate's identity.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Container classification.
    #[must_use]
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    /// Whether this candidate is part of the base runtime.
    #[must_use]
    pub fn is_base_runtime(&self) -> bool {
        self.base_runtime
    }

    /// Whether this candidate sits on the primary search path.
    #[must_use]
    pub fn is_primary_path(&self) -> bool {
        self.primary_path
    }

    /// The candidate's file name, when representable as UTF-8.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.path.display().fmt(f)
    }
}

/// Absolute, symlink-resolved form of `path`.
///
/// Falls back to the plain absolute form when the path does not exist
/// yet; identity stays stable either way within one discovery run.
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    absolute.canonicalize().unwrap_or(absolute)
}
