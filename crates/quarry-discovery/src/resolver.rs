//! Candidate resolution: walking search locations into a filtered,
//! deduplicated, ordered candidate list.
//!
//! Two kinds of search location feed a resolver: the primary search path
//! (an explicit list of files, never directories) and plugin directories
//! (listed, merged with any supplemental explicit files, and classified
//! per entry). Filtering happens here and only here — extraction receives
//! candidates that already passed the exclusion sets and the permission
//! gate.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::candidate::{CandidateSource, ContainerKind};
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::policy::{ExclusionSets, PermissionGate};

/// Default archive extensions recognized as candidate containers.
pub const DEFAULT_ARCHIVE_EXTENSIONS: &[&str] = &["jar", "zip"];

/// File extension of a single compiled unit.
pub const UNIT_EXTENSION: &str = "class";

/// Accumulates candidate sources from configured search locations.
///
/// Deduplication is by normalized path, first occurrence wins, and is
/// strictly sequential: the full candidate list exists before any
/// extraction begins. Resolution is deterministic — the same locations in
/// the same state yield the same ordered list.
pub struct CandidateResolver {
    exclusions: ExclusionSets,
    gate: Arc<dyn PermissionGate>,
    archive_extensions: Vec<String>,
    candidates: Vec<Arc<CandidateSource>>,
}

impl CandidateResolver {
    /// New resolver with the given exclusion sets and permission gate.
    #[must_use]
    pub fn new(exclusions: ExclusionSets, gate: Arc<dyn PermissionGate>) -> Self {
        Self {
            exclusions,
            gate,
            archive_extensions: DEFAULT_ARCHIVE_EXTENSIONS
                .iter()
                .map(ToString::to_string)
                .collect(),
            candidates: Vec::new(),
        }
    }

    /// Replace the archive extension whitelist.
    #[must_use]
    pub fn with_archive_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.archive_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Add the base runtime packaged as a single archive.
    ///
    /// Bypasses name filtering — the base runtime is not a discovered
    /// artifact, the caller named it directly.
    pub fn add_primary_base(&mut self, path: &Path) {
        debug!(path = %path.display(), "Base runtime is a single archive, adding as candidate");
        self.add_candidate(
            CandidateSource::new(path, ContainerKind::Archive)
                .with_base_runtime(true)
                .with_primary_path(true),
        );
    }

    /// Add the explicit files of the primary search path.
    ///
    /// Directories here are never candidates — explicit-file discovery
    /// expects the caller to have pre-expanded them. The first listed
    /// entry is additionally flagged as part of the base runtime.
    pub fn add_primary_sources(&mut self, paths: &[PathBuf]) {
        for (position, path) in paths.iter().enumerate() {
            if path.is_dir() {
                trace!(path = %path.display(), "Ignoring directory on the primary search path");
                continue;
            }
            let Some(name) = path.file_name().and_then(OsStr::to_str) else {
                trace!(path = %path.display(), "Ignoring primary source with unusable name");
                continue;
            };
            if self.exclusions.contains(name) {
                trace!(path = %path.display(), "Skipping known library file");
                continue;
            }
            if !self.gate.is_permitted(path) {
                debug!(path = %path.display(), "File not permitted, skipping");
                continue;
            }
            match self.classify_file(path) {
                Some(kind) => {
                    debug!(path = %path.display(), "Found a primary search path candidate");
                    self.add_candidate(
                        CandidateSource::new(path, kind)
                            .with_base_runtime(position == 0)
                            .with_primary_path(true),
                    );
                }
                None => {
                    trace!(path = %path.display(), "Ignoring unrecognized primary source");
                }
            }
        }
    }

    /// Add a plugins directory, merged with supplemental explicit files.
    ///
    /// The directory listing and the supplemental files are merged and
    /// sorted by file name before classification, so the resulting
    /// discovery order is stable across runs.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Location`] if the directory itself cannot
    /// be listed. Unreadable individual entries are skipped with a warning.
    pub fn add_plugin_dir(&mut self, dir: &Path, supplemental: &[PathBuf]) -> DiscoveryResult<()> {
        let entries = std::fs::read_dir(dir).map_err(|source| DiscoveryError::Location {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut merged: Vec<PathBuf> = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => merged.push(entry.path()),
                Err(e) => warn!(dir = %dir.display(), error = %e, "Failed to read a plugins directory entry"),
            }
        }
        merged.extend(supplemental.iter().cloned());
        merged.sort_by(|a, b| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));

        for path in merged {
            let Some(name) = path.file_name().and_then(OsStr::to_str) else {
                trace!(path = %path.display(), "Ignoring entry with unusable name");
                continue;
            };
            if self.exclusions.contains(name) {
                trace!(path = %path.display(), "Skipping already handled artifact");
                continue;
            }
            if !self.gate.is_permitted(&path) {
                debug!(path = %path.display(), "Artifact not permitted, skipping");
                continue;
            }
            if path.is_dir() {
                debug!(path = %path.display(), "Found a candidate plugin directory");
                self.add_candidate(CandidateSource::new(&path, ContainerKind::DirectoryTree));
            } else if let Some(kind) = self.classify_file(&path) {
                debug!(path = %path.display(), "Found a candidate plugin file");
                self.add_candidate(CandidateSource::new(&path, kind));
            } else {
                debug!(path = %path.display(), "Ignoring unknown file in plugins directory");
            }
        }
        Ok(())
    }

    /// Add one pre-built candidate, subject only to deduplication.
    pub fn add_candidate(&mut self, candidate: CandidateSource) {
        if self
            .candidates
            .iter()
            .any(|existing| existing.path() == candidate.path())
        {
            trace!(candidate = %candidate, "Skipping candidate already in list");
            return;
        }
        self.candidates.push(Arc::new(candidate));
    }

    fn classify_file(&self, path: &Path) -> Option<ContainerKind> {
        let extension = path.extension()?.to_str()?;
        if self.archive_extensions.iter().any(|e| e == extension) {
            Some(ContainerKind::Archive)
        } else if extension == UNIT_EXTENSION {
            Some(ContainerKind::SingleUnit)
        } else {
            None
        }
    }

    /// The accepted candidates in discovery order.
    #[must_use]
    pub fn candidates(&self) -> &[Arc<CandidateSource>] {
        &self.candidates
    }

    /// The accepted candidates sorted by file name.
    ///
    /// A view over the same filtering result; nothing is re-resolved.
    #[must_use]
    pub fn candidates_by_name(&self) -> Vec<Arc<CandidateSource>> {
        let mut sorted = self.candidates.clone();
        sorted.sort_by(|a, b| {
            a.file_name()
                .cmp(&b.file_name())
                .then_with(|| a.path().cmp(b.path()))
        });
        sorted
    }

    /// Consume the resolver, returning the candidates in discovery order.
    #[must_use]
    pub fn into_candidates(self) -> Vec<Arc<CandidateSource>> {
        self.candidates
    }
}
