//! Extraction driver: turning one candidate into indexed metadata.

use std::ffi::OsStr;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use quarry_classfile::{ClassMetadata, parse_metadata};

use crate::candidate::{CandidateSource, ContainerKind};
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::index::MetadataIndex;
use crate::policy::{Identity, UnitTransform};
use crate::resolver::UNIT_EXTENSION;

const UNIT_SUFFIX: &str = ".class";

/// How extracting one candidate went.
#[derive(Debug)]
pub enum ExtractionOutcome {
    /// The candidate contains plugin types; here is their metadata.
    ProducesMetadata(Vec<ClassMetadata>),
    /// The candidate parsed fine but holds no plugin-qualifying units —
    /// an ordinary dependency artifact.
    Inert,
    /// The candidate container itself could not be processed.
    Malformed {
        /// Why the candidate was skipped.
        reason: String,
    },
}

impl ExtractionOutcome {
    /// The extracted metadata, when the candidate produced any.
    #[must_use]
    pub fn metadata(&self) -> Option<&[ClassMetadata]> {
        match self {
            Self::ProducesMetadata(units) => Some(units),
            Self::Inert | Self::Malformed { .. } => None,
        }
    }

    /// Whether the candidate was classified inert.
    #[must_use]
    pub fn is_inert(&self) -> bool {
        matches!(self, Self::Inert)
    }

    /// Whether the candidate was classified malformed.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }
}

/// Drives extraction over resolved candidates.
///
/// Holds no per-candidate state: `extract` takes shared references only,
/// so an embedder may run candidates on worker threads against the same
/// index once resolution (which is sequential) has finished.
pub struct ExtractionDriver {
    transform: Arc<dyn UnitTransform>,
}

impl Default for ExtractionDriver {
    fn default() -> Self {
        Self {
            transform: Arc::new(Identity),
        }
    }
}

impl ExtractionDriver {
    /// New driver with the identity byte transform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// New driver applying `transform` to every unit's bytes before
    /// parsing.
    #[must_use]
    pub fn with_transform(transform: Arc<dyn UnitTransform>) -> Self {
        Self { transform }
    }

    /// Extract every compiled unit of `candidate`, flushing metadata into
    /// `index`.
    ///
    /// A unit that fails to read or decode is recorded and skipped; the
    /// candidate continues with its remaining units. A candidate whose
    /// container cannot be opened at all is classified
    /// [`ExtractionOutcome::Malformed`]. Only genuine defects (panics)
    /// propagate.
    pub fn extract(
        &self,
        candidate: &Arc<CandidateSource>,
        index: &MetadataIndex,
    ) -> ExtractionOutcome {
        let units = match read_units(candidate) {
            Ok(units) => units,
            Err(e) => {
                warn!(candidate = %candidate, error = %e, "Identified a problem with the candidate, ignoring this source");
                return ExtractionOutcome::Malformed {
                    reason: e.to_string(),
                };
            }
        };

        let mut qualifying = Vec::new();
        for (unit, bytes) in units {
            let raw = match bytes {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(unit = %unit, error = %e, "Skipping unreadable compiled unit");
                    continue;
                }
            };
            let reviewed = self.transform.review_bytes(raw);
            match parse_metadata(&reviewed) {
                Ok(metadata) => {
                    trace!(unit = %unit, class = %metadata.name, "Examined compiled unit");
                    if index.absorb(candidate, &metadata) > 0 {
                        qualifying.push(metadata);
                    }
                }
                Err(e) => {
                    let e = DiscoveryError::UnitDecode {
                        unit: unit.clone(),
                        source: e,
                    };
                    warn!(error = %e, "Unable to read a compiled unit correctly, skipping");
                }
            }
        }

        if qualifying.is_empty() {
            debug!(candidate = %candidate, "Candidate contains no plugin metadata");
            index.note_inert(candidate);
            ExtractionOutcome::Inert
        } else {
            debug!(candidate = %candidate, units = qualifying.len(), "Candidate produced plugin metadata");
            index.note_plugin_bearing(candidate);
            ExtractionOutcome::ProducesMetadata(qualifying)
        }
    }

    /// Extract every candidate in order, returning per-candidate outcomes.
    pub fn run_all(
        &self,
        candidates: &[Arc<CandidateSource>],
        index: &MetadataIndex,
    ) -> Vec<(Arc<CandidateSource>, ExtractionOutcome)> {
        candidates
            .iter()
            .map(|candidate| (Arc::clone(candidate), self.extract(candidate, index)))
            .collect()
    }
}

type UnitBytes = (String, DiscoveryResult<Vec<u8>>);

/// Enumerate the compiled units inside a candidate, reading each unit's
/// bytes. Per-unit read failures land in the per-unit slot; only a failure
/// to open the container itself is an error here. Iteration order is
/// deterministic for identical input.
fn read_units(candidate: &CandidateSource) -> DiscoveryResult<Vec<UnitBytes>> {
    match candidate.kind() {
        ContainerKind::SingleUnit => {
            let bytes = std::fs::read(candidate.path()).map_err(|source| {
                DiscoveryError::ContainerOpen {
                    path: candidate.path().to_path_buf(),
                    source,
                }
            })?;
            Ok(vec![(candidate.to_string(), Ok(bytes))])
        }
        ContainerKind::Archive => read_archive_units(candidate.path()),
        ContainerKind::DirectoryTree => read_directory_units(candidate.path()),
    }
}

fn read_archive_units(path: &Path) -> DiscoveryResult<Vec<UnitBytes>> {
    let file = File::open(path).map_err(|source| DiscoveryError::ContainerOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| DiscoveryError::ArchiveRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut units = Vec::new();
    for i in 0..archive.len() {
        match archive.by_index(i) {
            Ok(mut entry) => {
                if !entry.is_file() || !entry.name().ends_with(UNIT_SUFFIX) {
                    continue;
                }
                let name = entry.name().to_string();
                let mut bytes = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
                let result = entry
                    .read_to_end(&mut bytes)
                    .map(|_| bytes)
                    .map_err(|e| DiscoveryError::UnitRead {
                        unit: name.clone(),
                        message: e.to_string(),
                    });
                units.push((name, result));
            }
            Err(e) => {
                let name = format!("{}#{i}", path.display());
                units.push((
                    name.clone(),
                    Err(DiscoveryError::UnitRead {
                        unit: name,
                        message: e.to_string(),
                    }),
                ));
            }
        }
    }
    Ok(units)
}

fn read_directory_units(path: &Path) -> DiscoveryResult<Vec<UnitBytes>> {
    // A vanished or unreadable root is a container failure, not a unit one.
    std::fs::metadata(path).map_err(|source| DiscoveryError::ContainerOpen {
        path: path.to_path_buf(),
        source,
    })?;

    let mut units = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %path.display(), error = %e, "Failed to walk candidate directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file()
            || entry.path().extension().and_then(OsStr::to_str) != Some(UNIT_EXTENSION)
        {
            continue;
        }
        let name = entry
            .path()
            .strip_prefix(path)
            .unwrap_or(entry.path())
            .display()
            .to_string();
        let result = std::fs::read(entry.path()).map_err(|e| DiscoveryError::UnitRead {
            unit: name.clone(),
            message: e.to_string(),
        });
        units.push((name, result));
    }
    Ok(units)
}
