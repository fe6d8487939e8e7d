//! Discovery error types.

use std::path::PathBuf;

use quarry_classfile::ClassParseError;

/// Errors from candidate discovery and extraction.
///
/// Container-level variants classify a candidate as malformed; unit-level
/// variants are recorded and skipped without affecting the rest of the
/// candidate.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// A search location could not be listed.
    #[error("cannot list search location {path}: {source}")]
    Location {
        /// The unreadable location.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A candidate container could not be opened at all.
    #[error("cannot open candidate container {path}: {source}")]
    ContainerOpen {
        /// The candidate path.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A candidate archive is not readable as an archive.
    #[error("cannot read archive {path}: {message}")]
    ArchiveRead {
        /// The archive path.
        path: PathBuf,
        /// The archive library's failure description.
        message: String,
    },

    /// One compiled unit's bytes could not be read out of its container.
    #[error("cannot read compiled unit {unit}: {message}")]
    UnitRead {
        /// The unit's name within its container.
        unit: String,
        /// The underlying failure description.
        message: String,
    },

    /// One compiled unit's bytes did not decode.
    #[error("cannot decode compiled unit {unit}: {source}")]
    UnitDecode {
        /// The unit's name within its container.
        unit: String,
        /// The decode failure.
        #[source]
        source: ClassParseError,
    },
}

/// Result type for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;
