//! Static discovery of plugin-candidate artifacts and their metadata.
//!
//! A discovery run walks configured search locations for candidate
//! sources — archives, directory trees, single compiled units — filters
//! out known and unpermitted artifacts, statically parses every compiled
//! unit inside each surviving candidate, and indexes the extracted
//! metadata by marker identifier for a later activation stage to query.
//! Nothing discovered here is ever loaded or executed.
//!
//! - [`CandidateResolver`]: search locations → filtered, deduplicated,
//!   ordered candidate list
//! - [`ExtractionDriver`]: one candidate → [`ExtractionOutcome`], with
//!   per-unit failures recorded rather than fatal
//! - [`MetadataIndex`]: per-run, append-only marker table plus the
//!   inert/plugin-bearing candidate lists
//! - [`PermissionGate`] / [`UnitTransform`] / [`ExclusionSets`]: the
//!   host-supplied policy seams
//!
//! A run always completes with whatever it could extract: candidates are
//! individually classified as metadata-producing, inert, or malformed,
//! and one corrupt artifact never aborts the scan.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod candidate;
pub mod error;
pub mod extract;
pub mod index;
pub mod policy;
pub mod resolver;

pub use candidate::{CandidateSource, ContainerKind, normalize_path};
pub use error::{DiscoveryError, DiscoveryResult};
pub use extract::{ExtractionDriver, ExtractionOutcome};
pub use index::{MetadataIndex, MetadataRecord};
pub use policy::{AllowAll, DenyAll, ExclusionSets, Identity, PermissionGate, UnitTransform};
pub use resolver::{CandidateResolver, DEFAULT_ARCHIVE_EXTENSIONS, UNIT_EXTENSION};
