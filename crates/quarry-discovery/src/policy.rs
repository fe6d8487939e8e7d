//! External policy seams: permission gate, byte review, exclusion sets.
//!
//! Discovery never decides trust itself. The host supplies a
//! [`PermissionGate`] consulted once per candidate path before any bytes
//! are read, a [`UnitTransform`] applied to each compiled unit's raw bytes
//! before structural parsing, and [`ExclusionSets`] of artifact names that
//! are skipped without being errors.

use std::collections::BTreeSet;
use std::path::Path;

/// Trust decision for a candidate path.
///
/// Called once per path during resolution; a `false` drops the path with
/// a diagnostic and is never treated as a failure of the scan.
pub trait PermissionGate: Send + Sync {
    /// Whether the candidate at `path` may be examined at all.
    fn is_permitted(&self, path: &Path) -> bool;
}

/// Gate that permits every path (the default, and for testing).
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn is_permitted(&self, _path: &Path) -> bool {
        true
    }
}

/// Gate that rejects every path (for testing).
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl PermissionGate for DenyAll {
    fn is_permitted(&self, _path: &Path) -> bool {
        false
    }
}

/// Byte-level review step applied to each compiled unit before parsing.
///
/// Represents an integrity or unlock transform supplied by the host. The
/// reader only ever sees the returned bytes; it never assumes they equal
/// the raw input.
pub trait UnitTransform: Send + Sync {
    /// Transform one unit's raw bytes into the bytes to parse.
    fn review_bytes(&self, raw: Vec<u8>) -> Vec<u8>;
}

/// Transform that passes bytes through unchanged (the default).
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl UnitTransform for Identity {
    fn review_bytes(&self, raw: Vec<u8>) -> Vec<u8> {
        raw
    }
}

/// Known-artifact names excluded from discovery by exact match.
///
/// Three sets with distinct provenance, merged for the check: libraries
/// shipped with the base runtime, artifacts an earlier stage already
/// handled, and artifacts deferred for a later reparse.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSets {
    /// Default runtime library names.
    pub runtime_libraries: BTreeSet<String>,
    /// Artifact names already handled by an earlier stage.
    pub handled: BTreeSet<String>,
    /// Artifact names deferred for reparse elsewhere.
    pub deferred: BTreeSet<String>,
}

impl ExclusionSets {
    /// Whether `name` appears in any of the three sets. Case-sensitive
    /// exact match.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.runtime_libraries.contains(name)
            || self.handled.contains(name)
            || self.deferred.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gates_answer_uniformly() {
        let path = Path::new("/plugins/thing.jar");
        assert!(AllowAll.is_permitted(path));
        assert!(!DenyAll.is_permitted(path));
    }

    #[test]
    fn identity_transform_is_a_passthrough() {
        let raw = vec![0xCA, 0xFE];
        assert_eq!(Identity.review_bytes(raw.clone()), raw);
    }

    #[test]
    fn exclusion_check_spans_all_three_sets() {
        let sets = ExclusionSets {
            runtime_libraries: ["runtime.jar".to_string()].into(),
            handled: ["done.jar".to_string()].into(),
            deferred: ["later.jar".to_string()].into(),
        };
        assert!(sets.contains("runtime.jar"));
        assert!(sets.contains("done.jar"));
        assert!(sets.contains("later.jar"));
        assert!(!sets.contains("other.jar"));
        // Exact match only.
        assert!(!sets.contains("Runtime.jar"));
    }
}
