//! Per-run metadata index keyed by marker identifier.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;

use quarry_classfile::{AnnotationRecord, ClassMetadata};

use crate::candidate::CandidateSource;

/// One indexed occurrence of a marker.
///
/// `annotation` is present for annotation markers and absent for
/// capability (interface) markers, which carry the declaring class's own
/// name as their member marker instead.
#[derive(Debug, Clone)]
pub struct MetadataRecord {
    /// The candidate the declaring unit came from.
    pub candidate: Arc<CandidateSource>,
    /// Dotted name of the declaring class.
    pub class_name: String,
    /// Declaring member, when the marker was attached below type level.
    pub member: Option<String>,
    /// The full annotation record, for annotation markers.
    pub annotation: Option<AnnotationRecord>,
}

/// Write-mostly table from marker identifier to its occurrences.
///
/// Built once per discovery run and queried many times afterward; entries
/// are appended, never removed or mutated. Appends are internally
/// synchronized, so extraction may run candidates concurrently — ordering
/// across candidates under one marker is then unspecified, while records
/// from a single unit always land contiguously in source order.
///
/// There is no ambient instance: construct one per run, pass it down, and
/// drop or [`reset`](Self::reset) it explicitly.
#[derive(Debug, Default)]
pub struct MetadataIndex {
    records: DashMap<String, Vec<MetadataRecord>>,
    inert: Mutex<Vec<Arc<CandidateSource>>>,
    plugin_bearing: Mutex<Vec<Arc<CandidateSource>>>,
}

impl MetadataIndex {
    /// New empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flush one unit's metadata into the index, attributed to `candidate`.
    ///
    /// Appends one entry per annotation record under the record's marker,
    /// then one entry per implemented interface under the interface name.
    /// Returns how many entries were appended; the whole unit lands in one
    /// call, so concurrent flushes never interleave within a unit.
    pub fn absorb(&self, candidate: &Arc<CandidateSource>, metadata: &ClassMetadata) -> usize {
        let mut appended = 0;
        for record in &metadata.annotations {
            self.append(
                record.marker.clone(),
                MetadataRecord {
                    candidate: Arc::clone(candidate),
                    class_name: metadata.name.clone(),
                    member: record.target.member(),
                    annotation: Some(record.clone()),
                },
            );
            appended += 1;
        }
        for interface in &metadata.interfaces {
            self.append(
                interface.clone(),
                MetadataRecord {
                    candidate: Arc::clone(candidate),
                    class_name: metadata.name.clone(),
                    member: Some(metadata.name.clone()),
                    annotation: None,
                },
            );
            appended += 1;
        }
        appended
    }

    fn append(&self, marker: String, record: MetadataRecord) {
        self.records.entry(marker).or_default().push(record);
    }

    /// All occurrences of `marker`, as a snapshot.
    #[must_use]
    pub fn records_for(&self, marker: &str) -> Vec<MetadataRecord> {
        self.records
            .get(marker)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// All marker identifiers present, sorted.
    #[must_use]
    pub fn markers(&self) -> Vec<String> {
        let mut markers: Vec<String> = self.records.iter().map(|e| e.key().clone()).collect();
        markers.sort();
        markers
    }

    /// Number of distinct markers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no marker has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn note_inert(&self, candidate: &Arc<CandidateSource>) {
        Self::note(&self.inert, candidate);
    }

    pub(crate) fn note_plugin_bearing(&self, candidate: &Arc<CandidateSource>) {
        Self::note(&self.plugin_bearing, candidate);
    }

    fn note(list: &Mutex<Vec<Arc<CandidateSource>>>, candidate: &Arc<CandidateSource>) {
        let mut guard = list.lock().unwrap_or_else(PoisonError::into_inner);
        if !guard.iter().any(|c| c.path() == candidate.path()) {
            guard.push(Arc::clone(candidate));
        }
    }

    /// Candidates that parsed fine but contributed nothing: ordinary
    /// dependency artifacts, reported so callers need not re-scan them.
    #[must_use]
    pub fn inert_candidates(&self) -> Vec<Arc<CandidateSource>> {
        self.inert
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Candidates that produced at least one plugin-bearing unit.
    #[must_use]
    pub fn plugin_candidates(&self) -> Vec<Arc<CandidateSource>> {
        self.plugin_bearing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drop everything, returning the index to its freshly built state.
    pub fn reset(&self) {
        self.records.clear();
        self.inert
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.plugin_bearing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use quarry_classfile::{AnnotationTarget, AnnotationValue};

    use super::*;
    use crate::candidate::ContainerKind;

    fn candidate() -> Arc<CandidateSource> {
        Arc::new(CandidateSource::new(
            "/plugins/thing.jar",
            ContainerKind::Archive,
        ))
    }

    fn metadata_with_annotation_and_interface() -> ClassMetadata {
        let mut record = AnnotationRecord::new("com.example.Marker", AnnotationTarget::Type);
        record
            .values
            .insert("key".into(), AnnotationValue::Str("v".into()));
        ClassMetadata {
            name: "com.example.Thing".into(),
            major_version: 52,
            super_name: Some("java.lang.Object".into()),
            interfaces: BTreeSet::from(["com.example.Capability".to_string()]),
            annotations: vec![record],
        }
    }

    #[test]
    fn absorb_appends_annotation_and_capability_entries() {
        let index = MetadataIndex::new();
        let candidate = candidate();
        let appended = index.absorb(&candidate, &metadata_with_annotation_and_interface());
        assert_eq!(appended, 2);

        let annotation_records = index.records_for("com.example.Marker");
        assert_eq!(annotation_records.len(), 1);
        assert_eq!(annotation_records[0].class_name, "com.example.Thing");
        assert_eq!(annotation_records[0].member, None);
        assert!(annotation_records[0].annotation.is_some());

        let capability_records = index.records_for("com.example.Capability");
        assert_eq!(capability_records.len(), 1);
        assert_eq!(capability_records[0].class_name, "com.example.Thing");
        assert_eq!(
            capability_records[0].member.as_deref(),
            Some("com.example.Thing")
        );
        assert!(capability_records[0].annotation.is_none());
    }

    #[test]
    fn unknown_markers_return_empty() {
        let index = MetadataIndex::new();
        assert!(index.records_for("com.example.Nothing").is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn candidate_lists_deduplicate_by_path() {
        let index = MetadataIndex::new();
        let candidate = candidate();
        index.note_inert(&candidate);
        index.note_inert(&candidate);
        assert_eq!(index.inert_candidates().len(), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let index = MetadataIndex::new();
        let candidate = candidate();
        index.absorb(&candidate, &metadata_with_annotation_and_interface());
        index.note_plugin_bearing(&candidate);

        index.reset();
        assert!(index.is_empty());
        assert!(index.plugin_candidates().is_empty());
        assert!(index.markers().is_empty());
    }

    #[test]
    fn markers_are_sorted() {
        let index = MetadataIndex::new();
        let candidate = candidate();
        index.absorb(&candidate, &metadata_with_annotation_and_interface());
        assert_eq!(
            index.markers(),
            vec![
                "com.example.Capability".to_string(),
                "com.example.Marker".to_string()
            ]
        );
    }
}
