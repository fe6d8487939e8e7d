//! End-to-end discovery runs over synthetic plugin directories.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use quarry_classfile::testutil::{SyntheticAnnotation, SyntheticClass, SyntheticValue};
use quarry_classfile::AnnotationValue;
use quarry_discovery::{
    AllowAll, CandidateResolver, ContainerKind, DenyAll, ExclusionSets, ExtractionDriver,
    MetadataIndex,
};

fn write_jar(path: &Path, entries: &[(&str, Vec<u8>)]) {
    let file = std::fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    for (name, bytes) in entries {
        writer
            .start_file(*name, zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap();
}

fn annotated_class(name: &str, marker: &str) -> Vec<u8> {
    SyntheticClass::new(name)
        .annotate(SyntheticAnnotation::new(marker).with("key", SyntheticValue::Str("v".into())))
        .encode()
}

fn plain_class(name: &str) -> Vec<u8> {
    SyntheticClass::new(name).encode()
}

#[test]
fn round_trip_through_a_jar() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("plugin.jar");
    let unit = SyntheticClass::new("com.example.T")
        .with_super("com.example.S")
        .implements("com.example.C")
        .annotate(
            SyntheticAnnotation::new("com.example.M")
                .with("key", SyntheticValue::Str("v".into())),
        )
        .encode();
    write_jar(&jar, &[("com/example/T.class", unit)]);

    let mut resolver = CandidateResolver::new(ExclusionSets::default(), Arc::new(AllowAll));
    resolver.add_plugin_dir(dir.path(), &[]).unwrap();
    assert_eq!(resolver.candidates().len(), 1);

    let index = MetadataIndex::new();
    let outcomes = ExtractionDriver::new().run_all(resolver.candidates(), &index);
    assert_eq!(outcomes.len(), 1);

    let metadata = outcomes[0].1.metadata().expect("jar produces metadata");
    assert_eq!(metadata.len(), 1);
    assert_eq!(metadata[0].name, "com.example.T");
    assert_eq!(metadata[0].super_name.as_deref(), Some("com.example.S"));
    assert!(metadata[0].interfaces.contains("com.example.C"));

    let annotation_records = index.records_for("com.example.M");
    assert_eq!(annotation_records.len(), 1);
    let record = annotation_records[0].annotation.as_ref().unwrap();
    assert_eq!(
        record.values.get("key"),
        Some(&AnnotationValue::Str("v".into()))
    );

    let capability_records = index.records_for("com.example.C");
    assert_eq!(capability_records.len(), 1);
    assert!(capability_records[0].annotation.is_none());

    assert_eq!(index.plugin_candidates().len(), 1);
    assert!(index.inert_candidates().is_empty());
}

#[test]
fn mixed_plugin_dir_classifies_each_candidate() {
    let dir = tempfile::tempdir().unwrap();

    write_jar(
        &dir.path().join("real.jar"),
        &[(
            "com/example/Plugin.class",
            annotated_class("com.example.Plugin", "com.example.Entry"),
        )],
    );
    // Parses fine, carries no annotations or interfaces.
    write_jar(
        &dir.path().join("library.jar"),
        &[("com/example/Util.class", plain_class("com.example.Util"))],
    );
    // Not an archive at all.
    std::fs::write(dir.path().join("broken.jar"), b"this is not a zip").unwrap();

    let mut resolver = CandidateResolver::new(ExclusionSets::default(), Arc::new(AllowAll));
    resolver.add_plugin_dir(dir.path(), &[]).unwrap();

    let index = MetadataIndex::new();
    let driver = ExtractionDriver::new();
    let outcomes = driver.run_all(resolver.candidates(), &index);

    let by_name = |name: &str| {
        outcomes
            .iter()
            .find(|(c, _)| c.file_name() == Some(name))
            .map(|(_, outcome)| outcome)
            .unwrap()
    };
    assert!(by_name("real.jar").metadata().is_some());
    assert!(by_name("library.jar").is_inert());
    assert!(by_name("broken.jar").is_malformed());

    assert_eq!(index.plugin_candidates().len(), 1);
    assert_eq!(index.inert_candidates().len(), 1);
    assert_eq!(index.records_for("com.example.Entry").len(), 1);
}

#[test]
fn truncated_unit_does_not_poison_its_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("partial.jar");

    let first = annotated_class("com.example.First", "com.example.Entry");
    let second = annotated_class("com.example.Second", "com.example.Entry");
    let third = annotated_class("com.example.Third", "com.example.Entry");
    let truncated = second[..second.len() / 2].to_vec();

    write_jar(
        &jar,
        &[
            ("com/example/First.class", first),
            ("com/example/Second.class", truncated),
            ("com/example/Third.class", third),
        ],
    );

    let candidate = Arc::new(quarry_discovery::CandidateSource::new(
        &jar,
        ContainerKind::Archive,
    ));
    let index = MetadataIndex::new();
    let outcome = ExtractionDriver::new().extract(&candidate, &index);

    let metadata = outcome.metadata().expect("surviving units produce metadata");
    let names: Vec<&str> = metadata.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, ["com.example.First", "com.example.Third"]);
    assert_eq!(index.records_for("com.example.Entry").len(), 2);
}

#[test]
fn denied_candidates_produce_no_entries() {
    let dir = tempfile::tempdir().unwrap();
    write_jar(
        &dir.path().join("blocked.jar"),
        &[(
            "com/example/Plugin.class",
            annotated_class("com.example.Plugin", "com.example.Entry"),
        )],
    );

    let mut resolver = CandidateResolver::new(ExclusionSets::default(), Arc::new(DenyAll));
    resolver.add_plugin_dir(dir.path(), &[]).unwrap();
    assert!(resolver.candidates().is_empty());

    let index = MetadataIndex::new();
    ExtractionDriver::new().run_all(resolver.candidates(), &index);
    assert!(index.is_empty());
    assert!(index.records_for("com.example.Entry").is_empty());
}

#[test]
fn excluded_artifacts_never_reach_extraction() {
    let dir = tempfile::tempdir().unwrap();
    write_jar(
        &dir.path().join("handled.jar"),
        &[(
            "com/example/Plugin.class",
            annotated_class("com.example.Plugin", "com.example.Entry"),
        )],
    );

    let exclusions = ExclusionSets {
        handled: ["handled.jar".to_string()].into(),
        ..ExclusionSets::default()
    };
    let mut resolver = CandidateResolver::new(exclusions, Arc::new(AllowAll));
    resolver.add_plugin_dir(dir.path(), &[]).unwrap();
    assert!(resolver.candidates().is_empty());
}

#[test]
fn directory_tree_candidates_walk_nested_units() {
    let dir = tempfile::tempdir().unwrap();
    let tree = dir.path().join("unpacked");
    std::fs::create_dir_all(tree.join("com/example")).unwrap();
    std::fs::write(
        tree.join("com/example/Plugin.class"),
        annotated_class("com.example.Plugin", "com.example.Entry"),
    )
    .unwrap();
    std::fs::write(tree.join("readme.txt"), b"not a unit").unwrap();

    let mut resolver = CandidateResolver::new(ExclusionSets::default(), Arc::new(AllowAll));
    resolver.add_plugin_dir(dir.path(), &[]).unwrap();
    assert_eq!(resolver.candidates().len(), 1);
    assert_eq!(resolver.candidates()[0].kind(), ContainerKind::DirectoryTree);

    let index = MetadataIndex::new();
    let outcomes = ExtractionDriver::new().run_all(resolver.candidates(), &index);
    assert!(outcomes[0].1.metadata().is_some());
    assert_eq!(index.records_for("com.example.Entry").len(), 1);
}

#[test]
fn supplemental_candidates_join_the_scan() {
    let plugins = tempfile::tempdir().unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    let supplemental = elsewhere.path().join("extra.jar");
    write_jar(
        &supplemental,
        &[(
            "com/example/Extra.class",
            annotated_class("com.example.Extra", "com.example.Entry"),
        )],
    );

    let mut resolver = CandidateResolver::new(ExclusionSets::default(), Arc::new(AllowAll));
    resolver
        .add_plugin_dir(plugins.path(), &[supplemental])
        .unwrap();
    assert_eq!(resolver.candidates().len(), 1);

    let index = MetadataIndex::new();
    ExtractionDriver::new().run_all(resolver.candidates(), &index);
    assert_eq!(index.records_for("com.example.Entry").len(), 1);
}
