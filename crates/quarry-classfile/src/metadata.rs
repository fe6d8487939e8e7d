//! Structural metadata extracted from one compiled unit.
//!
//! These types are the read-only output of a parse: a [`ClassMetadata`] per
//! unit, holding the declared type, its ancestry, the implemented interface
//! set, and the full annotation tree. Nothing here retains the unit's bytes
//! or any handle back into the container it came from.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Dotted name of the single class allowed to have no superclass.
pub const OBJECT_ROOT: &str = "java.lang.Object";

/// Where an annotation was declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnnotationTarget {
    /// Declared on the class itself.
    Type,
    /// Declared on a field.
    Field {
        /// Field name.
        name: String,
    },
    /// Declared on a method, keyed by name plus descriptor.
    Method {
        /// Method name.
        name: String,
        /// Method descriptor, e.g. `(I)V`.
        descriptor: String,
    },
    /// Nested inside another annotation's value; carries no member of its own.
    Nested,
}

impl AnnotationTarget {
    /// The declaring member key, if any.
    ///
    /// `None` for type-level and nested annotations; methods are keyed by
    /// name plus descriptor so overloads stay distinct.
    #[must_use]
    pub fn member(&self) -> Option<String> {
        match self {
            Self::Type | Self::Nested => None,
            Self::Field { name } => Some(name.clone()),
            Self::Method { name, descriptor } => Some(format!("{name}{descriptor}")),
        }
    }
}

/// One annotation property value.
///
/// Mirrors the element value forms of the binary encoding: primitive
/// scalars, strings, class and enum references, nested annotations, and
/// ordered arrays of further values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationValue {
    /// `byte` constant.
    Byte(i8),
    /// `char` constant.
    Char(char),
    /// `short` constant.
    Short(i16),
    /// `int` constant.
    Int(i32),
    /// `long` constant.
    Long(i64),
    /// `boolean` constant.
    Boolean(bool),
    /// `float` constant.
    Float(f32),
    /// `double` constant.
    Double(f64),
    /// String constant.
    Str(String),
    /// Class reference, dotted where the descriptor names a class.
    ClassRef(String),
    /// Enum constant reference.
    Enum {
        /// Dotted enum type name.
        type_name: String,
        /// The constant's literal name.
        constant: String,
    },
    /// A nested annotation.
    Annotation(Box<AnnotationRecord>),
    /// An ordered sequence of values.
    Array(Vec<AnnotationValue>),
}

/// One declared annotation and its property values.
///
/// Property order follows the source encoding. Values may nest further
/// [`AnnotationRecord`]s, forming a tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    /// Dotted annotation type name, used as the index marker identifier.
    pub marker: String,
    /// Where the annotation was declared.
    pub target: AnnotationTarget,
    /// Property name to value, in source order.
    pub values: IndexMap<String, AnnotationValue>,
}

impl AnnotationRecord {
    /// New empty record for the given marker and target.
    #[must_use]
    pub fn new(marker: impl Into<String>, target: AnnotationTarget) -> Self {
        Self {
            marker: marker.into(),
            target,
            values: IndexMap::new(),
        }
    }
}

/// Structural metadata of one compiled unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetadata {
    /// Declared class name, dotted.
    pub name: String,
    /// Classfile major version. Advisory; no version gates anything here.
    pub major_version: u16,
    /// Superclass name, dotted. Absent only for [`OBJECT_ROOT`].
    pub super_name: Option<String>,
    /// Implemented interface names, dotted. Order is not significant.
    pub interfaces: BTreeSet<String>,
    /// Declared annotations in stream order, across class, field, and
    /// method targets.
    pub annotations: Vec<AnnotationRecord>,
}

impl ClassMetadata {
    /// Whether this unit extends one of the given legacy base types.
    ///
    /// The set is caller policy: known legacy entry-type names merged with
    /// any remembered types from earlier scans. Advisory metadata only —
    /// a `true` here never rejects the unit.
    #[must_use]
    pub fn is_legacy_entry(&self, legacy_bases: &BTreeSet<String>) -> bool {
        self.super_name
            .as_deref()
            .is_some_and(|s| legacy_bases.contains(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_keys_methods_by_name_and_descriptor() {
        let target = AnnotationTarget::Method {
            name: "configure".into(),
            descriptor: "(Ljava/lang/String;)V".into(),
        };
        assert_eq!(
            target.member().as_deref(),
            Some("configure(Ljava/lang/String;)V")
        );
        assert_eq!(AnnotationTarget::Type.member(), None);
        assert_eq!(AnnotationTarget::Nested.member(), None);
    }

    #[test]
    fn legacy_entry_matches_superclass() {
        let meta = ClassMetadata {
            name: "com.example.OldPlugin".into(),
            major_version: 52,
            super_name: Some("com.example.LegacyBase".into()),
            interfaces: BTreeSet::new(),
            annotations: Vec::new(),
        };
        let bases: BTreeSet<String> = ["com.example.LegacyBase".to_string()].into();
        assert!(meta.is_legacy_entry(&bases));
        assert!(!meta.is_legacy_entry(&BTreeSet::new()));
    }

    #[test]
    fn annotation_values_keep_insertion_order() {
        let mut record = AnnotationRecord::new("com.example.M", AnnotationTarget::Type);
        record.values.insert("z".into(), AnnotationValue::Int(1));
        record.values.insert("a".into(), AnnotationValue::Int(2));
        let keys: Vec<&str> = record.values.keys().map(String::as_str).collect();
        assert_eq!(keys, ["z", "a"]);
    }
}
