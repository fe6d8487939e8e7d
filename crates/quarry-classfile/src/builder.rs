//! Metadata accumulator: builds one [`ClassMetadata`] from reader events.

use std::collections::BTreeSet;

use crate::error::{ClassParseError, ClassResult};
use crate::events::ClassStructureVisitor;
use crate::metadata::{
    AnnotationRecord, AnnotationTarget, AnnotationValue, ClassMetadata, OBJECT_ROOT,
};

/// An annotation still being assembled.
///
/// `attach_name` is the parent property this frame closes into; `None` for
/// top-level frames and for frames opened inside an array element.
struct Frame {
    record: AnnotationRecord,
    attach_name: Option<String>,
    open_array: Option<(String, Vec<AnnotationValue>)>,
}

impl Frame {
    fn put(&mut self, name: Option<&str>, value: AnnotationValue) {
        match name {
            Some(property) => {
                self.record.values.insert(property.to_string(), value);
            }
            None => {
                // Unnamed values only occur inside an open array; the reader
                // guarantees one is open here on well-formed input.
                debug_assert!(self.open_array.is_some(), "unnamed value with no open array");
                if let Some((_, values)) = self.open_array.as_mut() {
                    values.push(value);
                }
            }
        }
    }
}

/// Accumulates the events of one classfile pass into a [`ClassMetadata`].
///
/// Implements [`ClassStructureVisitor`] with an explicit frame stack:
/// nested annotations push, closing pops and attaches the child as the
/// parent's value. The finished metadata is returned by value from
/// [`finish`](Self::finish); the builder holds no shared state.
///
/// The reader rejects malformed input before it can break the stack
/// discipline, so mismatched events indicate a bug in the reader itself;
/// the builder asserts that in debug builds and degrades to dropping the
/// event in release builds.
#[derive(Default)]
pub struct ClassMetadataBuilder {
    name: Option<String>,
    major_version: u16,
    super_name: Option<String>,
    interfaces: BTreeSet<String>,
    completed: Vec<AnnotationRecord>,
    stack: Vec<Frame>,
}

impl ClassMetadataBuilder {
    /// New empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and return the accumulated metadata.
    ///
    /// # Errors
    ///
    /// [`ClassParseError::IncompleteClass`] if no type declaration was seen,
    /// and [`ClassParseError::MissingSuperclass`] if a class other than the
    /// object root has an absent superclass reference — that is a decode
    /// inconsistency, not acceptable metadata.
    pub fn finish(self) -> ClassResult<ClassMetadata> {
        debug_assert!(self.stack.is_empty(), "unclosed annotation frames");
        let name = self.name.ok_or(ClassParseError::IncompleteClass)?;
        if self.super_name.is_none() && name != OBJECT_ROOT {
            return Err(ClassParseError::MissingSuperclass { class: name });
        }
        Ok(ClassMetadata {
            name,
            major_version: self.major_version,
            super_name: self.super_name,
            interfaces: self.interfaces,
            annotations: self.completed,
        })
    }

    fn top(&mut self) -> Option<&mut Frame> {
        debug_assert!(!self.stack.is_empty(), "annotation event outside any frame");
        self.stack.last_mut()
    }
}

impl ClassStructureVisitor for ClassMetadataBuilder {
    fn visit_class(
        &mut self,
        name: &str,
        major_version: u16,
        super_name: Option<&str>,
        interfaces: &[String],
    ) {
        self.name = Some(name.to_string());
        self.major_version = major_version;
        self.super_name = super_name.map(str::to_string);
        self.interfaces = interfaces.iter().cloned().collect();
    }

    fn begin_annotation(&mut self, target: AnnotationTarget, marker: &str) {
        debug_assert!(self.stack.is_empty(), "annotation opened inside another");
        self.stack.push(Frame {
            record: AnnotationRecord::new(marker, target),
            attach_name: None,
            open_array: None,
        });
    }

    fn visit_value(&mut self, name: Option<&str>, value: AnnotationValue) {
        if let Some(frame) = self.top() {
            frame.put(name, value);
        }
    }

    fn visit_enum(&mut self, name: Option<&str>, type_name: &str, constant: &str) {
        if let Some(frame) = self.top() {
            frame.put(
                name,
                AnnotationValue::Enum {
                    type_name: type_name.to_string(),
                    constant: constant.to_string(),
                },
            );
        }
    }

    fn begin_nested(&mut self, name: Option<&str>, marker: &str) {
        self.stack.push(Frame {
            record: AnnotationRecord::new(marker, AnnotationTarget::Nested),
            attach_name: name.map(str::to_string),
            open_array: None,
        });
    }

    fn end_nested(&mut self) {
        let Some(child) = self.stack.pop() else {
            debug_assert!(false, "end_nested with no open frame");
            return;
        };
        let value = AnnotationValue::Annotation(Box::new(child.record));
        if let Some(parent) = self.top() {
            parent.put(child.attach_name.as_deref(), value);
        }
    }

    fn begin_array(&mut self, name: &str) {
        if let Some(frame) = self.top() {
            debug_assert!(frame.open_array.is_none(), "array opened inside an array");
            frame.open_array = Some((name.to_string(), Vec::new()));
        }
    }

    fn end_array(&mut self) {
        if let Some(frame) = self.top() {
            if let Some((name, values)) = frame.open_array.take() {
                frame.record.values.insert(name, AnnotationValue::Array(values));
            } else {
                debug_assert!(false, "end_array with no open array");
            }
        }
    }

    fn end_annotation(&mut self) {
        let Some(frame) = self.stack.pop() else {
            debug_assert!(false, "end_annotation with no open frame");
            return;
        };
        self.completed.push(frame.record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_metadata;
    use crate::testutil::{SyntheticAnnotation, SyntheticClass, SyntheticValue};

    #[test]
    fn simple_round_trip() {
        let bytes = SyntheticClass::new("com.example.T")
            .with_super("com.example.S")
            .implements("com.example.C")
            .annotate(
                SyntheticAnnotation::new("com.example.M")
                    .with("key", SyntheticValue::Str("v".into())),
            )
            .encode();

        let meta = parse_metadata(&bytes).unwrap();
        assert_eq!(meta.name, "com.example.T");
        assert_eq!(meta.super_name.as_deref(), Some("com.example.S"));
        assert!(meta.interfaces.contains("com.example.C"));
        assert_eq!(meta.annotations.len(), 1);

        let record = &meta.annotations[0];
        assert_eq!(record.marker, "com.example.M");
        assert_eq!(record.target, AnnotationTarget::Type);
        assert_eq!(
            record.values.get("key"),
            Some(&AnnotationValue::Str("v".into()))
        );
    }

    #[test]
    fn nested_annotation_round_trip() {
        let bytes = SyntheticClass::new("com.example.T")
            .annotate(SyntheticAnnotation::new("com.example.Outer").with(
                "inner",
                SyntheticValue::Annotation(
                    SyntheticAnnotation::new("com.example.Inner")
                        .with("x", SyntheticValue::Int(1)),
                ),
            ))
            .encode();

        let meta = parse_metadata(&bytes).unwrap();
        let outer = &meta.annotations[0];
        assert_eq!(outer.marker, "com.example.Outer");
        let Some(AnnotationValue::Annotation(inner)) = outer.values.get("inner") else {
            panic!("inner property is not a nested annotation");
        };
        assert_eq!(inner.marker, "com.example.Inner");
        assert_eq!(inner.target, AnnotationTarget::Nested);
        assert_eq!(inner.values.get("x"), Some(&AnnotationValue::Int(1)));
    }

    #[test]
    fn array_property_round_trip() {
        let bytes = SyntheticClass::new("com.example.T")
            .annotate(SyntheticAnnotation::new("com.example.Outer").with(
                "vals",
                SyntheticValue::Array(vec![
                    SyntheticValue::Int(1),
                    SyntheticValue::Int(2),
                    SyntheticValue::Int(3),
                ]),
            ))
            .encode();

        let meta = parse_metadata(&bytes).unwrap();
        assert_eq!(
            meta.annotations[0].values.get("vals"),
            Some(&AnnotationValue::Array(vec![
                AnnotationValue::Int(1),
                AnnotationValue::Int(2),
                AnnotationValue::Int(3),
            ]))
        );
    }

    #[test]
    fn array_of_nested_annotations() {
        let bytes = SyntheticClass::new("com.example.T")
            .annotate(SyntheticAnnotation::new("com.example.Outer").with(
                "entries",
                SyntheticValue::Array(vec![
                    SyntheticValue::Annotation(
                        SyntheticAnnotation::new("com.example.Entry")
                            .with("n", SyntheticValue::Int(1)),
                    ),
                    SyntheticValue::Annotation(
                        SyntheticAnnotation::new("com.example.Entry")
                            .with("n", SyntheticValue::Int(2)),
                    ),
                ]),
            ))
            .encode();

        let meta = parse_metadata(&bytes).unwrap();
        let Some(AnnotationValue::Array(entries)) = meta.annotations[0].values.get("entries")
        else {
            panic!("entries property is not an array");
        };
        assert_eq!(entries.len(), 2);
        for (i, entry) in entries.iter().enumerate() {
            let AnnotationValue::Annotation(record) = entry else {
                panic!("array element is not a nested annotation");
            };
            assert_eq!(record.marker, "com.example.Entry");
            assert_eq!(
                record.values.get("n"),
                Some(&AnnotationValue::Int(i32::try_from(i).unwrap() + 1))
            );
        }
    }

    #[test]
    fn enum_property_round_trip() {
        let bytes = SyntheticClass::new("com.example.T")
            .annotate(SyntheticAnnotation::new("com.example.M").with(
                "side",
                SyntheticValue::Enum {
                    type_name: "com.example.Side".into(),
                    constant: "LEFT".into(),
                },
            ))
            .encode();

        let meta = parse_metadata(&bytes).unwrap();
        assert_eq!(
            meta.annotations[0].values.get("side"),
            Some(&AnnotationValue::Enum {
                type_name: "com.example.Side".into(),
                constant: "LEFT".into(),
            })
        );
    }

    #[test]
    fn field_and_method_targets() {
        let bytes = SyntheticClass::new("com.example.T")
            .annotate_field(
                "instance",
                "Lcom/example/T;",
                SyntheticAnnotation::new("com.example.Instance"),
            )
            .annotate_method(
                "init",
                "()V",
                SyntheticAnnotation::new("com.example.Handler"),
            )
            .encode();

        let meta = parse_metadata(&bytes).unwrap();
        assert_eq!(meta.annotations.len(), 2);
        assert_eq!(
            meta.annotations[0].target,
            AnnotationTarget::Field {
                name: "instance".into()
            }
        );
        assert_eq!(
            meta.annotations[1].target,
            AnnotationTarget::Method {
                name: "init".into(),
                descriptor: "()V".into()
            }
        );
        assert_eq!(
            meta.annotations[1].target.member().as_deref(),
            Some("init()V")
        );
    }

    #[test]
    fn missing_superclass_is_a_decode_error() {
        let bytes = SyntheticClass::new("com.example.NotRoot")
            .without_super()
            .encode();
        let err = parse_metadata(&bytes).unwrap_err();
        assert!(
            matches!(err, ClassParseError::MissingSuperclass { ref class } if class == "com.example.NotRoot")
        );
    }

    #[test]
    fn object_root_may_omit_superclass() {
        let bytes = SyntheticClass::new("java.lang.Object").without_super().encode();
        let meta = parse_metadata(&bytes).unwrap();
        assert_eq!(meta.name, "java.lang.Object");
        assert!(meta.super_name.is_none());
    }

    #[test]
    fn finish_without_declaration_fails() {
        let err = ClassMetadataBuilder::new().finish().unwrap_err();
        assert!(matches!(err, ClassParseError::IncompleteClass));
    }

    #[test]
    fn annotations_keep_stream_order() {
        let bytes = SyntheticClass::new("com.example.T")
            .annotate(SyntheticAnnotation::new("com.example.First"))
            .annotate(SyntheticAnnotation::new("com.example.Second"))
            .encode();
        let meta = parse_metadata(&bytes).unwrap();
        let markers: Vec<&str> = meta.annotations.iter().map(|a| a.marker.as_str()).collect();
        assert_eq!(markers, ["com.example.First", "com.example.Second"]);
    }
}
