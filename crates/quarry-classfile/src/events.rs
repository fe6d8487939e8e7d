//! Event surface between the reader and a metadata consumer.

use crate::metadata::{AnnotationTarget, AnnotationValue};

/// Receiver for the structural events of one classfile pass.
///
/// [`parse_class`](crate::reader::parse_class) walks the byte stream once
/// and calls these methods in stream order. Annotation events follow a
/// strict stack discipline: every `begin_*` is closed by its matching
/// `end_*` before any enclosing scope closes, and arrays never contain
/// arrays directly. A malformed stream fails inside the reader before it
/// can violate that discipline, so implementors may treat out-of-order
/// events as a programming error.
///
/// `name` is the annotation property being assigned, or `None` when the
/// value is an element of an open array.
pub trait ClassStructureVisitor {
    /// The declared type: name, classfile major version, superclass (absent
    /// for the object root), and implemented interfaces. Called exactly
    /// once, before any annotation event.
    fn visit_class(
        &mut self,
        name: &str,
        major_version: u16,
        super_name: Option<&str>,
        interfaces: &[String],
    );

    /// A top-level annotation opens on the given target.
    fn begin_annotation(&mut self, target: AnnotationTarget, marker: &str);

    /// A scalar, string, or class-reference value.
    fn visit_value(&mut self, name: Option<&str>, value: AnnotationValue);

    /// An enum constant reference value.
    fn visit_enum(&mut self, name: Option<&str>, type_name: &str, constant: &str);

    /// A nested annotation opens as a value of the current one.
    fn begin_nested(&mut self, name: Option<&str>, marker: &str);

    /// The innermost nested annotation closes.
    fn end_nested(&mut self);

    /// An array property opens on the current annotation.
    fn begin_array(&mut self, name: &str);

    /// The open array property closes.
    fn end_array(&mut self);

    /// The current top-level annotation closes.
    fn end_annotation(&mut self);
}
