//! Synthetic classfile encoder for test fixtures.
//!
//! Builds minimal but structurally valid compiled units: a type
//! declaration, optional superclass and interfaces, and annotations on the
//! class, individual fields, or individual methods. Enough surface for
//! round-trip and discovery tests; not a general classfile writer.

use std::collections::HashMap;

/// A value placed in a synthetic annotation property.
#[derive(Debug, Clone)]
pub enum SyntheticValue {
    /// `int` constant.
    Int(i32),
    /// `long` constant.
    Long(i64),
    /// `boolean` constant.
    Boolean(bool),
    /// String constant.
    Str(String),
    /// Enum constant reference.
    Enum {
        /// Dotted enum type name.
        type_name: String,
        /// Constant literal name.
        constant: String,
    },
    /// A nested annotation.
    Annotation(SyntheticAnnotation),
    /// An ordered array of values.
    Array(Vec<SyntheticValue>),
}

/// A synthetic annotation under construction.
#[derive(Debug, Clone)]
pub struct SyntheticAnnotation {
    type_name: String,
    values: Vec<(String, SyntheticValue)>,
}

impl SyntheticAnnotation {
    /// New annotation of the given dotted type name.
    #[must_use]
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            values: Vec::new(),
        }
    }

    /// Add a property.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: SyntheticValue) -> Self {
        self.values.push((name.into(), value));
        self
    }
}

/// A synthetic compiled unit under construction.
///
/// Defaults to extending the object root with no interfaces and no
/// annotations.
#[derive(Debug, Clone)]
pub struct SyntheticClass {
    name: String,
    super_name: Option<String>,
    interfaces: Vec<String>,
    class_annotations: Vec<SyntheticAnnotation>,
    field_annotations: Vec<(String, String, SyntheticAnnotation)>,
    method_annotations: Vec<(String, String, SyntheticAnnotation)>,
}

impl SyntheticClass {
    /// New class with the given dotted name, extending the object root.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            super_name: Some("java.lang.Object".into()),
            interfaces: Vec::new(),
            class_annotations: Vec::new(),
            field_annotations: Vec::new(),
            method_annotations: Vec::new(),
        }
    }

    /// Set the superclass.
    #[must_use]
    pub fn with_super(mut self, name: impl Into<String>) -> Self {
        self.super_name = Some(name.into());
        self
    }

    /// Drop the superclass reference entirely (index 0 in the encoding).
    #[must_use]
    pub fn without_super(mut self) -> Self {
        self.super_name = None;
        self
    }

    /// Add an implemented interface.
    #[must_use]
    pub fn implements(mut self, name: impl Into<String>) -> Self {
        self.interfaces.push(name.into());
        self
    }

    /// Add a class-level annotation.
    #[must_use]
    pub fn annotate(mut self, annotation: SyntheticAnnotation) -> Self {
        self.class_annotations.push(annotation);
        self
    }

    /// Add a field carrying one annotation.
    #[must_use]
    pub fn annotate_field(
        mut self,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        annotation: SyntheticAnnotation,
    ) -> Self {
        self.field_annotations
            .push((name.into(), descriptor.into(), annotation));
        self
    }

    /// Add a method carrying one annotation.
    #[must_use]
    pub fn annotate_method(
        mut self,
        name: impl Into<String>,
        descriptor: impl Into<String>,
        annotation: SyntheticAnnotation,
    ) -> Self {
        self.method_annotations
            .push((name.into(), descriptor.into(), annotation));
        self
    }

    /// Encode to classfile bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut pool = PoolBuilder::new();
        let this_index = pool.class(&self.name);
        let super_index = self.super_name.as_deref().map_or(0, |s| pool.class(s));
        let interface_indices: Vec<u16> =
            self.interfaces.iter().map(|i| pool.class(i)).collect();

        let mut fields = Vec::new();
        for (name, descriptor, annotation) in &self.field_annotations {
            write_member(&mut fields, &mut pool, name, descriptor, annotation);
        }
        let mut methods = Vec::new();
        for (name, descriptor, annotation) in &self.method_annotations {
            write_member(&mut methods, &mut pool, name, descriptor, annotation);
        }

        let mut class_attributes = Vec::new();
        if !self.class_annotations.is_empty() {
            write_annotation_attribute(&mut class_attributes, &mut pool, &self.class_annotations);
        }

        let mut out = Vec::new();
        out.extend_from_slice(&0xCAFE_BABE_u32.to_be_bytes());
        push_u2(&mut out, 0); // minor version
        push_u2(&mut out, 52); // major version
        pool.render(&mut out);
        push_u2(&mut out, 0x0021); // ACC_PUBLIC | ACC_SUPER
        push_u2(&mut out, this_index);
        push_u2(&mut out, super_index);
        push_u2(&mut out, self.interfaces.len() as u16);
        for index in interface_indices {
            push_u2(&mut out, index);
        }
        push_u2(&mut out, self.field_annotations.len() as u16);
        out.extend_from_slice(&fields);
        push_u2(&mut out, self.method_annotations.len() as u16);
        out.extend_from_slice(&methods);
        push_u2(&mut out, u16::from(!self.class_annotations.is_empty()));
        out.extend_from_slice(&class_attributes);
        out
    }
}

/// Constant pool under construction. Entries render after the body has
/// registered everything it references, since registration assigns indices.
struct PoolBuilder {
    bytes: Vec<u8>,
    next_index: u16,
    utf8_cache: HashMap<String, u16>,
    class_cache: HashMap<String, u16>,
}

impl PoolBuilder {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            next_index: 1,
            utf8_cache: HashMap::new(),
            class_cache: HashMap::new(),
        }
    }

    fn utf8(&mut self, value: &str) -> u16 {
        if let Some(&index) = self.utf8_cache.get(value) {
            return index;
        }
        let index = self.next_index;
        self.bytes.push(1);
        push_u2(&mut self.bytes, value.len() as u16);
        self.bytes.extend_from_slice(value.as_bytes());
        self.next_index += 1;
        self.utf8_cache.insert(value.to_string(), index);
        index
    }

    fn class(&mut self, dotted: &str) -> u16 {
        if let Some(&index) = self.class_cache.get(dotted) {
            return index;
        }
        let name_index = self.utf8(&dotted.replace('.', "/"));
        let index = self.next_index;
        self.bytes.push(7);
        push_u2(&mut self.bytes, name_index);
        self.next_index += 1;
        self.class_cache.insert(dotted.to_string(), index);
        index
    }

    fn integer(&mut self, value: i32) -> u16 {
        let index = self.next_index;
        self.bytes.push(3);
        self.bytes.extend_from_slice(&value.to_be_bytes());
        self.next_index += 1;
        index
    }

    fn long(&mut self, value: i64) -> u16 {
        let index = self.next_index;
        self.bytes.push(5);
        self.bytes.extend_from_slice(&value.to_be_bytes());
        // Wide constants take two pool slots.
        self.next_index += 2;
        index
    }

    fn render(&self, out: &mut Vec<u8>) {
        push_u2(out, self.next_index); // constant_pool_count
        out.extend_from_slice(&self.bytes);
    }
}

fn push_u2(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn write_member(
    out: &mut Vec<u8>,
    pool: &mut PoolBuilder,
    name: &str,
    descriptor: &str,
    annotation: &SyntheticAnnotation,
) {
    push_u2(out, 0x0001); // ACC_PUBLIC
    let name_index = pool.utf8(name);
    push_u2(out, name_index);
    let descriptor_index = pool.utf8(descriptor);
    push_u2(out, descriptor_index);
    push_u2(out, 1); // one attribute
    write_annotation_attribute(out, pool, std::slice::from_ref(annotation));
}

fn write_annotation_attribute(
    out: &mut Vec<u8>,
    pool: &mut PoolBuilder,
    annotations: &[SyntheticAnnotation],
) {
    let name_index = pool.utf8("RuntimeVisibleAnnotations");
    let mut payload = Vec::new();
    push_u2(&mut payload, annotations.len() as u16);
    for annotation in annotations {
        write_annotation(&mut payload, pool, annotation);
    }
    push_u2(out, name_index);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(&payload);
}

fn write_annotation(out: &mut Vec<u8>, pool: &mut PoolBuilder, annotation: &SyntheticAnnotation) {
    let descriptor = format!("L{};", annotation.type_name.replace('.', "/"));
    let type_index = pool.utf8(&descriptor);
    push_u2(out, type_index);
    push_u2(out, annotation.values.len() as u16);
    for (name, value) in &annotation.values {
        let name_index = pool.utf8(name);
        push_u2(out, name_index);
        write_element_value(out, pool, value);
    }
}

fn write_element_value(out: &mut Vec<u8>, pool: &mut PoolBuilder, value: &SyntheticValue) {
    match value {
        SyntheticValue::Int(v) => {
            out.push(b'I');
            let index = pool.integer(*v);
            push_u2(out, index);
        }
        SyntheticValue::Long(v) => {
            out.push(b'J');
            let index = pool.long(*v);
            push_u2(out, index);
        }
        SyntheticValue::Boolean(v) => {
            out.push(b'Z');
            let index = pool.integer(i32::from(*v));
            push_u2(out, index);
        }
        SyntheticValue::Str(v) => {
            out.push(b's');
            let index = pool.utf8(v);
            push_u2(out, index);
        }
        SyntheticValue::Enum {
            type_name,
            constant,
        } => {
            out.push(b'e');
            let descriptor = format!("L{};", type_name.replace('.', "/"));
            let type_index = pool.utf8(&descriptor);
            push_u2(out, type_index);
            let constant_index = pool.utf8(constant);
            push_u2(out, constant_index);
        }
        SyntheticValue::Annotation(nested) => {
            out.push(b'@');
            write_annotation(out, pool, nested);
        }
        SyntheticValue::Array(values) => {
            out.push(b'[');
            push_u2(out, values.len() as u16);
            for element in values {
                write_element_value(out, pool, element);
            }
        }
    }
}
