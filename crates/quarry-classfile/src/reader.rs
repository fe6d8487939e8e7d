//! Single-pass structural tokenizer for the classfile format.
//!
//! [`parse_class`] walks one compiled unit's bytes front to back — magic,
//! version, constant pool, type declaration, member tables, attributes —
//! and emits structural events to a [`ClassStructureVisitor`]. Only the
//! declaration and annotation structure is surfaced; code, debug tables,
//! and every other attribute are skipped by length. The unit is never
//! loaded or executed.

use crate::error::{ClassParseError, ClassResult};
use crate::events::ClassStructureVisitor;
use crate::metadata::{AnnotationTarget, AnnotationValue};

const MAGIC: u32 = 0xCAFE_BABE;

const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";

/// Parse one compiled unit, emitting structural events to `visitor`.
///
/// Performs a single forward pass. The visitor sees `visit_class` first,
/// then annotation events for the class, its fields, and its methods in
/// stream order.
///
/// # Errors
///
/// Any truncation, bad magic, malformed constant pool entry, or malformed
/// annotation encoding returns a [`ClassParseError`] describing the first
/// problem found. The visitor may have received a prefix of the events by
/// then; callers discard partial state on error.
pub fn parse_class<V: ClassStructureVisitor>(bytes: &[u8], visitor: &mut V) -> ClassResult<()> {
    let mut reader = Cursor::new(bytes);
    reader.expect_magic()?;
    let _minor_version = reader.read_u2()?;
    let major_version = reader.read_u2()?;
    let pool = ConstantPool::parse(&mut reader)?;

    let _access_flags = reader.read_u2()?;
    let this_class = reader.read_u2()?;
    let super_class = reader.read_u2()?;

    let name = pool.class_name(this_class)?;
    let super_name = if super_class == 0 {
        None
    } else {
        Some(pool.class_name(super_class)?)
    };

    let interfaces_count = reader.read_u2()?;
    let mut interfaces = Vec::with_capacity(interfaces_count as usize);
    for _ in 0..interfaces_count {
        interfaces.push(pool.class_name(reader.read_u2()?)?);
    }

    visitor.visit_class(&name, major_version, super_name.as_deref(), &interfaces);

    let fields_count = reader.read_u2()?;
    for _ in 0..fields_count {
        read_member(&mut reader, &pool, visitor, MemberKind::Field)?;
    }

    let methods_count = reader.read_u2()?;
    for _ in 0..methods_count {
        read_member(&mut reader, &pool, visitor, MemberKind::Method)?;
    }

    let attributes_count = reader.read_u2()?;
    read_attributes(&mut reader, &pool, visitor, attributes_count, &Site::Type)?;

    Ok(())
}

enum MemberKind {
    Field,
    Method,
}

/// Annotation site within the current unit; turned into a fresh
/// [`AnnotationTarget`] per annotation.
enum Site {
    Type,
    Field(String),
    Method(String, String),
}

impl Site {
    fn target(&self) -> AnnotationTarget {
        match self {
            Self::Type => AnnotationTarget::Type,
            Self::Field(name) => AnnotationTarget::Field { name: name.clone() },
            Self::Method(name, descriptor) => AnnotationTarget::Method {
                name: name.clone(),
                descriptor: descriptor.clone(),
            },
        }
    }
}

fn read_member<V: ClassStructureVisitor>(
    reader: &mut Cursor<'_>,
    pool: &ConstantPool,
    visitor: &mut V,
    kind: MemberKind,
) -> ClassResult<()> {
    let _access_flags = reader.read_u2()?;
    let name = pool.utf8(reader.read_u2()?)?.to_string();
    let descriptor = pool.utf8(reader.read_u2()?)?.to_string();
    let attributes_count = reader.read_u2()?;

    let site = match kind {
        MemberKind::Field => Site::Field(name),
        MemberKind::Method => Site::Method(name, descriptor),
    };
    read_attributes(reader, pool, visitor, attributes_count, &site)
}

fn read_attributes<V: ClassStructureVisitor>(
    reader: &mut Cursor<'_>,
    pool: &ConstantPool,
    visitor: &mut V,
    count: u16,
    site: &Site,
) -> ClassResult<()> {
    for _ in 0..count {
        let attribute_name = pool.utf8(reader.read_u2()?)?;
        let length = reader.read_u4()? as usize;
        if attribute_name == RUNTIME_VISIBLE_ANNOTATIONS
            || attribute_name == RUNTIME_INVISIBLE_ANNOTATIONS
        {
            // Decode from a bounded sub-cursor so a bad count inside the
            // attribute cannot run past its declared length.
            let slice = reader.read_slice(length)?;
            let mut sub = Cursor::new(slice);
            let num_annotations = sub.read_u2()?;
            for _ in 0..num_annotations {
                read_annotation(&mut sub, pool, visitor, site)?;
            }
        } else {
            reader.skip(length)?;
        }
    }
    Ok(())
}

fn read_annotation<V: ClassStructureVisitor>(
    reader: &mut Cursor<'_>,
    pool: &ConstantPool,
    visitor: &mut V,
    site: &Site,
) -> ClassResult<()> {
    let marker = annotation_type_name(pool.utf8(reader.read_u2()?)?)?;
    visitor.begin_annotation(site.target(), &marker);
    read_element_pairs(reader, pool, visitor)?;
    visitor.end_annotation();
    Ok(())
}

fn read_element_pairs<V: ClassStructureVisitor>(
    reader: &mut Cursor<'_>,
    pool: &ConstantPool,
    visitor: &mut V,
) -> ClassResult<()> {
    let num_pairs = reader.read_u2()?;
    for _ in 0..num_pairs {
        let name = pool.utf8(reader.read_u2()?)?.to_string();
        read_element_value(reader, pool, visitor, Some(&name))?;
    }
    Ok(())
}

/// Decode one `element_value`, recursing through nested annotations and
/// arrays. `name` is `None` for values inside an open array.
fn read_element_value<V: ClassStructureVisitor>(
    reader: &mut Cursor<'_>,
    pool: &ConstantPool,
    visitor: &mut V,
    name: Option<&str>,
) -> ClassResult<()> {
    let tag = reader.read_u1()?;
    match tag {
        b'B' => {
            let value = pool.integer(reader.read_u2()?)?;
            visitor.visit_value(name, AnnotationValue::Byte(value as i8));
        }
        b'C' => {
            let value = pool.integer(reader.read_u2()?)?;
            let ch = u32::try_from(value)
                .ok()
                .and_then(char::from_u32)
                .ok_or(ClassParseError::InvalidCharValue { value })?;
            visitor.visit_value(name, AnnotationValue::Char(ch));
        }
        b'S' => {
            let value = pool.integer(reader.read_u2()?)?;
            visitor.visit_value(name, AnnotationValue::Short(value as i16));
        }
        b'I' => {
            let value = pool.integer(reader.read_u2()?)?;
            visitor.visit_value(name, AnnotationValue::Int(value));
        }
        b'Z' => {
            let value = pool.integer(reader.read_u2()?)?;
            visitor.visit_value(name, AnnotationValue::Boolean(value != 0));
        }
        b'J' => {
            let value = pool.long(reader.read_u2()?)?;
            visitor.visit_value(name, AnnotationValue::Long(value));
        }
        b'F' => {
            let value = pool.float(reader.read_u2()?)?;
            visitor.visit_value(name, AnnotationValue::Float(value));
        }
        b'D' => {
            let value = pool.double(reader.read_u2()?)?;
            visitor.visit_value(name, AnnotationValue::Double(value));
        }
        b's' => {
            let value = pool.utf8(reader.read_u2()?)?.to_string();
            visitor.visit_value(name, AnnotationValue::Str(value));
        }
        b'c' => {
            let descriptor = pool.utf8(reader.read_u2()?)?;
            visitor.visit_value(name, AnnotationValue::ClassRef(class_ref_name(descriptor)));
        }
        b'e' => {
            let type_name = annotation_type_name(pool.utf8(reader.read_u2()?)?)?;
            let constant = pool.utf8(reader.read_u2()?)?;
            visitor.visit_enum(name, &type_name, constant);
        }
        b'@' => {
            let marker = annotation_type_name(pool.utf8(reader.read_u2()?)?)?;
            visitor.begin_nested(name, &marker);
            read_element_pairs(reader, pool, visitor)?;
            visitor.end_nested();
        }
        b'[' => {
            // Arrays exist only as named properties; the source language has
            // no array-of-array annotation values.
            let Some(property) = name else {
                return Err(ClassParseError::NestedArray);
            };
            visitor.begin_array(property);
            let num_values = reader.read_u2()?;
            for _ in 0..num_values {
                read_element_value(reader, pool, visitor, None)?;
            }
            visitor.end_array();
        }
        other => return Err(ClassParseError::UnexpectedValueTag { tag: other }),
    }
    Ok(())
}

/// `Lcom/example/Marker;` → `com.example.Marker`.
fn annotation_type_name(descriptor: &str) -> ClassResult<String> {
    descriptor
        .strip_prefix('L')
        .and_then(|d| d.strip_suffix(';'))
        .map(|d| d.replace('/', "."))
        .ok_or_else(|| ClassParseError::InvalidDescriptor(descriptor.to_string()))
}

/// Class-reference values may name primitives or arrays; only object
/// descriptors get the dotted treatment.
fn class_ref_name(descriptor: &str) -> String {
    descriptor
        .strip_prefix('L')
        .and_then(|d| d.strip_suffix(';'))
        .map_or_else(|| descriptor.to_string(), |d| d.replace('/', "."))
}

#[derive(Debug, Clone)]
enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    Other,
    Unusable,
}

struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    fn parse(reader: &mut Cursor<'_>) -> ClassResult<Self> {
        let count = reader.read_u2()? as usize;
        let mut entries = Vec::with_capacity(count);
        entries.push(Constant::Unusable); // index 0 unused

        let mut index = 1;
        while index < count {
            let tag = reader.read_u1()?;
            let entry = match tag {
                1 => {
                    let length = reader.read_u2()? as usize;
                    let bytes = reader.read_slice(length)?;
                    Constant::Utf8(String::from_utf8(bytes.to_vec())?)
                }
                3 => {
                    let bytes = reader.read_u4()?;
                    Constant::Integer(bytes as i32)
                }
                4 => {
                    let bytes = reader.read_u4()?;
                    Constant::Float(f32::from_bits(bytes))
                }
                5 => {
                    let high = reader.read_u4()?;
                    let low = reader.read_u4()?;
                    let entry = Constant::Long(((u64::from(high) << 32) | u64::from(low)) as i64);
                    // Wide constants occupy two pool slots.
                    entries.push(entry);
                    entries.push(Constant::Unusable);
                    index += 2;
                    continue;
                }
                6 => {
                    let high = reader.read_u4()?;
                    let low = reader.read_u4()?;
                    let entry =
                        Constant::Double(f64::from_bits((u64::from(high) << 32) | u64::from(low)));
                    entries.push(entry);
                    entries.push(Constant::Unusable);
                    index += 2;
                    continue;
                }
                7 => {
                    let name_index = reader.read_u2()?;
                    Constant::Class { name_index }
                }
                8 => {
                    reader.read_u2()?; // string index
                    Constant::Other
                }
                9 | 10 | 11 | 12 | 17 | 18 => {
                    reader.skip(4)?;
                    Constant::Other
                }
                15 => {
                    reader.skip(3)?;
                    Constant::Other
                }
                16 | 19 | 20 => {
                    reader.skip(2)?;
                    Constant::Other
                }
                other => return Err(ClassParseError::UnsupportedConstant { tag: other }),
            };

            entries.push(entry);
            index += 1;
        }

        Ok(Self { entries })
    }

    fn get(&self, index: u16) -> ClassResult<&Constant> {
        self.entries
            .get(index as usize)
            .ok_or(ClassParseError::InvalidConstantIndex { index })
    }

    fn utf8(&self, index: u16) -> ClassResult<&str> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value.as_str()),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    fn integer(&self, index: u16) -> ClassResult<i32> {
        match self.get(index)? {
            Constant::Integer(value) => Ok(*value),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    fn long(&self, index: u16) -> ClassResult<i64> {
        match self.get(index)? {
            Constant::Long(value) => Ok(*value),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    fn float(&self, index: u16) -> ClassResult<f32> {
        match self.get(index)? {
            Constant::Float(value) => Ok(*value),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    fn double(&self, index: u16) -> ClassResult<f64> {
        match self.get(index)? {
            Constant::Double(value) => Ok(*value),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }

    /// Resolve a `Class` entry to its dotted name.
    fn class_name(&self, index: u16) -> ClassResult<String> {
        match self.get(index)? {
            Constant::Class { name_index } => Ok(self.utf8(*name_index)?.replace('/', ".")),
            _ => Err(ClassParseError::InvalidConstantIndex { index }),
        }
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn expect_magic(&mut self) -> ClassResult<()> {
        if self.read_u4()? != MAGIC {
            return Err(ClassParseError::InvalidMagic);
        }
        Ok(())
    }

    fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn read_u1(&mut self) -> ClassResult<u8> {
        if self.remaining() < 1 {
            return Err(ClassParseError::UnexpectedEof);
        }
        let value = self.data[self.pos];
        self.pos += 1;
        Ok(value)
    }

    fn read_u2(&mut self) -> ClassResult<u16> {
        if self.remaining() < 2 {
            return Err(ClassParseError::UnexpectedEof);
        }
        let value = u16::from_be_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos += 2;
        Ok(value)
    }

    fn read_u4(&mut self) -> ClassResult<u32> {
        if self.remaining() < 4 {
            return Err(ClassParseError::UnexpectedEof);
        }
        let value = u32::from_be_bytes([
            self.data[self.pos],
            self.data[self.pos + 1],
            self.data[self.pos + 2],
            self.data[self.pos + 3],
        ]);
        self.pos += 4;
        Ok(value)
    }

    fn read_slice(&mut self, len: usize) -> ClassResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(ClassParseError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn skip(&mut self, len: usize) -> ClassResult<()> {
        if self.remaining() < len {
            return Err(ClassParseError::UnexpectedEof);
        }
        self.pos += len;
        Ok(())
    }
}
