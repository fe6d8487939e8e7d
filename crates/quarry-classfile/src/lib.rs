//! Static structural metadata extraction for JVM classfiles.
//!
//! Walks one compiled unit's byte layout in a single forward pass and
//! reconstructs its declared structure — type name, superclass, implemented
//! interfaces, and the full annotation tree including nested and
//! array-valued properties — without loading, linking, or executing
//! anything:
//!
//! - [`parse_class`]: the tokenizer; emits structural events to a
//!   [`ClassStructureVisitor`]
//! - [`ClassMetadataBuilder`]: the standard visitor; accumulates events
//!   into one owned [`ClassMetadata`]
//! - [`parse_metadata`]: the two wired together for the common case
//!
//! The annotation model is a tree: properties hold scalars, enum and class
//! references, nested [`AnnotationRecord`]s, and ordered arrays, in source
//! order.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod builder;
pub mod error;
pub mod events;
pub mod metadata;
pub mod reader;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use builder::ClassMetadataBuilder;
pub use error::{ClassParseError, ClassResult};
pub use events::ClassStructureVisitor;
pub use metadata::{
    AnnotationRecord, AnnotationTarget, AnnotationValue, ClassMetadata, OBJECT_ROOT,
};
pub use reader::parse_class;

/// Parse one compiled unit into its structural metadata.
///
/// Runs [`parse_class`] with a fresh [`ClassMetadataBuilder`] and returns
/// the finished [`ClassMetadata`] by value.
///
/// # Errors
///
/// Returns a [`ClassParseError`] for any decode failure, including the
/// post-pass validation that a non-root class must declare a superclass.
pub fn parse_metadata(bytes: &[u8]) -> ClassResult<ClassMetadata> {
    let mut builder = ClassMetadataBuilder::new();
    parse_class(bytes, &mut builder)?;
    builder.finish()
}
