//! Classfile decode error types.

/// Errors from decoding a single compiled unit.
///
/// Every variant is a per-unit decode failure: callers scanning many units
/// are expected to record the error and continue with the next unit.
#[derive(Debug, thiserror::Error)]
pub enum ClassParseError {
    /// The byte stream ended before the structure it promised.
    #[error("unexpected end of class file")]
    UnexpectedEof,

    /// The stream does not start with the classfile magic header.
    #[error("invalid class file magic header")]
    InvalidMagic,

    /// The constant pool contains a tag this reader does not know.
    #[error("unsupported constant pool tag {tag}")]
    UnsupportedConstant {
        /// The unrecognized tag byte.
        tag: u8,
    },

    /// A constant pool index points outside the pool or at the wrong kind
    /// of entry.
    #[error("invalid constant pool index {index}")]
    InvalidConstantIndex {
        /// The offending pool index.
        index: u16,
    },

    /// A constant pool string is not valid UTF-8.
    #[error("invalid UTF-8 string in constant pool: {0}")]
    Utf8Decode(#[from] std::string::FromUtf8Error),

    /// A type descriptor does not have the expected shape.
    #[error("malformed descriptor: {0}")]
    InvalidDescriptor(String),

    /// An annotation element value carries an unknown tag byte.
    #[error("unexpected annotation value tag {tag:#04x}")]
    UnexpectedValueTag {
        /// The unrecognized tag byte.
        tag: u8,
    },

    /// An array element value opened directly inside another array.
    ///
    /// The annotation model permits arrays only as named properties, so a
    /// stream presenting one anywhere else is malformed.
    #[error("annotation array opened outside a named property")]
    NestedArray,

    /// A character constant is outside the valid scalar range.
    #[error("invalid character constant {value}")]
    InvalidCharValue {
        /// The raw constant pool integer.
        value: i32,
    },

    /// A non-root class declared no superclass.
    #[error("class {class} declares no superclass but is not the object root")]
    MissingSuperclass {
        /// The class missing its superclass reference.
        class: String,
    },

    /// The stream ended before a type declaration was seen.
    #[error("class structure ended before a type declaration was seen")]
    IncompleteClass,
}

/// Result type for classfile decoding.
pub type ClassResult<T> = Result<T, ClassParseError>;
