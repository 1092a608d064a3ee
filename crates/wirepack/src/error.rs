//! Error types for schema compilation, encoding, and decoding.

use thiserror::Error;

/// Errors raised while resolving or mutating a single field.
///
/// These are shared between both codec directions: the encoder hits them
/// while compiling a schema or reassigning a value, the decoder while
/// validating schema shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// A value's bit/byte length exceeds the field's declared width.
    #[error("field `{name}`: value needs {needed} {unit} but the field declares {declared}")]
    CapacityExceeded {
        name: String,
        declared: usize,
        needed: usize,
        unit: &'static str,
    },

    /// A field spec matches no recognized shape.
    #[error("invalid field spec `{name}`: {reason}")]
    InvalidFieldShape { name: String, reason: String },

    /// An IPv4 value has the wrong arity or an out-of-range component.
    #[error("field `{name}`: invalid IPv4 address `{value}`: {reason}")]
    InvalidAddress {
        name: String,
        value: String,
        reason: &'static str,
    },
}

/// Errors raised by [`Serialize`](crate::Serialize).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error(transparent)]
    Field(#[from] FieldError),

    /// `packetize` was called while a placeholder field was never assigned.
    #[error("field `{0}` was never assigned a value")]
    UninitializedField(String),

    /// A by-name lookup or assignment targeted an undeclared field.
    #[error("no field named `{0}`")]
    FieldNotFound(String),

    /// Bit fields do not sum to a byte boundary before a byte-typed field
    /// or before the end of the schema.
    #[error("field `{name}`: bit fields leave {pending} pending bits at a byte boundary")]
    Alignment { name: String, pending: u32 },
}

/// Errors raised by [`Deserialize`](crate::Deserialize).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Field(#[from] FieldError),

    /// A field's declared consumption would read past the buffer end.
    #[error("field `{name}`: needs {needed} bits but only {available} remain")]
    OutOfBounds {
        name: String,
        needed: usize,
        available: usize,
    },

    /// The buffer ended before a null-terminated field found its 0x00 byte.
    #[error("field `{0}`: buffer ended before the 0x00 terminator")]
    MissingTerminator(String),

    /// A repeated group's count variable was never produced by an earlier
    /// field.
    #[error("repeated group `{0}` has no bound count variable")]
    UnboundVariable(String),

    /// A by-name lookup targeted an undeclared field.
    #[error("no field named `{0}`")]
    FieldNotFound(String),
}
