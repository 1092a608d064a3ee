//! Dynamic value slot shared by field specs and resolved fields.

use crate::field::Field;

/// A value carried by a field, before or after resolution.
///
/// Schema declarations supply `Int`, `Bytes`, `Text`, `Labels`, or `Octets`
/// values (usually through the `From` impls below); the decoder additionally
/// produces `Groups` for repeated sub-schemas. `Unset` marks a special-kind
/// placeholder that must be assigned before encoding.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    /// Placeholder for a special-kind field that has not been assigned yet.
    #[default]
    Unset,
    /// An unsigned integer, capacity-checked against the field width.
    Int(u64),
    /// Raw bytes, spliced into the wire image verbatim.
    Bytes(Vec<u8>),
    /// Decoded text produced by a formatter, or UTF-8 input for a special
    /// encoding.
    Text(String),
    /// Elements of a PREFIX_LENGTH tuple; one length byte is emitted per
    /// label.
    Labels(Vec<String>),
    /// An IPv4 address given as four octets.
    Octets([u8; 4]),
    /// Per-iteration field lists of a decoded repeated group.
    Groups(Vec<Vec<Field>>),
}

impl Value {
    /// True for the undefined placeholder.
    pub fn is_unset(&self) -> bool {
        matches!(self, Value::Unset)
    }

    /// Integer view of the value, if it is one.
    pub fn as_int(&self) -> Option<u64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Raw-byte view of the value, if it is one.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Text view of the value, if it is one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Decoded repeated-group iterations, if this is a group value.
    pub fn as_groups(&self) -> Option<&[Vec<Field>]> {
        match self {
            Value::Groups(g) => Some(g),
            _ => None,
        }
    }
}

macro_rules! value_from_uint {
    ($($t:ty),*) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Int(n as u64)
            }
        })*
    };
}

value_from_uint!(u8, u16, u32, u64, usize);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Value {
    fn from(b: &[u8; N]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<[u8; 4]> for Value {
    fn from(octets: [u8; 4]) -> Self {
        Value::Octets(octets)
    }
}

impl From<Vec<String>> for Value {
    fn from(labels: Vec<String>) -> Self {
        Value::Labels(labels)
    }
}

impl From<Vec<&str>> for Value {
    fn from(labels: Vec<&str>) -> Self {
        Value::Labels(labels.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Value {
    fn from(labels: &[&str]) -> Self {
        Value::Labels(labels.iter().map(|s| s.to_string()).collect())
    }
}
