//! Schema declaration types: widths, special kinds, field specs, and the
//! ordered schema map.

use std::str::FromStr;

use indexmap::IndexMap;

use crate::error::FieldError;
use crate::format::Formatter;
use crate::value::Value;

/// A fixed field width, in bits or whole bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidthSpec {
    Bits(u32),
    Bytes(u32),
}

impl WidthSpec {
    /// Total width in bits.
    pub fn bit_len(&self) -> u32 {
        match self {
            WidthSpec::Bits(n) => *n,
            WidthSpec::Bytes(n) => n * 8,
        }
    }
}

impl FromStr for WidthSpec {
    type Err = FieldError;

    /// Parses the `"Nb"` (bits) / `"NB"` (bytes) width grammar. N must be a
    /// positive decimal integer with no leading zero.
    fn from_str(s: &str) -> Result<Self, FieldError> {
        let shape_err = |reason: &str| FieldError::InvalidFieldShape {
            name: s.to_string(),
            reason: reason.to_string(),
        };
        // Split on char boundaries: the unit may be fed arbitrary input.
        let (unit_at, unit) = s
            .char_indices()
            .last()
            .ok_or_else(|| shape_err("width strings look like \"4b\" or \"2B\""))?;
        let digits = &s[..unit_at];
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(shape_err("width strings look like \"4b\" or \"2B\""));
        }
        if digits.starts_with('0') {
            return Err(shape_err("width must be at least one bit"));
        }
        let n: u32 = digits
            .parse()
            .map_err(|_| shape_err("width is too large"))?;
        match unit {
            'b' => Ok(WidthSpec::Bits(n)),
            'B' => Ok(WidthSpec::Bytes(n)),
            _ => Err(shape_err("width strings end in `b` (bits) or `B` (bytes)")),
        }
    }
}

/// The variable-length / typed special encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialKind {
    /// Raw bytes followed by one 0x00 byte.
    NullTerminate,
    /// One big-endian length byte per element, then the element bytes.
    PrefixLength,
    /// The PREFIX_LENGTH image plus a trailing 0x00 byte.
    PrefixLenNullTerm,
    /// Four raw octets parsed from a dotted-decimal string or an octet quad.
    Ipv4,
    /// UTF-8 bytes of a host name, width fixed by the value's length.
    Host,
}

impl SpecialKind {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            SpecialKind::NullTerminate => "null_terminate",
            SpecialKind::PrefixLength => "prefix_length",
            SpecialKind::PrefixLenNullTerm => "prefix_len_null_term",
            SpecialKind::Ipv4 => "ipv4",
            SpecialKind::Host => "host",
        }
    }
}

/// One declared schema entry, before resolution into a
/// [`Field`](crate::Field).
///
/// This is the closed set of shapes the compiler accepts; anything that does
/// not fit is rejected with [`FieldError::InvalidFieldShape`] when the spec
/// is built or compiled.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    /// A 1-bit field with value 0.
    Empty,
    /// A fixed-width field with value 0. `bind` names a decode-time variable
    /// that receives the decoded integer; `format` renders the decoded bytes.
    FixedWidth {
        width: WidthSpec,
        format: Option<Formatter>,
        bind: Option<String>,
    },
    /// A fixed-width field with a concrete value (encode direction).
    FixedWidthValued { width: WidthSpec, value: Value },
    /// A special-kind field. An `Unset` (or integer 0) value leaves an
    /// undefined placeholder that must be assigned before encoding.
    Special {
        kind: SpecialKind,
        value: Value,
        format: Option<Formatter>,
    },
    /// A repeated sub-schema, decoded as many times as the bound variable
    /// sharing this entry's name dictates.
    Group(Schema),
}

impl FieldSpec {
    /// A 1-bit field with value 0.
    pub fn empty() -> Self {
        FieldSpec::Empty
    }

    /// An `n`-bit field with value 0.
    pub fn bits(n: u32) -> Self {
        FieldSpec::FixedWidth {
            width: WidthSpec::Bits(n),
            format: None,
            bind: None,
        }
    }

    /// An `n`-byte field with value 0.
    pub fn bytes(n: u32) -> Self {
        FieldSpec::FixedWidth {
            width: WidthSpec::Bytes(n),
            format: None,
            bind: None,
        }
    }

    /// A zero-valued field with a `"Nb"`/`"NB"` width string.
    pub fn width(spec: &str) -> Result<Self, FieldError> {
        Ok(FieldSpec::FixedWidth {
            width: spec.parse()?,
            format: None,
            bind: None,
        })
    }

    /// A valued field with a `"Nb"`/`"NB"` width string.
    pub fn valued(spec: &str, value: impl Into<Value>) -> Result<Self, FieldError> {
        Ok(FieldSpec::FixedWidthValued {
            width: spec.parse()?,
            value: value.into(),
        })
    }

    /// An `n`-bit field carrying a concrete value.
    pub fn bits_valued(n: u32, value: impl Into<Value>) -> Self {
        FieldSpec::FixedWidthValued {
            width: WidthSpec::Bits(n),
            value: value.into(),
        }
    }

    /// An `n`-byte field carrying a concrete value.
    pub fn bytes_valued(n: u32, value: impl Into<Value>) -> Self {
        FieldSpec::FixedWidthValued {
            width: WidthSpec::Bytes(n),
            value: value.into(),
        }
    }

    /// A byte field of exactly the literal's length, carrying it verbatim.
    pub fn raw(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        FieldSpec::FixedWidthValued {
            width: WidthSpec::Bytes(bytes.len() as u32),
            value: Value::Bytes(bytes),
        }
    }

    /// A special-kind field with a concrete value.
    pub fn special(kind: SpecialKind, value: impl Into<Value>) -> Self {
        FieldSpec::Special {
            kind,
            value: value.into(),
            format: None,
        }
    }

    /// A special-kind placeholder, to be assigned before encoding.
    pub fn placeholder(kind: SpecialKind) -> Self {
        FieldSpec::Special {
            kind,
            value: Value::Unset,
            format: None,
        }
    }

    /// A repeated sub-schema sized by the bound variable sharing the
    /// entry's name.
    pub fn group(schema: Schema) -> Self {
        FieldSpec::Group(schema)
    }

    /// Binds the decoded integer to `var` for a later repeated group.
    ///
    /// Only unformatted fixed-width specs can bind a variable.
    pub fn bound(self, var: impl Into<String>) -> Result<Self, FieldError> {
        match self {
            FieldSpec::FixedWidth {
                width,
                format: None,
                bind: None,
            } => Ok(FieldSpec::FixedWidth {
                width,
                format: None,
                bind: Some(var.into()),
            }),
            other => Err(FieldError::InvalidFieldShape {
                name: var.into(),
                reason: format!(
                    "only plain fixed-width fields can bind a count variable, got {other:?}"
                ),
            }),
        }
    }

    /// Renders the decoded payload through `fmt` instead of producing an
    /// integer.
    pub fn formatted(self, fmt: Formatter) -> Result<Self, FieldError> {
        match self {
            FieldSpec::FixedWidth {
                width,
                format: None,
                bind: None,
            } => Ok(FieldSpec::FixedWidth {
                width,
                format: Some(fmt),
                bind: None,
            }),
            FieldSpec::Special {
                kind,
                value,
                format: None,
            } => Ok(FieldSpec::Special {
                kind,
                value,
                format: Some(fmt),
            }),
            other => Err(FieldError::InvalidFieldShape {
                name: format!("{other:?}"),
                reason: "formatters apply to fixed-width or special fields, once".to_string(),
            }),
        }
    }
}

/// An ordered mapping from field name to [`FieldSpec`].
///
/// Declaration order is wire order: the encoder emits fields and the decoder
/// consumes them exactly as inserted.
///
/// # Example
///
/// ```
/// use wirepack::{FieldSpec, Schema};
///
/// let schema = Schema::new()
///     .field("VER", FieldSpec::bytes(1))
///     .field("NMETHODS", FieldSpec::bytes(1));
/// assert_eq!(schema.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    entries: IndexMap<String, FieldSpec>,
    duplicates: Vec<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a named entry, preserving insertion order.
    ///
    /// Re-using a name is recorded and rejected when the schema is compiled.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        let name = name.into();
        if self.entries.insert(name.clone(), spec).is_some() {
            self.duplicates.push(name);
        }
        self
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First duplicated name in this schema or any nested group, if any.
    pub(crate) fn first_duplicate(&self) -> Option<&str> {
        if let Some(name) = self.duplicates.first() {
            return Some(name);
        }
        self.entries.values().find_map(|spec| match spec {
            FieldSpec::Group(sub) => sub.first_duplicate(),
            _ => None,
        })
    }
}
