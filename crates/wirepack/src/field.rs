//! Resolved field model: classification, capacity validation, and
//! diagnostic rendering.

use std::fmt;

use crate::error::FieldError;
use crate::format::parse_ipv4;
use crate::schema::{FieldSpec, SpecialKind, WidthSpec};
use crate::value::Value;

/// How a resolved field occupies the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A sub-byte bit run carrying an integer.
    Bits(u32),
    /// A whole-byte field carrying a byte image (or a decoded integer).
    Bytes(usize),
    /// A variable-length special encoding; the width is fixed by the first
    /// concrete value.
    Special(SpecialKind),
    /// A decoded repeated group.
    Group,
}

/// One resolved field: a name, a wire kind, and a value that always fits
/// the declared width.
///
/// Fields are produced by compiling a [`FieldSpec`] (encode direction) or
/// by decoding a buffer. Every mutation goes through [`Field::assign`],
/// which re-validates capacity; a value is never silently truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    kind: FieldKind,
    value: Value,
}

impl Field {
    /// Resolves one declared schema entry into a field.
    pub(crate) fn from_spec(name: &str, spec: &FieldSpec) -> Result<Field, FieldError> {
        match spec {
            FieldSpec::Empty => Ok(Field {
                name: name.to_string(),
                kind: FieldKind::Bits(1),
                value: Value::Int(0),
            }),
            FieldSpec::FixedWidth { width, .. } => {
                Field::from_width(name, *width, &Value::Int(0))
            }
            FieldSpec::FixedWidthValued { width, value } => Field::from_width(name, *width, value),
            FieldSpec::Special { kind, value, .. } => Field::from_special(name, *kind, value),
            FieldSpec::Group(_) => Err(FieldError::InvalidFieldShape {
                name: name.to_string(),
                reason: "repeated groups only exist while decoding".to_string(),
            }),
        }
    }

    fn from_width(name: &str, width: WidthSpec, value: &Value) -> Result<Field, FieldError> {
        let bits = width.bit_len();
        if bits == 0 {
            return Err(FieldError::InvalidFieldShape {
                name: name.to_string(),
                reason: "width must be at least one bit".to_string(),
            });
        }
        // Bit counts that fill whole bytes are normalized to byte fields so
        // the encoder can splice them without touching the bit accumulator.
        if bits % 8 == 0 {
            let field = Field {
                name: name.to_string(),
                kind: FieldKind::Bytes((bits / 8) as usize),
                value: Value::Unset,
            };
            return field.with_assigned(value);
        }
        let field = Field {
            name: name.to_string(),
            kind: FieldKind::Bits(bits),
            value: Value::Unset,
        };
        field.with_assigned(value)
    }

    fn from_special(name: &str, kind: SpecialKind, value: &Value) -> Result<Field, FieldError> {
        let field = Field {
            name: name.to_string(),
            kind: FieldKind::Special(kind),
            value: Value::Unset,
        };
        // Value 0 marks a placeholder to be assigned before packetize.
        if matches!(value, Value::Unset | Value::Int(0)) {
            return Ok(field);
        }
        field.with_assigned(value)
    }

    /// Decoder constructor: a field carrying an already-decoded value.
    pub(crate) fn decoded(name: &str, kind: FieldKind, value: Value) -> Field {
        Field {
            name: name.to_string(),
            kind,
            value,
        }
    }

    fn with_assigned(mut self, value: &Value) -> Result<Field, FieldError> {
        self.assign(value.clone())?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// True while the field is an undefined placeholder.
    pub fn is_unset(&self) -> bool {
        self.value.is_unset()
    }

    /// Width in bits, once known. Placeholders and groups have no width.
    pub fn bit_len(&self) -> Option<usize> {
        match (&self.kind, &self.value) {
            (FieldKind::Bits(n), _) => Some(*n as usize),
            (FieldKind::Bytes(w), _) => Some(w * 8),
            (FieldKind::Special(_), Value::Bytes(b)) => Some(b.len() * 8),
            (FieldKind::Special(_), Value::Text(s)) => Some(s.len() * 8),
            _ => None,
        }
    }

    /// Re-assigns the field's value, validating capacity against the
    /// existing kind. The first assignment on an undefined special kind
    /// fixes its width.
    pub fn assign(&mut self, value: Value) -> Result<(), FieldError> {
        match self.kind {
            FieldKind::Bits(bits) => self.assign_bits(bits, value),
            FieldKind::Bytes(width) => self.assign_bytes(width, value),
            FieldKind::Special(kind) => self.assign_special(kind, value),
            FieldKind::Group => Err(FieldError::InvalidFieldShape {
                name: self.name.clone(),
                reason: "decoded groups are immutable".to_string(),
            }),
        }
    }

    fn assign_bits(&mut self, bits: u32, value: Value) -> Result<(), FieldError> {
        let n = match value {
            Value::Int(n) => n,
            Value::Unset => 0,
            other => {
                return Err(FieldError::InvalidFieldShape {
                    name: self.name.clone(),
                    reason: format!("bit fields take integer values, got {other:?}"),
                })
            }
        };
        let needed = bit_length(n);
        if needed > bits as usize {
            return Err(FieldError::CapacityExceeded {
                name: self.name.clone(),
                declared: bits as usize,
                needed,
                unit: "bits",
            });
        }
        self.value = Value::Int(n);
        Ok(())
    }

    fn assign_bytes(&mut self, width: usize, value: Value) -> Result<(), FieldError> {
        let image = match value {
            Value::Int(n) => {
                let needed = bit_length(n);
                if needed > width * 8 {
                    return Err(FieldError::CapacityExceeded {
                        name: self.name.clone(),
                        declared: width * 8,
                        needed,
                        unit: "bits",
                    });
                }
                int_to_be(n, width)
            }
            Value::Unset => vec![0u8; width],
            Value::Bytes(mut b) => {
                if b.len() > width {
                    return Err(FieldError::CapacityExceeded {
                        name: self.name.clone(),
                        declared: width,
                        needed: b.len(),
                        unit: "bytes",
                    });
                }
                // Short images are right-padded with zero bytes.
                b.resize(width, 0);
                b
            }
            other => {
                return Err(FieldError::InvalidFieldShape {
                    name: self.name.clone(),
                    reason: format!("byte fields take integer or byte values, got {other:?}"),
                })
            }
        };
        self.value = Value::Bytes(image);
        Ok(())
    }

    fn assign_special(&mut self, kind: SpecialKind, value: Value) -> Result<(), FieldError> {
        if matches!(value, Value::Unset | Value::Int(0)) {
            return Err(FieldError::InvalidFieldShape {
                name: self.name.clone(),
                reason: format!("{} fields take a concrete value", kind.label()),
            });
        }
        let image = encode_special(&self.name, kind, &value)?;
        if let Value::Bytes(existing) = &self.value {
            // The width was fixed by the first assignment; later values
            // must produce an image of the same length.
            if image.len() > existing.len() {
                return Err(FieldError::CapacityExceeded {
                    name: self.name.clone(),
                    declared: existing.len(),
                    needed: image.len(),
                    unit: "bytes",
                });
            }
            if image.len() < existing.len() {
                return Err(FieldError::InvalidFieldShape {
                    name: self.name.clone(),
                    reason: format!(
                        "value encodes to {} bytes but the field width is fixed at {}",
                        image.len(),
                        existing.len()
                    ),
                });
            }
        }
        self.value = Value::Bytes(image);
        Ok(())
    }

    /// Binary-digit rendering for diagnostics: exact width for bit fields,
    /// `_`-separated 8-bit groups for byte images. Not a wire format.
    pub fn to_binary(&self) -> String {
        match (&self.kind, &self.value) {
            (_, Value::Unset) => "undefined".to_string(),
            (FieldKind::Bits(n), Value::Int(v)) => format!("{v:0width$b}", width = *n as usize),
            (FieldKind::Bytes(w), Value::Int(v)) => group_bits(&int_to_be(*v, *w)),
            (_, Value::Bytes(b)) => group_bits(b),
            (_, Value::Text(s)) => group_bits(s.as_bytes()),
            _ => String::new(),
        }
    }

    /// Hex rendering for diagnostics: integer hex for bit fields, byte hex
    /// for byte images.
    pub fn to_hex(&self) -> String {
        match (&self.kind, &self.value) {
            (_, Value::Unset) => "undefined".to_string(),
            (FieldKind::Bits(_), Value::Int(v)) => format!("{v:#x}"),
            (FieldKind::Bytes(_), Value::Int(v)) => format!("{v:#x}"),
            (_, Value::Bytes(b)) => hex_bytes(b),
            (_, Value::Text(s)) => hex_bytes(s.as_bytes()),
            _ => String::new(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = match self.bit_len() {
            Some(bits) => format!("{bits} bits"),
            None => "-".to_string(),
        };
        write!(
            f,
            "Field(name: {}, width: {}, value: {:?})",
            self.name, width, self.value
        )
    }
}

/// Number of bits needed to represent `n`; 0 needs 0 bits.
pub(crate) fn bit_length(n: u64) -> usize {
    (u64::BITS - n.leading_zeros()) as usize
}

/// Big-endian image of `n`, exactly `width` bytes wide. The caller has
/// already checked that `n` fits.
pub(crate) fn int_to_be(n: u64, width: usize) -> Vec<u8> {
    let all = n.to_be_bytes();
    if width <= all.len() {
        all[all.len() - width..].to_vec()
    } else {
        let mut out = vec![0u8; width - all.len()];
        out.extend_from_slice(&all);
        out
    }
}

fn group_bits(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:08b}"))
        .collect::<Vec<_>>()
        .join("_")
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn encode_special(name: &str, kind: SpecialKind, value: &Value) -> Result<Vec<u8>, FieldError> {
    match kind {
        SpecialKind::Host => match value {
            Value::Text(s) => Ok(s.as_bytes().to_vec()),
            Value::Bytes(b) => Ok(b.clone()),
            other => Err(shape(name, kind, other)),
        },
        SpecialKind::Ipv4 => match value {
            Value::Text(s) => Ok(parse_ipv4(name, s)?.to_vec()),
            Value::Octets(o) => Ok(o.to_vec()),
            Value::Bytes(b) if b.len() == 4 => Ok(b.clone()),
            Value::Bytes(b) => Err(FieldError::InvalidAddress {
                name: name.to_string(),
                value: format!("{b:02x?}"),
                reason: "IPv4 addresses are exactly four bytes",
            }),
            other => Err(FieldError::InvalidAddress {
                name: name.to_string(),
                value: format!("{other:?}"),
                reason: "expected a dotted-decimal string or four octets",
            }),
        },
        SpecialKind::PrefixLength => encode_prefixed(name, value),
        SpecialKind::NullTerminate => match value {
            Value::Text(s) => Ok(terminated(s.as_bytes())),
            Value::Bytes(b) => Ok(terminated(b)),
            other => Err(shape(name, kind, other)),
        },
        SpecialKind::PrefixLenNullTerm => {
            let mut image = encode_prefixed(name, value)?;
            image.push(0);
            Ok(image)
        }
    }
}

/// One big-endian length byte per element, then the element's bytes.
fn encode_prefixed(name: &str, value: &Value) -> Result<Vec<u8>, FieldError> {
    let elements: Vec<&[u8]> = match value {
        Value::Text(s) => vec![s.as_bytes()],
        Value::Bytes(b) => vec![b.as_slice()],
        Value::Labels(labels) => labels.iter().map(|l| l.as_bytes()).collect(),
        other => {
            return Err(FieldError::InvalidFieldShape {
                name: name.to_string(),
                reason: format!("prefix-length fields take text, bytes, or labels, got {other:?}"),
            })
        }
    };
    let mut image = Vec::new();
    for element in elements {
        if element.len() > u8::MAX as usize {
            return Err(FieldError::CapacityExceeded {
                name: name.to_string(),
                declared: u8::MAX as usize,
                needed: element.len(),
                unit: "bytes in one length-prefixed element",
            });
        }
        image.push(element.len() as u8);
        image.extend_from_slice(element);
    }
    Ok(image)
}

fn terminated(bytes: &[u8]) -> Vec<u8> {
    let mut out = bytes.to_vec();
    out.push(0);
    out
}

fn shape(name: &str, kind: SpecialKind, value: &Value) -> FieldError {
    FieldError::InvalidFieldShape {
        name: name.to_string(),
        reason: format!("{} fields take text or byte values, got {value:?}", kind.label()),
    }
}
