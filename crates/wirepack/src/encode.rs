//! Schema-driven packet encoder.

use std::collections::HashMap;

use crate::error::{EncodeError, FieldError};
use crate::field::{Field, FieldKind};
use crate::schema::{FieldSpec, Schema};
use crate::value::Value;

/// Compiles a schema into an ordered field list and produces its byte-exact
/// wire image.
///
/// Fields may be re-assigned by name between compilation and
/// [`packetize`](Serialize::packetize); every assignment re-validates
/// capacity against the declared width.
///
/// # Example
///
/// ```
/// use wirepack::{FieldSpec, Schema, Serialize, SpecialKind};
///
/// let schema = Schema::new()
///     .field("VER", FieldSpec::valued("1B", 5u8)?)
///     .field("DADDR", FieldSpec::special(SpecialKind::NullTerminate, "abc.d"));
/// let packet = Serialize::new(&schema)?;
/// assert_eq!(packet.packetize()?, b"\x05abc.d\x00");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Serialize {
    fields: Vec<Field>,
    index: HashMap<String, usize>,
}

impl Serialize {
    /// Compiles the schema: resolves every entry into a [`Field`] in
    /// declaration order and validates the byte-multiple invariant for bit
    /// runs, so `packetize` never has to guess a bit-splitting policy.
    ///
    /// Repeated groups are rejected here: their iteration count only exists
    /// while decoding. Decode-only adornments (`bind`, fixed-width
    /// formatters) are ignored.
    pub fn new(schema: &Schema) -> Result<Self, EncodeError> {
        if let Some(name) = schema.first_duplicate() {
            return Err(FieldError::InvalidFieldShape {
                name: name.to_string(),
                reason: "duplicate field name".to_string(),
            }
            .into());
        }

        let mut fields = Vec::with_capacity(schema.len());
        let mut index = HashMap::with_capacity(schema.len());
        for (name, spec) in schema.iter() {
            if matches!(spec, FieldSpec::Group(_)) {
                return Err(FieldError::InvalidFieldShape {
                    name: name.to_string(),
                    reason: "repeated groups need a decoded count and cannot be encoded"
                        .to_string(),
                }
                .into());
            }
            index.insert(name.to_string(), fields.len());
            fields.push(Field::from_spec(name, spec)?);
        }

        check_alignment(&fields)?;
        Ok(Self { fields, index })
    }

    /// Looks up a field by its exact declared name.
    pub fn get_field(&self, name: &str) -> Result<&Field, EncodeError> {
        self.index
            .get(name)
            .map(|&i| &self.fields[i])
            .ok_or_else(|| EncodeError::FieldNotFound(name.to_string()))
    }

    /// Re-assigns a named field's value, re-validating it against the
    /// declared width or kind. The first assignment on an undefined special
    /// kind fixes its width.
    pub fn set_field(&mut self, name: &str, value: impl Into<Value>) -> Result<(), EncodeError> {
        let i = *self
            .index
            .get(name)
            .ok_or_else(|| EncodeError::FieldNotFound(name.to_string()))?;
        self.fields[i].assign(value.into())?;
        Ok(())
    }

    pub fn field_exists(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Compiled fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Produces the wire image: bit fields accumulate MSB-first into a
    /// pending byte that flushes when full; byte and special images are
    /// spliced in verbatim. Any still-undefined field aborts with
    /// [`EncodeError::UninitializedField`] before a single byte is
    /// produced.
    pub fn packetize(&self) -> Result<Vec<u8>, EncodeError> {
        if let Some(field) = self.fields.iter().find(|f| f.is_unset()) {
            return Err(EncodeError::UninitializedField(field.name().to_string()));
        }

        let mut out = Vec::new();
        let mut acc: u32 = 0;
        let mut acc_bits: u32 = 0;
        for field in &self.fields {
            match (field.kind(), field.value()) {
                (FieldKind::Bits(n), Value::Int(v)) => {
                    acc = (acc << n) | *v as u32;
                    acc_bits += n;
                    // new() guarantees runs never overflow a byte.
                    if acc_bits == 8 {
                        out.push(acc as u8);
                        acc = 0;
                        acc_bits = 0;
                    }
                }
                (FieldKind::Bytes(_) | FieldKind::Special(_), Value::Bytes(image)) => {
                    out.extend_from_slice(image);
                }
                (kind, value) => {
                    return Err(FieldError::InvalidFieldShape {
                        name: field.name().to_string(),
                        reason: format!("cannot encode {value:?} as {kind:?}"),
                    }
                    .into())
                }
            }
        }
        Ok(out)
    }
}

/// Consecutive bit runs must sum to exactly 8 at each flush point, both
/// before any byte-typed field and before the end of the schema.
fn check_alignment(fields: &[Field]) -> Result<(), EncodeError> {
    let mut pending: u32 = 0;
    let mut last_bit_field = "";
    for field in fields {
        match field.kind() {
            FieldKind::Bits(n) => {
                pending += n;
                last_bit_field = field.name();
                if pending > 8 {
                    return Err(EncodeError::Alignment {
                        name: field.name().to_string(),
                        pending,
                    });
                }
                if pending == 8 {
                    pending = 0;
                }
            }
            _ => {
                if pending != 0 {
                    return Err(EncodeError::Alignment {
                        name: field.name().to_string(),
                        pending,
                    });
                }
            }
        }
    }
    if pending != 0 {
        return Err(EncodeError::Alignment {
            name: last_bit_field.to_string(),
            pending,
        });
    }
    Ok(())
}
