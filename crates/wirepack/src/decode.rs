//! Schema-driven packet decoder.

use std::collections::HashMap;

use crate::error::{DecodeError, FieldError};
use crate::field::{Field, FieldKind};
use crate::schema::{FieldSpec, Schema, SpecialKind, WidthSpec};
use crate::value::Value;

/// Decodes a byte buffer against a schema, recovering every declared
/// field's value.
///
/// The walk is driven by a single monotonic cursor; a field that would read
/// past the buffer end aborts the whole decode, so a `Deserialize` value
/// always holds a complete field list.
///
/// # Example
///
/// ```
/// use wirepack::{Deserialize, FieldSpec, Formatter, Schema, Value};
///
/// let schema = Schema::new()
///     .field("id", FieldSpec::bytes(1))
///     .field("dest", FieldSpec::bytes(4).formatted(Formatter::Ipv4)?);
/// let packet = Deserialize::new(b"\x32\xff\xff\xff\xff", &schema)?;
/// assert_eq!(packet.get_value("id")?, &Value::Int(0x32));
/// assert_eq!(packet.get_value("dest")?, &Value::Text("255.255.255.255".into()));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Deserialize {
    fields: Vec<Field>,
}

/// Decode state threaded explicitly through the schema walk: the input
/// buffer, a bit-granular cursor, and the bound-variable table.
struct DecodeCtx<'a> {
    buf: &'a [u8],
    bit_pos: usize,
    vars: HashMap<String, u64>,
}

impl<'a> DecodeCtx<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            bit_pos: 0,
            vars: HashMap::new(),
        }
    }

    fn remaining_bits(&self) -> usize {
        self.buf.len() * 8 - self.bit_pos
    }

    /// Reads `n` bits MSB-first, mirroring the encoder's packing order.
    fn read_bits(&mut self, name: &str, n: u32) -> Result<u64, DecodeError> {
        if n as usize > self.remaining_bits() {
            return Err(DecodeError::OutOfBounds {
                name: name.to_string(),
                needed: n as usize,
                available: self.remaining_bits(),
            });
        }
        let mut v: u64 = 0;
        for _ in 0..n {
            let byte = self.buf[self.bit_pos / 8];
            let bit = (byte >> (7 - (self.bit_pos % 8))) & 1;
            v = (v << 1) | bit as u64;
            self.bit_pos += 1;
        }
        Ok(v)
    }

    /// Byte-granular reads require the preceding bit fields to have filled
    /// whole bytes; a mid-byte cursor is a schema-shape problem.
    fn require_aligned(&self, name: &str) -> Result<usize, DecodeError> {
        if self.bit_pos % 8 != 0 {
            return Err(FieldError::InvalidFieldShape {
                name: name.to_string(),
                reason: format!(
                    "bit fields before `{name}` leave the cursor mid-byte ({} pending bits)",
                    self.bit_pos % 8
                ),
            }
            .into());
        }
        Ok(self.bit_pos / 8)
    }

    fn read_bytes(&mut self, name: &str, n: usize) -> Result<&'a [u8], DecodeError> {
        let pos = self.require_aligned(name)?;
        if pos + n > self.buf.len() {
            return Err(DecodeError::OutOfBounds {
                name: name.to_string(),
                needed: n * 8,
                available: self.remaining_bits(),
            });
        }
        self.bit_pos += n * 8;
        Ok(&self.buf[pos..pos + n])
    }

    /// Accumulates bytes up to (not including) the first 0x00 and advances
    /// the cursor past the terminator.
    fn read_until_nul(&mut self, name: &str) -> Result<&'a [u8], DecodeError> {
        let pos = self.require_aligned(name)?;
        match self.buf[pos..].iter().position(|&b| b == 0) {
            Some(i) => {
                self.bit_pos += (i + 1) * 8;
                Ok(&self.buf[pos..pos + i])
            }
            None => Err(DecodeError::MissingTerminator(name.to_string())),
        }
    }
}

impl Deserialize {
    /// Decodes `buf` against the schema in one pass. Errors leave no
    /// partial result behind.
    pub fn new(buf: &[u8], schema: &Schema) -> Result<Self, DecodeError> {
        if let Some(name) = schema.first_duplicate() {
            return Err(FieldError::InvalidFieldShape {
                name: name.to_string(),
                reason: "duplicate field name".to_string(),
            }
            .into());
        }
        let mut ctx = DecodeCtx::new(buf);
        let fields = decode_entries(schema, &mut ctx)?;
        Ok(Self { fields })
    }

    /// Case-insensitive lookup, first match over the flat field list.
    /// Repeated-group members are addressed through the group's
    /// [`Value::Groups`] lists instead.
    pub fn get_field(&self, name: &str) -> Result<&Field, DecodeError> {
        self.fields
            .iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| DecodeError::FieldNotFound(name.to_string()))
    }

    /// The decoded value of a named field.
    pub fn get_value(&self, name: &str) -> Result<&Value, DecodeError> {
        Ok(self.get_field(name)?.value())
    }

    /// Decoded fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

fn decode_entries(schema: &Schema, ctx: &mut DecodeCtx<'_>) -> Result<Vec<Field>, DecodeError> {
    let mut fields = Vec::with_capacity(schema.len());
    for (name, spec) in schema.iter() {
        fields.push(decode_entry(name, spec, ctx)?);
    }
    Ok(fields)
}

fn decode_entry(
    name: &str,
    spec: &FieldSpec,
    ctx: &mut DecodeCtx<'_>,
) -> Result<Field, DecodeError> {
    match spec {
        FieldSpec::Empty => {
            let v = ctx.read_bits(name, 1)?;
            Ok(Field::decoded(name, FieldKind::Bits(1), Value::Int(v)))
        }
        FieldSpec::FixedWidth {
            width,
            format,
            bind,
        } => decode_fixed(name, *width, format.as_ref(), bind.as_deref(), ctx),
        // A valued spec decodes like a plain fixed-width read; the declared
        // value only matters when encoding.
        FieldSpec::FixedWidthValued { width, .. } => decode_fixed(name, *width, None, None, ctx),
        FieldSpec::Special { kind, format, .. } => decode_special(name, *kind, format.as_ref(), ctx),
        FieldSpec::Group(sub) => decode_group(name, sub, ctx),
    }
}

fn decode_fixed(
    name: &str,
    width: WidthSpec,
    format: Option<&crate::format::Formatter>,
    bind: Option<&str>,
    ctx: &mut DecodeCtx<'_>,
) -> Result<Field, DecodeError> {
    // A zero-width field would consume nothing, letting a repeated group
    // spin without ever advancing the cursor.
    if width.bit_len() == 0 {
        return Err(FieldError::InvalidFieldShape {
            name: name.to_string(),
            reason: "width must be at least one bit".to_string(),
        }
        .into());
    }
    match width {
        WidthSpec::Bits(n) => {
            let v = ctx.read_bits(name, n)?;
            if let Some(var) = bind {
                ctx.vars.insert(var.to_string(), v);
            }
            Ok(Field::decoded(name, FieldKind::Bits(n), Value::Int(v)))
        }
        WidthSpec::Bytes(n) => {
            let n = n as usize;
            let raw = ctx.read_bytes(name, n)?;
            if let Some(fmt) = format {
                return Ok(Field::decoded(
                    name,
                    FieldKind::Bytes(n),
                    Value::Text(fmt.render(raw)),
                ));
            }
            // u64 carries the integer; wider unformatted fields stay raw.
            if n > 8 {
                return Ok(Field::decoded(
                    name,
                    FieldKind::Bytes(n),
                    Value::Bytes(raw.to_vec()),
                ));
            }
            let v = raw.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
            if let Some(var) = bind {
                ctx.vars.insert(var.to_string(), v);
            }
            Ok(Field::decoded(name, FieldKind::Bytes(n), Value::Int(v)))
        }
    }
}

fn decode_special(
    name: &str,
    kind: SpecialKind,
    format: Option<&crate::format::Formatter>,
    ctx: &mut DecodeCtx<'_>,
) -> Result<Field, DecodeError> {
    let raw: Vec<u8> = match kind {
        SpecialKind::NullTerminate | SpecialKind::PrefixLenNullTerm => {
            ctx.read_until_nul(name)?.to_vec()
        }
        SpecialKind::PrefixLength => {
            let len = ctx.read_bytes(name, 1)?[0] as usize;
            ctx.read_bytes(name, len)?.to_vec()
        }
        SpecialKind::Ipv4 => {
            let raw = ctx.read_bytes(name, 4)?;
            return Ok(Field::decoded(
                name,
                FieldKind::Special(kind),
                Value::Text(crate::format::format_ipv4(raw)),
            ));
        }
        SpecialKind::Host => {
            return Err(FieldError::InvalidFieldShape {
                name: name.to_string(),
                reason: "host payloads decode through a formatter on a sized or terminated field"
                    .to_string(),
            }
            .into())
        }
    };
    let value = match format {
        Some(fmt) => Value::Text(fmt.render(&raw)),
        None => Value::Bytes(raw),
    };
    Ok(Field::decoded(name, FieldKind::Special(kind), value))
}

fn decode_group(name: &str, sub: &Schema, ctx: &mut DecodeCtx<'_>) -> Result<Field, DecodeError> {
    if sub.is_empty() {
        return Err(FieldError::InvalidFieldShape {
            name: name.to_string(),
            reason: "repeated group declares no fields".to_string(),
        }
        .into());
    }
    let count = *ctx
        .vars
        .get(name)
        .ok_or_else(|| DecodeError::UnboundVariable(name.to_string()))?;
    // Cap the pre-allocation; a hostile count still fails on its first read.
    let mut groups = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        groups.push(decode_entries(sub, ctx)?);
    }
    Ok(Field::decoded(name, FieldKind::Group, Value::Groups(groups)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Formatter;

    #[test]
    fn fixed_width_bytes_decode_big_endian() {
        let schema = Schema::new()
            .field("id", FieldSpec::bytes(2))
            .field("ttl", FieldSpec::bytes(4));
        let packet = Deserialize::new(b"\x12\x34\x00\x00\x0e\x10", &schema).unwrap();
        assert_eq!(packet.get_value("id").unwrap(), &Value::Int(0x1234));
        assert_eq!(packet.get_value("ttl").unwrap(), &Value::Int(3600));
    }

    #[test]
    fn bit_fields_unpack_msb_first() {
        // 0xb5 = 1 0110 1 0 1.
        let schema = Schema::new()
            .field("QR", FieldSpec::bits(1))
            .field("OPCODE", FieldSpec::bits(4))
            .field("AA", FieldSpec::bits(1))
            .field("TC", FieldSpec::bits(1))
            .field("RD", FieldSpec::bits(1));
        let packet = Deserialize::new(&[0xb5], &schema).unwrap();
        assert_eq!(packet.get_value("QR").unwrap(), &Value::Int(1));
        assert_eq!(packet.get_value("OPCODE").unwrap(), &Value::Int(0b0110));
        assert_eq!(packet.get_value("AA").unwrap(), &Value::Int(1));
        assert_eq!(packet.get_value("TC").unwrap(), &Value::Int(0));
        assert_eq!(packet.get_value("RD").unwrap(), &Value::Int(1));
    }

    #[test]
    fn mid_byte_cursor_rejects_byte_reads() {
        let schema = Schema::new()
            .field("flag", FieldSpec::bits(1))
            .field("rest", FieldSpec::bytes(1));
        let err = Deserialize::new(&[0xff, 0x00], &schema).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Field(FieldError::InvalidFieldShape { .. })
        ));
    }

    #[test]
    fn bound_variable_sizes_a_repeated_group() {
        let schema = Schema::new()
            .field("VER", FieldSpec::bytes(1))
            .field("NAUTHS", FieldSpec::bytes(1).bound("AUTHS").unwrap())
            .field(
                "AUTHS",
                FieldSpec::group(Schema::new().field("val", FieldSpec::bytes(1))),
            );
        let packet = Deserialize::new(b"\x01\x03\x00\x01\x02", &schema).unwrap();
        assert_eq!(packet.get_value("NAUTHS").unwrap(), &Value::Int(3));

        let groups = packet.get_value("AUTHS").unwrap().as_groups().unwrap();
        assert_eq!(groups.len(), 3);
        for (i, iteration) in groups.iter().enumerate() {
            assert_eq!(iteration[0].name(), "val");
            assert_eq!(iteration[0].value(), &Value::Int(i as u64));
        }
    }

    #[test]
    fn missing_count_is_an_unbound_variable() {
        let schema = Schema::new().field(
            "AUTHS",
            FieldSpec::group(Schema::new().field("val", FieldSpec::bytes(1))),
        );
        let err = Deserialize::new(b"\x00", &schema).unwrap_err();
        assert!(matches!(err, DecodeError::UnboundVariable(ref n) if n == "AUTHS"));
    }

    #[test]
    fn null_terminated_host_recovers_the_name() {
        let schema = Schema::new().field(
            "DADDR",
            FieldSpec::placeholder(SpecialKind::NullTerminate)
                .formatted(Formatter::Host)
                .unwrap(),
        );
        let packet = Deserialize::new(b"abc.d\x00", &schema).unwrap();
        assert_eq!(
            packet.get_value("DADDR").unwrap(),
            &Value::Text("abc.d".to_string())
        );
    }

    #[test]
    fn missing_terminator_is_fatal() {
        let schema = Schema::new()
            .field("DADDR", FieldSpec::placeholder(SpecialKind::NullTerminate));
        let err = Deserialize::new(b"abc.d", &schema).unwrap_err();
        assert!(matches!(err, DecodeError::MissingTerminator(ref n) if n == "DADDR"));
    }

    #[test]
    fn prefix_length_reads_one_sized_element() {
        let schema = Schema::new()
            .field("VER", FieldSpec::bytes(1))
            .field("ID", FieldSpec::placeholder(SpecialKind::PrefixLength))
            .field("PW", FieldSpec::placeholder(SpecialKind::PrefixLength));
        let packet = Deserialize::new(b"\x01\x06cs158b\x08Pa55word", &schema).unwrap();
        assert_eq!(packet.get_value("VER").unwrap(), &Value::Int(1));
        assert_eq!(
            packet.get_value("ID").unwrap(),
            &Value::Bytes(b"cs158b".to_vec())
        );
        assert_eq!(
            packet.get_value("PW").unwrap(),
            &Value::Bytes(b"Pa55word".to_vec())
        );
    }

    #[test]
    fn out_of_bounds_yields_no_partial_result() {
        let schema = Schema::new()
            .field("a", FieldSpec::bytes(2))
            .field("b", FieldSpec::bytes(4));
        let err = Deserialize::new(b"\x00\x01\x02", &schema).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::OutOfBounds { ref name, needed: 32, .. } if name == "b"
        ));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let schema = Schema::new().field("FlAgS", FieldSpec::bytes(1));
        let packet = Deserialize::new(&[7], &schema).unwrap();
        assert_eq!(packet.get_value("flags").unwrap(), &Value::Int(7));
        assert!(matches!(
            packet.get_value("nope"),
            Err(DecodeError::FieldNotFound(_))
        ));
    }

    #[test]
    fn zero_width_fields_are_rejected() {
        for spec in [FieldSpec::bits(0), FieldSpec::bytes(0)] {
            let schema = Schema::new().field("z", spec);
            let err = Deserialize::new(&[0xff], &schema).unwrap_err();
            assert!(matches!(
                err,
                DecodeError::Field(FieldError::InvalidFieldShape { .. })
            ));
        }

        // A group over a zero-width field must not loop in place.
        let schema = Schema::new()
            .field("N", FieldSpec::bytes(1).bound("G").unwrap())
            .field(
                "G",
                FieldSpec::group(Schema::new().field("z", FieldSpec::bits(0))),
            );
        assert!(Deserialize::new(&[0xff], &schema).is_err());
    }

    #[test]
    fn wide_unformatted_fields_stay_raw() {
        let schema = Schema::new().field("blob", FieldSpec::bytes(9));
        let packet = Deserialize::new(&[1, 2, 3, 4, 5, 6, 7, 8, 9], &schema).unwrap();
        assert_eq!(
            packet.get_value("blob").unwrap(),
            &Value::Bytes(vec![1, 2, 3, 4, 5, 6, 7, 8, 9])
        );
    }
}
