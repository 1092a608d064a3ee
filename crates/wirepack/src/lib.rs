//! Schema-driven binary packet codec.
//!
//! Declare a packet's fields once — bit widths, byte widths, or special
//! variable-length encodings — and `wirepack` produces the byte-exact wire
//! image, or recovers named, typed values from a raw buffer, without
//! hand-rolled shifts or cursor arithmetic. Byte order is network
//! (big-endian); sub-byte fields pack most-significant-bit-first in
//! declaration order.
//!
//! # Example
//!
//! A DNS-style query header plus a label-encoded name:
//!
//! ```
//! use wirepack::{FieldSpec, Schema, Serialize, SpecialKind};
//!
//! let schema = Schema::new()
//!     .field("ID", FieldSpec::valued("2B", 17u16)?)
//!     .field("QR", FieldSpec::bits(1))
//!     .field("OPCODE", FieldSpec::bits(4))
//!     .field("AA", FieldSpec::bits(1))
//!     .field("TC", FieldSpec::bits(1))
//!     .field("RD", FieldSpec::bits_valued(1, 1u8))
//!     .field("RA", FieldSpec::bits(1))
//!     .field("Z", FieldSpec::bits(3))
//!     .field("RCODE", FieldSpec::bits(4))
//!     .field("QDCOUNT", FieldSpec::valued("2B", 1u16)?)
//!     .field("ANCOUNT", FieldSpec::width("2B")?)
//!     .field("NSCOUNT", FieldSpec::width("2B")?)
//!     .field("ARCOUNT", FieldSpec::width("2B")?)
//!     .field(
//!         "QNAME",
//!         FieldSpec::special(SpecialKind::PrefixLenNullTerm, vec!["google", "com"]),
//!     )
//!     .field("QTYPE", FieldSpec::valued("2B", 1u16)?)
//!     .field("QCLASS", FieldSpec::valued("2B", 1u16)?);
//!
//! let packet = Serialize::new(&schema)?;
//! assert_eq!(
//!     packet.packetize()?,
//!     b"\x00\x11\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00\x06google\x03com\x00\x00\x01\x00\x01"
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod decode;
mod encode;
mod error;
mod field;
mod format;
mod schema;
mod value;

pub use decode::Deserialize;
pub use encode::Serialize;
pub use error::{DecodeError, EncodeError, FieldError};
pub use field::{Field, FieldKind};
pub use format::Formatter;
pub use schema::{FieldSpec, Schema, SpecialKind, WidthSpec};
pub use value::Value;
