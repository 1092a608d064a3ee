//! Encode-direction vectors: byte-exact wire images for schema shapes the
//! codec must reproduce.

use wirepack::{EncodeError, FieldError, FieldSpec, Schema, Serialize, SpecialKind};

fn packetize(schema: &Schema) -> Vec<u8> {
    Serialize::new(schema).unwrap().packetize().unwrap()
}

#[test]
fn dns_query_wire_image_matrix() {
    // Header flags split across two bytes of bit fields; QNAME is the
    // per-label length encoding with a trailing null.
    let schema = Schema::new()
        .field("ID", FieldSpec::valued("2B", 0xcc44u16).unwrap())
        .field("QR", FieldSpec::bits(1))
        .field("OPCODE", FieldSpec::bits(4))
        .field("AA", FieldSpec::bits(1))
        .field("TC", FieldSpec::bits(1))
        .field("RD", FieldSpec::bits_valued(1, 1u8))
        .field("RA", FieldSpec::bits(1))
        .field("Z", FieldSpec::bits(3))
        .field("RCODE", FieldSpec::bits(4))
        .field("QDCOUNT", FieldSpec::valued("2B", 1u16).unwrap())
        .field("ANCOUNT", FieldSpec::width("2B").unwrap())
        .field("NSCOUNT", FieldSpec::width("2B").unwrap())
        .field("ARCOUNT", FieldSpec::width("2B").unwrap())
        .field(
            "QNAME",
            FieldSpec::special(SpecialKind::PrefixLenNullTerm, vec!["jackgisel", "com"]),
        )
        .field("QTYPE", FieldSpec::valued("2B", 1u16).unwrap())
        .field("QCLASS", FieldSpec::valued("2B", 1u16).unwrap());

    assert_eq!(
        packetize(&schema),
        b"\xccD\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00\x09jackgisel\x03com\x00\x00\x01\x00\x01"
    );
}

#[test]
fn special_encoding_vector_matrix() {
    let cases: Vec<(FieldSpec, &[u8])> = vec![
        (
            FieldSpec::special(SpecialKind::PrefixLength, vec!["test", "com", "ex"]),
            b"\x04test\x03com\x02ex",
        ),
        (
            FieldSpec::special(SpecialKind::NullTerminate, "abc.d"),
            b"abc.d\x00",
        ),
        (
            FieldSpec::special(SpecialKind::Ipv4, "10.3.102.2"),
            b"\x0a\x03\x66\x02",
        ),
        (
            FieldSpec::special(SpecialKind::Ipv4, [255u8, 255, 255, 255]),
            b"\xff\xff\xff\xff",
        ),
        (
            FieldSpec::special(SpecialKind::Host, "www.google.com"),
            b"www.google.com",
        ),
        (
            FieldSpec::special(SpecialKind::PrefixLength, "cs158b"),
            b"\x06cs158b",
        ),
        (
            FieldSpec::special(SpecialKind::PrefixLenNullTerm, vec!["google", "com"]),
            b"\x06google\x03com\x00",
        ),
    ];
    for (spec, expected) in cases {
        let schema = Schema::new().field("payload", spec.clone());
        assert_eq!(packetize(&schema), expected, "spec {spec:?}");
    }
}

#[test]
fn socks5_style_request_with_late_assignment() {
    // VER/CMD/RSV/ATYP are plain bytes; the destination address starts as a
    // placeholder and is filled in before packetize.
    let schema = Schema::new()
        .field("VER", FieldSpec::valued("1B", 5u8).unwrap())
        .field("CMD", FieldSpec::valued("1B", 1u8).unwrap())
        .field("RSV", FieldSpec::bytes(1))
        .field("ATYP", FieldSpec::valued("1B", 3u8).unwrap())
        .field("DADDR", FieldSpec::placeholder(SpecialKind::PrefixLength))
        .field("DPORT", FieldSpec::valued("2B", 80u16).unwrap());

    let mut packet = Serialize::new(&schema).unwrap();
    let err = packet.packetize().unwrap_err();
    assert!(matches!(err, EncodeError::UninitializedField(ref n) if n == "DADDR"));

    packet.set_field("DADDR", "www.google.com").unwrap();
    assert_eq!(
        packet.packetize().unwrap(),
        b"\x05\x01\x00\x03\x0ewww.google.com\x00P"
    );
}

#[test]
fn capacity_violations_never_truncate() {
    // One over the 4-bit ceiling.
    let over = Schema::new().field("OPCODE", FieldSpec::bits_valued(4, 16u8));
    assert!(matches!(
        Serialize::new(&over).unwrap_err(),
        EncodeError::Field(FieldError::CapacityExceeded { .. })
    ));

    // At the ceiling.
    let at = Schema::new()
        .field("OPCODE", FieldSpec::bits_valued(4, 15u8))
        .field("PAD", FieldSpec::bits(4));
    assert_eq!(packetize(&at), vec![0xf0]);

    // Byte field, one byte too long.
    let long = Schema::new().field("TAG", FieldSpec::valued("2B", &b"abc"[..]).unwrap());
    assert!(matches!(
        Serialize::new(&long).unwrap_err(),
        EncodeError::Field(FieldError::CapacityExceeded { .. })
    ));

    // A prefix-length element longer than its one-byte length can describe.
    let wide = Schema::new().field(
        "ID",
        FieldSpec::special(SpecialKind::PrefixLength, "x".repeat(256)),
    );
    assert!(matches!(
        Serialize::new(&wide).unwrap_err(),
        EncodeError::Field(FieldError::CapacityExceeded { .. })
    ));

    // 255 bytes is the ceiling, not past it.
    let at_limit = Schema::new().field(
        "ID",
        FieldSpec::special(SpecialKind::PrefixLength, "x".repeat(255)),
    );
    let image = packetize(&at_limit);
    assert_eq!(image.len(), 256);
    assert_eq!(image[0], 255);
}

#[test]
fn alignment_matrix() {
    // Runs summing to 8 at each flush point pass.
    let ok = Schema::new()
        .field("a", FieldSpec::bits(4))
        .field("b", FieldSpec::bits(4))
        .field("c", FieldSpec::bits(2))
        .field("d", FieldSpec::bits(6))
        .field("tail", FieldSpec::bytes(1));
    assert_eq!(packetize(&ok).len(), 3);

    // Overflowing a flush point fails at compile time.
    let overflow = Schema::new()
        .field("a", FieldSpec::bits(4))
        .field("b", FieldSpec::bits(5));
    assert!(matches!(
        Serialize::new(&overflow).unwrap_err(),
        EncodeError::Alignment { pending: 9, .. }
    ));

    // Partial bits before a byte field fail too.
    let partial = Schema::new()
        .field("a", FieldSpec::bits(2))
        .field("tail", FieldSpec::bytes(1));
    assert!(matches!(
        Serialize::new(&partial).unwrap_err(),
        EncodeError::Alignment { pending: 2, .. }
    ));
}

#[test]
fn empty_marker_is_a_single_zero_bit() {
    let schema = Schema::new()
        .field("flag", FieldSpec::empty())
        .field("rest", FieldSpec::bits_valued(7, 0x55u8));
    assert_eq!(packetize(&schema), vec![0x55]);
}

#[test]
fn undefined_guard_covers_every_special_kind() {
    for kind in [
        SpecialKind::NullTerminate,
        SpecialKind::PrefixLength,
        SpecialKind::PrefixLenNullTerm,
        SpecialKind::Ipv4,
        SpecialKind::Host,
    ] {
        let schema = Schema::new().field("payload", FieldSpec::placeholder(kind));
        let packet = Serialize::new(&schema).unwrap();
        assert!(
            matches!(
                packet.packetize().unwrap_err(),
                EncodeError::UninitializedField(_)
            ),
            "{kind:?}"
        );
    }
}
