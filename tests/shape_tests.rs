use chrono::{TimeZone, Utc};
use xdr_codec::shape::{self, Field, Shape};
use xdr_codec::{Decoder, Encoder, ErrorKind, MAX_EMPTY_ELEMENTS, MAX_OPAQUE_LEN, Value};

type Case<'a> = (&'a [u8], Result<Value, ErrorKind>, usize);

fn check(shape: &Shape, cases: &[Case<'_>]) {
    for (i, (input, want, want_n)) in cases.iter().enumerate() {
        let mut target = shape.zero_value();
        let mut dec = Decoder::new(*input);
        let got = shape::decode_value(&mut dec, shape, &mut target);
        assert_eq!(dec.position(), *want_n, "{shape:?} #{i} cursor");
        match (got, want) {
            (Ok(n), Ok(value)) => {
                assert_eq!(n, *want_n, "{shape:?} #{i} bytes read");
                assert_eq!(&target, value, "{shape:?} #{i}");
                // Canonical input re-encodes to itself.
                let mut out = Vec::new();
                assert_eq!(shape::encode(&mut out, shape, &target).unwrap(), n);
                assert_eq!(&out[..], *input, "{shape:?} #{i} re-encode");
            }
            (Err(err), Err(kind)) => {
                assert_eq!(err.kind(), *kind, "{shape:?} #{i} kind");
                assert_eq!(err.offset(), *want_n, "{shape:?} #{i} offset");
            }
            (got, want) => panic!("{shape:?} #{i}: got {got:?} want {want:?}"),
        }
    }
}

#[test]
fn narrow_integers() {
    check(
        &Shape::Int8,
        &[
            (&[0x00, 0x00, 0x00, 0x00], Ok(Value::Int8(0)), 4),
            (&[0x00, 0x00, 0x00, 0x40], Ok(Value::Int8(64)), 4),
            (&[0x00, 0x00, 0x00, 0x7F], Ok(Value::Int8(127)), 4),
            (&[0xFF, 0xFF, 0xFF, 0xFF], Ok(Value::Int8(-1)), 4),
            (&[0xFF, 0xFF, 0xFF, 0x80], Ok(Value::Int8(-128)), 4),
            (&[0x00, 0x00, 0x00, 0x80], Err(ErrorKind::Overflow), 4),
            (&[0xFF, 0xFF, 0xFF, 0x7F], Err(ErrorKind::Overflow), 4),
        ],
    );
    check(
        &Shape::Uint8,
        &[
            (&[0x00, 0x00, 0x00, 0xFF], Ok(Value::Uint8(255)), 4),
            (&[0x00, 0x00, 0x01, 0x00], Err(ErrorKind::Overflow), 4),
            (&[0xFF, 0xFF, 0xFF, 0xFF], Err(ErrorKind::Overflow), 4),
        ],
    );
    check(
        &Shape::Int16,
        &[
            (&[0x00, 0x00, 0x04, 0x00], Ok(Value::Int16(1024)), 4),
            (&[0x00, 0x00, 0x7F, 0xFF], Ok(Value::Int16(32767)), 4),
            (&[0xFF, 0xFF, 0x80, 0x00], Ok(Value::Int16(-32768)), 4),
            (&[0x00, 0x00, 0x80, 0x00], Err(ErrorKind::Overflow), 4),
            (&[0xFF, 0xFF, 0x7F, 0xFF], Err(ErrorKind::Overflow), 4),
        ],
    );
    check(
        &Shape::Uint16,
        &[
            (&[0x00, 0x00, 0xFF, 0xFF], Ok(Value::Uint16(65535)), 4),
            (&[0x00, 0x01, 0x00, 0x00], Err(ErrorKind::Overflow), 4),
            (&[0xFF, 0xFF, 0xFF, 0xFF], Err(ErrorKind::Overflow), 4),
        ],
    );
    check(
        &Shape::Int32,
        &[
            (&[0x80, 0x00, 0x00, 0x00], Ok(Value::Int32(i32::MIN)), 4),
            (&[0x7F, 0xFF], Err(ErrorKind::Io), 2),
        ],
    );
    check(
        &Shape::Uint64,
        &[
            (&[0xFF; 8], Ok(Value::Uint64(u64::MAX)), 8),
            (&[0xFF, 0x00, 0xFF, 0x00], Err(ErrorKind::Io), 4),
        ],
    );
}

#[test]
fn bool_and_floats() {
    check(
        &Shape::Bool,
        &[
            (&[0x00, 0x00, 0x00, 0x01], Ok(Value::Bool(true)), 4),
            (&[0x01, 0x00, 0x00, 0x00], Err(ErrorKind::BadEnumValue), 4),
        ],
    );
    check(
        &Shape::Float32,
        &[
            (&[0x49, 0x96, 0xB4, 0x38], Ok(Value::Float32(1234567.0)), 4),
            (&[0xFF, 0x80, 0x00, 0x00], Ok(Value::Float32(f32::NEG_INFINITY)), 4),
        ],
    );
    check(
        &Shape::Float64,
        &[(
            &[0x40, 0x09, 0x21, 0xFB, 0x54, 0x44, 0x2D, 0x18],
            Ok(Value::Float64(std::f64::consts::PI)),
            8,
        )],
    );
}

#[test]
fn strings_and_opaque() {
    check(
        &Shape::String,
        &[
            (&[0x00, 0x00, 0x00, 0x03, 0x78, 0x64, 0x72, 0x00], Ok(Value::from("xdr")), 8),
            (
                &[0x00, 0x00, 0x00, 0x06, 0xCF, 0x84, 0x3D, 0x32, 0xCF, 0x80, 0x00, 0x00],
                Ok(Value::from("τ=2π")),
                12,
            ),
            (&[0xFF, 0xFF, 0xFF, 0xFF], Err(ErrorKind::Overflow), 4),
            (&[0x00, 0x00, 0x00, 0xFF], Err(ErrorKind::Io), 4),
        ],
    );
    check(
        &Shape::VariableOpaque,
        &[
            (&[0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00, 0x00], Ok(Value::Opaque(vec![1])), 8),
            (&[0x7F, 0xFF, 0xFF, 0xFD], Err(ErrorKind::Overflow), 4),
        ],
    );
    check(
        &Shape::FixedOpaque(1),
        &[
            (&[0x01, 0x00, 0x00, 0x00], Ok(Value::Opaque(vec![0x01])), 4),
            (&[0x01], Err(ErrorKind::Io), 1),
        ],
    );
    check(
        &Shape::FixedOpaque(5),
        &[(&[1, 2, 3, 4, 5, 0, 0, 0], Ok(Value::Opaque(vec![1, 2, 3, 4, 5])), 8)],
    );
}

#[test]
fn arrays() {
    check(
        &Shape::variable_array(Shape::Int16),
        &[
            (
                &[0, 0, 0, 3, 0, 0, 0x02, 0, 0, 0, 0x04, 0, 0, 0, 0x08, 0],
                Ok(Value::Array(vec![
                    Value::Int16(512),
                    Value::Int16(1024),
                    Value::Int16(2048),
                ])),
                16,
            ),
            (&[0, 0, 0, 0], Ok(Value::Array(vec![])), 4),
        ],
    );
    check(
        &Shape::variable_array(Shape::Bool),
        &[
            (
                &[0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 0],
                Ok(Value::Array(vec![Value::Bool(true), Value::Bool(false)])),
                12,
            ),
            (&[0, 0, 0, 2, 0, 0, 0, 1], Err(ErrorKind::Io), 8),
            (&[0x80, 0, 0, 0], Err(ErrorKind::Overflow), 4),
        ],
    );
    check(
        &Shape::fixed_array(Shape::Uint32, 2),
        &[
            (
                &[0, 0, 0x02, 0, 0, 0, 0x04, 0],
                Ok(Value::Array(vec![Value::Uint32(512), Value::Uint32(1024)])),
                8,
            ),
            (&[0, 0, 0, 2], Err(ErrorKind::Io), 4),
        ],
    );
}

#[test]
fn one_entry_map_round_trips() {
    let map = Shape::map(Shape::String, Shape::Uint32);
    check(
        &map,
        &[
            (
                &[0, 0, 0, 1, 0, 0, 0, 4, b'm', b'a', b'p', b'1', 0, 0, 0, 1],
                Ok(Value::Map(vec![(Value::from("map1"), Value::Uint32(1))])),
                16,
            ),
            (&[0, 0, 0, 1], Err(ErrorKind::Io), 4),
        ],
    );
}

#[test]
fn map_encode_sorts_by_encoded_key() {
    let map = Shape::map(Shape::Int32, Shape::Bool);
    let value = Value::Map(vec![
        (Value::Int32(-1), Value::Bool(true)),
        (Value::Int32(7), Value::Bool(false)),
        (Value::Int32(2), Value::Bool(true)),
    ]);
    let mut out = Vec::new();
    assert_eq!(shape::encode(&mut out, &map, &value).unwrap(), 28);
    // -1 is 0xFFFFFFFF on the wire and sorts last.
    assert_eq!(
        out,
        [
            0, 0, 0, 3, //
            0, 0, 0, 2, 0, 0, 0, 1, //
            0, 0, 0, 7, 0, 0, 0, 0, //
            0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 1,
        ]
    );

    // Decoding keeps wire order.
    let (decoded, n) = shape::decode(&out[..], &map).unwrap();
    assert_eq!(n, 28);
    let keys: Vec<_> = match &decoded {
        Value::Map(entries) => entries.iter().map(|(k, _)| k.clone()).collect(),
        other => panic!("expected a map, got {other:?}"),
    };
    assert_eq!(keys, [Value::Int32(2), Value::Int32(7), Value::Int32(-1)]);
}

#[test]
fn timestamp_string() {
    let mut bytes = vec![0, 0, 0, 0x14];
    bytes.extend_from_slice(b"2014-04-04T03:24:48Z");
    let when = Utc.timestamp_opt(1396581888, 0).unwrap();
    check(&Shape::Timestamp, &[(&bytes[..], Ok(Value::Timestamp(when)), 24)]);

    let mut garbage = Vec::new();
    shape::encode(&mut garbage, &Shape::String, &Value::from("yesterday")).unwrap();
    let err = shape::decode(&garbage[..], &Shape::Timestamp).unwrap_err();
    assert_eq!((err.kind(), err.offset()), (ErrorKind::ParseTime, 16));
}

#[test]
fn timestamp_year_must_have_four_digits() {
    let last = Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59).unwrap();
    let mut out = Vec::new();
    assert_eq!(shape::encode(&mut out, &Shape::Timestamp, &Value::Timestamp(last)).unwrap(), 24);
    assert_eq!(shape::decode(&out[..], &Shape::Timestamp).unwrap().0, Value::Timestamp(last));

    let stamped = Shape::Struct(vec![
        Field::new("seq", Shape::Uint32),
        Field::new("at", Shape::Timestamp),
    ]);
    for year in [10000, -1] {
        let when = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap();
        let value = Value::Struct(vec![Value::Uint32(1), Value::Timestamp(when)]);
        let mut out = Vec::new();
        let err = shape::encode(&mut out, &stamped, &value).unwrap_err();
        assert_eq!((err.kind(), err.offset()), (ErrorKind::Overflow, 4), "year {year}");
        assert_eq!(out, [0, 0, 0, 1]);
    }
}

// ── Structs and field tags ─────────────────────────────────────────────────

fn sub_test() -> Shape {
    Shape::Struct(vec![Field::new("a", Shape::String), Field::new("b", Shape::Uint8)])
}

fn all_types() -> Shape {
    Shape::Struct(vec![
        Field::new("a", Shape::Int8),
        Field::new("b", Shape::Uint8),
        Field::new("c", Shape::Int16),
        Field::new("d", Shape::Uint16),
        Field::new("e", Shape::Int32),
        Field::new("f", Shape::Uint32),
        Field::new("g", Shape::Int64),
        Field::new("h", Shape::Uint64),
        Field::new("i", Shape::Bool),
        Field::new("j", Shape::Float32),
        Field::new("k", Shape::Float64),
        Field::new("l", Shape::String),
        Field::new("m", Shape::VariableOpaque),
        Field::new("n", Shape::FixedOpaque(3)),
        Field::new("o", Shape::variable_array(Shape::Int16)),
        Field::new("p", Shape::fixed_array(sub_test(), 2)),
        Field::new("q", sub_test()),
        Field::new("r", Shape::map(Shape::String, Shape::Uint32)),
        Field::new("s", Shape::Timestamp),
    ])
}

const ALL_TYPES_WIRE: &[u8] = &[
    0x00, 0x00, 0x00, 0x7F, // a
    0x00, 0x00, 0x00, 0xFF, // b
    0x00, 0x00, 0x7F, 0xFF, // c
    0x00, 0x00, 0xFF, 0xFF, // d
    0x7F, 0xFF, 0xFF, 0xFF, // e
    0xFF, 0xFF, 0xFF, 0xFF, // f
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // g
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, // h
    0x00, 0x00, 0x00, 0x01, // i
    0x40, 0x48, 0xF5, 0xC3, // j
    0x40, 0x09, 0x21, 0xFB, 0x54, 0x44, 0x2D, 0x18, // k
    0x00, 0x00, 0x00, 0x03, 0x78, 0x64, 0x72, 0x00, // l
    0x00, 0x00, 0x00, 0x04, 0x01, 0x02, 0x03, 0x04, // m
    0x01, 0x02, 0x03, 0x00, // n
    0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x02, 0x00, //
    0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x08, 0x00, // o
    0x00, 0x00, 0x00, 0x03, 0x6F, 0x6E, 0x65, 0x00, // p[0].a
    0x00, 0x00, 0x00, 0x01, // p[0].b
    0x00, 0x00, 0x00, 0x03, 0x74, 0x77, 0x6F, 0x00, // p[1].a
    0x00, 0x00, 0x00, 0x02, // p[1].b
    0x00, 0x00, 0x00, 0x03, 0x62, 0x61, 0x72, 0x00, // q.a
    0x00, 0x00, 0x00, 0x03, // q.b
    0x00, 0x00, 0x00, 0x02, // r count
    0x00, 0x00, 0x00, 0x04, 0x6D, 0x61, 0x70, 0x31, // r key
    0x00, 0x00, 0x00, 0x01, // r value
    0x00, 0x00, 0x00, 0x04, 0x6D, 0x61, 0x70, 0x32, // r key
    0x00, 0x00, 0x00, 0x02, // r value
    0x00, 0x00, 0x00, 0x14, 0x32, 0x30, 0x31, 0x34, //
    0x2D, 0x30, 0x34, 0x2D, 0x30, 0x34, 0x54, 0x30, //
    0x33, 0x3A, 0x32, 0x34, 0x3A, 0x34, 0x38, 0x5A, // s
];

fn sub(a: &str, b: u8) -> Value {
    Value::Struct(vec![Value::from(a), Value::Uint8(b)])
}

#[test]
fn all_types_struct() {
    let want = Value::Struct(vec![
        Value::Int8(127),
        Value::Uint8(255),
        Value::Int16(32767),
        Value::Uint16(65535),
        Value::Int32(i32::MAX),
        Value::Uint32(u32::MAX),
        Value::Int64(i64::MAX),
        Value::Uint64(u64::MAX),
        Value::Bool(true),
        Value::Float32(f32::from_bits(0x4048_F5C3)),
        Value::Float64(std::f64::consts::PI),
        Value::from("xdr"),
        Value::Opaque(vec![1, 2, 3, 4]),
        Value::Opaque(vec![1, 2, 3]),
        Value::Array(vec![Value::Int16(512), Value::Int16(1024), Value::Int16(2048)]),
        Value::Array(vec![sub("one", 1), sub("two", 2)]),
        sub("bar", 3),
        Value::Map(vec![
            (Value::from("map1"), Value::Uint32(1)),
            (Value::from("map2"), Value::Uint32(2)),
        ]),
        Value::Timestamp(Utc.timestamp_opt(1396581888, 0).unwrap()),
    ]);
    check(&all_types(), &[(ALL_TYPES_WIRE, Ok(want), ALL_TYPES_WIRE.len())]);
}

#[test]
fn failed_struct_keeps_earlier_fields() {
    let record = Shape::Struct(vec![
        Field::new("id", Shape::Uint32),
        Field::new("name", Shape::String),
        Field::new("size", Shape::Uint64),
    ]);
    let bytes = [0, 0, 0, 9, 0, 0, 0, 2, b'o', b'k', 0, 0, 0, 0, 0];
    let mut target = record.zero_value();
    let err = shape::decode_into(&bytes[..], &record, &mut target).unwrap_err();
    assert_eq!((err.kind(), err.offset()), (ErrorKind::Io, 15));
    assert_eq!(
        target,
        Value::Struct(vec![Value::Uint32(9), Value::from("ok"), Value::Uint64(0)])
    );
}

#[test]
fn decode_into_replaces_previous_contents() {
    let list = Shape::variable_array(Shape::Uint32);
    let mut target = Value::Array(vec![Value::Uint32(1), Value::Uint32(2), Value::Uint32(3)]);
    let n = shape::decode_into(&[0u8, 0, 0, 1, 0, 0, 0, 5][..], &list, &mut target).unwrap();
    assert_eq!(n, 8);
    assert_eq!(target, Value::Array(vec![Value::Uint32(5)]));

    // A target of the wrong kind is rebuilt from the shape.
    let mut target = Value::Bool(true);
    shape::decode_into(&[0u8, 0, 0, 0][..], &list, &mut target).unwrap();
    assert_eq!(target, Value::Array(vec![]));
}

fn reply() -> Shape {
    Shape::Struct(vec![
        Field::new("xid", Shape::Uint32),
        Field::tagged("status", Shape::Enum, "enum=0|1"),
    ])
}

#[test]
fn enum_tag_limits_decode() {
    let reply = reply();
    let (value, n) = shape::decode(&[0u8, 0, 0, 7, 0, 0, 0, 1][..], &reply).unwrap();
    assert_eq!(n, 8);
    assert_eq!(value, Value::Struct(vec![Value::Uint32(7), Value::Enum(1)]));

    let mut target = reply.zero_value();
    let err = shape::decode_into(&[0u8, 0, 0, 7, 0, 0, 0, 2][..], &reply, &mut target)
        .unwrap_err();
    assert_eq!((err.kind(), err.offset()), (ErrorKind::BadEnumValue, 8));
    assert_eq!(target, Value::Struct(vec![Value::Uint32(7), Value::Enum(0)]));
}

#[test]
fn enum_tag_limits_encode() {
    let reply = reply();
    let mut out = Vec::new();
    let err = shape::encode(
        &mut out,
        &reply,
        &Value::Struct(vec![Value::Uint32(7), Value::Enum(5)]),
    )
    .unwrap_err();
    assert_eq!((err.kind(), err.offset()), (ErrorKind::BadEnumValue, 4));
    assert_eq!(out, [0, 0, 0, 7]);
}

#[test]
fn enum_without_tag_accepts_any_value() {
    let shape = Shape::Struct(vec![Field::new("raw", Shape::Enum)]);
    let (value, _) = shape::decode(&[0x12u8, 0x34, 0x56, 0x78][..], &shape).unwrap();
    assert_eq!(value, Value::Struct(vec![Value::Enum(0x1234_5678)]));
}

#[test]
fn empty_enum_tag_rejects_everything() {
    let shape = Shape::Struct(vec![Field::tagged("never", Shape::Enum, "enum=")]);
    let err = shape::decode(&[0u8, 0, 0, 0][..], &shape).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadEnumValue);
}

#[test]
fn explicit_enum_values_match_tag() {
    let tagged = Field::tagged("s", Shape::Enum, "enum=1|3");
    let built = Field::new("s", Shape::Enum).with_enum_values(&[1, 3]);
    assert_eq!(tagged.tag().get("enum"), built.tag().get("enum"));

    let shape = Shape::Struct(vec![built]);
    assert!(shape::decode(&[0u8, 0, 0, 3][..], &shape).is_ok());
    assert!(shape::decode(&[0u8, 0, 0, 2][..], &shape).is_err());
}

#[test]
fn enum_tag_applies_to_array_elements() {
    let shape = Shape::Struct(vec![Field::tagged(
        "codes",
        Shape::variable_array(Shape::Enum),
        "enum=1|2",
    )]);
    let ok = [0u8, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 2];
    assert_eq!(shape::decode(&ok[..], &shape).unwrap().1, 12);

    let bad = [0u8, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 3];
    let err = shape::decode(&bad[..], &shape).unwrap_err();
    assert_eq!((err.kind(), err.offset()), (ErrorKind::BadEnumValue, 12));
}

#[test]
fn enum_tag_applies_to_map_entries() {
    let shape = Shape::Struct(vec![Field::tagged(
        "modes",
        Shape::map(Shape::String, Shape::Enum),
        "enum=0|1",
    )]);
    let ok = [0u8, 0, 0, 1, 0, 0, 0, 1, b'a', 0, 0, 0, 0, 0, 0, 1];
    assert_eq!(shape::decode(&ok[..], &shape).unwrap().1, 16);

    let bad = [0u8, 0, 0, 1, 0, 0, 0, 1, b'a', 0, 0, 0, 0, 0, 0, 9];
    let err = shape::decode(&bad[..], &shape).unwrap_err();
    assert_eq!((err.kind(), err.offset()), (ErrorKind::BadEnumValue, 16));

    let value = Value::Struct(vec![Value::Map(vec![(Value::from("a"), Value::Enum(9))])]);
    let mut out = Vec::new();
    let err = shape::encode(&mut out, &shape, &value).unwrap_err();
    assert_eq!((err.kind(), err.offset()), (ErrorKind::BadEnumValue, 0));
    assert!(out.is_empty());

    // Keys are checked too.
    let keyed = Shape::Struct(vec![Field::tagged(
        "by_mode",
        Shape::map(Shape::Enum, Shape::Uint32),
        "enum=0|1",
    )]);
    let bad_key = [0u8, 0, 0, 1, 0, 0, 0, 4, 0, 0, 0, 7];
    let err = shape::decode(&bad_key[..], &keyed).unwrap_err();
    assert_eq!((err.kind(), err.offset()), (ErrorKind::BadEnumValue, 8));
}

#[test]
fn malformed_enum_tag_is_unsupported() {
    let shape = Shape::Struct(vec![
        Field::new("len", Shape::Uint32),
        Field::tagged("kind", Shape::Enum, "enum=0|one"),
    ]);
    let err = shape::decode(&[0u8, 0, 0, 1, 0, 0, 0, 0][..], &shape).unwrap_err();
    assert_eq!((err.kind(), err.offset()), (ErrorKind::UnsupportedShape, 4));
}

#[test]
fn unrelated_tag_keys_are_ignored() {
    let shape = Shape::Struct(vec![Field::tagged("n", Shape::Int32, "opaque,note=x")]);
    assert_eq!(
        shape::decode(&[0u8, 0, 0, 1][..], &shape).unwrap(),
        (Value::Struct(vec![Value::Int32(1)]), 4)
    );
}

// ── Encode errors ──────────────────────────────────────────────────────────

#[test]
fn value_must_match_shape() {
    let mut out = Vec::new();
    let err = shape::encode(&mut out, &Shape::String, &Value::Int32(1)).unwrap_err();
    assert_eq!((err.kind(), err.offset()), (ErrorKind::UnsupportedShape, 0));

    let err = shape::encode(
        &mut out,
        &Shape::fixed_array(Shape::Bool, 3),
        &Value::Array(vec![Value::Bool(true)]),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedShape);

    let err = shape::encode(&mut out, &Shape::FixedOpaque(4), &Value::Opaque(vec![1, 2]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedShape);

    let err = shape::encode(&mut out, &sub_test(), &Value::Struct(vec![Value::from("x")]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedShape);
    assert!(out.is_empty());
}

#[test]
fn map_entry_error_points_at_map() {
    let shape = Shape::Struct(vec![
        Field::new("n", Shape::Uint32),
        Field::new("m", Shape::map(Shape::String, Shape::Uint32)),
    ]);
    let value = Value::Struct(vec![
        Value::Uint32(1),
        Value::Map(vec![(Value::from("k"), Value::Bool(true))]),
    ]);
    let mut out = Vec::new();
    let err = shape::encode(&mut out, &shape, &value).unwrap_err();
    assert_eq!((err.kind(), err.offset()), (ErrorKind::UnsupportedShape, 4));
    assert_eq!(out.len(), 4);
}

#[test]
fn short_sink_is_io() {
    let mut buf = [0u8; 6];
    let err = shape::encode(&mut buf[..], &Shape::String, &Value::from("xdr!")).unwrap_err();
    assert_eq!((err.kind(), err.offset()), (ErrorKind::Io, 6));
}

// ── Mixing with hand-written codecs ────────────────────────────────────────

#[test]
fn shared_cursor_with_primitives() {
    let pair = Shape::fixed_array(Shape::Uint16, 2);
    let mut out = Vec::new();
    let mut enc = Encoder::new(&mut out);
    enc.encode_uint(0xCAFE).unwrap();
    let n = shape::encode_value(
        &mut enc,
        &pair,
        &Value::Array(vec![Value::Uint16(1), Value::Uint16(2)]),
    )
    .unwrap();
    assert_eq!((n, enc.position()), (8, 12));

    let mut dec = Decoder::new(&out[..]);
    assert_eq!(dec.decode_uint().unwrap(), (0xCAFE, 4));
    let mut target = pair.zero_value();
    assert_eq!(shape::decode_value(&mut dec, &pair, &mut target).unwrap(), 8);
    assert_eq!(target, Value::Array(vec![Value::Uint16(1), Value::Uint16(2)]));
}

#[test]
fn limited_decoder_caps_counts() {
    let list = Shape::variable_array(Shape::Uint32);
    let bytes = [0u8, 0, 0, 3, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 3];
    let mut target = list.zero_value();
    let mut dec = Decoder::new(&bytes[..]).with_max_read_size(2);
    let err = shape::decode_value(&mut dec, &list, &mut target).unwrap_err();
    assert_eq!((err.kind(), err.offset()), (ErrorKind::Overflow, 4));
}

#[test]
fn zero_values_follow_the_shape() {
    assert_eq!(Shape::FixedOpaque(3).zero_value(), Value::Opaque(vec![0, 0, 0]));
    assert_eq!(
        Shape::fixed_array(Shape::Bool, 2).zero_value(),
        Value::Array(vec![Value::Bool(false), Value::Bool(false)])
    );
    assert_eq!(sub_test().zero_value(), sub("", 0));
    assert_eq!(
        Shape::Timestamp.zero_value(),
        Value::Timestamp(Utc.timestamp_opt(0, 0).unwrap())
    );
}

#[test]
fn zero_width_elements_have_their_own_ceiling() {
    let empties = Shape::variable_array(Shape::Struct(vec![]));
    let (value, n) = shape::decode(&[0u8, 0, 0, 3][..], &empties).unwrap();
    assert_eq!(n, 4);
    assert_eq!(value, Value::Array(vec![Value::Struct(vec![]); 3]));

    let huge = (MAX_EMPTY_ELEMENTS as u32 + 1).to_be_bytes();
    for elem in [
        Shape::Struct(vec![]),
        Shape::FixedOpaque(0),
        Shape::fixed_array(Shape::Uint64, 0),
    ] {
        let err = shape::decode(&huge[..], &Shape::variable_array(elem.clone())).unwrap_err();
        assert_eq!((err.kind(), err.offset()), (ErrorKind::Overflow, 4), "{elem:?}");
    }

    let empty_map = Shape::map(Shape::Struct(vec![]), Shape::FixedOpaque(0));
    let err = shape::decode(&[0u8, 0x4C, 0x4B, 0x40][..], &empty_map).unwrap_err();
    assert_eq!((err.kind(), err.offset()), (ErrorKind::Overflow, 4));

    // Elements that occupy bytes are bounded by the input instead.
    let words = Shape::variable_array(Shape::Uint32);
    let err = shape::decode(&[0u8, 0x4C, 0x4B, 0x40, 0, 0, 0, 1][..], &words).unwrap_err();
    assert_eq!((err.kind(), err.offset()), (ErrorKind::Io, 8));
}

#[test]
fn oversized_fixed_lengths_overflow() {
    assert_eq!(Shape::FixedOpaque(usize::MAX).zero_value(), Value::Opaque(vec![]));
    assert_eq!(
        Shape::fixed_array(Shape::Int64, MAX_OPAQUE_LEN + 1).zero_value(),
        Value::Array(vec![])
    );

    let header = Shape::Struct(vec![
        Field::new("len", Shape::Uint32),
        Field::new("body", Shape::FixedOpaque(usize::MAX)),
    ]);
    let err = shape::decode(&[0u8, 0, 0, 1, 0xAA][..], &header).unwrap_err();
    assert_eq!((err.kind(), err.offset()), (ErrorKind::Overflow, 4));

    let table = Shape::Struct(vec![
        Field::new("len", Shape::Uint32),
        Field::new("rows", Shape::fixed_array(Shape::Int64, MAX_OPAQUE_LEN + 1)),
    ]);
    let mut target = table.zero_value();
    let err = shape::decode_into(&[0u8, 0, 0, 1][..], &table, &mut target).unwrap_err();
    assert_eq!((err.kind(), err.offset()), (ErrorKind::Overflow, 4));
}
