//! Runtime shape-directed traversal.
//!
//! Where the serde front end ([`crate::ser`], [`crate::de`]) takes its shape
//! from `#[derive]`, this engine takes it from a [`Shape`] value built at
//! runtime. Struct fields carry a [`Tag`] whose options (today: an enum
//! allow-list) are derived once per field as the traversal reaches it.
//!
//! ```rust
//! use xdr_codec::shape::{self, Field, Shape};
//! use xdr_codec::{ErrorKind, Value};
//!
//! let reply = Shape::Struct(vec![
//!     Field::tagged("status", Shape::Enum, "enum=0|1"),
//!     Field::new("name", Shape::String),
//! ]);
//!
//! let bytes = [0, 0, 0, 1, 0, 0, 0, 3, b'x', b'd', b'r', 0];
//! let (value, n) = shape::decode(&bytes[..], &reply).unwrap();
//! assert_eq!(n, 12);
//! assert_eq!(value, Value::Struct(vec![Value::Enum(1), Value::from("xdr")]));
//!
//! let err = shape::decode(&[0u8, 0, 0, 2][..], &reply).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::BadEnumValue);
//! assert_eq!(err.offset(), 4);
//! ```

use crate::error::{Error, Result};
use crate::primitive::{Decoder, Encoder};
use crate::tag::{self, FieldOptions, Tag};
use crate::timestamp;
use crate::value::Value;
use crate::{MAX_EMPTY_ELEMENTS, MAX_OPAQUE_LEN};
use chrono::{DateTime, Utc};
use std::io::{Read, Write};
use tracing::{debug, trace};

/// The closed set of shapes the engine can traverse.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Bool,
    Float32,
    Float64,
    String,
    /// Opaque data of a declared length, no length prefix.
    FixedOpaque(usize),
    VariableOpaque,
    /// A 32-bit enum; the allow-list comes from the enclosing field's tag.
    Enum,
    /// `n` elements, no count prefix.
    FixedArray(Box<Shape>, usize),
    VariableArray(Box<Shape>),
    Map(Box<Shape>, Box<Shape>),
    Struct(Vec<Field>),
    /// RFC 3339 string, second precision, UTC.
    Timestamp,
}

impl Shape {
    pub fn fixed_array(elem: Shape, n: usize) -> Shape {
        Shape::FixedArray(Box::new(elem), n)
    }

    pub fn variable_array(elem: Shape) -> Shape {
        Shape::VariableArray(Box::new(elem))
    }

    pub fn map(key: Shape, value: Shape) -> Shape {
        Shape::Map(Box::new(key), Box::new(value))
    }

    /// The empty value a caller allocates before decoding into it.
    ///
    /// Fixed lengths beyond [`MAX_OPAQUE_LEN`] can never decode, so their
    /// zero value is left empty.
    pub fn zero_value(&self) -> Value {
        match self {
            Shape::Int8 => Value::Int8(0),
            Shape::Int16 => Value::Int16(0),
            Shape::Int32 => Value::Int32(0),
            Shape::Int64 => Value::Int64(0),
            Shape::Uint8 => Value::Uint8(0),
            Shape::Uint16 => Value::Uint16(0),
            Shape::Uint32 => Value::Uint32(0),
            Shape::Uint64 => Value::Uint64(0),
            Shape::Bool => Value::Bool(false),
            Shape::Float32 => Value::Float32(0.0),
            Shape::Float64 => Value::Float64(0.0),
            Shape::String => Value::String(String::new()),
            Shape::FixedOpaque(len) if *len > MAX_OPAQUE_LEN => Value::Opaque(Vec::new()),
            Shape::FixedOpaque(len) => Value::Opaque(vec![0; *len]),
            Shape::VariableOpaque => Value::Opaque(Vec::new()),
            Shape::Enum => Value::Enum(0),
            Shape::FixedArray(_, n) if *n > MAX_OPAQUE_LEN => Value::Array(Vec::new()),
            Shape::FixedArray(elem, n) => Value::Array(zeros(elem, *n)),
            Shape::VariableArray(_) => Value::Array(Vec::new()),
            Shape::Map(_, _) => Value::Map(Vec::new()),
            Shape::Struct(fields) => {
                Value::Struct(fields.iter().map(|f| f.shape.zero_value()).collect())
            }
            Shape::Timestamp => Value::Timestamp(DateTime::<Utc>::default()),
        }
    }

    /// Whether every value of this shape encodes to zero bytes.
    fn is_empty_on_wire(&self) -> bool {
        match self {
            Shape::FixedOpaque(len) => *len == 0,
            Shape::FixedArray(elem, n) => *n == 0 || elem.is_empty_on_wire(),
            Shape::Struct(fields) => fields.iter().all(|f| f.shape.is_empty_on_wire()),
            _ => false,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Shape::Int8 => "int8",
            Shape::Int16 => "int16",
            Shape::Int32 => "int32",
            Shape::Int64 => "int64",
            Shape::Uint8 => "uint8",
            Shape::Uint16 => "uint16",
            Shape::Uint32 => "uint32",
            Shape::Uint64 => "uint64",
            Shape::Bool => "bool",
            Shape::Float32 => "float32",
            Shape::Float64 => "float64",
            Shape::String => "string",
            Shape::FixedOpaque(_) => "fixed opaque",
            Shape::VariableOpaque => "variable opaque",
            Shape::Enum => "enum",
            Shape::FixedArray(_, _) => "fixed array",
            Shape::VariableArray(_) => "variable array",
            Shape::Map(_, _) => "map",
            Shape::Struct(_) => "struct",
            Shape::Timestamp => "timestamp",
        }
    }
}

fn zeros(elem: &Shape, n: usize) -> Vec<Value> {
    (0..n).map(|_| elem.zero_value()).collect()
}

/// One struct member: its name, shape and annotations. Only the order of
/// fields reaches the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    shape: Shape,
    tag: Tag,
}

impl Field {
    pub fn new(name: impl Into<String>, shape: Shape) -> Field {
        Field {
            name: name.into(),
            shape,
            tag: Tag::default(),
        }
    }

    /// A field annotated with a tag string such as `"enum=0|1"`.
    pub fn tagged(name: impl Into<String>, shape: Shape, raw_tag: &str) -> Field {
        Field {
            name: name.into(),
            shape,
            tag: Tag::parse(raw_tag),
        }
    }

    /// Restrict an enum-shaped field to `values`.
    pub fn with_enum_values(mut self, values: &[i32]) -> Field {
        self.tag.insert(tag::ENUM_KEY, tag::format_enum_values(values));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }
}

// ── Entry points ───────────────────────────────────────────────────────────

/// Encode `value` as `shape` into `writer`, returning the bytes written.
pub fn encode<W: Write>(writer: W, shape: &Shape, value: &Value) -> Result<usize> {
    encode_value(&mut Encoder::new(writer), shape, value)
}

/// Decode a fresh value of `shape` from `reader`.
pub fn decode<R: Read>(reader: R, shape: &Shape) -> Result<(Value, usize)> {
    let mut value = blank();
    let n = decode_into(reader, shape, &mut value)?;
    Ok((value, n))
}

/// Decode into a caller-allocated target, returning the bytes read.
///
/// Struct fields are written as they decode, so after a failure `target` may
/// hold some decoded fields; treat it as unreliable.
pub fn decode_into<R: Read>(reader: R, shape: &Shape, target: &mut Value) -> Result<usize> {
    decode_value(&mut Decoder::new(reader), shape, target)
}

/// Encode one value through an existing encoder, for callers mixing
/// shape-directed and hand-written encoding.
pub fn encode_value<W: Write>(
    enc: &mut Encoder<W>,
    shape: &Shape,
    value: &Value,
) -> Result<usize> {
    let start = enc.position();
    encode_shape(enc, shape, None, value).inspect_err(|err| {
        debug!(kind = ?err.kind(), offset = err.offset(), "xdr encode failed");
    })?;
    Ok(enc.position() - start)
}

/// Decode one value through an existing decoder.
pub fn decode_value<R: Read>(
    dec: &mut Decoder<R>,
    shape: &Shape,
    target: &mut Value,
) -> Result<usize> {
    let start = dec.position();
    decode_shape(dec, shape, None, target).inspect_err(|err| {
        debug!(kind = ?err.kind(), offset = err.offset(), "xdr decode failed");
    })?;
    Ok(dec.position() - start)
}

// ── Decode ─────────────────────────────────────────────────────────────────

/// Placeholder target. Every shape overwrites it, and containers grow from
/// it element by element.
fn blank() -> Value {
    Value::Struct(Vec::new())
}

/// Check a wire count whose elements occupy no bytes.
fn check_empty_count<R: Read>(dec: &Decoder<R>, count: usize) -> Result<()> {
    if count > MAX_EMPTY_ELEMENTS {
        return Err(Error::overflow(
            format!("{count} zero-width elements exceed maximum {MAX_EMPTY_ELEMENTS}"),
            dec.position(),
        ));
    }
    Ok(())
}

fn decode_field<R: Read>(dec: &mut Decoder<R>, field: &Field, slot: &mut Value) -> Result<()> {
    let opts = FieldOptions::from_tag(&field.tag, dec.position())?;
    trace!(field = %field.name, offset = dec.position(), "xdr decode field");
    decode_shape(dec, &field.shape, opts.enum_values.as_deref(), slot)
}

/// Decode up to `count` elements, keeping the ones decoded before a failure.
fn decode_items<R: Read>(
    dec: &mut Decoder<R>,
    elem: &Shape,
    enum_values: Option<&[i32]>,
    count: usize,
    target: &mut Value,
) -> Result<()> {
    let mut items = Vec::new();
    let mut res = Ok(());
    for _ in 0..count {
        let mut item = blank();
        res = decode_shape(dec, elem, enum_values, &mut item);
        if res.is_err() {
            break;
        }
        items.push(item);
    }
    *target = Value::Array(items);
    res
}

fn narrow<R, S, T>(dec: &Decoder<R>, v: S, target: &str) -> Result<T>
where
    R: Read,
    S: Copy + std::fmt::Display,
    T: TryFrom<S>,
{
    T::try_from(v)
        .map_err(|_| Error::overflow(format!("{v} does not fit in {target}"), dec.position()))
}

fn decode_shape<R: Read>(
    dec: &mut Decoder<R>,
    shape: &Shape,
    enum_values: Option<&[i32]>,
    target: &mut Value,
) -> Result<()> {
    match shape {
        Shape::Int8 => {
            let v = dec.read_i32()?;
            *target = Value::Int8(narrow(dec, v, "int8")?);
        }
        Shape::Int16 => {
            let v = dec.read_i32()?;
            *target = Value::Int16(narrow(dec, v, "int16")?);
        }
        Shape::Int32 => *target = Value::Int32(dec.read_i32()?),
        Shape::Int64 => *target = Value::Int64(dec.read_i64()?),
        Shape::Uint8 => {
            let v = dec.read_u32()?;
            *target = Value::Uint8(narrow(dec, v, "uint8")?);
        }
        Shape::Uint16 => {
            let v = dec.read_u32()?;
            *target = Value::Uint16(narrow(dec, v, "uint16")?);
        }
        Shape::Uint32 => *target = Value::Uint32(dec.read_u32()?),
        Shape::Uint64 => *target = Value::Uint64(dec.read_u64()?),
        Shape::Bool => *target = Value::Bool(dec.read_bool()?),
        Shape::Float32 => *target = Value::Float32(dec.read_f32()?),
        Shape::Float64 => *target = Value::Float64(dec.read_f64()?),
        Shape::String => *target = Value::String(dec.read_string()?),
        Shape::FixedOpaque(len) => *target = Value::Opaque(dec.read_fixed_opaque(*len)?),
        Shape::VariableOpaque => *target = Value::Opaque(dec.read_opaque()?),
        Shape::Enum => {
            let v = match enum_values {
                Some(allowed) => dec.read_enum(allowed)?,
                None => dec.read_i32()?,
            };
            *target = Value::Enum(v);
        }
        Shape::Timestamp => {
            let text = dec.read_string()?;
            *target = Value::Timestamp(timestamp::parse(&text, dec.position())?);
        }
        Shape::FixedArray(elem, n) => {
            if *n > MAX_OPAQUE_LEN {
                return Err(Error::overflow(
                    format!("fixed array length {n} exceeds maximum {MAX_OPAQUE_LEN}"),
                    dec.position(),
                ));
            }
            match target {
                Value::Array(items) if items.len() == *n => items
                    .iter_mut()
                    .try_for_each(|item| decode_shape(dec, elem, enum_values, item))?,
                _ => decode_items(dec, elem, enum_values, *n, target)?,
            }
        }
        Shape::VariableArray(elem) => {
            let count = dec.read_count()?;
            if elem.is_empty_on_wire() {
                check_empty_count(dec, count)?;
            }
            // Grow with the elements actually decoded; `count` is untrusted.
            decode_items(dec, elem, enum_values, count, target)?;
        }
        Shape::Map(key_shape, value_shape) => {
            let count = dec.read_count()?;
            if key_shape.is_empty_on_wire() && value_shape.is_empty_on_wire() {
                check_empty_count(dec, count)?;
            }
            let mut entries = Vec::new();
            let mut res = Ok(());
            for _ in 0..count {
                let mut key = blank();
                let mut value = blank();
                res = decode_shape(dec, key_shape, enum_values, &mut key)
                    .and_then(|()| decode_shape(dec, value_shape, enum_values, &mut value));
                if res.is_err() {
                    break;
                }
                entries.push((key, value));
            }
            *target = Value::Map(entries);
            res?;
        }
        Shape::Struct(fields) => match target {
            Value::Struct(items) if items.len() == fields.len() => {
                for (field, slot) in fields.iter().zip(items.iter_mut()) {
                    decode_field(dec, field, slot)?;
                }
            }
            // A target of the wrong layout is rebuilt field by field.
            _ => {
                let mut items = Vec::with_capacity(fields.len());
                let mut res = Ok(());
                for field in fields {
                    let mut slot = blank();
                    res = decode_field(dec, field, &mut slot);
                    if res.is_err() {
                        break;
                    }
                    items.push(slot);
                }
                *target = Value::Struct(items);
                res?;
            }
        },
    }
    Ok(())
}

// ── Encode ─────────────────────────────────────────────────────────────────

fn mismatch(shape: &Shape, value: &Value, offset: usize) -> Error {
    Error::unsupported(
        format!("cannot encode {} value as {}", value.kind_name(), shape.name()),
        offset,
    )
}

fn check_len(expected: usize, got: usize, what: &str, offset: usize) -> Result<()> {
    if expected != got {
        return Err(Error::unsupported(
            format!("{what} declares {expected} elements, value has {got}"),
            offset,
        ));
    }
    Ok(())
}

/// Encode into a scratch buffer; used to order map entries by key bytes.
fn encode_scratch(
    shape: &Shape,
    enum_values: Option<&[i32]>,
    value: &Value,
    offset: usize,
) -> Result<Vec<u8>> {
    let mut scratch = Encoder::new(Vec::new());
    encode_shape(&mut scratch, shape, enum_values, value).map_err(|e| e.with_offset(offset))?;
    Ok(scratch.into_inner())
}

fn encode_shape<W: Write>(
    enc: &mut Encoder<W>,
    shape: &Shape,
    enum_values: Option<&[i32]>,
    value: &Value,
) -> Result<()> {
    match (shape, value) {
        (Shape::Int8, Value::Int8(v)) => enc.write_i32((*v).into()),
        (Shape::Int16, Value::Int16(v)) => enc.write_i32((*v).into()),
        (Shape::Int32, Value::Int32(v)) => enc.write_i32(*v),
        (Shape::Int64, Value::Int64(v)) => enc.write_i64(*v),
        (Shape::Uint8, Value::Uint8(v)) => enc.write_u32((*v).into()),
        (Shape::Uint16, Value::Uint16(v)) => enc.write_u32((*v).into()),
        (Shape::Uint32, Value::Uint32(v)) => enc.write_u32(*v),
        (Shape::Uint64, Value::Uint64(v)) => enc.write_u64(*v),
        (Shape::Bool, Value::Bool(v)) => enc.write_bool(*v),
        (Shape::Float32, Value::Float32(v)) => enc.write_f32(*v),
        (Shape::Float64, Value::Float64(v)) => enc.write_f64(*v),
        (Shape::String, Value::String(s)) => enc.write_opaque(s.as_bytes()),
        (Shape::FixedOpaque(len), Value::Opaque(bytes)) => {
            check_len(*len, bytes.len(), "fixed opaque", enc.position())?;
            enc.write_fixed_opaque(bytes)
        }
        (Shape::VariableOpaque, Value::Opaque(bytes)) => enc.write_opaque(bytes),
        (Shape::Enum, Value::Enum(v)) => match enum_values {
            Some(allowed) => enc.write_enum(*v, allowed),
            None => enc.write_i32(*v),
        },
        (Shape::Timestamp, Value::Timestamp(t)) => {
            enc.write_opaque(timestamp::format(t, enc.position())?.as_bytes())
        }
        (Shape::FixedArray(elem, n), Value::Array(items)) => {
            check_len(*n, items.len(), "fixed array", enc.position())?;
            items
                .iter()
                .try_for_each(|item| encode_shape(enc, elem, enum_values, item))
        }
        (Shape::VariableArray(elem), Value::Array(items)) => {
            enc.write_count(items.len())?;
            items
                .iter()
                .try_for_each(|item| encode_shape(enc, elem, enum_values, item))
        }
        (Shape::Map(key_shape, value_shape), Value::Map(entries)) => {
            let offset = enc.position();
            let mut encoded = entries
                .iter()
                .map(|(k, v)| -> Result<(Vec<u8>, Vec<u8>)> {
                    Ok((
                        encode_scratch(key_shape, enum_values, k, offset)?,
                        encode_scratch(value_shape, enum_values, v, offset)?,
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            encoded.sort_by(|a, b| a.0.cmp(&b.0));
            enc.write_count(encoded.len())?;
            for (k, v) in &encoded {
                enc.write_all(k)?;
                enc.write_all(v)?;
            }
            Ok(())
        }
        (Shape::Struct(fields), Value::Struct(items)) => {
            check_len(fields.len(), items.len(), "struct", enc.position())?;
            fields.iter().zip(items).try_for_each(|(field, item)| {
                let opts = FieldOptions::from_tag(&field.tag, enc.position())?;
                trace!(field = %field.name, offset = enc.position(), "xdr encode field");
                encode_shape(enc, &field.shape, opts.enum_values.as_deref(), item)
            })
        }
        (shape, value) => Err(mismatch(shape, value, enc.position())),
    }
}
