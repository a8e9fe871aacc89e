//! XDR Serializer (RFC 4506)
//!
//! The [`Serializer`] is generic over any `W: std::io::Write` and counts every
//! byte it produces, so [`to_writer`] can report the encoded size and a failing
//! call can report how far it got.
//!
//! ## Wire format summary
//! - All values are big-endian (network byte order)
//! - All items are padded to a multiple of 4 bytes
//! - Integers: 4 bytes (signed or unsigned), Hyper: 8 bytes
//! - Floats: IEEE 754, 4 bytes; Doubles: 8 bytes
//! - Strings/Bytes: 4-byte length prefix + data + 0–3 zero-padding bytes
//! - Sequences: 4-byte count prefix + elements
//! - Structs/Tuples: fields encoded consecutively, no length prefix
//! - Maps: 4-byte count prefix + pairs, sorted by encoded key bytes
//! - Options: 4-byte bool discriminant (0=None, 1=Some) + optional value
//! - Enums (unit): 4-byte discriminant (variant index as u32)
//! - Enums (with data): 4-byte discriminant + encoded arm

use crate::error::{Error, Result};
use crate::primitive::Encoder;
use serde::ser::{self, Serialize};
use std::io::Write;
use tracing::debug;

// ── Public entry points ────────────────────────────────────────────────────

/// Serialize `value` into a freshly allocated `Vec<u8>` of XDR bytes.
pub fn to_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut ser = Serializer::new(Vec::new());
    ser.encode(value)?;
    Ok(ser.into_writer())
}

/// Serialize `value` as XDR bytes directly into `writer`, returning the number
/// of bytes written.
///
/// On failure the error's offset is the number of bytes that reached the
/// writer before the fault.
pub fn to_writer<W: Write, T: Serialize + ?Sized>(writer: W, value: &T) -> Result<usize> {
    let mut ser = Serializer::new(writer);
    ser.encode(value)
}

// ── Serializer ─────────────────────────────────────────────────────────────

/// The XDR serializer. Generic over any `W: Write`.
///
/// ```rust
/// use xdr_codec::ser::Serializer;
/// use serde::Serialize;
///
/// let mut buf = Vec::new();
/// let mut ser = Serializer::new(&mut buf);
/// 42u32.serialize(&mut ser).unwrap();
/// assert_eq!(ser.position(), 4);
/// assert_eq!(buf, [0, 0, 0, 42]);
/// ```
pub struct Serializer<W> {
    enc: Encoder<W>,
    /// Set by the fixed-opaque hook; the next `serialize_bytes` omits the
    /// length prefix.
    fixed_opaque: bool,
    /// Set by the timestamp hook; the next `serialize_str` must carry a
    /// four-digit year.
    timestamp: bool,
}

impl<W: Write> Serializer<W> {
    /// Create a new serializer that writes into `writer`.
    pub fn new(writer: W) -> Self {
        Serializer {
            enc: Encoder::new(writer),
            fixed_opaque: false,
            timestamp: false,
        }
    }

    /// Bytes written so far.
    pub fn position(&self) -> usize {
        self.enc.position()
    }

    /// Consume the serializer and return the inner writer.
    pub fn into_writer(self) -> W {
        self.enc.into_inner()
    }

    /// Serialize one whole value, returning the bytes it produced.
    pub fn encode<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<usize> {
        let start = self.position();
        match value.serialize(&mut *self) {
            Ok(()) => Ok(self.position() - start),
            Err(err) => {
                let err = err.locate(self.position());
                debug!(kind = ?err.kind(), offset = err.offset(), "xdr encode failed");
                Err(err)
            }
        }
    }
}

// ── serde::Serializer impl ─────────────────────────────────────────────────

impl<'a, W: Write> ser::Serializer for &'a mut Serializer<W> {
    type Ok = ();
    type Error = Error;

    type SerializeSeq = Self;
    type SerializeTuple = Self;
    type SerializeTupleStruct = Self;
    type SerializeTupleVariant = Self;
    type SerializeMap = MapSerializer<'a, W>;
    type SerializeStruct = Self;
    type SerializeStructVariant = Self;

    // ── Primitives ─────────────────────────────────────────────────────────

    /// XDR Bool → 4-byte unsigned int: 0 (false) or 1 (true)
    fn serialize_bool(self, v: bool) -> Result<()> {
        self.enc.write_bool(v)
    }

    fn serialize_i8(self, v: i8) -> Result<()> {
        self.enc.write_i32(v.into())
    }
    fn serialize_i16(self, v: i16) -> Result<()> {
        self.enc.write_i32(v.into())
    }
    /// XDR signed integer — 4 bytes, big-endian, two's complement
    fn serialize_i32(self, v: i32) -> Result<()> {
        self.enc.write_i32(v)
    }
    /// XDR hyper integer — 8 bytes, big-endian, two's complement
    fn serialize_i64(self, v: i64) -> Result<()> {
        self.enc.write_i64(v)
    }

    fn serialize_u8(self, v: u8) -> Result<()> {
        self.enc.write_u32(v.into())
    }
    fn serialize_u16(self, v: u16) -> Result<()> {
        self.enc.write_u32(v.into())
    }
    /// XDR unsigned integer — 4 bytes, big-endian
    fn serialize_u32(self, v: u32) -> Result<()> {
        self.enc.write_u32(v)
    }
    /// XDR unsigned hyper integer — 8 bytes, big-endian
    fn serialize_u64(self, v: u64) -> Result<()> {
        self.enc.write_u64(v)
    }

    fn serialize_f32(self, v: f32) -> Result<()> {
        self.enc.write_f32(v)
    }
    fn serialize_f64(self, v: f64) -> Result<()> {
        self.enc.write_f64(v)
    }

    /// char → XDR unsigned int (Unicode scalar value, 4 bytes)
    fn serialize_char(self, v: char) -> Result<()> {
        self.enc.write_u32(v.into())
    }

    /// XDR string — 4-byte length + UTF-8 bytes + 0–3 zero-padding bytes
    fn serialize_str(self, v: &str) -> Result<()> {
        if std::mem::take(&mut self.timestamp) {
            crate::timestamp::check_year(v, self.position())?;
        }
        self.enc.write_opaque(v.as_bytes())
    }

    /// XDR opaque — variable-length unless the fixed-opaque hook is armed
    fn serialize_bytes(self, v: &[u8]) -> Result<()> {
        if std::mem::take(&mut self.fixed_opaque) {
            self.enc.write_fixed_opaque(v)
        } else {
            self.enc.write_opaque(v)
        }
    }

    /// XDR optional-data void arm — 4-byte FALSE (0)
    fn serialize_none(self) -> Result<()> {
        self.enc.write_bool(false)
    }

    /// XDR optional-data value arm — 4-byte TRUE (1) + encoded value
    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<()> {
        self.enc.write_bool(true)?;
        value.serialize(self)
    }

    /// XDR void — 0 bytes
    fn serialize_unit(self) -> Result<()> {
        Ok(())
    }
    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        Ok(())
    }

    /// Unit enum variant → 4-byte unsigned discriminant (variant index)
    fn serialize_unit_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
    ) -> Result<()> {
        self.enc.write_u32(variant_index)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        name: &'static str,
        value: &T,
    ) -> Result<()> {
        if name == crate::FIXED_OPAQUE_TOKEN {
            self.fixed_opaque = true;
            let res = value.serialize(&mut *self);
            self.fixed_opaque = false;
            res
        } else if name == crate::TIMESTAMP_TOKEN {
            self.timestamp = true;
            let res = value.serialize(&mut *self);
            self.timestamp = false;
            res
        } else {
            value.serialize(self)
        }
    }

    /// Enum newtype variant → 4-byte discriminant + encoded inner value
    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<()> {
        self.enc.write_u32(variant_index)?;
        value.serialize(self)
    }

    /// XDR variable-length array → 4-byte element count + elements
    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        let len = len.ok_or_else(|| {
            Error::unsupported(
                "sequence length must be known before serialization",
                self.position(),
            )
        })?;
        self.enc.write_count(len)?;
        Ok(self)
    }

    /// XDR fixed-length array / structure — elements without a length prefix
    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Ok(self)
    }
    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct> {
        Ok(self)
    }

    /// Enum tuple variant → 4-byte discriminant + fields (no inner length prefix)
    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        self.enc.write_u32(variant_index)?;
        Ok(self)
    }

    /// Map → 4-byte pair count + key/value pairs in encoded-key order
    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(MapSerializer {
            ser: self,
            entries: Vec::new(),
            pending_key: None,
        })
    }

    /// XDR structure — fields encoded consecutively, no count prefix
    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Ok(self)
    }

    /// Enum struct variant → 4-byte discriminant + fields consecutively
    fn serialize_struct_variant(
        self,
        _name: &'static str,
        variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        self.enc.write_u32(variant_index)?;
        Ok(self)
    }
}

// ── Compound serializer impls ──────────────────────────────────────────────

macro_rules! forward_serialize_element {
    ($t:ty, $method:ident) => {
        impl<'a, W: Write> $t for &'a mut Serializer<W> {
            type Ok = ();
            type Error = Error;
            fn $method<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
                value.serialize(&mut **self)
            }
            fn end(self) -> Result<()> {
                Ok(())
            }
        }
    };
}

macro_rules! forward_serialize_field {
    ($t:ty) => {
        impl<'a, W: Write> $t for &'a mut Serializer<W> {
            type Ok = ();
            type Error = Error;
            fn serialize_field<T: Serialize + ?Sized>(
                &mut self,
                key: &'static str,
                value: &T,
            ) -> Result<()> {
                tracing::trace!(field = key, offset = self.position(), "xdr encode field");
                value.serialize(&mut **self)
            }
            fn end(self) -> Result<()> {
                Ok(())
            }
        }
    };
}

forward_serialize_element!(ser::SerializeSeq, serialize_element);
forward_serialize_element!(ser::SerializeTuple, serialize_element);
forward_serialize_element!(ser::SerializeTupleStruct, serialize_field);
forward_serialize_element!(ser::SerializeTupleVariant, serialize_field);
forward_serialize_field!(ser::SerializeStruct);
forward_serialize_field!(ser::SerializeStructVariant);

// ── MapSerializer ──────────────────────────────────────────────────────────
//
// A map's native iteration order is not stable (HashMap), so each entry is
// encoded into its own buffer and the pairs are written sorted by encoded key
// bytes once the map ends. Two encodes of the same logical map are therefore
// byte-identical.

pub struct MapSerializer<'a, W> {
    ser: &'a mut Serializer<W>,
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    pending_key: Option<Vec<u8>>,
}

impl<W: Write> MapSerializer<'_, W> {
    fn encode_scratch<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let mut scratch = Serializer::new(Vec::new());
        // Nothing buffered has reached the writer yet.
        value
            .serialize(&mut scratch)
            .map_err(|e| e.with_offset(self.ser.position()))?;
        Ok(scratch.into_writer())
    }
}

impl<W: Write> ser::SerializeMap for MapSerializer<'_, W> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<()> {
        self.pending_key = Some(self.encode_scratch(key)?);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let key = self.pending_key.take().ok_or_else(|| {
            Error::unsupported("map value serialized before its key", self.ser.position())
        })?;
        let value = self.encode_scratch(value)?;
        self.entries.push((key, value));
        Ok(())
    }

    fn end(mut self) -> Result<()> {
        self.entries.sort_by(|a, b| a.0.cmp(&b.0));
        let enc = &mut self.ser.enc;
        enc.write_count(self.entries.len())?;
        for (key, value) in &self.entries {
            enc.write_all(key)?;
            enc.write_all(value)?;
        }
        Ok(())
    }
}
