//! XDR Deserializer (RFC 4506)
//!
//! The [`Deserializer`] pulls from any `std::io::Read` source through a
//! counting [`Decoder`], so every entry point can report exactly how many bytes
//! it consumed, including when it fails.

use crate::error::{Error, ErrorKind, Result};
use crate::primitive::Decoder;
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, EnumAccess, MapAccess, SeqAccess, VariantAccess,
    Visitor,
};
use std::fmt;
use std::io::Read;
use tracing::{debug, trace};

/// Deserialize a value from XDR bytes. Trailing bytes are ignored.
pub fn from_bytes<T: DeserializeOwned>(input: &[u8]) -> Result<T> {
    Deserializer::new(input).decode()
}

/// Deserialize a value from XDR bytes, also returning remaining unconsumed bytes.
pub fn from_bytes_partial<T: DeserializeOwned>(input: &[u8]) -> Result<(T, &[u8])> {
    let mut de = Deserializer::new(input);
    let value = de.decode()?;
    Ok((value, &input[de.position()..]))
}

/// Deserialize a value from `reader`, returning it with the number of bytes read.
///
/// On failure the error's offset is the number of bytes read before the fault.
pub fn from_reader<R: Read, T: DeserializeOwned>(reader: R) -> Result<(T, usize)> {
    let mut de = Deserializer::new(reader);
    let value = de.decode()?;
    Ok((value, de.position()))
}

/// Decode into a target the caller allocated, returning the number of bytes read.
///
/// Treat `place` as unreliable after an error.
pub fn decode_into<R: Read, T: DeserializeOwned>(reader: R, place: &mut T) -> Result<usize> {
    Deserializer::new(reader).decode_into(place)
}

/// The XDR deserializer. Reads from any `R: Read`, maintaining a byte cursor.
pub struct Deserializer<R> {
    dec: Decoder<R>,
}

impl<R: Read> Deserializer<R> {
    pub fn new(reader: R) -> Self {
        Deserializer {
            dec: Decoder::new(reader),
        }
    }

    /// Cap every length prefix and element count at `max`.
    pub fn with_max_read_size(self, max: usize) -> Self {
        Deserializer {
            dec: self.dec.with_max_read_size(max),
        }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.dec.position()
    }

    pub fn into_inner(self) -> R {
        self.dec.into_inner()
    }

    /// Decode one whole value.
    pub fn decode<T: DeserializeOwned>(&mut self) -> Result<T> {
        let res = T::deserialize(&mut *self);
        self.finish(res)
    }

    /// Decode one whole value into `place`, returning the bytes it consumed.
    pub fn decode_into<T: DeserializeOwned>(&mut self, place: &mut T) -> Result<usize> {
        let start = self.position();
        let res = T::deserialize_in_place(&mut *self, place);
        self.finish(res)?;
        Ok(self.position() - start)
    }

    fn finish<T>(&self, res: Result<T>) -> Result<T> {
        res.map_err(|err| {
            let err = err.locate(self.position());
            debug!(kind = ?err.kind(), offset = err.offset(), "xdr decode failed");
            err
        })
    }

    fn narrow<S, T>(&self, v: S, target: &str) -> Result<T>
    where
        S: Copy + fmt::Display,
        T: TryFrom<S>,
    {
        T::try_from(v).map_err(|_| {
            Error::overflow(format!("{v} does not fit in {target}"), self.position())
        })
    }
}

// ── Main Deserializer impl ─────────────────────────────────────────────────

impl<'de, R: Read> de::Deserializer<'de> for &mut Deserializer<R> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::unsupported(
            "deserialize_any (XDR is not self-describing)",
            self.position(),
        ))
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_bool(self.dec.read_bool()?)
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let v = self.dec.read_i32()?;
        visitor.visit_i8(self.narrow(v, "i8")?)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let v = self.dec.read_i32()?;
        visitor.visit_i16(self.narrow(v, "i16")?)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i32(self.dec.read_i32()?)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_i64(self.dec.read_i64()?)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let v = self.dec.read_u32()?;
        visitor.visit_u8(self.narrow(v, "u8")?)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let v = self.dec.read_u32()?;
        visitor.visit_u16(self.narrow(v, "u16")?)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u32(self.dec.read_u32()?)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_u64(self.dec.read_u64()?)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_f32(self.dec.read_f32()?)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_f64(self.dec.read_f64()?)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let v = self.dec.read_u32()?;
        let c = char::from_u32(v).ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidUtf8,
                format!("{v:#x} is not a unicode scalar value"),
                self.position(),
            )
        })?;
        visitor.visit_char(c)
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_string(self.dec.read_string()?)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_byte_buf(self.dec.read_opaque()?)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.dec.read_u32()? {
            0 => visitor.visit_none(),
            1 => visitor.visit_some(self),
            v => Err(Error::bad_enum(
                format!("invalid optional discriminant {v} (must be 0 or 1)"),
                self.position(),
            )),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        if name == crate::FIXED_OPAQUE_TOKEN {
            visitor.visit_newtype_struct(FixedOpaqueDeserializer { de: self })
        } else if name == crate::TIMESTAMP_TOKEN {
            let text = self.dec.read_string()?;
            crate::timestamp::parse(&text, self.position())?;
            visitor.visit_string(text)
        } else {
            visitor.visit_newtype_struct(self)
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let count = self.dec.read_count()?;
        visitor.visit_seq(SeqDeserializer::new(self, count))
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value> {
        // Fixed-length: no count prefix
        visitor.visit_seq(SeqDeserializer::new(self, len))
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_seq(SeqDeserializer::new(self, len))
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        let count = self.dec.read_count()?;
        visitor.visit_map(MapDeserializer {
            de: self,
            remaining: count,
        })
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        // XDR structure: fields in order, no count prefix
        visitor.visit_seq(SeqDeserializer::with_fields(self, fields))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_enum(EnumDeserializer { de: self })
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        // Identifiers are discriminants in XDR context — read as u32
        visitor.visit_u32(self.dec.read_u32()?)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::unsupported(
            "deserialize_ignored_any (XDR is not self-describing)",
            self.position(),
        ))
    }
}

// ── SeqDeserializer: fixed count ───────────────────────────────────────────

struct SeqDeserializer<'a, R> {
    de: &'a mut Deserializer<R>,
    remaining: usize,
    fields: &'static [&'static str],
}

impl<'a, R: Read> SeqDeserializer<'a, R> {
    fn new(de: &'a mut Deserializer<R>, count: usize) -> Self {
        SeqDeserializer {
            de,
            remaining: count,
            fields: &[],
        }
    }

    fn with_fields(de: &'a mut Deserializer<R>, fields: &'static [&'static str]) -> Self {
        SeqDeserializer {
            de,
            remaining: fields.len(),
            fields,
        }
    }
}

impl<'de, R: Read> SeqAccess<'de> for SeqDeserializer<'_, R> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        if !self.fields.is_empty() {
            let field = self.fields[self.fields.len() - self.remaining];
            trace!(field, offset = self.de.position(), "xdr decode field");
        }
        self.remaining -= 1;
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

// ── MapDeserializer ────────────────────────────────────────────────────────

struct MapDeserializer<'a, R> {
    de: &'a mut Deserializer<R>,
    remaining: usize,
}

impl<'de, R: Read> MapAccess<'de> for MapDeserializer<'_, R> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        seed.deserialize(&mut *self.de).map(Some)
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        seed.deserialize(&mut *self.de)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.remaining)
    }
}

// ── EnumDeserializer ───────────────────────────────────────────────────────

struct EnumDeserializer<'a, R> {
    de: &'a mut Deserializer<R>,
}

impl<'de, 'a, R: Read> EnumAccess<'de> for EnumDeserializer<'a, R> {
    type Error = Error;
    type Variant = Self;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let variant_index = self.de.dec.read_u32()?;
        // An index past the last variant is rejected by the seed through
        // `Error::invalid_value`, i.e. as a bad enum value.
        let val = seed.deserialize(de::value::U32Deserializer::<Error>::new(variant_index))?;
        Ok((val, self))
    }
}

impl<'de, R: Read> VariantAccess<'de> for EnumDeserializer<'_, R> {
    type Error = Error;

    /// Unit variant — no data follows the discriminant
    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    /// Newtype variant — deserialize the inner value
    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        seed.deserialize(self.de)
    }

    /// Tuple variant — deserialize a fixed-length sequence of fields
    fn tuple_variant<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value> {
        visitor.visit_seq(SeqDeserializer::new(self.de, len))
    }

    /// Struct variant — deserialize fields consecutively by name list length
    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_seq(SeqDeserializer::with_fields(self.de, fields))
    }
}

// ── FixedOpaqueDeserializer ────────────────────────────────────────────────
//
// Handed to the fixed-opaque visitor. `[u8; N]` asks for a tuple of N
// elements; that is answered by reading N bytes plus padding in one go and
// replaying them as a sequence of u8.

struct FixedOpaqueDeserializer<'a, R> {
    de: &'a mut Deserializer<R>,
}

impl<'de, R: Read> de::Deserializer<'de> for FixedOpaqueDeserializer<'_, R> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value> {
        Err(Error::unsupported(
            "fixed opaque data must be a byte array",
            self.de.position(),
        ))
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, len: usize, visitor: V) -> Result<V::Value> {
        let bytes = self.de.dec.read_fixed_opaque(len)?;
        visitor.visit_seq(de::value::SeqDeserializer::<_, Error>::new(
            bytes.into_iter(),
        ))
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple_struct
        map struct enum identifier ignored_any
    }
}
