//! Serde helper module for XDR fixed-length opaque data (RFC 4506 §4.9).
//!
//! Fixed-length opaque is a raw byte array whose size is part of the declared
//! shape. Unlike variable-length opaque it carries **no length prefix**: the
//! bytes are followed only by 0–3 zero bytes up to a 4-byte boundary.
//!
//! Annotate any `[u8; N]` field with `#[serde(with = "xdr_codec::fixed_opaque")]`:
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use xdr_codec::{from_bytes, to_bytes};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! pub struct Verifier {
//!     pub flavor: u32,
//!     #[serde(with = "xdr_codec::fixed_opaque")]
//!     pub body: [u8; 5],
//! }
//!
//! let v = Verifier { flavor: 1, body: [1, 2, 3, 4, 5] };
//! let bytes = to_bytes(&v).unwrap();
//! // 4 bytes (flavor) + 5 bytes + 3 bytes padding
//! assert_eq!(bytes, [0, 0, 0, 1, 1, 2, 3, 4, 5, 0, 0, 0]);
//! assert_eq!(v, from_bytes(&bytes).unwrap());
//! ```
//!
//! Without the annotation serde treats `[u8; N]` as a tuple of N `u8`
//! elements, each of which XDR widens to a 4-byte unsigned int.

use serde::de::{Deserialize, Deserializer, SeqAccess, Visitor};
use serde::ser::{Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

mod private {
    pub trait Sealed {}
}

/// Types that can be encoded as XDR fixed-length opaque data.
///
/// Sealed; only `[u8; N]` implements it.
pub trait FixedOpaque: private::Sealed + Sized {
    /// The byte length on the wire, before padding.
    fn fixed_len() -> usize;
    fn as_bytes(&self) -> &[u8];
    /// Construct from a slice of exactly `fixed_len()` bytes.
    fn from_exact_bytes(bytes: &[u8]) -> Option<Self>;
}

impl<const N: usize> private::Sealed for [u8; N] {}

impl<const N: usize> FixedOpaque for [u8; N] {
    fn fixed_len() -> usize {
        N
    }
    fn as_bytes(&self) -> &[u8] {
        self.as_slice()
    }
    fn from_exact_bytes(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok()
    }
}

/// Serialize `value` as padded raw bytes, no length prefix.
pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: FixedOpaque,
    S: Serializer,
{
    // The XDR serializer arms its fixed-opaque mode on this token, so the
    // inner `serialize_bytes` call skips the length prefix.
    serializer.serialize_newtype_struct(crate::FIXED_OPAQUE_TOKEN, &Bytes(value.as_bytes()))
}

/// Deserialize exactly `T::fixed_len()` bytes plus padding.
pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: FixedOpaque + Deserialize<'de>,
    D: Deserializer<'de>,
{
    deserializer.deserialize_newtype_struct(
        crate::FIXED_OPAQUE_TOKEN,
        FixedOpaqueVisitor::<T>(PhantomData),
    )
}

struct Bytes<'a>(&'a [u8]);

impl Serialize for Bytes<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(self.0)
    }
}

struct FixedOpaqueVisitor<T>(PhantomData<T>);

impl<'de, T: FixedOpaque + Deserialize<'de>> Visitor<'de> for FixedOpaqueVisitor<T> {
    type Value = T;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fixed-length opaque ({} bytes)", T::fixed_len())
    }

    /// The XDR deserializer hands over a deserializer that answers `[u8; N]`'s
    /// tuple request with the padded raw bytes.
    fn visit_newtype_struct<D: Deserializer<'de>>(self, de: D) -> Result<T, D::Error> {
        T::deserialize(de)
    }

    // Fallback paths for self-describing formats.
    fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<T, E> {
        T::from_exact_bytes(v).ok_or_else(|| E::invalid_length(v.len(), &self))
    }
    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<T, A::Error> {
        let mut buf = Vec::with_capacity(T::fixed_len());
        while let Some(b) = seq.next_element::<u8>()? {
            buf.push(b);
        }
        T::from_exact_bytes(&buf).ok_or_else(|| serde::de::Error::invalid_length(buf.len(), &self))
    }
}
