//! # xdr-codec
//!
//! XDR (eXternal Data Representation, RFC 4506) encoding and decoding driven
//! by the declared shape of a value, with exact byte accounting.
//!
//! ## Overview
//!
//! XDR is the wire encoding used by ONC RPC protocols such as NFS. All values
//! are big-endian (network byte order), and every item occupies a multiple of
//! 4 bytes (padded with zeroes as needed).
//!
//! The crate has three layers:
//!
//! * [`primitive`]: [`Decoder`] / [`Encoder`], the eleven XDR base types over
//!   a counted cursor. Usable directly for hand-written codecs.
//! * [`ser`] / [`de`]: a `serde` front end. Shapes come from
//!   `#[derive(Serialize, Deserialize)]`.
//! * [`shape`]: a runtime front end. Shapes come from a [`Shape`] value, and
//!   struct fields carry [`tag`] annotations such as an enum allow-list.
//!
//! Every call reports the bytes it consumed or produced; every failure
//! carries an [`ErrorKind`] and the exact [offset](Error::offset) at which it
//! happened.
//!
//! ## Serde type mapping
//!
//! | Rust / serde type | XDR encoding |
//! |-------------------|--------------|
//! | `bool`            | 4-byte unsigned int: 0 (false) or 1 (true) |
//! | `i8`, `i16`, `i32` | 4-byte signed int (range-checked on decode) |
//! | `i64`             | 8-byte hyper integer |
//! | `u8`, `u16`, `u32` | 4-byte unsigned int (range-checked on decode) |
//! | `u64`             | 8-byte unsigned hyper integer |
//! | `f32`             | 4-byte IEEE 754 single-precision float |
//! | `f64`             | 8-byte IEEE 754 double-precision float |
//! | `char`            | 4-byte unsigned int (Unicode scalar) |
//! | `String`          | 4-byte length + UTF-8 bytes + 0-3 zero-padding bytes |
//! | `serde_bytes` buffers | 4-byte length + bytes + 0-3 zero-padding bytes |
//! | `[u8; N]` with [`fixed_opaque`] | N bytes + 0-3 zero-padding bytes |
//! | `DateTime<Utc>` with [`timestamp`] | string, RFC 3339 at second precision |
//! | `Option<T>`       | 4-byte bool discriminant + optional encoded T |
//! | `()` / unit struct | 0 bytes (XDR void) |
//! | Unit enum variant | 4-byte unsigned discriminant (variant index) |
//! | Newtype variant   | 4-byte discriminant + encoded inner value |
//! | Tuple/struct variant | 4-byte discriminant + fields consecutively |
//! | `Vec<T>` / seq    | 4-byte count + encoded elements |
//! | Tuple / `[T; N]`  | elements encoded consecutively (no count prefix) |
//! | Struct            | fields encoded consecutively (no count prefix) |
//! | Map               | 4-byte count + pairs sorted by encoded key bytes |
//!
//! ## Example
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use xdr_codec::{ErrorKind, from_bytes, from_reader, to_bytes};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct FileHandle {
//!     inode: u64,
//!     generation: u32,
//!     flags: u8,
//! }
//!
//! let fh = FileHandle { inode: 0x0102030405060708, generation: 42, flags: 0 };
//!
//! let bytes = to_bytes(&fh).unwrap();
//! assert_eq!(bytes.len(), 16); // 8 + 4 + 4
//!
//! let (decoded, n) = from_reader::<_, FileHandle>(&bytes[..]).unwrap();
//! assert_eq!((decoded, n), (fh, 16));
//!
//! // 256 does not fit the u8 `flags` field.
//! let mut bad = bytes.clone();
//! bad[14] = 1;
//! let err = from_bytes::<FileHandle>(&bad).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Overflow);
//! assert_eq!(err.offset(), 16);
//! ```

pub mod de;
pub mod error;
pub mod fixed_opaque;
pub mod primitive;
pub mod ser;
pub mod shape;
pub mod tag;
pub mod timestamp;
pub mod value;

pub use de::{Deserializer, decode_into, from_bytes, from_bytes_partial, from_reader};
pub use error::{Error, ErrorKind, Result};
pub use primitive::{Decoder, Encoder};
pub use ser::{Serializer, to_bytes, to_writer};
pub use shape::{Field, Shape};
pub use value::Value;

pub use serde::{Deserialize, Serialize};

/// Largest opaque/string payload, padding included, that will be decoded or
/// encoded.
pub const MAX_OPAQUE_LEN: usize = i32::MAX as usize;

/// Largest wire count the shape engine accepts for an array or map whose
/// elements occupy no bytes (e.g. an empty struct). Such elements are not
/// bounded by the input length, so they get their own ceiling.
pub const MAX_EMPTY_ELEMENTS: usize = 1 << 16;

/// Newtype-struct name the [`fixed_opaque`] helpers use to reach the XDR
/// serializer and deserializer.
pub(crate) const FIXED_OPAQUE_TOKEN: &str = "$xdr_codec::FixedOpaque";

/// Newtype-struct name the [`timestamp`] helpers use to reach the XDR
/// serializer and deserializer.
pub(crate) const TIMESTAMP_TOKEN: &str = "$xdr_codec::Timestamp";
