//! The XDR base types (RFC 4506 §4.1 – §4.11) over a counted byte cursor.
//!
//! [`Decoder`] and [`Encoder`] are the only places that touch the byte
//! source/sink. Both engines ([`crate::de`], [`crate::ser`], [`crate::shape`])
//! are built on top of them, and callers who want to hand-decode part of a
//! structure can use the public `decode_*` / `encode_*` operations directly.
//!
//! Every operation returns the bytes it consumed (or produced). On failure the
//! error's [`offset`](crate::Error::offset) is the cursor position at the exact
//! point of failure, counting partial reads.
//!
//! ```rust
//! use xdr_codec::{Decoder, ErrorKind};
//!
//! let mut dec = Decoder::new(&[0x00u8, 0x00, 0x00, 0x03, b'x', b'd', b'r', 0x00][..]);
//! assert_eq!(dec.decode_string().unwrap(), ("xdr".to_string(), 8));
//!
//! let mut dec = Decoder::new(&[0x7fu8, 0xff, 0xff][..]);
//! let err = dec.decode_hyper().unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Io);
//! assert_eq!(err.offset(), 3);
//! ```

use crate::MAX_OPAQUE_LEN;
use crate::error::{Error, Result};
use std::io::{self, Read, Write};
use tracing::trace;

const PADDING: [u8; 3] = [0; 3];

/// Number of zero bytes that follow `len` payload bytes on the wire.
pub(crate) const fn padding_len(len: usize) -> usize {
    (4 - len % 4) % 4
}

// ── Decoder ────────────────────────────────────────────────────────────────

/// Reads XDR base types from any `std::io::Read` source.
pub struct Decoder<R> {
    reader: R,
    pos: usize,
    max_read_size: Option<usize>,
}

impl<R: Read> Decoder<R> {
    pub fn new(reader: R) -> Self {
        Decoder {
            reader,
            pos: 0,
            max_read_size: None,
        }
    }

    /// Reject any length prefix or element count above `max` with
    /// [`ErrorKind::Overflow`](crate::ErrorKind::Overflow), in addition to the
    /// fixed [`MAX_OPAQUE_LEN`] ceiling.
    pub fn with_max_read_size(mut self, max: usize) -> Self {
        self.max_read_size = Some(max);
        self
    }

    /// Bytes consumed since the decoder was created.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    // ── Raw reads ──────────────────────────────────────────────────────────

    /// Fill `buf` completely, advancing the cursor by every byte actually read.
    fn read_full(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => return Err(Error::unexpected_eof(buf.len(), filled, self.pos)),
                Ok(n) => {
                    filled += n;
                    self.pos += n;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::io(e, self.pos)),
            }
        }
        Ok(())
    }

    fn read_block<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut block = [0u8; N];
        self.read_full(&mut block)?;
        Ok(block)
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.read_block()?))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_block()?))
    }

    pub(crate) fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.read_block()?))
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.read_block()?))
    }

    pub(crate) fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_be_bytes(self.read_block()?))
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_be_bytes(self.read_block()?))
    }

    pub(crate) fn read_bool(&mut self) -> Result<bool> {
        match self.read_u32()? {
            0 => Ok(false),
            1 => Ok(true),
            v => Err(Error::bad_enum(
                format!("invalid bool encoding {v} (must be 0 or 1)"),
                self.pos,
            )),
        }
    }

    pub(crate) fn read_enum(&mut self, allowed: &[i32]) -> Result<i32> {
        let v = self.read_i32()?;
        if allowed.contains(&v) {
            Ok(v)
        } else {
            Err(Error::bad_enum(
                format!("enum value {v} is not one of {allowed:?}"),
                self.pos,
            ))
        }
    }

    /// Check a payload length against the ceilings before any payload byte is
    /// read.
    fn check_len(&self, len: usize) -> Result<()> {
        let padded = (len as u64).saturating_add(padding_len(len) as u64);
        if padded > MAX_OPAQUE_LEN as u64 {
            return Err(Error::overflow(
                format!("opaque length {len} exceeds maximum {MAX_OPAQUE_LEN}"),
                self.pos,
            ));
        }
        self.check_limit(len)
    }

    fn check_limit(&self, n: usize) -> Result<()> {
        match self.max_read_size {
            Some(max) if n > max => Err(Error::overflow(
                format!("size {n} exceeds configured maximum {max}"),
                self.pos,
            )),
            _ => Ok(()),
        }
    }

    /// Read a 4-byte opaque/string length prefix and validate it.
    pub(crate) fn read_len(&mut self) -> Result<usize> {
        let len = self.read_u32()? as usize;
        trace!(len, offset = self.pos, "xdr length prefix");
        self.check_len(len)?;
        Ok(len)
    }

    /// Read a 4-byte array/map element count and validate it.
    pub(crate) fn read_count(&mut self) -> Result<usize> {
        let count = self.read_u32()?;
        trace!(count, offset = self.pos, "xdr element count");
        if count > i32::MAX as u32 {
            return Err(Error::overflow(
                format!("element count {count} exceeds maximum {}", i32::MAX),
                self.pos,
            ));
        }
        let count = count as usize;
        self.check_limit(count)?;
        Ok(count)
    }

    /// Read `len` payload bytes plus their padding.
    ///
    /// The buffer grows with the bytes actually delivered, so a bogus length
    /// prefix on a short stream costs no more memory than the stream holds.
    pub(crate) fn read_padded(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        let res = Read::by_ref(&mut self.reader)
            .take(len as u64)
            .read_to_end(&mut data);
        self.pos += data.len();
        if let Err(e) = res {
            return Err(Error::io(e, self.pos));
        }
        if data.len() < len {
            return Err(Error::unexpected_eof(len, data.len(), self.pos));
        }
        let mut pad = [0u8; 3];
        self.read_full(&mut pad[..padding_len(len)])?;
        Ok(data)
    }

    pub(crate) fn read_fixed_opaque(&mut self, len: usize) -> Result<Vec<u8>> {
        self.check_len(len)?;
        self.read_padded(len)
    }

    pub(crate) fn read_opaque(&mut self) -> Result<Vec<u8>> {
        let len = self.read_len()?;
        self.read_padded(len)
    }

    pub(crate) fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_opaque()?;
        String::from_utf8(bytes).map_err(|e| {
            Error::new(crate::ErrorKind::InvalidUtf8, e.to_string(), self.pos)
        })
    }

    // ── Public single-primitive operations ─────────────────────────────────

    fn measured<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<(T, usize)> {
        let start = self.pos;
        let value = op(self)?;
        Ok((value, self.pos - start))
    }

    /// XDR signed integer (§4.1).
    pub fn decode_int(&mut self) -> Result<(i32, usize)> {
        self.measured(Self::read_i32)
    }

    /// XDR unsigned integer (§4.2).
    pub fn decode_uint(&mut self) -> Result<(u32, usize)> {
        self.measured(Self::read_u32)
    }

    /// XDR hyper integer (§4.5).
    pub fn decode_hyper(&mut self) -> Result<(i64, usize)> {
        self.measured(Self::read_i64)
    }

    /// XDR unsigned hyper integer (§4.5).
    pub fn decode_uhyper(&mut self) -> Result<(u64, usize)> {
        self.measured(Self::read_u64)
    }

    /// XDR boolean (§4.4). Anything but 0 or 1 is a bad enum value.
    pub fn decode_bool(&mut self) -> Result<(bool, usize)> {
        self.measured(Self::read_bool)
    }

    pub fn decode_float(&mut self) -> Result<(f32, usize)> {
        self.measured(Self::read_f32)
    }

    pub fn decode_double(&mut self) -> Result<(f64, usize)> {
        self.measured(Self::read_f64)
    }

    /// XDR enumeration (§4.3). The value must be a member of `allowed`; an
    /// empty allow-list rejects everything.
    pub fn decode_enum(&mut self, allowed: &[i32]) -> Result<(i32, usize)> {
        self.measured(|d| d.read_enum(allowed))
    }

    /// Fixed-length opaque data of `len` bytes (§4.9).
    pub fn decode_fixed_opaque(&mut self, len: usize) -> Result<(Vec<u8>, usize)> {
        self.measured(|d| d.read_fixed_opaque(len))
    }

    /// Variable-length opaque data (§4.10).
    pub fn decode_opaque(&mut self) -> Result<(Vec<u8>, usize)> {
        self.measured(Self::read_opaque)
    }

    /// XDR string (§4.11).
    pub fn decode_string(&mut self) -> Result<(String, usize)> {
        self.measured(Self::read_string)
    }
}

// ── Encoder ────────────────────────────────────────────────────────────────

/// Writes XDR base types into any `std::io::Write` sink.
pub struct Encoder<W> {
    writer: W,
    pos: usize,
}

impl<W: Write> Encoder<W> {
    pub fn new(writer: W) -> Self {
        Encoder { writer, pos: 0 }
    }

    /// Bytes written since the encoder was created.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    // ── Raw writes ─────────────────────────────────────────────────────────

    pub(crate) fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut written = 0;
        while written < bytes.len() {
            match self.writer.write(&bytes[written..]) {
                Ok(0) => {
                    return Err(Error::io(
                        io::Error::from(io::ErrorKind::WriteZero),
                        self.pos,
                    ));
                }
                Ok(n) => {
                    written += n;
                    self.pos += n;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::io(e, self.pos)),
            }
        }
        Ok(())
    }

    pub(crate) fn write_i32(&mut self, v: i32) -> Result<()> {
        self.write_all(&v.to_be_bytes())
    }

    pub(crate) fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write_all(&v.to_be_bytes())
    }

    pub(crate) fn write_i64(&mut self, v: i64) -> Result<()> {
        self.write_all(&v.to_be_bytes())
    }

    pub(crate) fn write_u64(&mut self, v: u64) -> Result<()> {
        self.write_all(&v.to_be_bytes())
    }

    pub(crate) fn write_f32(&mut self, v: f32) -> Result<()> {
        self.write_all(&v.to_be_bytes())
    }

    pub(crate) fn write_f64(&mut self, v: f64) -> Result<()> {
        self.write_all(&v.to_be_bytes())
    }

    pub(crate) fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_u32(u32::from(v))
    }

    pub(crate) fn write_enum(&mut self, v: i32, allowed: &[i32]) -> Result<()> {
        if !allowed.contains(&v) {
            return Err(Error::bad_enum(
                format!("enum value {v} is not one of {allowed:?}"),
                self.pos,
            ));
        }
        self.write_i32(v)
    }

    /// Write `bytes` followed by enough zero bytes to reach a 4-byte boundary.
    pub(crate) fn write_padded(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_all(bytes)?;
        self.write_all(&PADDING[..padding_len(bytes.len())])
    }

    fn check_len(&self, len: usize) -> Result<()> {
        if len + padding_len(len) > MAX_OPAQUE_LEN {
            return Err(Error::overflow(
                format!("opaque length {len} exceeds maximum {MAX_OPAQUE_LEN}"),
                self.pos,
            ));
        }
        Ok(())
    }

    /// Array/map element count prefix.
    pub(crate) fn write_count(&mut self, count: usize) -> Result<()> {
        if count > i32::MAX as usize {
            return Err(Error::overflow(
                format!("element count {count} exceeds maximum {}", i32::MAX),
                self.pos,
            ));
        }
        self.write_u32(count as u32)
    }

    pub(crate) fn write_fixed_opaque(&mut self, bytes: &[u8]) -> Result<()> {
        self.check_len(bytes.len())?;
        self.write_padded(bytes)
    }

    /// Variable-length opaque: 4-byte length + padded data.
    pub(crate) fn write_opaque(&mut self, bytes: &[u8]) -> Result<()> {
        self.check_len(bytes.len())?;
        self.write_u32(bytes.len() as u32)?;
        self.write_padded(bytes)
    }

    // ── Public single-primitive operations ─────────────────────────────────

    fn measured(&mut self, op: impl FnOnce(&mut Self) -> Result<()>) -> Result<usize> {
        let start = self.pos;
        op(self)?;
        Ok(self.pos - start)
    }

    pub fn encode_int(&mut self, v: i32) -> Result<usize> {
        self.measured(|e| e.write_i32(v))
    }

    pub fn encode_uint(&mut self, v: u32) -> Result<usize> {
        self.measured(|e| e.write_u32(v))
    }

    pub fn encode_hyper(&mut self, v: i64) -> Result<usize> {
        self.measured(|e| e.write_i64(v))
    }

    pub fn encode_uhyper(&mut self, v: u64) -> Result<usize> {
        self.measured(|e| e.write_u64(v))
    }

    pub fn encode_bool(&mut self, v: bool) -> Result<usize> {
        self.measured(|e| e.write_bool(v))
    }

    pub fn encode_float(&mut self, v: f32) -> Result<usize> {
        self.measured(|e| e.write_f32(v))
    }

    pub fn encode_double(&mut self, v: f64) -> Result<usize> {
        self.measured(|e| e.write_f64(v))
    }

    /// Nothing is written when `v` is not a member of `allowed`.
    pub fn encode_enum(&mut self, v: i32, allowed: &[i32]) -> Result<usize> {
        self.measured(|e| e.write_enum(v, allowed))
    }

    /// Fixed-length opaque: the bytes and their padding, no length prefix.
    pub fn encode_fixed_opaque(&mut self, bytes: &[u8]) -> Result<usize> {
        self.measured(|e| e.write_fixed_opaque(bytes))
    }

    pub fn encode_opaque(&mut self, bytes: &[u8]) -> Result<usize> {
        self.measured(|e| e.write_opaque(bytes))
    }

    pub fn encode_string(&mut self, v: &str) -> Result<usize> {
        self.measured(|e| e.write_opaque(v.as_bytes()))
    }
}
