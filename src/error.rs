use serde::{de, ser};
use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// The closed set of fault kinds reported by every encode and decode path.
///
/// Callers branch on the kind, never on the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Fewer bytes were available than the operation required, or the sink
    /// rejected a write.
    Io,

    /// A decoded integer does not fit the target width, or a length prefix
    /// exceeds the decodable ceiling.
    Overflow,

    /// A bool, optional-data discriminant or enum ordinal outside its
    /// permitted values.
    BadEnumValue,

    /// The target shape has no XDR mapping, or a value does not match the
    /// shape it is encoded against.
    UnsupportedShape,

    /// A string payload is not valid UTF-8 and cannot populate a `String`.
    InvalidUtf8,

    /// A timestamp payload is not an RFC 3339 date-time.
    ParseTime,

    /// A message raised by a user `Serialize`/`Deserialize` implementation.
    Custom,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Io => "i/o error",
            ErrorKind::Overflow => "overflow",
            ErrorKind::BadEnumValue => "bad enum value",
            ErrorKind::UnsupportedShape => "unsupported shape",
            ErrorKind::InvalidUtf8 => "invalid utf-8",
            ErrorKind::ParseTime => "invalid timestamp",
            ErrorKind::Custom => "error",
        };
        f.write_str(name)
    }
}

/// An XDR fault: what went wrong and how many bytes had been consumed (or
/// produced) when it did.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at byte {}: {message}", .offset.unwrap_or(0))]
pub struct Error {
    kind: ErrorKind,
    message: String,
    offset: Option<usize>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>, offset: usize) -> Self {
        Error {
            kind,
            message: message.into(),
            offset: Some(offset),
        }
    }

    /// An error raised through a serde hook, before the cursor position is known.
    fn unlocated(kind: ErrorKind, message: String) -> Self {
        Error {
            kind,
            message,
            offset: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Bytes consumed (decode) or produced (encode) by the call at the point
    /// of failure.
    pub fn offset(&self) -> usize {
        self.offset.unwrap_or(0)
    }

    /// Pin an error raised without a position to the cursor position `pos`.
    /// Errors that already carry an offset are left untouched.
    pub(crate) fn locate(mut self, pos: usize) -> Self {
        if self.offset.is_none() {
            self.offset = Some(pos);
        }
        self
    }

    /// Re-pin an error raised against a scratch buffer to the real cursor.
    pub(crate) fn with_offset(mut self, pos: usize) -> Self {
        self.offset = Some(pos);
        self
    }

    pub(crate) fn io(err: std::io::Error, offset: usize) -> Self {
        Error::new(ErrorKind::Io, err.to_string(), offset)
    }

    pub(crate) fn unexpected_eof(wanted: usize, got: usize, offset: usize) -> Self {
        Error::new(
            ErrorKind::Io,
            format!("unexpected end of input: wanted {wanted} bytes, got {got}"),
            offset,
        )
    }

    pub(crate) fn overflow(message: impl Into<String>, offset: usize) -> Self {
        Error::new(ErrorKind::Overflow, message, offset)
    }

    pub(crate) fn bad_enum(message: impl Into<String>, offset: usize) -> Self {
        Error::new(ErrorKind::BadEnumValue, message, offset)
    }

    pub(crate) fn unsupported(message: impl Into<String>, offset: usize) -> Self {
        Error::new(ErrorKind::UnsupportedShape, message, offset)
    }
}

impl ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::unlocated(ErrorKind::Custom, msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::unlocated(ErrorKind::Custom, msg.to_string())
    }

    fn invalid_type(unexp: de::Unexpected<'_>, exp: &dyn de::Expected) -> Self {
        Error::unlocated(
            ErrorKind::UnsupportedShape,
            format!("invalid type: {unexp}, expected {exp}"),
        )
    }

    // Derived enums report an out-of-range discriminant through this hook.
    fn invalid_value(unexp: de::Unexpected<'_>, exp: &dyn de::Expected) -> Self {
        Error::unlocated(
            ErrorKind::BadEnumValue,
            format!("invalid value: {unexp}, expected {exp}"),
        )
    }

    fn unknown_variant(variant: &str, expected: &'static [&'static str]) -> Self {
        Error::unlocated(
            ErrorKind::BadEnumValue,
            format!("unknown variant `{variant}`, expected one of {expected:?}"),
        )
    }
}
