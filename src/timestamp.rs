//! Serde helper module for timestamps.
//!
//! XDR has no time type. A timestamp travels as an XDR string holding an
//! RFC 3339 date-time at second precision with a literal `Z` suffix, e.g.
//! `2014-04-04T03:24:48Z`. Sub-second precision is dropped on encode; decode
//! accepts any RFC 3339 date-time and normalizes it to UTC.
//!
//! RFC 3339 only spells years 0000 through 9999. Encoding a date-time outside
//! that range fails with [`ErrorKind::Overflow`](crate::ErrorKind::Overflow).
//!
//! ```rust
//! use chrono::{DateTime, TimeZone, Utc};
//! use serde::{Deserialize, Serialize};
//! use xdr_codec::{from_bytes, to_bytes};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Lease {
//!     #[serde(with = "xdr_codec::timestamp")]
//!     expires: DateTime<Utc>,
//! }
//!
//! let lease = Lease { expires: Utc.timestamp_opt(1396581888, 0).unwrap() };
//! let bytes = to_bytes(&lease).unwrap();
//! assert_eq!(&bytes[4..], b"2014-04-04T03:24:48Z");
//! assert_eq!(lease, from_bytes(&bytes).unwrap());
//! ```

use crate::error::{Error, ErrorKind, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{self, Deserialize, Deserializer, Visitor};
use serde::ser::Serializer;
use std::fmt;

fn render(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// The wire text for `value`, or `Overflow` when its year has no RFC 3339
/// spelling.
pub(crate) fn format(value: &DateTime<Utc>, offset: usize) -> Result<String> {
    let text = render(value);
    check_year(&text, offset)?;
    Ok(text)
}

/// chrono renders years past 9999 or before 0000 with a sign, e.g.
/// `+10000-01-01T00:00:00Z`.
pub(crate) fn check_year(text: &str, offset: usize) -> Result<()> {
    let year = text.as_bytes().get(..5);
    match year {
        Some([y @ .., b'-']) if y.iter().all(u8::is_ascii_digit) => Ok(()),
        _ => Err(Error::overflow(
            format!("`{text}` is outside the RFC 3339 year range 0000-9999"),
            offset,
        )),
    }
}

pub(crate) fn parse(text: &str, offset: usize) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            Error::new(
                ErrorKind::ParseTime,
                format!("`{text}` is not an RFC 3339 date-time: {e}"),
                offset,
            )
        })
}

pub fn serialize<S: Serializer>(
    value: &DateTime<Utc>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_newtype_struct(crate::TIMESTAMP_TOKEN, &render(value))
}

pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<DateTime<Utc>, D::Error> {
    deserializer.deserialize_newtype_struct(crate::TIMESTAMP_TOKEN, TimestampVisitor)
}

struct TimestampVisitor;

impl<'de> Visitor<'de> for TimestampVisitor {
    type Value = DateTime<Utc>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an RFC 3339 date-time string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
        DateTime::parse_from_rfc3339(v)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(E::custom)
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> std::result::Result<Self::Value, D::Error> {
        let text = String::deserialize(deserializer)?;
        self.visit_str(&text)
    }
}
