//! Per-field annotations for the runtime shape engine.
//!
//! A tag is a comma-separated list of `key=value` tokens. A bare `key` means
//! `key=true`. There is no escaping: keys cannot contain `=` and values
//! cannot contain `,`.
//! When a key appears more than once the last occurrence wins.
//!
//! ```rust
//! use xdr_codec::tag::Tag;
//!
//! let tag = Tag::parse("enum=0|1|5,opt");
//! assert_eq!(tag.get("enum"), Some("0|1|5"));
//! assert_eq!(tag.get("opt"), Some("true"));
//! ```

use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Tag key holding an enum allow-list, as `|`-separated `i32` ordinals.
pub const ENUM_KEY: &str = "enum";

/// Parsed key/value annotations of one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    entries: BTreeMap<String, String>,
}

impl Tag {
    pub fn parse(raw: &str) -> Tag {
        let mut tag = Tag::default();
        for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            match token.split_once('=') {
                Some((key, value)) => tag.insert(key.trim(), value.trim()),
                None => tag.insert(token, "true"),
            }
        }
        tag
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Set `key`, replacing any earlier value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// The typed view of a field's tag consumed by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldOptions {
    /// Valid ordinals of an enum-shaped field. `None` accepts any value.
    pub enum_values: Option<Vec<i32>>,
}

impl FieldOptions {
    /// Derive options from a tag. `offset` positions the error of a
    /// malformed option.
    pub fn from_tag(tag: &Tag, offset: usize) -> Result<FieldOptions> {
        let enum_values = match tag.get(ENUM_KEY) {
            Some(list) => Some(parse_enum_values(list, offset)?),
            None => None,
        };
        Ok(FieldOptions { enum_values })
    }
}

fn parse_enum_values(list: &str, offset: usize) -> Result<Vec<i32>> {
    list.split('|')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<i32>().map_err(|_| {
                Error::unsupported(format!("invalid enum ordinal `{v}` in `{list}`"), offset)
            })
        })
        .collect()
}

/// Render an allow-list as a tag value.
pub(crate) fn format_enum_values(values: &[i32]) -> String {
    values
        .iter()
        .map(i32::to_string)
        .collect::<Vec<_>>()
        .join("|")
}
