//! Dynamic values for the runtime shape engine.

use chrono::{DateTime, Utc};

/// A decoded (or to-be-encoded) value. Which variant is valid where is decided
/// by the [`Shape`](crate::shape::Shape) it travels with.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Bool(bool),
    Float32(f32),
    Float64(f64),
    String(String),
    /// Fixed or variable-length opaque data.
    Opaque(Vec<u8>),
    Enum(i32),
    /// Fixed or variable-length array.
    Array(Vec<Value>),
    /// Entries in wire order after a decode. Encoding sorts them.
    Map(Vec<(Value, Value)>),
    /// Field values in declaration order.
    Struct(Vec<Value>),
    Timestamp(DateTime<Utc>),
}

impl Value {
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Uint8(_) => "uint8",
            Value::Uint16(_) => "uint16",
            Value::Uint32(_) => "uint32",
            Value::Uint64(_) => "uint64",
            Value::Bool(_) => "bool",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Opaque(_) => "opaque",
            Value::Enum(_) => "enum",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Struct(_) => "struct",
            Value::Timestamp(_) => "timestamp",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Opaque(b) => Some(b),
            _ => None,
        }
    }

    /// Field values of a struct, or elements of an array.
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::Struct(items) | Value::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}
