//! Typed field values carried by frames.

use std::fmt;

/// Wire type of a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// 8-bit unsigned integer.
    U8,
    /// 32-bit unsigned integer, little-endian.
    U32,
    /// 64-bit unsigned integer, little-endian.
    U64,
    /// IEEE-754 double, little-endian.
    F64,
    /// u32 length prefix followed by that many UTF-8 bytes.
    Str,
}

impl FieldType {
    /// Encoded size for fixed-width types, `None` for strings.
    pub const fn fixed_size(self) -> Option<usize> {
        match self {
            FieldType::U8 => Some(1),
            FieldType::U32 => Some(4),
            FieldType::U64 | FieldType::F64 => Some(8),
            FieldType::Str => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::U8 => "u8",
            FieldType::U32 => "u32",
            FieldType::U64 => "u64",
            FieldType::F64 => "f64",
            FieldType::Str => "str",
        };
        f.write_str(name)
    }
}

/// A decoded or to-be-encoded field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    U32(u32),
    U64(u64),
    F64(f64),
    Str(String),
}

impl Value {
    /// The wire type of this value.
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::U8(_) => FieldType::U8,
            Value::U32(_) => FieldType::U32,
            Value::U64(_) => FieldType::U64,
            Value::F64(_) => FieldType::F64,
            Value::Str(_) => FieldType::Str,
        }
    }

    /// Number of bytes this value occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        match self {
            Value::Str(s) => 4 + s.len(),
            other => other.field_type().fixed_size().unwrap_or(0),
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Value::U8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Consume the value, yielding the owned string if it is one.
    pub fn into_string(self) -> Option<String> {
        match self {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::U8(u8::from(v))
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::U8(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::U64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_len_matches_wire_sizes() {
        assert_eq!(Value::U8(1).encoded_len(), 1);
        assert_eq!(Value::U32(1).encoded_len(), 4);
        assert_eq!(Value::U64(1).encoded_len(), 8);
        assert_eq!(Value::F64(1.0).encoded_len(), 8);
        assert_eq!(Value::from("héllo").encoded_len(), 4 + 6);
    }

    #[test]
    fn accessors_only_match_their_type() {
        let v = Value::U64(9);
        assert_eq!(v.as_u64(), Some(9));
        assert_eq!(v.as_u32(), None);
        assert_eq!(v.as_str(), None);
        assert_eq!(Value::from(true), Value::U8(1));
        assert_eq!(Value::from("x").into_string().as_deref(), Some("x"));
    }

    #[test]
    fn field_type_display() {
        assert_eq!(FieldType::Str.to_string(), "str");
        assert_eq!(FieldType::F64.to_string(), "f64");
        assert_eq!(FieldType::Str.fixed_size(), None);
    }
}
