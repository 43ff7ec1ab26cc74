use bytes::{Buf, BufMut, BytesMut};

use crate::catalog::{self, Direction};
use crate::error::{FrameError, Result};
use crate::value::{FieldType, Value};

/// Tag byte that starts every frame.
pub const TAG_SIZE: usize = 1;

/// Size of the length prefix in front of string fields.
pub const STRING_LEN_PREFIX: usize = 4;

/// Default maximum string field size: 16 MiB.
pub const DEFAULT_MAX_STRING_LEN: usize = 16 * 1024 * 1024;

/// A tagged message with typed fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    tag: u8,
    fields: Vec<Value>,
}

impl Frame {
    /// Create a new frame. Fields are checked against the catalog on encode.
    pub fn new(tag: u8, fields: Vec<Value>) -> Self {
        Self { tag, fields }
    }

    /// Create a frame with no fields.
    pub fn empty(tag: u8) -> Self {
        Self::new(tag, Vec::new())
    }

    /// The message tag.
    pub fn tag(&self) -> u8 {
        self.tag
    }

    /// The fields, in wire order.
    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    /// Consume the frame and return its fields.
    pub fn into_fields(self) -> Vec<Value> {
        self.fields
    }

    /// The total wire size of this frame (tag + fields).
    pub fn wire_size(&self) -> usize {
        TAG_SIZE + self.fields.iter().map(Value::encoded_len).sum::<usize>()
    }
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum string field size in bytes. Default: 16 MiB.
    pub max_string_len: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_string_len: DEFAULT_MAX_STRING_LEN,
        }
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────────────────────────────────────────┐
/// │ Tag (1B) │ Fields, in catalog order, no padding          │
/// │          │ u8 | u32 LE | u64 LE | f64 LE | u32 LE + utf8 │
/// └──────────┴──────────────────────────────────────────────┘
/// ```
///
/// Nothing is written to `dst` unless the whole frame is valid.
pub fn encode_frame(frame: &Frame, config: &FrameConfig, dst: &mut BytesMut) -> Result<()> {
    let spec = catalog::lookup(frame.tag).ok_or(FrameError::UnknownTag(frame.tag))?;
    check_fields(frame.tag, spec.fields, &frame.fields, config)?;

    dst.reserve(frame.wire_size());
    dst.put_u8(frame.tag);
    for value in &frame.fields {
        put_value(value, dst);
    }
    Ok(())
}

/// Encode `values` against an explicit field layout, without a tag byte.
pub fn encode_fields(
    tag: u8,
    layout: &[FieldType],
    values: &[Value],
    config: &FrameConfig,
    dst: &mut BytesMut,
) -> Result<()> {
    check_fields(tag, layout, values, config)?;
    for value in values {
        put_value(value, dst);
    }
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Only tags belonging to `direction` are accepted. Returns `Ok(None)` if the
/// buffer doesn't contain a complete frame yet; on success, consumes the
/// frame bytes from the buffer.
pub fn decode_frame(
    src: &mut BytesMut,
    direction: Direction,
    config: &FrameConfig,
) -> Result<Option<Frame>> {
    let Some(&tag) = src.first() else {
        return Ok(None); // Need more data
    };
    let spec = catalog::lookup_in(tag, direction).ok_or(FrameError::UnknownTag(tag))?;

    let mut cursor = &src[TAG_SIZE..];
    let mut fields = Vec::with_capacity(spec.fields.len());
    for &field_type in spec.fields {
        match read_value(&mut cursor, field_type, config.max_string_len)? {
            Some(value) => fields.push(value),
            None => return Ok(None), // Need more data
        }
    }

    let consumed = src.len() - cursor.len();
    src.advance(consumed);
    Ok(Some(Frame { tag, fields }))
}

fn check_fields(
    tag: u8,
    layout: &[FieldType],
    values: &[Value],
    config: &FrameConfig,
) -> Result<()> {
    if layout.len() != values.len() {
        return Err(FrameError::LayoutMismatch {
            tag,
            expected: layout.len(),
            found: values.len(),
        });
    }
    for (index, (&expected, value)) in layout.iter().zip(values).enumerate() {
        let found = value.field_type();
        if expected != found {
            return Err(FrameError::FieldMismatch {
                tag,
                index,
                expected,
                found,
            });
        }
        if let Value::Str(s) = value {
            let max = config.max_string_len.min(u32::MAX as usize);
            if s.len() > max {
                return Err(FrameError::StringTooLarge {
                    size: s.len(),
                    max,
                });
            }
        }
    }
    Ok(())
}

fn put_value(value: &Value, dst: &mut BytesMut) {
    match value {
        Value::U8(v) => dst.put_u8(*v),
        Value::U32(v) => dst.put_u32_le(*v),
        Value::U64(v) => dst.put_u64_le(*v),
        Value::F64(v) => dst.put_f64_le(*v),
        Value::Str(s) => {
            // Length was bounded by `check_fields`.
            dst.put_u32_le(s.len() as u32);
            dst.put_slice(s.as_bytes());
        }
    }
}

fn read_value(
    cursor: &mut &[u8],
    field_type: FieldType,
    max_string_len: usize,
) -> Result<Option<Value>> {
    if let Some(size) = field_type.fixed_size() {
        if cursor.remaining() < size {
            return Ok(None);
        }
    }

    let value = match field_type {
        FieldType::U8 => Value::U8(cursor.get_u8()),
        FieldType::U32 => Value::U32(cursor.get_u32_le()),
        FieldType::U64 => Value::U64(cursor.get_u64_le()),
        FieldType::F64 => Value::F64(cursor.get_f64_le()),
        FieldType::Str => {
            if cursor.remaining() < STRING_LEN_PREFIX {
                return Ok(None);
            }
            let len = (&cursor[..STRING_LEN_PREFIX]).get_u32_le() as usize;
            if len > max_string_len {
                return Err(FrameError::StringTooLarge {
                    size: len,
                    max: max_string_len,
                });
            }
            if cursor.remaining() < STRING_LEN_PREFIX + len {
                return Ok(None);
            }
            cursor.advance(STRING_LEN_PREFIX);
            let text = std::str::from_utf8(&cursor[..len])?.to_owned();
            cursor.advance(len);
            Value::Str(text)
        }
    };
    Ok(Some(value))
}
