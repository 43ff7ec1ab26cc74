use crate::value::FieldType;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended cleanly on a frame boundary.
    #[error("connection closed")]
    ConnectionClosed,

    /// The stream ended in the middle of a frame.
    #[error("stream truncated mid-frame ({buffered} bytes of an incomplete frame buffered)")]
    TruncatedStream { buffered: usize },

    /// A string field did not contain valid UTF-8.
    #[error("malformed string field: {0}")]
    MalformedString(#[from] std::str::Utf8Error),

    /// The tag is not part of the catalog for this direction.
    #[error("unknown message tag {0}")]
    UnknownTag(u8),

    /// A string length prefix exceeds the configured maximum.
    #[error("string too large ({size} bytes, max {max})")]
    StringTooLarge { size: usize, max: usize },

    /// A value does not match the field type the catalog expects.
    #[error("tag {tag} field {index}: expected {expected}, found {found}")]
    FieldMismatch {
        tag: u8,
        index: usize,
        expected: FieldType,
        found: FieldType,
    },

    /// A frame does not carry the number of fields its tag requires.
    #[error("tag {tag}: expected {expected} fields, found {found}")]
    LayoutMismatch {
        tag: u8,
        expected: usize,
        found: usize,
    },
}

impl FrameError {
    /// Whether this error means the engine's stream has ended.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(
            self,
            FrameError::ConnectionClosed | FrameError::TruncatedStream { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
