//! Tagged typed-field framing for the moov engine protocol.
//!
//! Every message on the engine's stdin/stdout pipes is one frame:
//! - A 1-byte tag selecting the message and its field layout
//! - The fields in catalog order: `u8`, `u32`/`u64`/`f64` little-endian, or a
//!   `u32` length-prefixed UTF-8 string
//!
//! There is no magic number, no version and no checksum; both ends must agree
//! on the [`catalog`]. No partial reads, no buffer management in user code.

pub mod catalog;
pub mod codec;
pub mod error;
pub mod message;
pub mod reader;
#[cfg(feature = "async")]
pub mod tokio_codec;
pub mod value;
pub mod writer;

pub use catalog::{lookup, lookup_in, tag_name, Direction, MessageSpec, CATALOG};
pub use codec::{
    decode_frame, encode_fields, encode_frame, Frame, FrameConfig, DEFAULT_MAX_STRING_LEN,
};
pub use error::{FrameError, Result};
pub use message::{Command, ControlUpdate, Event, Message, RequestId, StatusReply, UserEvent};
pub use reader::FrameReader;
#[cfg(feature = "async")]
pub use tokio_codec::EngineCodec;
pub use value::{FieldType, Value};
pub use writer::FrameWriter;
