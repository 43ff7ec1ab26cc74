//! Typed views of catalog frames.

use crate::catalog::{
    self, APPEND, CONTROL_UPDATE, INDEX, PUT_MESSAGE, REQUEST_STATUS, SEEK, SET_PAUSED, SHUTDOWN,
    STATUS_REPLY, USER_TEXT,
};
use crate::codec::Frame;
use crate::error::{FrameError, Result};
use crate::value::{FieldType, Value};

/// Client-assigned identifier linking a status request to its reply.
pub type RequestId = u32;

/// Conversion between a typed message and its frame.
pub trait Message: Sized {
    /// Build the frame for this message.
    fn to_frame(&self) -> Frame;

    /// Interpret a decoded frame.
    fn from_frame(frame: Frame) -> Result<Self>;
}

/// Snapshot returned by the engine for one status request.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusReply {
    pub request_id: RequestId,
    pub playlist_position: u64,
    pub playlist_count: u64,
    pub time_seconds: f64,
    pub paused: bool,
}

/// Unsolicited playback state pushed by the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlUpdate {
    pub playlist_position: u64,
    pub time_seconds: f64,
    pub paused: bool,
}

/// Unsolicited text produced by the engine, e.g. a line typed into its chat box.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UserEvent {
    pub text: String,
}

/// Messages written to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetPaused(bool),
    Seek(f64),
    PutMessage { text: String, fg: u32, bg: u32 },
    Append(String),
    Index(u64),
    RequestStatus(RequestId),
    Shutdown,
}

/// Messages read from the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Status(StatusReply),
    UserText(UserEvent),
    Control(ControlUpdate),
}

impl Command {
    /// The catalog tag for this command.
    pub fn tag(&self) -> u8 {
        match self {
            Command::SetPaused(_) => SET_PAUSED,
            Command::Seek(_) => SEEK,
            Command::PutMessage { .. } => PUT_MESSAGE,
            Command::Append(_) => APPEND,
            Command::Index(_) => INDEX,
            Command::RequestStatus(_) => REQUEST_STATUS,
            Command::Shutdown => SHUTDOWN,
        }
    }
}

impl Event {
    /// The catalog tag for this event.
    pub fn tag(&self) -> u8 {
        match self {
            Event::Status(_) => STATUS_REPLY,
            Event::UserText(_) => USER_TEXT,
            Event::Control(_) => CONTROL_UPDATE,
        }
    }
}

impl Message for Command {
    fn to_frame(&self) -> Frame {
        let fields = match self {
            Command::SetPaused(paused) => vec![Value::from(*paused)],
            Command::Seek(time) => vec![Value::F64(*time)],
            Command::PutMessage { text, fg, bg } => {
                vec![Value::U32(*fg), Value::U32(*bg), Value::Str(text.clone())]
            }
            Command::Append(path) => vec![Value::Str(path.clone())],
            Command::Index(position) => vec![Value::U64(*position)],
            Command::RequestStatus(id) => vec![Value::U32(*id)],
            Command::Shutdown => Vec::new(),
        };
        Frame::new(self.tag(), fields)
    }

    fn from_frame(frame: Frame) -> Result<Self> {
        let tag = frame.tag();
        let mut fields = Fields::new(tag, frame.into_fields())?;
        let command = match tag {
            SET_PAUSED => Command::SetPaused(fields.flag()?),
            SEEK => Command::Seek(fields.f64()?),
            PUT_MESSAGE => {
                let fg = fields.u32()?;
                let bg = fields.u32()?;
                let text = fields.string()?;
                Command::PutMessage { text, fg, bg }
            }
            APPEND => Command::Append(fields.string()?),
            INDEX => Command::Index(fields.u64()?),
            REQUEST_STATUS => Command::RequestStatus(fields.u32()?),
            SHUTDOWN => Command::Shutdown,
            other => return Err(FrameError::UnknownTag(other)),
        };
        Ok(command)
    }
}

impl Message for Event {
    fn to_frame(&self) -> Frame {
        let fields = match self {
            Event::Status(reply) => vec![
                Value::U32(reply.request_id),
                Value::U64(reply.playlist_position),
                Value::U64(reply.playlist_count),
                Value::F64(reply.time_seconds),
                Value::from(reply.paused),
            ],
            Event::UserText(event) => vec![Value::Str(event.text.clone())],
            Event::Control(update) => vec![
                Value::U64(update.playlist_position),
                Value::F64(update.time_seconds),
                Value::from(update.paused),
            ],
        };
        Frame::new(self.tag(), fields)
    }

    fn from_frame(frame: Frame) -> Result<Self> {
        let tag = frame.tag();
        let mut fields = Fields::new(tag, frame.into_fields())?;
        let event = match tag {
            STATUS_REPLY => Event::Status(StatusReply {
                request_id: fields.u32()?,
                playlist_position: fields.u64()?,
                playlist_count: fields.u64()?,
                time_seconds: fields.f64()?,
                paused: fields.flag()?,
            }),
            USER_TEXT => Event::UserText(UserEvent {
                text: fields.string()?,
            }),
            CONTROL_UPDATE => Event::Control(ControlUpdate {
                playlist_position: fields.u64()?,
                time_seconds: fields.f64()?,
                paused: fields.flag()?,
            }),
            other => return Err(FrameError::UnknownTag(other)),
        };
        Ok(event)
    }
}

impl From<StatusReply> for Event {
    fn from(reply: StatusReply) -> Self {
        Event::Status(reply)
    }
}

impl From<ControlUpdate> for Event {
    fn from(update: ControlUpdate) -> Self {
        Event::Control(update)
    }
}

impl From<UserEvent> for Event {
    fn from(event: UserEvent) -> Self {
        Event::UserText(event)
    }
}

/// Sequential typed access to a frame's fields.
struct Fields {
    tag: u8,
    index: usize,
    values: std::vec::IntoIter<Value>,
}

impl Fields {
    fn new(tag: u8, values: Vec<Value>) -> Result<Self> {
        let spec = catalog::lookup(tag).ok_or(FrameError::UnknownTag(tag))?;
        if spec.fields.len() != values.len() {
            return Err(FrameError::LayoutMismatch {
                tag,
                expected: spec.fields.len(),
                found: values.len(),
            });
        }
        Ok(Self {
            tag,
            index: 0,
            values: values.into_iter(),
        })
    }

    fn next(&mut self, expected: FieldType) -> Result<Value> {
        let index = self.index;
        self.index += 1;
        let value = self.values.next().ok_or(FrameError::LayoutMismatch {
            tag: self.tag,
            expected: index + 1,
            found: index,
        })?;
        if value.field_type() == expected {
            Ok(value)
        } else {
            Err(FrameError::FieldMismatch {
                tag: self.tag,
                index,
                expected,
                found: value.field_type(),
            })
        }
    }

    fn flag(&mut self) -> Result<bool> {
        Ok(self.next(FieldType::U8)?.as_u8().is_some_and(|v| v != 0))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(self.next(FieldType::U32)?.as_u32().unwrap_or_default())
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(self.next(FieldType::U64)?.as_u64().unwrap_or_default())
    }

    fn f64(&mut self) -> Result<f64> {
        Ok(self.next(FieldType::F64)?.as_f64().unwrap_or_default())
    }

    fn string(&mut self) -> Result<String> {
        Ok(self.next(FieldType::Str)?.into_string().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::*;
    use crate::catalog::Direction;
    use crate::codec::{decode_frame, encode_frame, FrameConfig};

    fn through_wire<M: Message>(message: &M, direction: Direction) -> M {
        let cfg = FrameConfig::default();
        let mut buf = BytesMut::new();
        encode_frame(&message.to_frame(), &cfg, &mut buf).unwrap();
        let frame = decode_frame(&mut buf, direction, &cfg).unwrap().unwrap();
        assert!(buf.is_empty());
        M::from_frame(frame).unwrap()
    }

    #[test]
    fn every_command_survives_the_wire() {
        let commands = [
            Command::SetPaused(true),
            Command::SetPaused(false),
            Command::Seek(3723.25),
            Command::PutMessage {
                text: "alice: ça va? 👋\0".to_string(),
                fg: 0xFFFF_FFFF,
                bg: 0x0000_0080,
            },
            Command::Append("https://example.invalid/video?id=1".to_string()),
            Command::Index(u64::MAX),
            Command::RequestStatus(7),
            Command::Shutdown,
        ];
        for command in commands {
            assert_eq!(through_wire(&command, Direction::ToEngine), command);
        }
    }

    #[test]
    fn every_event_survives_the_wire() {
        let events = [
            Event::Status(StatusReply {
                request_id: 7,
                playlist_position: 2,
                playlist_count: 5,
                time_seconds: 90.0,
                paused: true,
            }),
            Event::Control(ControlUpdate {
                playlist_position: 1,
                time_seconds: 12.5,
                paused: false,
            }),
            Event::UserText(UserEvent {
                text: "bob:NEXT".to_string(),
            }),
        ];
        for event in events {
            assert_eq!(through_wire(&event, Direction::ToClient), event);
        }
    }

    #[test]
    fn nonzero_paused_byte_is_true() {
        let frame = Frame::new(
            CONTROL_UPDATE,
            vec![Value::U64(0), Value::F64(0.0), Value::U8(2)],
        );
        let Event::Control(update) = Event::from_frame(frame).unwrap() else {
            panic!("expected control update");
        };
        assert!(update.paused);
    }

    #[test]
    fn from_frame_rejects_wrong_field_types() {
        let frame = Frame::new(SEEK, vec![Value::U32(1)]);
        let err = Command::from_frame(frame).unwrap_err();
        assert!(matches!(err, FrameError::FieldMismatch { index: 0, .. }));
    }

    #[test]
    fn from_frame_rejects_wrong_field_count() {
        let frame = Frame::new(USER_TEXT, Vec::new());
        let err = Event::from_frame(frame).unwrap_err();
        assert!(matches!(
            err,
            FrameError::LayoutMismatch {
                expected: 1,
                found: 0,
                ..
            }
        ));
    }

    #[test]
    fn from_frame_rejects_other_direction() {
        let err = Event::from_frame(Command::Shutdown.to_frame()).unwrap_err();
        assert!(matches!(err, FrameError::UnknownTag(SHUTDOWN)));

        let err = Command::from_frame(
            Event::UserText(UserEvent {
                text: String::new(),
            })
            .to_frame(),
        )
        .unwrap_err();
        assert!(matches!(err, FrameError::UnknownTag(USER_TEXT)));
    }

    #[test]
    fn tags_match_catalog() {
        assert_eq!(Command::Index(0).tag(), INDEX);
        assert_eq!(Command::RequestStatus(0).tag(), REQUEST_STATUS);
        assert_eq!(
            Event::from(ControlUpdate {
                playlist_position: 0,
                time_seconds: 0.0,
                paused: false
            })
            .tag(),
            CONTROL_UPDATE
        );
    }
}
