//! `tokio_util::codec` adapter for driving the engine from an async runtime.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::catalog::Direction;
use crate::codec::{decode_frame, encode_frame, Frame, FrameConfig};
use crate::error::FrameError;
use crate::message::Message;

/// Frame codec for `FramedRead` / `FramedWrite`.
///
/// Decodes frames travelling in `direction`; encodes any catalog frame.
#[derive(Debug, Clone)]
pub struct EngineCodec {
    direction: Direction,
    config: FrameConfig,
}

impl EngineCodec {
    /// Codec for the client side: decodes engine replies and events.
    pub fn client() -> Self {
        Self::new(Direction::ToClient, FrameConfig::default())
    }

    /// Codec for the engine side: decodes client commands.
    pub fn engine() -> Self {
        Self::new(Direction::ToEngine, FrameConfig::default())
    }

    pub fn new(direction: Direction, config: FrameConfig) -> Self {
        Self { direction, config }
    }
}

impl Decoder for EngineCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src, self.direction, &self.config)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None if buf.is_empty() => Ok(None),
            None => {
                debug!(buffered = buf.len(), "end of stream inside a frame");
                Err(FrameError::TruncatedStream {
                    buffered: buf.len(),
                })
            }
        }
    }
}

impl Encoder<Frame> for EngineCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item, &self.config, dst)
    }
}

impl<M: Message> Encoder<&M> for EngineCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &M, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item.to_frame(), &self.config, dst)
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;
    use crate::message::{Command, ControlUpdate, Event, UserEvent};

    #[tokio::test]
    async fn framed_write_then_read_commands() {
        let mut sink = FramedWrite::new(Vec::<u8>::new(), EngineCodec::engine());
        sink.send(&Command::Append("a.mkv".to_string()))
            .await
            .unwrap();
        sink.send(&Command::RequestStatus(4)).await.unwrap();
        let bytes = sink.into_inner();

        let mut stream = FramedRead::new(bytes.as_slice(), EngineCodec::engine());
        let first = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(
            Command::from_frame(first).unwrap(),
            Command::Append("a.mkv".to_string())
        );
        assert_eq!(
            Command::from_frame(second).unwrap(),
            Command::RequestStatus(4)
        );
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn truncated_stream_is_an_error() {
        let mut sink = FramedWrite::new(Vec::<u8>::new(), EngineCodec::client());
        sink.send(&Event::UserText(UserEvent {
            text: "cut short".to_string(),
        }))
        .await
        .unwrap();
        let mut bytes = sink.into_inner();
        bytes.truncate(bytes.len() - 3);

        let mut stream = FramedRead::new(bytes.as_slice(), EngineCodec::client());
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, FrameError::TruncatedStream { .. }));
    }

    #[tokio::test]
    async fn client_codec_rejects_commands() {
        let mut sink = FramedWrite::new(Vec::<u8>::new(), EngineCodec::engine());
        sink.send(&Command::Shutdown).await.unwrap();
        sink.send(Event::Control(ControlUpdate {
            playlist_position: 0,
            time_seconds: 0.0,
            paused: true,
        })
        .to_frame())
        .await
        .unwrap();
        let bytes = sink.into_inner();

        let mut stream = FramedRead::new(bytes.as_slice(), EngineCodec::client());
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, FrameError::UnknownTag(_)));
    }
}
