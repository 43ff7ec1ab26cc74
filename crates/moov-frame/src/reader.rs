use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::{debug, trace};

use crate::catalog::{tag_name, Direction};
use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::message::Message;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete frames.
/// Only tags travelling in the reader's [`Direction`] are accepted.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    direction: Direction,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T, direction: Direction) -> Self {
        Self::with_config(inner, direction, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, direction: Direction, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            direction,
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached on a
    /// frame boundary and `Err(FrameError::TruncatedStream)` when it is
    /// reached in the middle of one.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.buf, self.direction, &self.config)? {
                trace!(
                    tag = frame.tag(),
                    name = tag_name(frame.tag()),
                    buffered = self.buf.len(),
                    "frame decoded"
                );
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {
                    trace!("read interrupted, retrying");
                    continue;
                }
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if self.buf.is_empty() {
                    trace!("end of stream on frame boundary");
                    return Err(FrameError::ConnectionClosed);
                }
                debug!(buffered = self.buf.len(), "end of stream inside a frame");
                return Err(FrameError::TruncatedStream {
                    buffered: self.buf.len(),
                });
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Read the next frame and interpret it as a typed message.
    pub fn read_message<M: Message>(&mut self) -> Result<M> {
        M::from_frame(self.read_frame()?)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Direction of the frames this reader accepts.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<T> std::fmt::Debug for FrameReader<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReader")
            .field("direction", &self.direction)
            .field("buffered", &self.buf.len())
            .finish()
    }
}
