//! Background stream reader: decodes engine output and routes it to the sinks.

use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use moov_frame::{tag_name, ControlUpdate, Event, FrameError, FrameReader, UserEvent};
use tracing::{debug, error, trace};

use crate::correlation::CorrelationTable;
use crate::queue::EventQueue;

const READER_THREAD_NAME: &str = "moov-reader";

/// Destinations for everything the engine sends.
#[derive(Debug)]
pub(crate) struct Sinks {
    pub(crate) replies: CorrelationTable,
    pub(crate) updates: EventQueue<ControlUpdate>,
    pub(crate) events: EventQueue<UserEvent>,
    finished: AtomicBool,
}

impl Sinks {
    pub(crate) fn new(queue_capacity: Option<usize>) -> Self {
        Self {
            replies: CorrelationTable::new(),
            updates: EventQueue::new("control_updates", queue_capacity),
            events: EventQueue::new("user_events", queue_capacity),
            finished: AtomicBool::new(false),
        }
    }

    /// Whether the reader has stopped consuming the engine's output.
    pub(crate) fn reader_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    fn dispatch(&self, event: Event) {
        trace!(tag = event.tag(), name = tag_name(event.tag()), "engine message");
        match event {
            Event::Status(reply) => {
                self.replies.put(reply);
            }
            Event::Control(update) => self.updates.push(update),
            Event::UserText(text) => self.events.push(text),
        }
    }
}

/// How the stream reader stopped.
#[derive(Debug)]
pub enum ReaderExit {
    /// The engine closed its output on a frame boundary.
    EndOfStream,
    /// Reading failed: truncated frame, unknown tag, bad UTF-8 or I/O error.
    Failed(FrameError),
}

/// Start the reader thread over `reader`.
pub(crate) fn spawn_reader<R>(
    reader: FrameReader<R>,
    sinks: Arc<Sinks>,
) -> std::io::Result<JoinHandle<ReaderExit>>
where
    R: Read + Send + 'static,
{
    std::thread::Builder::new()
        .name(READER_THREAD_NAME.to_string())
        .spawn(move || run(reader, &sinks))
}

/// Read until end of stream or the first error, then close the reply table.
fn run<R: Read>(mut reader: FrameReader<R>, sinks: &Sinks) -> ReaderExit {
    let exit = loop {
        match reader.read_message::<Event>() {
            Ok(event) => sinks.dispatch(event),
            Err(FrameError::ConnectionClosed) => {
                debug!("engine closed its output");
                break ReaderExit::EndOfStream;
            }
            Err(err) => {
                error!(error = %err, "stream reader stopped");
                break ReaderExit::Failed(err);
            }
        }
    };

    sinks.finished.store(true, Ordering::SeqCst);
    sinks.replies.close();
    exit
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use moov_frame::{Direction, FrameWriter, StatusReply};

    use super::*;

    fn encode(events: &[Event]) -> Vec<u8> {
        let mut writer = FrameWriter::new(Vec::new());
        for event in events {
            writer.send(event).unwrap();
        }
        writer.into_inner()
    }

    fn run_over(bytes: Vec<u8>) -> (Sinks, ReaderExit) {
        let sinks = Sinks::new(None);
        let reader = FrameReader::new(Cursor::new(bytes), Direction::ToClient);
        let exit = run(reader, &sinks);
        (sinks, exit)
    }

    #[test]
    fn routes_each_event_kind() {
        let reply = StatusReply {
            request_id: 3,
            playlist_position: 1,
            playlist_count: 2,
            time_seconds: 4.5,
            paused: false,
        };
        let update = ControlUpdate {
            playlist_position: 1,
            time_seconds: 12.5,
            paused: false,
        };
        let bytes = encode(&[
            Event::Control(update),
            Event::UserText(UserEvent {
                text: "hello".to_string(),
            }),
            Event::Status(reply),
        ]);

        let (sinks, exit) = run_over(bytes);

        assert!(matches!(exit, ReaderExit::EndOfStream));
        assert!(sinks.reader_finished());
        assert_eq!(sinks.updates.drain(), vec![update]);
        assert_eq!(sinks.events.drain()[0].text, "hello");
        assert_eq!(sinks.replies.take_blocking(3, None).unwrap(), reply);
    }

    #[test]
    fn truncated_frame_fails_and_closes_table() {
        let mut bytes = encode(&[Event::UserText(UserEvent {
            text: "partial".to_string(),
        })]);
        bytes.truncate(bytes.len() - 2);

        let (sinks, exit) = run_over(bytes);

        assert!(matches!(
            exit,
            ReaderExit::Failed(FrameError::TruncatedStream { .. })
        ));
        assert!(sinks.events.is_empty());
        assert!(sinks.replies.is_closed());
    }

    #[test]
    fn unknown_tag_stops_reader() {
        let (sinks, exit) = run_over(vec![0xEE, 1, 2, 3]);
        assert!(matches!(exit, ReaderExit::Failed(FrameError::UnknownTag(0xEE))));
        assert!(sinks.reader_finished());
    }

    #[test]
    fn command_tag_from_engine_is_rejected() {
        // Tag 9 is Shutdown, which only flows toward the engine.
        let (_, exit) = run_over(vec![9]);
        assert!(matches!(exit, ReaderExit::Failed(FrameError::UnknownTag(9))));
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let (_, exit) = run_over(vec![5, 2, 0, 0, 0, 0xC3, 0x28]);
        assert!(matches!(
            exit,
            ReaderExit::Failed(FrameError::MalformedString(_))
        ));
    }
}
