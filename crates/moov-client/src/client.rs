use std::io::{ErrorKind, Read, Write};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use moov_frame::{
    tag_name, Command, ControlUpdate, Direction, FrameConfig, FrameError, FrameReader,
    FrameWriter, RequestId, StatusReply, UserEvent,
};
use moov_transport::EngineHandle;
use tracing::{debug, error, info, trace, warn};

use crate::correlation::WaitError;
use crate::error::{ClientError, Result};
use crate::reader::{spawn_reader, ReaderExit, Sinks};

/// Default time the engine gets to exit after `Shutdown` before it is signalled.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Limits applied to frames in both directions.
    pub frame: FrameConfig,
    /// Upper bound for [`Client::status`]. `None` waits indefinitely.
    pub status_timeout: Option<Duration>,
    /// Grace period per step of the close sequence (exit, SIGTERM, kill).
    pub shutdown_timeout: Duration,
    /// Bound for each event queue. `None` means unbounded.
    pub queue_capacity: Option<usize>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            status_timeout: None,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            queue_capacity: None,
        }
    }
}

type CommandWriter = FrameWriter<Box<dyn Write + Send>>;

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle on one engine session.
///
/// Commands may be issued from any thread; each command is written as one
/// whole frame under a writer lock. A background reader thread routes status
/// replies to their waiters and queues control updates and user events until
/// the caller drains them.
pub struct Client {
    writer: Mutex<Option<CommandWriter>>,
    sinks: Arc<Sinks>,
    next_request_id: AtomicU32,
    reader: Mutex<Option<JoinHandle<ReaderExit>>>,
    process: Mutex<Option<Box<dyn EngineHandle>>>,
    closed: Mutex<bool>,
    config: ClientConfig,
}

impl Client {
    /// Build a client over an already connected byte stream pair.
    ///
    /// `reader` carries engine output, `writer` carries commands. Without a
    /// process handle, liveness follows the reader, and [`Client::close`]
    /// returns once the peer closes its end.
    pub fn from_streams<R, W>(reader: R, writer: W, config: ClientConfig) -> Result<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        Self::from_parts(reader, writer, None, config)
    }

    /// Build a client over a stream pair plus the process that owns it.
    pub fn from_parts<R, W>(
        reader: R,
        writer: W,
        process: Option<Box<dyn EngineHandle>>,
        config: ClientConfig,
    ) -> Result<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let sinks = Arc::new(Sinks::new(config.queue_capacity));
        let frames = FrameReader::with_config(reader, Direction::ToClient, config.frame.clone());

        let handle = match spawn_reader(frames, Arc::clone(&sinks)) {
            Ok(handle) => handle,
            Err(err) => {
                if let Some(mut process) = process {
                    if let Err(kill_err) = process.kill() {
                        warn!(error = %kill_err, "failed to kill engine after reader spawn failure");
                    }
                }
                return Err(ClientError::ReaderSpawn(err));
            }
        };

        let writer: Box<dyn Write + Send> = Box::new(writer);
        Ok(Self {
            writer: Mutex::new(Some(FrameWriter::with_config(writer, config.frame.clone()))),
            sinks,
            next_request_id: AtomicU32::new(0),
            reader: Mutex::new(Some(handle)),
            process: Mutex::new(process),
            closed: Mutex::new(false),
            config,
        })
    }

    /// Current configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Operating system id of the engine process, if there is one.
    pub fn pid(&self) -> Option<u32> {
        lock(&self.process).as_ref().and_then(|process| process.id())
    }

    fn send(&self, command: Command) -> Result<()> {
        let mut guard = lock(&self.writer);
        let writer = guard.as_mut().ok_or(ClientError::EngineUnavailable)?;
        match writer.send(&command) {
            Ok(()) => {
                trace!(
                    tag = command.tag(),
                    name = tag_name(command.tag()),
                    "command sent"
                );
                Ok(())
            }
            Err(err) if engine_gone(&err) => {
                debug!(error = %err, "engine no longer accepts commands");
                Err(ClientError::EngineUnavailable)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Pause or resume playback.
    pub fn set_paused(&self, paused: bool) -> Result<()> {
        self.send(Command::SetPaused(paused))
    }

    /// Jump to an absolute time in seconds.
    pub fn seek(&self, seconds: f64) -> Result<()> {
        self.send(Command::Seek(seconds))
    }

    /// Show an overlay message with the given foreground and background colours.
    pub fn put_message(&self, text: &str, fg: u32, bg: u32) -> Result<()> {
        self.send(Command::PutMessage {
            text: text.to_string(),
            fg,
            bg,
        })
    }

    /// Append a media path to the playlist.
    pub fn append(&self, path: &str) -> Result<()> {
        self.send(Command::Append(path.to_string()))
    }

    /// Jump to a playlist position (0-based).
    pub fn index(&self, position: u64) -> Result<()> {
        self.send(Command::Index(position))
    }

    /// Send a status request and return a handle on its reply.
    pub fn request_status(&self) -> Result<PendingStatus> {
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        self.sinks.replies.register(id);
        if let Err(err) = self.send(Command::RequestStatus(id)) {
            self.sinks.replies.abandon(id);
            return Err(err);
        }
        Ok(PendingStatus {
            id,
            sinks: Arc::clone(&self.sinks),
            finished: false,
        })
    }

    /// Request a status snapshot and block until the matching reply arrives.
    ///
    /// Bounded by [`ClientConfig::status_timeout`] when one is set.
    pub fn status(&self) -> Result<StatusReply> {
        let pending = self.request_status()?;
        match self.config.status_timeout {
            Some(timeout) => pending.wait_timeout(timeout),
            None => pending.wait(),
        }
    }

    /// Flip the pause state. Returns the state that was requested.
    pub fn toggle_paused(&self) -> Result<bool> {
        let paused = !self.status()?.paused;
        self.set_paused(paused)?;
        Ok(paused)
    }

    /// Seek relative to the current time. Returns the target time.
    pub fn relative_seek(&self, delta: f64) -> Result<f64> {
        let target = self.status()?.time_seconds + delta;
        self.seek(target)?;
        Ok(target)
    }

    /// Move to the previous playlist entry. `None` when already at the first,
    /// or when the target would fall outside the playlist.
    pub fn previous(&self) -> Result<Option<u64>> {
        let status = self.status()?;
        let Some(position) = status.playlist_position.checked_sub(1) else {
            return Ok(None);
        };
        if position >= status.playlist_count {
            return Ok(None);
        }
        self.index(position)?;
        Ok(Some(position))
    }

    /// Move to the next playlist entry. `None` when already at the last.
    pub fn next(&self) -> Result<Option<u64>> {
        let status = self.status()?;
        let position = status.playlist_position.saturating_add(1);
        if position >= status.playlist_count {
            return Ok(None);
        }
        self.index(position)?;
        Ok(Some(position))
    }

    /// Take every queued control update, oldest first. Never blocks on the engine.
    pub fn drain_updates(&self) -> Vec<ControlUpdate> {
        self.sinks.updates.drain()
    }

    /// Take every queued user event, oldest first. Never blocks on the engine.
    pub fn drain_events(&self) -> Vec<UserEvent> {
        self.sinks.events.drain()
    }

    /// Whether the engine is still running.
    ///
    /// With a process handle this is "not yet exited"; for stream-only
    /// clients it is "the reader is still consuming output".
    pub fn alive(&self) -> bool {
        let mut process = lock(&self.process);
        match process.as_mut() {
            Some(process) => match process.has_exited() {
                Ok(exited) => !exited,
                Err(err) => {
                    warn!(error = %err, "failed to query engine state");
                    false
                }
            },
            None => !self.sinks.reader_finished(),
        }
    }

    /// Shut the engine down and release every resource. Idempotent.
    ///
    /// Sends `Shutdown`, closes the command stream, waits for the process to
    /// exit (escalating to SIGTERM and then kill after
    /// [`ClientConfig::shutdown_timeout`] each), and joins the reader thread.
    pub fn close(&self) -> Result<()> {
        let mut closed = lock(&self.closed);
        if *closed {
            debug!("client already closed");
            return Ok(());
        }
        *closed = true;
        self.shutdown(true)
    }

    fn shutdown(&self, join_reader: bool) -> Result<()> {
        // The write can block on an engine that stopped reading stdin, so the
        // exit supervision runs alongside it. Signalling the engine closes
        // the pipe and unblocks the write.
        let supervised = thread::scope(|scope| {
            let stopper = thread::Builder::new()
                .name("moov-shutdown".to_string())
                .spawn_scoped(scope, || self.stop_commands());
            if let Err(err) = stopper {
                warn!(error = %err, "failed to start shutdown thread, sending inline");
                self.stop_commands();
            }
            self.supervise_exit()
        });
        if join_reader {
            self.join_reader();
        }
        supervised
    }

    /// Send `Shutdown` and close the engine's stdin.
    fn stop_commands(&self) {
        match self.send(Command::Shutdown) {
            Ok(()) => debug!("shutdown sent"),
            Err(ClientError::EngineUnavailable) => debug!("engine gone before shutdown"),
            Err(err) => warn!(error = %err, "failed to send shutdown"),
        }
        // Dropping the writer closes the engine's stdin.
        lock(&self.writer).take();
    }

    fn supervise_exit(&self) -> Result<()> {
        let mut guard = lock(&self.process);
        let Some(process) = guard.as_mut() else {
            return Ok(());
        };
        let timeout = self.config.shutdown_timeout;
        let pid = process.id();

        if process.wait_timeout(timeout)? {
            info!(?pid, "engine exited");
            return Ok(());
        }
        warn!(?pid, ?timeout, "engine ignored shutdown, sending SIGTERM");
        process.terminate()?;
        if process.wait_timeout(timeout)? {
            return Ok(());
        }
        warn!(?pid, "engine ignored SIGTERM, killing");
        process.kill()?;
        if !process.wait_timeout(timeout)? {
            error!(?pid, "engine still running after kill");
        }
        Ok(())
    }

    fn join_reader(&self) {
        let Some(handle) = lock(&self.reader).take() else {
            return;
        };
        match handle.join() {
            Ok(ReaderExit::EndOfStream) => debug!("stream reader finished"),
            Ok(ReaderExit::Failed(err)) => {
                debug!(error = %err, "stream reader had stopped with an error")
            }
            Err(_) => error!("stream reader panicked"),
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("pid", &self.pid())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        let closed = self.closed.get_mut().unwrap_or_else(PoisonError::into_inner);
        if std::mem::replace(closed, true) {
            return;
        }
        // The reader is left to finish on its own once the engine's output closes.
        if let Err(err) = self.shutdown(false) {
            warn!(error = %err, "engine shutdown on drop failed");
        }
    }
}

fn engine_gone(err: &FrameError) -> bool {
    match err {
        FrameError::ConnectionClosed => true,
        FrameError::Io(err) => matches!(
            err.kind(),
            ErrorKind::BrokenPipe
                | ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::NotConnected
                | ErrorKind::UnexpectedEof
        ),
        _ => false,
    }
}

/// An outstanding status request.
///
/// Dropping it without waiting abandons the request; a reply that arrives
/// later is discarded.
#[derive(Debug)]
pub struct PendingStatus {
    id: RequestId,
    sinks: Arc<Sinks>,
    finished: bool,
}

impl PendingStatus {
    /// The request id sent to the engine.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// A handle that can cancel this request from another thread.
    pub fn canceller(&self) -> StatusCanceller {
        StatusCanceller {
            id: self.id,
            sinks: Arc::clone(&self.sinks),
        }
    }

    /// Block until the reply arrives, the request is cancelled, or the engine disconnects.
    pub fn wait(self) -> Result<StatusReply> {
        self.finish(None)
    }

    /// Like [`PendingStatus::wait`], giving up after `timeout`.
    pub fn wait_timeout(self, timeout: Duration) -> Result<StatusReply> {
        self.finish(Some(timeout))
    }

    fn finish(mut self, timeout: Option<Duration>) -> Result<StatusReply> {
        self.finished = true;
        self.sinks
            .replies
            .take_blocking(self.id, timeout)
            .map_err(|err| match err {
                WaitError::Cancelled => ClientError::Cancelled(self.id),
                WaitError::TimedOut => ClientError::Timeout(timeout.unwrap_or_default()),
                WaitError::Closed => ClientError::Disconnected,
            })
    }
}

impl Drop for PendingStatus {
    fn drop(&mut self) {
        if !self.finished {
            self.sinks.replies.abandon(self.id);
        }
    }
}

/// Cancels one status request; cloneable and sendable to other threads.
#[derive(Debug, Clone)]
pub struct StatusCanceller {
    id: RequestId,
    sinks: Arc<Sinks>,
}

impl StatusCanceller {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Wake the waiter with [`ClientError::Cancelled`]. No effect once answered.
    pub fn cancel(&self) {
        self.sinks.replies.cancel(self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use super::*;

    #[derive(Default)]
    struct RecordingWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for RecordingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Blocks reads until the paired sender is dropped, then reports end of stream.
    struct BlockingReader(std::sync::mpsc::Receiver<()>);

    impl Read for BlockingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            let _ = self.0.recv();
            Ok(0)
        }
    }

    type CallLog = Arc<Mutex<Vec<&'static str>>>;

    struct FakeProcess {
        exited: Arc<AtomicBool>,
        exit_on_terminate: bool,
        calls: CallLog,
    }

    impl EngineHandle for FakeProcess {
        fn id(&self) -> Option<u32> {
            Some(4242)
        }

        fn has_exited(&mut self) -> moov_transport::Result<bool> {
            Ok(self.exited.load(Ordering::SeqCst))
        }

        fn wait_timeout(&mut self, _timeout: Duration) -> moov_transport::Result<bool> {
            self.calls.lock().unwrap().push("wait");
            Ok(self.exited.load(Ordering::SeqCst))
        }

        fn terminate(&mut self) -> moov_transport::Result<()> {
            self.calls.lock().unwrap().push("terminate");
            if self.exit_on_terminate {
                self.exited.store(true, Ordering::SeqCst);
            }
            Ok(())
        }

        fn kill(&mut self) -> moov_transport::Result<()> {
            self.calls.lock().unwrap().push("kill");
            self.exited.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Stands in for a full stdin pipe: writes block until the engine is gone.
    struct StalledWriter(Arc<AtomicBool>);

    impl Write for StalledWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            while !self.0.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(1));
            }
            Err(ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn fake_client(exit_on_terminate: bool) -> (Client, Arc<AtomicBool>, CallLog) {
        fake_client_with(exit_on_terminate, |_| Box::new(RecordingWriter::default()))
    }

    fn fake_client_with<F>(exit_on_terminate: bool, writer: F) -> (Client, Arc<AtomicBool>, CallLog)
    where
        F: FnOnce(Arc<AtomicBool>) -> Box<dyn Write + Send>,
    {
        let exited = Arc::new(AtomicBool::new(false));
        let calls = Arc::new(Mutex::new(Vec::new()));
        let process = FakeProcess {
            exited: Arc::clone(&exited),
            exit_on_terminate,
            calls: Arc::clone(&calls),
        };
        let client = Client::from_parts(
            std::io::empty(),
            writer(Arc::clone(&exited)),
            Some(Box::new(process)),
            ClientConfig {
                shutdown_timeout: Duration::from_millis(1),
                ..ClientConfig::default()
            },
        )
        .unwrap();
        (client, exited, calls)
    }

    #[test]
    fn alive_follows_process_handle() {
        let (client, exited, _) = fake_client(true);
        assert!(client.alive());
        exited.store(true, Ordering::SeqCst);
        assert!(!client.alive());
        assert_eq!(client.pid(), Some(4242));
    }

    #[test]
    fn close_escalates_to_terminate() {
        let (client, _, calls) = fake_client(true);
        client.close().unwrap();
        assert_eq!(*calls.lock().unwrap(), vec!["wait", "terminate", "wait"]);
        assert!(!client.alive());
    }

    #[test]
    fn close_escalates_to_kill() {
        let (client, _, calls) = fake_client(false);
        client.close().unwrap();
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["wait", "terminate", "wait", "kill", "wait"]
        );
    }

    #[test]
    fn close_signals_engine_that_stopped_reading() {
        let (client, _, calls) =
            fake_client_with(false, |exited| Box::new(StalledWriter(exited)));
        client.close().unwrap();
        assert_eq!(
            *calls.lock().unwrap(),
            vec!["wait", "terminate", "wait", "kill", "wait"]
        );
        assert!(!client.alive());
    }

    #[test]
    fn close_does_not_wait_behind_a_blocked_command() {
        let (client, _, calls) =
            fake_client_with(true, |exited| Box::new(StalledWriter(exited)));
        std::thread::scope(|scope| {
            let blocked = scope.spawn(|| client.seek(1.0));
            std::thread::sleep(Duration::from_millis(20));
            client.close().unwrap();
            assert!(matches!(
                blocked.join().unwrap(),
                Err(ClientError::EngineUnavailable)
            ));
        });
        assert_eq!(*calls.lock().unwrap(), vec!["wait", "terminate", "wait"]);
    }

    #[test]
    fn close_twice_supervises_once() {
        let (client, _, calls) = fake_client(true);
        client.close().unwrap();
        client.close().unwrap();
        assert_eq!(calls.lock().unwrap().len(), 3);
    }

    #[test]
    fn commands_after_close_are_unavailable() {
        let (client, _, _) = fake_client(true);
        client.close().unwrap();
        assert!(matches!(
            client.set_paused(true),
            Err(ClientError::EngineUnavailable)
        ));
        assert!(matches!(
            client.request_status(),
            Err(ClientError::EngineUnavailable)
        ));
        assert!(client.drain_updates().is_empty());
    }

    #[test]
    fn commands_are_written_as_frames() {
        let wire = Arc::new(Mutex::new(Vec::new()));
        let client = Client::from_streams(
            std::io::empty(),
            RecordingWriter(Arc::clone(&wire)),
            ClientConfig::default(),
        )
        .unwrap();

        client.set_paused(true).unwrap();
        client.seek(12.5).unwrap();
        client.put_message("hi", 0x00FF_FFFF, 0).unwrap();

        let mut expected = vec![1, 1, 2];
        expected.extend_from_slice(&12.5f64.to_le_bytes());
        expected.push(3);
        expected.extend_from_slice(&0x00FF_FFFFu32.to_le_bytes());
        expected.extend_from_slice(&0u32.to_le_bytes());
        expected.extend_from_slice(&2u32.to_le_bytes());
        expected.extend_from_slice(b"hi");
        assert_eq!(*wire.lock().unwrap(), expected);
    }

    #[test]
    fn stream_only_client_dies_with_reader() {
        let client = Client::from_streams(
            std::io::empty(),
            RecordingWriter::default(),
            ClientConfig::default(),
        )
        .unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while client.alive() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!client.alive());
        assert!(matches!(client.status(), Err(ClientError::Disconnected)));
        client.close().unwrap();
    }

    #[test]
    fn dropped_pending_request_is_abandoned() {
        let (_hold_open, rx) = std::sync::mpsc::channel::<()>();
        let client = Client::from_streams(
            BlockingReader(rx),
            RecordingWriter::default(),
            ClientConfig::default(),
        )
        .unwrap();
        let pending = client.request_status().unwrap();
        let id = pending.id();
        drop(pending);

        client.sinks.replies.put(StatusReply {
            request_id: id,
            playlist_position: 0,
            playlist_count: 1,
            time_seconds: 0.0,
            paused: false,
        });
        assert!(client.sinks.replies.is_empty());
    }

    #[test]
    fn request_ids_increase() {
        let client = Client::from_streams(
            std::io::empty(),
            RecordingWriter::default(),
            ClientConfig::default(),
        )
        .unwrap();
        let first = client.request_status().unwrap();
        let second = client.request_status().unwrap();
        assert_eq!(first.id(), 0);
        assert_eq!(second.id(), 1);
        assert_eq!(first.canceller().id(), 0);
    }
}
