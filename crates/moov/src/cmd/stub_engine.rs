use std::io::{Read, Write};

use moov_frame::{
    Command, ControlUpdate, Direction, Event, FrameError, FrameReader, FrameWriter, StatusReply,
    UserEvent,
};
use tracing::{debug, info, warn};

use crate::cmd::StubEngineArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};

pub fn run(args: StubEngineArgs) -> CliResult<i32> {
    let mut engine = StubEngine::new(args.media, args.paused, args.echo_messages);
    engine.serve(std::io::stdin().lock(), std::io::stdout().lock())?;
    Ok(SUCCESS)
}

/// Playback state without any playback: time only moves on seek.
#[derive(Debug)]
struct StubEngine {
    playlist: Vec<String>,
    position: u64,
    time_seconds: f64,
    paused: bool,
    echo_messages: bool,
}

impl StubEngine {
    fn new(playlist: Vec<String>, paused: bool, echo_messages: bool) -> Self {
        Self {
            playlist,
            position: 0,
            time_seconds: 0.0,
            paused,
            echo_messages,
        }
    }

    /// Answer commands from `input` on `output` until Shutdown or end of input.
    fn serve<R: Read, W: Write>(&mut self, input: R, output: W) -> CliResult<()> {
        let mut commands = FrameReader::new(input, Direction::ToEngine);
        let mut events = FrameWriter::new(output);
        info!(entries = self.playlist.len(), "stub engine ready");

        loop {
            let command: Command = match commands.read_message() {
                Ok(command) => command,
                Err(FrameError::ConnectionClosed) => {
                    info!("client closed the command stream");
                    return Ok(());
                }
                Err(err) => return Err(frame_error("failed to read command", err)),
            };
            debug!(tag = command.tag(), ?command, "command received");

            let Some(replies) = self.apply(command) else {
                info!("shutdown requested");
                return Ok(());
            };
            for event in &replies {
                events
                    .send(event)
                    .map_err(|err| frame_error("failed to write event", err))?;
            }
        }
    }

    /// Update state for one command. `None` means stop.
    fn apply(&mut self, command: Command) -> Option<Vec<Event>> {
        let events = match command {
            Command::SetPaused(paused) => {
                self.paused = paused;
                vec![self.update()]
            }
            Command::Seek(seconds) => {
                self.time_seconds = if seconds.is_finite() {
                    seconds.max(0.0)
                } else {
                    0.0
                };
                vec![self.update()]
            }
            Command::PutMessage { text, fg, bg } => {
                info!(%text, fg, bg, "overlay message");
                if self.echo_messages {
                    vec![Event::UserText(UserEvent { text })]
                } else {
                    Vec::new()
                }
            }
            Command::Append(path) => {
                debug!(%path, "appended to playlist");
                self.playlist.push(path);
                Vec::new()
            }
            Command::Index(position) => {
                if position < self.playlist.len() as u64 {
                    self.position = position;
                    self.time_seconds = 0.0;
                    vec![self.update()]
                } else {
                    warn!(
                        position,
                        entries = self.playlist.len(),
                        "index outside playlist ignored"
                    );
                    Vec::new()
                }
            }
            Command::RequestStatus(request_id) => vec![Event::Status(StatusReply {
                request_id,
                playlist_position: self.position,
                playlist_count: self.playlist.len() as u64,
                time_seconds: self.time_seconds,
                paused: self.paused,
            })],
            Command::Shutdown => return None,
        };
        Some(events)
    }

    fn update(&self) -> Event {
        Event::Control(ControlUpdate {
            playlist_position: self.position,
            time_seconds: self.time_seconds,
            paused: self.paused,
        })
    }
}
