use std::fmt;
use std::io;

use moov_client::ClientError;
use moov_frame::FrameError;
use moov_transport::TransportError;

// Exit code constants aligned with rsfulmen/DDR-0002 semantics.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::BrokenPipe | io::ErrorKind::UnexpectedEof => FAILURE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Spawn { ref source, .. }
            if source.kind() == io::ErrorKind::PermissionDenied =>
        {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        TransportError::Spawn { .. } => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ConnectionClosed | FrameError::TruncatedStream { .. } => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        FrameError::StringTooLarge { .. }
        | FrameError::UnknownTag(_)
        | FrameError::MalformedString(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    match err {
        ClientError::Transport(err) => transport_error(context, err),
        ClientError::Frame(err) => frame_error(context, err),
        ClientError::Timeout(_) => CliError::new(TIMEOUT, format!("{context}: {err}")),
        ClientError::EngineUnavailable | ClientError::Disconnected => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
        ClientError::ReaderSpawn(source) => io_error(context, source),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;

    #[test]
    fn missing_engine_is_transport_error() {
        let err = ClientError::Transport(TransportError::Spawn {
            program: PathBuf::from("/nope"),
            source: io::Error::from(io::ErrorKind::NotFound),
        });
        let cli = client_error("spawn failed", err);
        assert_eq!(cli.code, TRANSPORT_ERROR);
        assert!(cli.message.starts_with("spawn failed: "));
    }

    #[test]
    fn status_timeout_maps_to_124() {
        let cli = client_error("status", ClientError::Timeout(Duration::from_secs(1)));
        assert_eq!(cli.code, TIMEOUT);
    }

    #[test]
    fn dead_engine_is_failure() {
        assert_eq!(client_error("x", ClientError::EngineUnavailable).code, FAILURE);
        assert_eq!(client_error("x", ClientError::Disconnected).code, FAILURE);
        assert_eq!(
            frame_error("x", FrameError::TruncatedStream { buffered: 2 }).code,
            FAILURE
        );
    }

    #[test]
    fn protocol_garbage_is_data_invalid() {
        assert_eq!(
            client_error("x", ClientError::Frame(FrameError::UnknownTag(0xEE))).code,
            DATA_INVALID
        );
    }

    #[test]
    fn cancelled_is_internal() {
        assert_eq!(client_error("x", ClientError::Cancelled(3)).code, INTERNAL);
    }
}
