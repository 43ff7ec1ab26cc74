use std::time::Duration;

use moov_frame::RequestId;

/// Errors that can occur in client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error (spawning or supervising the engine).
    #[error("transport error: {0}")]
    Transport(#[from] moov_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] moov_frame::FrameError),

    /// The engine can no longer accept commands.
    #[error("engine unavailable")]
    EngineUnavailable,

    /// The engine's output ended while a reply was outstanding.
    #[error("engine disconnected before replying")]
    Disconnected,

    /// A status request was not answered in time.
    #[error("status request timed out after {0:?}")]
    Timeout(Duration),

    /// A status request was cancelled by the caller.
    #[error("status request {0} cancelled")]
    Cancelled(RequestId),

    /// The background stream reader could not be started.
    #[error("failed to start stream reader: {0}")]
    ReaderSpawn(std::io::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;
