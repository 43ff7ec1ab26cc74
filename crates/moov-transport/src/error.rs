use std::path::PathBuf;

/// Errors that can occur while launching or supervising the engine process.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The engine executable could not be started.
    #[error("failed to spawn engine {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    /// A standard stream was not captured as a pipe.
    #[error("engine {0} was not captured as a pipe")]
    MissingPipe(&'static str),

    /// An I/O error occurred while supervising the process.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransportError>;
