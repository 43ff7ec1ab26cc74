//! Engine child-process transport.
//!
//! The playback engine runs as a separate process whose standard input and
//! standard output are the two halves of the control channel. This crate
//! spawns it with both ends piped, hands the pipe ends to the caller, and
//! keeps the process handle for liveness checks and shutdown.
//!
//! This is the lowest layer of moov. Everything else builds on the pipe ends
//! and the [`EngineHandle`] seam provided here.

pub mod error;
pub mod process;
pub mod traits;

pub use error::{Result, TransportError};
pub use process::{EngineCommand, EnginePipes, EngineProcess};
pub use traits::EngineHandle;
