//! Client for the moov playback engine.
//!
//! Spawns the engine, writes commands to its stdin, and runs a reader thread
//! over its stdout that routes status replies to their waiters and queues
//! control updates and user events for the caller to drain.

pub mod client;
pub mod correlation;
pub mod error;
pub mod queue;
pub mod reader;
pub mod spawn;

pub use client::{
    Client, ClientConfig, PendingStatus, StatusCanceller, DEFAULT_SHUTDOWN_TIMEOUT,
};
pub use correlation::{CorrelationTable, WaitError};
pub use error::{ClientError, Result};
pub use moov_frame::{ControlUpdate, RequestId, StatusReply, UserEvent};
pub use queue::EventQueue;
pub use reader::ReaderExit;
pub use spawn::{spawn, spawn_with_config};
