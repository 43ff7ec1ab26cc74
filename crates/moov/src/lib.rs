//! Control-plane client for the moov playback engine.
//!
//! The engine runs as a child process and is driven over its stdin/stdout
//! with a small tagged binary protocol. This crate bundles the pieces.
//!
//! # Crate Structure
//!
//! - [`transport`]: spawning and supervising the engine process
//! - [`frame`]: the wire codec and message catalog
//! - [`client`]: request/reply correlation, event queues and the command API
//!   (behind `client` feature)
//! - [`chat`]: the chat-line command grammar (behind `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use moov_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use moov_frame::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use moov_client::*;
}

#[cfg(feature = "client")]
pub mod chat;
