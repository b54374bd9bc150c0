//! Duplex byte channels for plugwire sessions.
//!
//! Provides a unified owned read/write pair over the local transports a
//! host and its plugin typically share:
//! - Unix domain sockets (Linux/macOS)
//! - The process's own stdin/stdout
//! - A spawned child's stdout/stdin pipes
//!
//! This is the lowest layer of plugwire. Everything else builds on top of
//! the [`Channel`] type provided here.

pub mod channel;
pub mod error;

#[cfg(unix)]
pub mod uds;

pub use channel::{BoxedReader, BoxedWriter, Channel, ChannelKind};
pub use error::{Result, TransportError};

#[cfg(unix)]
pub use uds::UnixDomainSocket;
