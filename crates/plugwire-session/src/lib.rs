//! One endpoint of a bidirectional JSON channel session.
//!
//! A [`Session`] owns a [`Channel`](plugwire_transport::Channel) and runs two
//! tasks over it: a writer that serializes every outbound message, and a
//! read loop that correlates replies with pending calls and hands inbound
//! requests and notifications to the registered [`MessageHandler`].
//!
//! Either side may call the other at any time; outbound calls are
//! correlated by id and may complete in any order.

pub mod callback;
pub mod config;
#[cfg(unix)]
pub mod connector;
pub mod error;
#[cfg(unix)]
pub mod listener;
mod pending;
pub mod session;

pub use callback::{MessageHandler, ReplySink, Responder, NO_HANDLER_MESSAGE};
pub use config::{DispatchMode, SessionConfig, DEFAULT_OUTBOUND_QUEUE, DEFAULT_REDRAW_METHOD};
#[cfg(unix)]
pub use connector::connect;
pub use error::{Result, SessionError};
#[cfg(unix)]
pub use listener::SessionListener;
pub use session::{Completion, Session};
