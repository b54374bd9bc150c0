//! Host side of a plugwire session.
//!
//! - [`Invoker`] is the capability table: method name to async [`Handler`].
//! - [`dispatch`]/[`handle_inbound`] turn one inbound message into a reply
//!   (or a logged failure for notifications) without ever letting a handler
//!   error escape.
//! - [`Host`] wraps a [`Session`](plugwire_session::Session): every outbound
//!   [`Host::call`] is followed by a redraw, and [`Host::listen`] serves an
//!   invoker until the channel ends.

pub mod dispatcher;
pub mod error;
pub mod host;
pub mod invoker;

pub use dispatcher::{dispatch, handle_inbound, DispatchHandler, Outcome};
pub use error::{DispatchError, HandlerError};
pub use host::Host;
pub use invoker::{parse_args, Handler, Invoker, InvokerBuilder};
