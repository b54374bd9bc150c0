//! Bidirectional JSON-channel RPC between a host and its plugins.
//!
//! Either end can call the other at any time over one duplex channel.
//! Messages are `[id, payload]` JSON arrays; id 0 marks a notification,
//! and each side numbers its own calls from its half of the id line so
//! replies and inbound requests never collide.
//!
//! # Crate Structure
//!
//! - [`transport`]: duplex byte channels (Unix sockets, stdio, child pipes)
//! - [`frame`]: JSON stream codec and the envelope, invocation and reply shapes
//! - [`session`]: call correlation, read loop and handler slot (behind `session` feature)
//! - [`host`]: capability tables, dispatch and the call-then-redraw facade
//!   (behind `host` feature)
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use plugwire::host::{Host, Invoker};
//! use plugwire::session::SessionConfig;
//! use serde_json::json;
//!
//! let host = Host::connect("/tmp/plugin.sock", SessionConfig::host()).await?;
//! let serving = host.listen(
//!     Invoker::builder()
//!         .register_fn("version", |_| async { Ok(json!("0.1.0")) })
//!         .build(),
//! );
//! let echoed = host.call("echo", vec![json!("hi")]).await?;
//! assert_eq!(echoed, json!("hi"));
//! host.close().await;
//! serving.await?;
//! # Ok(())
//! # }
//! ```

/// Re-export transport types.
pub mod transport {
    pub use plugwire_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use plugwire_frame::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use plugwire_session::*;
}

/// Re-export host types (requires `host` feature).
#[cfg(feature = "host")]
pub mod host {
    pub use plugwire_host::*;
}
