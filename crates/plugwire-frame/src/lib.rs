//! JSON channel framing for plugwire.
//!
//! A channel carries a stream of JSON values. Every message is a 2-element
//! array `[id, payload]`:
//! - `id == 0` is a notification (no reply)
//! - any other id asks for a reply correlated by that id
//!
//! Invocations travel as `["invoke", method, args]` payloads and replies as
//! `[ok, err]` payloads. Values may be newline-delimited or simply
//! concatenated; the codec accepts both and always writes one value per line.

pub mod codec;
pub mod error;
pub mod ids;
pub mod message;
pub mod reader;
pub mod writer;

pub use codec::{decode_frame, encode_frame, FrameConfig, MessageCodec, DEFAULT_MAX_PAYLOAD};
pub use error::{FrameError, Result};
pub use ids::{classify_id, IdKind, IdSpace, NOTIFICATION_ID};
pub use message::{is_invocation, Invocation, Message, Reply, INVOKE_TAG};
pub use reader::FrameReader;
pub use writer::FrameWriter;
