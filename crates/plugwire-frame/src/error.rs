/// Errors that can occur while framing or interpreting channel messages.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The byte stream is not valid JSON. The stream cannot be resynchronized.
    #[error("invalid JSON on channel: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// A message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete value was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,

    /// A value is not a `[id, payload]` envelope.
    #[error("invalid message envelope: {0}")]
    InvalidEnvelope(String),

    /// A payload is not an `["invoke", method, args]` descriptor.
    #[error("unexpected channel message: {0}")]
    MalformedInvocation(String),

    /// A reply payload is not an `[ok, err]` pair.
    #[error("malformed reply: {0}")]
    MalformedReply(String),
}

pub type Result<T> = std::result::Result<T, FrameError>;
