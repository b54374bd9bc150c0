use serde_json::Value;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error (bind, connect, accept).
    #[error("transport error: {0}")]
    Transport(#[from] plugwire_transport::TransportError),

    /// Frame-level error while encoding an outbound message.
    #[error("frame error: {0}")]
    Frame(#[from] plugwire_frame::FrameError),

    /// The session ended in an orderly way (EOF or `close()`).
    #[error("channel closed")]
    ChannelClosed,

    /// The session ended because reading or writing the channel failed.
    #[error("channel transport failed: {0}")]
    TransportFailure(String),

    /// The remote side answered with a populated error slot.
    #[error("remote error: {}", display_remote(.0))]
    Remote(Value),

    /// A reply correlated with a pending call was not an `[ok, err]` pair.
    #[error("malformed reply: {0}")]
    MalformedReply(String),

    /// Notifications (id 0) cannot be replied to.
    #[error("cannot reply to a notification")]
    ReplyToNotification,

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SessionError {
    /// The remote error value, if this error came from the other side.
    pub fn remote_value(&self) -> Option<&Value> {
        match self {
            SessionError::Remote(value) => Some(value),
            _ => None,
        }
    }

    /// Returns true if the session is gone and no further calls can succeed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionError::ChannelClosed | SessionError::TransportFailure(_)
        )
    }
}

fn display_remote(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
