use plugwire_session::SessionError;

/// Failure reported by a capability handler.
///
/// Only the message crosses the wire; it becomes the error slot of the reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("invalid arguments: {err}"))
    }
}

/// Handlers that call back into the session can propagate its errors with `?`.
impl From<SessionError> for HandlerError {
    fn from(err: SessionError) -> Self {
        Self::new(err.to_string())
    }
}

/// Why one inbound invocation produced no result.
///
/// For requests the display text is sent back as the reply's error slot.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The payload is not `["invoke", method, args]`. Carries the payload JSON.
    #[error("unexpected channel message: {0}")]
    MalformedMessage(String),

    /// No handler is registered under this name.
    #[error("method '{0}' is not defined in the invoker")]
    UnknownMethod(String),

    /// The handler ran and failed (or panicked).
    #[error("{source}")]
    HandlerFailure {
        method: String,
        #[source]
        source: HandlerError,
    },
}

impl DispatchError {
    /// The method this error concerns, when the payload named one.
    pub fn method(&self) -> Option<&str> {
        match self {
            DispatchError::MalformedMessage(_) => None,
            DispatchError::UnknownMethod(method) => Some(method),
            DispatchError::HandlerFailure { method, .. } => Some(method),
        }
    }
}
