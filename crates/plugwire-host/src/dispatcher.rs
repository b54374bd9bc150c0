use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures_util::FutureExt;
use plugwire_frame::{FrameError, Invocation, Message, Reply, NOTIFICATION_ID};
use plugwire_session::{MessageHandler, ReplySink, Responder, SessionError};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::{DispatchError, HandlerError};
use crate::invoker::Invoker;

/// What [`handle_inbound`] did with one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A request was answered (success or error reply).
    Replied,
    /// A notification ran to completion; its result was discarded.
    Notified,
    /// A notification failed. Nothing was sent; the error was logged.
    NotificationFailed(DispatchError),
}

/// Validate `payload`, resolve its method in `invoker` and run the handler.
///
/// Handler errors and panics are captured as [`DispatchError::HandlerFailure`].
pub async fn dispatch(invoker: &Invoker, payload: Value) -> Result<Value, DispatchError> {
    let Invocation { method, args } = match Invocation::from_value(payload) {
        Ok(invocation) => invocation,
        Err(FrameError::MalformedInvocation(payload)) => {
            return Err(DispatchError::MalformedMessage(payload))
        }
        Err(other) => return Err(DispatchError::MalformedMessage(other.to_string())),
    };

    let Some(handler) = invoker.get(&method) else {
        return Err(DispatchError::UnknownMethod(method));
    };

    match AssertUnwindSafe(handler.invoke(args)).catch_unwind().await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(DispatchError::HandlerFailure { method, source }),
        Err(panic) => {
            let source = HandlerError::new(format!("handler panicked: {}", panic_message(&*panic)));
            Err(DispatchError::HandlerFailure { method, source })
        }
    }
}

/// Dispatch one inbound message and route the outcome.
///
/// Requests get exactly one reply through `sink`: `[result, null]` on
/// success, `[null, error text]` on any dispatch error. Notifications never
/// get a reply; their failures are reported with `tracing::error!`.
///
/// The only error returned is a failure of `sink` itself.
pub async fn handle_inbound(
    message: Message,
    invoker: &Invoker,
    sink: &dyn ReplySink,
) -> Result<Outcome, SessionError> {
    let id = message.id;
    let result = dispatch(invoker, message.payload).await;

    if id == NOTIFICATION_ID {
        return Ok(match result {
            Ok(_) => Outcome::Notified,
            Err(err) => {
                error!(method = err.method().unwrap_or("-"), error = %err, "notification failed");
                Outcome::NotificationFailed(err)
            }
        });
    }

    let reply = match result {
        Ok(value) => Reply::Ok(value),
        Err(err) => {
            debug!(id, method = err.method().unwrap_or("-"), error = %err, "request failed");
            Reply::Err(Value::String(err.to_string()))
        }
    };
    sink.send_reply(id, reply).await?;
    Ok(Outcome::Replied)
}

/// Serves an [`Invoker`] as a session message handler.
#[derive(Debug, Clone)]
pub struct DispatchHandler {
    invoker: Invoker,
}

impl DispatchHandler {
    pub fn new(invoker: Invoker) -> Self {
        Self { invoker }
    }

    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }
}

#[async_trait]
impl MessageHandler for DispatchHandler {
    async fn handle(&self, message: Message, responder: Responder) -> Result<(), SessionError> {
        handle_inbound(message, &self.invoker, &responder)
            .await
            .map(|_| ())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}
