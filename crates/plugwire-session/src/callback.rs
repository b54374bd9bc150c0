use std::fmt;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use plugwire_frame::{Message, Reply, NOTIFICATION_ID};
use tokio::sync::mpsc;

use crate::error::{Result, SessionError};

/// Error text sent back for requests that arrive while no handler is set.
pub const NO_HANDLER_MESSAGE: &str = "no message handler registered";

/// Somewhere replies can be sent.
///
/// The session's [`Responder`] is the production implementation; tests can
/// substitute a recorder and exercise dispatch logic without a channel.
#[async_trait]
pub trait ReplySink: Send + Sync {
    /// Send `reply` for request `id`.
    async fn send_reply(&self, id: i64, reply: Reply) -> Result<()>;
}

/// Receives inbound requests and notifications from a session.
///
/// For a request (non-zero id) the handler is expected to answer through the
/// responder it is given. An `Err` return is logged by the session.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: Message, responder: Responder) -> Result<()>;
}

/// Replies into the outbound queue of one session.
#[derive(Clone)]
pub struct Responder {
    outbound: mpsc::Sender<Message>,
}

impl Responder {
    pub(crate) fn new(outbound: mpsc::Sender<Message>) -> Self {
        Self { outbound }
    }
}

#[async_trait]
impl ReplySink for Responder {
    async fn send_reply(&self, id: i64, reply: Reply) -> Result<()> {
        if id == NOTIFICATION_ID {
            return Err(SessionError::ReplyToNotification);
        }
        self.outbound
            .send(Message::reply(id, &reply))
            .await
            .map_err(|_| SessionError::ChannelClosed)
    }
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Responder")
            .field("closed", &self.outbound.is_closed())
            .finish()
    }
}

/// Single replaceable handler slot.
///
/// The read loop loads the slot once per inbound message, so each message
/// goes to exactly one handler even while the slot is being replaced.
#[derive(Default)]
pub(crate) struct CallbackSlot {
    current: RwLock<Option<Arc<dyn MessageHandler>>>,
}

impl CallbackSlot {
    pub(crate) fn new(handler: Option<Arc<dyn MessageHandler>>) -> Self {
        Self {
            current: RwLock::new(handler),
        }
    }

    pub(crate) fn load(&self) -> Option<Arc<dyn MessageHandler>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub(crate) fn replace(
        &self,
        handler: Option<Arc<dyn MessageHandler>>,
    ) -> Option<Arc<dyn MessageHandler>> {
        let mut current = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *current, handler)
    }
}
