use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use plugwire_frame::{
    FrameReader, FrameWriter, IdKind, Invocation, Message, Reply,
};
use plugwire_transport::{BoxedReader, BoxedWriter, Channel, ChannelKind};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::callback::{CallbackSlot, MessageHandler, ReplySink, Responder, NO_HANDLER_MESSAGE};
use crate::config::{DispatchMode, SessionConfig};
use crate::error::{Result, SessionError};
use crate::pending::{PendingCalls, PendingGuard};

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// EOF from the peer or a local `close()`.
    Closed,
    /// Reading or writing the channel failed.
    Failed(String),
}

impl Completion {
    /// The error handed to calls that were still waiting.
    pub fn to_error(&self) -> SessionError {
        match self {
            Completion::Closed => SessionError::ChannelClosed,
            Completion::Failed(message) => SessionError::TransportFailure(message.clone()),
        }
    }
}

/// One endpoint of a bidirectional JSON channel.
///
/// Cheap to clone; all clones share the same channel, pending-call map and
/// handler slot. Construction spawns the writer task and the read loop, so it
/// must happen inside a Tokio runtime. The session runs until EOF, a fatal
/// channel error, or [`Session::close`].
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

struct Inner {
    config: SessionConfig,
    kind: ChannelKind,
    outbound: mpsc::Sender<Message>,
    pending: PendingCalls,
    callback: CallbackSlot,
    next_id: AtomicU64,
    cancel: CancellationToken,
    completion: watch::Sender<Option<Completion>>,
    writer_task: Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Start a session over `channel` with no message handler registered.
    pub fn new(channel: Channel, config: SessionConfig) -> Self {
        Self::spawn(channel, config, None)
    }

    /// Start a session with `handler` already installed, so the first
    /// inbound message is handled by it.
    pub fn with_handler(
        channel: Channel,
        config: SessionConfig,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self::spawn(channel, config, Some(handler))
    }

    fn spawn(
        channel: Channel,
        config: SessionConfig,
        handler: Option<Arc<dyn MessageHandler>>,
    ) -> Self {
        let kind = channel.kind();
        let (reader, writer) = channel.into_split();
        let (outbound, queue) = mpsc::channel(config.outbound_queue.max(1));
        let (completion, _) = watch::channel(None);

        let reader = FrameReader::with_config(reader, config.frame_config());
        let writer = FrameWriter::with_config(writer, config.frame_config());

        debug!(
            channel = kind.as_str(),
            outbound_ids = config.outbound_ids.as_str(),
            dispatch = config.dispatch.as_str(),
            "session started"
        );

        let inner = Arc::new(Inner {
            config,
            kind,
            outbound,
            pending: PendingCalls::default(),
            callback: CallbackSlot::new(handler),
            next_id: AtomicU64::new(1),
            cancel: CancellationToken::new(),
            completion,
            writer_task: Mutex::new(None),
        });

        let writer_task = tokio::spawn(write_loop(Arc::clone(&inner), writer, queue));
        *inner
            .writer_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(writer_task);
        tokio::spawn(read_loop(Arc::clone(&inner), reader));

        Self { inner }
    }

    /// Invoke `method` on the peer and wait for its reply.
    ///
    /// An error slot in the reply comes back as [`SessionError::Remote`].
    /// Dropping the returned future abandons the call; a reply that arrives
    /// later is discarded.
    pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        let id = self
            .inner
            .config
            .outbound_ids
            .nth(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let reply = self.inner.pending.register(id)?;
        let _guard = PendingGuard::new(&self.inner.pending, id);

        debug!(id, method, "sending call");
        let invocation = Invocation::new(method, args);
        self.enqueue(Message::new(id, invocation.to_value())).await?;

        match reply.await {
            Ok(result) => result,
            Err(_) => Err(self.inner.terminal_error()),
        }
    }

    /// Invoke `method` on the peer without expecting a reply.
    pub async fn notify(&self, method: &str, args: Vec<Value>) -> Result<()> {
        debug!(method, "sending notification");
        let invocation = Invocation::new(method, args);
        self.enqueue(Message::notification(invocation.to_value()))
            .await
    }

    /// Call the configured redraw method and discard its result.
    pub async fn redraw(&self) -> Result<()> {
        self.call(&self.inner.config.redraw_method, Vec::new())
            .await
            .map(|_| ())
    }

    /// Answer inbound request `id`.
    pub async fn reply(&self, id: i64, reply: Reply) -> Result<()> {
        self.responder().send_reply(id, reply).await
    }

    /// Install `handler` for inbound messages, returning the previous one.
    ///
    /// Messages already handed to the previous handler finish there.
    pub fn replace_callback(
        &self,
        handler: Arc<dyn MessageHandler>,
    ) -> Option<Arc<dyn MessageHandler>> {
        self.inner.callback.replace(Some(handler))
    }

    /// Remove the current handler, returning it.
    pub fn clear_callback(&self) -> Option<Arc<dyn MessageHandler>> {
        self.inner.callback.replace(None)
    }

    /// A reply sink bound to this session.
    pub fn responder(&self) -> Responder {
        Responder::new(self.inner.outbound.clone())
    }

    /// Resolves when the session ends.
    ///
    /// `Ok(())` on EOF or `close()`, `Err(TransportFailure)` if the channel
    /// failed. Can be obtained any number of times, before or after the end.
    pub fn listen(&self) -> impl Future<Output = Result<()>> + Send + 'static {
        let mut completion = self.inner.completion.subscribe();
        async move {
            let state = match completion.wait_for(Option::is_some).await {
                Ok(state) => state.clone(),
                Err(_) => None,
            };
            match state {
                Some(Completion::Failed(message)) => Err(SessionError::TransportFailure(message)),
                _ => Ok(()),
            }
        }
    }

    /// Stop the session.
    ///
    /// Pending calls fail with [`SessionError::ChannelClosed`]. Messages
    /// already queued are written before the write half is shut down, which
    /// the peer observes as EOF.
    pub async fn close(&self) {
        self.inner.finish(Completion::Closed);
        let writer_task = self
            .inner
            .writer_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(task) = writer_task {
            if let Err(err) = task.await {
                warn!(error = %err, "writer task did not shut down cleanly");
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// How the session ended, or `None` while it is running.
    pub fn completion(&self) -> Option<Completion> {
        self.inner.completion.borrow().clone()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn channel_kind(&self) -> ChannelKind {
        self.inner.kind
    }

    /// Number of outbound calls still waiting for a reply.
    pub fn pending_calls(&self) -> usize {
        self.inner.pending.len()
    }

    async fn enqueue(&self, message: Message) -> Result<()> {
        if self.is_closed() {
            return Err(self.inner.terminal_error());
        }
        self.inner
            .outbound
            .send(message)
            .await
            .map_err(|_| self.inner.terminal_error())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("channel", &self.inner.kind.as_str())
            .field("outbound_ids", &self.inner.config.outbound_ids.as_str())
            .field("pending_calls", &self.inner.pending.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Inner {
    /// Record how the session ended, fail pending calls and stop both tasks.
    /// Later calls keep the first outcome.
    fn finish(&self, completion: Completion) {
        let recorded = self.completion.send_if_modified(|state| {
            if state.is_none() {
                *state = Some(completion.clone());
                true
            } else {
                false
            }
        });
        if recorded {
            match &completion {
                Completion::Closed => debug!(channel = self.kind.as_str(), "session closed"),
                Completion::Failed(message) => {
                    error!(channel = self.kind.as_str(), error = %message, "session failed")
                }
            }
        }

        let terminal = self.completion.borrow().clone().unwrap_or(completion);
        let failed = self.pending.close(&terminal);
        if failed > 0 {
            debug!(failed, "failed pending calls");
        }
        self.cancel.cancel();
    }

    fn terminal_error(&self) -> SessionError {
        self.pending
            .terminal_error()
            .unwrap_or(SessionError::ChannelClosed)
    }

    /// Route one decoded JSON value.
    async fn route(&self, value: Value) {
        let message = match Message::from_value(value) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "dropping invalid message");
                return;
            }
        };

        match message.kind(self.config.outbound_ids) {
            IdKind::Reply => self.resolve(message),
            IdKind::Request | IdKind::Notification => self.deliver(message).await,
        }
    }

    fn resolve(&self, message: Message) {
        let id = message.id;
        let result = match Reply::from_value(message.payload) {
            Ok(Reply::Ok(value)) => Ok(value),
            Ok(Reply::Err(err)) => Err(SessionError::Remote(err)),
            Err(err) => {
                warn!(id, error = %err, "malformed reply");
                Err(SessionError::MalformedReply(err.to_string()))
            }
        };
        if !self.pending.complete(id, result) {
            warn!(id, "dropping reply with no pending call");
        }
    }

    async fn deliver(&self, message: Message) {
        let responder = Responder::new(self.outbound.clone());
        let Some(handler) = self.callback.load() else {
            if message.is_notification() {
                warn!("dropping notification: no message handler registered");
            } else {
                debug!(id = message.id, "rejecting request: no message handler registered");
                if let Err(err) = responder
                    .send_reply(message.id, Reply::Err(Value::from(NO_HANDLER_MESSAGE)))
                    .await
                {
                    warn!(id = message.id, error = %err, "failed to send reply");
                }
            }
            return;
        };

        match self.config.dispatch {
            DispatchMode::Concurrent => {
                tokio::spawn(run_handler(handler, message, responder));
            }
            DispatchMode::Sequential => run_handler(handler, message, responder).await,
        }
    }
}

async fn run_handler(handler: Arc<dyn MessageHandler>, message: Message, responder: Responder) {
    let id = message.id;
    match AssertUnwindSafe(handler.handle(message, responder))
        .catch_unwind()
        .await
    {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(id, error = %err, "message handler failed"),
        Err(_) => error!(id, "message handler panicked"),
    }
}

async fn read_loop(inner: Arc<Inner>, mut reader: FrameReader<BoxedReader>) {
    let completion = loop {
        let frame = tokio::select! {
            biased;
            _ = inner.cancel.cancelled() => break Completion::Closed,
            frame = reader.read_frame() => frame,
        };
        match frame {
            Ok(Some(value)) => inner.route(value).await,
            Ok(None) => {
                debug!(channel = inner.kind.as_str(), "channel reached EOF");
                break Completion::Closed;
            }
            Err(err) => break Completion::Failed(err.to_string()),
        }
    };
    inner.finish(completion);
}

async fn write_loop(
    inner: Arc<Inner>,
    mut writer: FrameWriter<BoxedWriter>,
    mut queue: mpsc::Receiver<Message>,
) {
    loop {
        let message = tokio::select! {
            biased;
            message = queue.recv() => message,
            _ = inner.cancel.cancelled() => None,
        };
        let Some(message) = message else { break };
        if let Err(err) = writer.send(message).await {
            inner.finish(Completion::Failed(err.to_string()));
            return;
        }
    }

    // Flush whatever was queued before the session stopped.
    queue.close();
    while let Ok(message) = queue.try_recv() {
        if let Err(err) = writer.send(message).await {
            debug!(error = %err, "dropping queued messages after write failure");
            break;
        }
    }
    if let Err(err) = writer.shutdown().await {
        debug!(error = %err, "channel shutdown failed");
    }
}
