use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use plugwire_transport::UnixDomainSocket;
use tracing::debug;

use crate::callback::MessageHandler;
use crate::config::SessionConfig;
use crate::error::Result;
use crate::session::Session;

/// Accepts connections on a Unix domain socket and starts a session on each.
///
/// Sessions default to the plugin role: the connecting side is the host.
pub struct SessionListener {
    socket: UnixDomainSocket,
    config: SessionConfig,
    handler: Option<Arc<dyn MessageHandler>>,
    accepted: AtomicU64,
}

impl SessionListener {
    /// Bind to a Unix domain socket path.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        let socket = UnixDomainSocket::bind(path)?;
        Ok(Self {
            socket,
            config: SessionConfig::plugin(),
            handler: None,
            accepted: AtomicU64::new(0),
        })
    }

    /// Override the configuration of accepted sessions.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Register `handler` on every accepted session before it reads anything.
    pub fn with_handler(mut self, handler: Arc<dyn MessageHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Accept the next connection and start a session on it.
    pub async fn accept(&self) -> Result<Session> {
        let channel = self.socket.accept().await?;
        let n = self.accepted.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(connection = n, path = %self.path().display(), "accepted session");

        Ok(match &self.handler {
            Some(handler) => Session::with_handler(channel, self.config.clone(), Arc::clone(handler)),
            None => Session::new(channel, self.config.clone()),
        })
    }

    /// Number of connections accepted so far.
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Bound socket path.
    pub fn path(&self) -> &Path {
        self.socket.path()
    }
}
