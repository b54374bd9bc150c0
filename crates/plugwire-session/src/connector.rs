use std::path::Path;

use plugwire_transport::UnixDomainSocket;

use crate::config::SessionConfig;
use crate::error::Result;
use crate::session::Session;

/// Connect to a listening endpoint and start a session over the socket.
pub async fn connect(path: impl AsRef<Path>, config: SessionConfig) -> Result<Session> {
    let channel = UnixDomainSocket::connect(path).await?;
    Ok(Session::new(channel, config))
}
