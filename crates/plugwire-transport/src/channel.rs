use std::fmt;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::Child;

use crate::error::{Result, TransportError};

/// Owned read half of a channel.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Owned write half of a channel.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Where a channel's bytes come from, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Unix,
    Stdio,
    Child,
    Custom,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Unix => "unix",
            ChannelKind::Stdio => "stdio",
            ChannelKind::Child => "child",
            ChannelKind::Custom => "custom",
        }
    }
}

/// A connected duplex byte channel, already split into owned halves.
///
/// A session takes ownership of both halves: the read half drives its read
/// loop and the write half is owned by its writer task.
pub struct Channel {
    reader: BoxedReader,
    writer: BoxedWriter,
    kind: ChannelKind,
}

impl Channel {
    /// Build a channel from arbitrary read/write halves.
    pub fn from_parts<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            kind: ChannelKind::Custom,
        }
    }

    /// Build a channel from a connected Unix domain socket stream.
    #[cfg(unix)]
    pub fn from_unix(stream: tokio::net::UnixStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
            kind: ChannelKind::Unix,
        }
    }

    /// Build a channel over this process's stdin (read) and stdout (write).
    ///
    /// Anything else written to stdout corrupts the stream; log to stderr.
    pub fn stdio() -> Self {
        Self {
            reader: Box::new(tokio::io::stdin()),
            writer: Box::new(tokio::io::stdout()),
            kind: ChannelKind::Stdio,
        }
    }

    /// Take the piped stdout (read) and stdin (write) of a spawned child.
    pub fn from_child(child: &mut Child) -> Result<Self> {
        let stdout = child
            .stdout
            .take()
            .ok_or(TransportError::NotPiped("stdout"))?;
        let stdin = child
            .stdin
            .take()
            .ok_or(TransportError::NotPiped("stdin"))?;
        Ok(Self {
            reader: Box::new(stdout),
            writer: Box::new(stdin),
            kind: ChannelKind::Child,
        })
    }

    /// The transport this channel was built from.
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Consume the channel and return its halves.
    pub fn into_split(self) -> (BoxedReader, BoxedWriter) {
        (self.reader, self.writer)
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("kind", &self.kind.as_str())
            .finish()
    }
}
