use futures_util::StreamExt;
use serde_json::Value;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tracing::trace;

use crate::codec::{FrameConfig, MessageCodec};
use crate::error::Result;
use crate::message::Message;

/// Reads complete JSON values from any `AsyncRead` stream.
///
/// Handles partial reads internally; callers always get complete values.
pub struct FrameReader<R> {
    inner: FramedRead<R, MessageCodec>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: R, config: FrameConfig) -> Self {
        Self {
            inner: FramedRead::new(inner, MessageCodec::new(config)),
        }
    }

    /// Read the next complete JSON value.
    ///
    /// Returns `Ok(None)` on a clean EOF between values and
    /// `Err(FrameError::ConnectionClosed)` if EOF cuts a value short.
    pub async fn read_frame(&mut self) -> Result<Option<Value>> {
        let frame = self.inner.next().await.transpose()?;
        if frame.is_none() {
            trace!("end of stream");
        }
        Ok(frame)
    }

    /// Read the next value and interpret it as a `[id, payload]` envelope.
    pub async fn read_message(&mut self) -> Result<Option<Message>> {
        match self.read_frame().await? {
            Some(value) => Message::from_value(value).map(Some),
            None => Ok(None),
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        self.inner.get_ref()
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut R {
        self.inner.get_mut()
    }

    /// Consume the reader and return the inner stream.
    ///
    /// Buffered bytes that were not yet decoded are lost.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }

    /// Update maximum payload size for subsequent decoding.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.inner.decoder_mut().set_max_payload_size(max_payload_size);
    }

    /// Current reader configuration.
    pub fn config(&self) -> &FrameConfig {
        self.inner.decoder().config()
    }
}
