use futures_util::SinkExt;
use tokio::io::AsyncWrite;
use tokio_util::codec::FramedWrite;

use crate::codec::{FrameConfig, MessageCodec};
use crate::error::Result;
use crate::message::Message;

/// Writes complete messages to any `AsyncWrite` stream.
pub struct FrameWriter<W> {
    inner: FramedWrite<W, MessageCodec>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: W) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: W, config: FrameConfig) -> Self {
        Self {
            inner: FramedWrite::new(inner, MessageCodec::new(config)),
        }
    }

    /// Encode, write and flush one message.
    pub async fn send(&mut self, message: Message) -> Result<()> {
        self.inner.send(message).await
    }

    /// Flush buffered bytes and shut the underlying stream down.
    ///
    /// The peer observes EOF afterwards.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.close().await
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &W {
        self.inner.get_ref()
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut W {
        self.inner.get_mut()
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }

    /// Update maximum payload size for subsequent encoding.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.inner.encoder_mut().set_max_payload_size(max_payload_size);
    }

    /// Current writer configuration.
    pub fn config(&self) -> &FrameConfig {
        self.inner.encoder().config()
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};

    use bytes::BytesMut;
    use serde_json::json;

    use super::*;
    use crate::codec::decode_frame;
    use crate::error::FrameError;

    #[tokio::test]
    async fn write_single_message() {
        let mut writer = FrameWriter::new(Vec::<u8>::new());
        writer
            .send(Message::new(5, json!(["hi", null])))
            .await
            .unwrap();

        let wire = writer.into_inner();
        assert_eq!(wire, b"[5,[\"hi\",null]]\n");
    }

    #[tokio::test]
    async fn write_multiple_messages() {
        let mut writer = FrameWriter::new(Vec::<u8>::new());
        writer.send(Message::new(1, json!("one"))).await.unwrap();
        writer.send(Message::notification(json!("two"))).await.unwrap();
        writer.send(Message::new(-3, json!("three"))).await.unwrap();

        let mut wire = BytesMut::from(writer.into_inner().as_slice());
        let f1 = decode_frame(&mut wire, usize::MAX).unwrap().unwrap();
        let f2 = decode_frame(&mut wire, usize::MAX).unwrap().unwrap();
        let f3 = decode_frame(&mut wire, usize::MAX).unwrap().unwrap();

        assert_eq!(f1, json!([1, "one"]));
        assert_eq!(f2, json!([0, "two"]));
        assert_eq!(f3, json!([-3, "three"]));
    }

    #[tokio::test]
    async fn payload_too_large_rejected() {
        let cfg = FrameConfig {
            max_payload_size: 4,
        };
        let mut writer = FrameWriter::with_config(Vec::<u8>::new(), cfg);

        let err = writer
            .send(Message::new(1, json!("oversized")))
            .await
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(writer.get_ref().is_empty());
    }

    #[tokio::test]
    async fn send_flushes() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink);

        writer.send(Message::new(1, json!("x"))).await.unwrap();

        assert!(flag.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn shutdown_signals_eof_to_peer() {
        let (left, right) = tokio::io::duplex(64);
        let mut writer = FrameWriter::new(left);
        let mut reader = crate::reader::FrameReader::new(right);

        writer.send(Message::new(2, json!("last"))).await.unwrap();
        writer.shutdown().await.unwrap();

        let msg = reader.read_message().await.unwrap().unwrap();
        assert_eq!(msg.id, 2);
        assert!(reader.read_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn accessors_and_into_inner() {
        let mut writer = FrameWriter::new(Vec::<u8>::new());
        writer.set_max_payload_size(64);
        assert_eq!(writer.config().max_payload_size, 64);

        let _ = writer.get_ref();
        let _ = writer.get_mut();
        let _inner = writer.into_inner();
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
        data: Vec<u8>,
    }

    impl AsyncWrite for FlushTrackingWriter {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            self.data.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            self.flushed.store(true, Ordering::SeqCst);
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }
}
