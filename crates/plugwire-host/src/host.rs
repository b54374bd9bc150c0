use std::future::Future;
use std::sync::Arc;

use plugwire_session::{Result, Session, SessionConfig};
use plugwire_transport::Channel;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::dispatcher::DispatchHandler;
use crate::invoker::Invoker;

/// The host's view of a plugin session.
///
/// Outbound calls are followed by a redraw so that, once [`Host::call`]
/// returns, the remote side has flushed whatever the call changed.
#[derive(Debug, Clone)]
pub struct Host {
    session: Session,
}

impl Host {
    /// Start a host session over `channel` (negative outbound ids).
    pub fn new(channel: Channel) -> Self {
        Self::with_config(channel, SessionConfig::host())
    }

    pub fn with_config(channel: Channel, config: SessionConfig) -> Self {
        Self::from_session(Session::new(channel, config))
    }

    pub fn from_session(session: Session) -> Self {
        Self { session }
    }

    /// Connect to a plugin listening on a Unix domain socket.
    #[cfg(unix)]
    pub async fn connect(path: impl AsRef<std::path::Path>, config: SessionConfig) -> Result<Self> {
        Ok(Self::from_session(
            plugwire_session::connect(path, config).await?,
        ))
    }

    /// Call `method` on the plugin, then redraw.
    ///
    /// A remote error comes back as [`SessionError::Remote`](plugwire_session::SessionError::Remote)
    /// and no redraw is issued. A failing redraw fails the call even though
    /// the call itself succeeded.
    pub async fn call(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        let result = self.session.call(method, args).await?;
        self.session.redraw().await?;
        debug!(method, "call completed");
        Ok(result)
    }

    /// [`Host::call`], deserializing the result into `T`.
    pub async fn call_as<T: DeserializeOwned>(&self, method: &str, args: Vec<Value>) -> Result<T> {
        let value = self.call(method, args).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Send a notification. No reply and no redraw.
    pub async fn notify(&self, method: &str, args: Vec<Value>) -> Result<()> {
        self.session.notify(method, args).await
    }

    /// Serve `invoker` for inbound messages from now on.
    ///
    /// Replaces whatever handler was registered before. The returned future
    /// resolves when the session ends; dropping it does not stop serving.
    pub fn listen(&self, invoker: Invoker) -> impl Future<Output = Result<()>> + Send + 'static {
        debug!(methods = invoker.len(), "serving invoker");
        self.session
            .replace_callback(Arc::new(DispatchHandler::new(invoker)));
        self.session.listen()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn close(&self) {
        self.session.close().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use plugwire_frame::{FrameReader, FrameWriter, Message};
    use plugwire_session::SessionError;
    use serde_json::json;
    use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

    use super::*;

    struct Remote {
        reader: FrameReader<ReadHalf<DuplexStream>>,
        writer: FrameWriter<WriteHalf<DuplexStream>>,
    }

    impl Remote {
        async fn recv(&mut self) -> Message {
            tokio::time::timeout(Duration::from_secs(5), self.reader.read_message())
                .await
                .expect("remote should receive within timeout")
                .expect("frame should decode")
                .expect("channel should still be open")
        }

        async fn send(&mut self, value: Value) {
            self.writer
                .send(Message::from_value(value).unwrap())
                .await
                .unwrap();
        }
    }

    fn host_pair() -> (Host, Remote) {
        let (local, remote) = tokio::io::duplex(64 * 1024);
        let (local_read, local_write) = tokio::io::split(local);
        let (remote_read, remote_write) = tokio::io::split(remote);
        let host = Host::new(Channel::from_parts(local_read, local_write));
        let remote = Remote {
            reader: FrameReader::new(remote_read),
            writer: FrameWriter::new(remote_write),
        };
        (host, remote)
    }

    #[tokio::test]
    async fn call_returns_only_after_redraw() {
        let (host, mut remote) = host_pair();
        let redrawn = Arc::new(AtomicBool::new(false));

        let call = tokio::spawn({
            let host = host.clone();
            let redrawn = Arc::clone(&redrawn);
            async move {
                let value = host.call("foo", vec![json!(1), json!(2)]).await;
                (value, redrawn.load(Ordering::SeqCst))
            }
        });

        let request = remote.recv().await;
        assert_eq!(request.payload, json!(["invoke", "foo", [1, 2]]));
        remote.send(json!([request.id, ["V", null]])).await;

        let redraw = remote.recv().await;
        assert_eq!(redraw.payload, json!(["invoke", "redraw", []]));
        assert_ne!(redraw.id, request.id);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!call.is_finished(), "call must wait for the redraw reply");

        redrawn.store(true, Ordering::SeqCst);
        remote.send(json!([redraw.id, [null, null]])).await;

        let (value, saw_redraw) = call.await.unwrap();
        assert_eq!(value.unwrap(), json!("V"));
        assert!(saw_redraw);
    }

    #[tokio::test]
    async fn remote_error_skips_redraw() {
        let (host, mut remote) = host_pair();
        let call = tokio::spawn({
            let host = host.clone();
            async move { host.call("bad", Vec::new()).await }
        });

        let request = remote.recv().await;
        remote.send(json!([request.id, [null, "nope"]])).await;

        let err = call.await.unwrap().unwrap_err();
        assert!(matches!(err, SessionError::Remote(ref v) if v == "nope"));

        // The next frame the remote sees is a fresh call, not a redraw.
        let pinged = tokio::spawn({
            let host = host.clone();
            async move { host.notify("pinged", Vec::new()).await }
        });
        let next = remote.recv().await;
        assert_eq!(next.payload, json!(["invoke", "pinged", []]));
        pinged.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn redraw_failure_fails_the_call() {
        let (host, mut remote) = host_pair();
        let call = tokio::spawn({
            let host = host.clone();
            async move { host.call("ok", Vec::new()).await }
        });

        let request = remote.recv().await;
        remote.send(json!([request.id, [1, null]])).await;
        let redraw = remote.recv().await;
        remote.send(json!([redraw.id, [null, "redraw broke"]])).await;

        let err = call.await.unwrap().unwrap_err();
        assert!(matches!(err, SessionError::Remote(ref v) if v == "redraw broke"));
    }

    #[tokio::test]
    async fn concurrent_calls_with_reversed_replies() {
        let (host, mut remote) = host_pair();
        let a = tokio::spawn({
            let host = host.clone();
            async move { host.call("a", Vec::new()).await }
        });
        let b = tokio::spawn({
            let host = host.clone();
            async move { host.call("b", Vec::new()).await }
        });

        let first = remote.recv().await;
        let second = remote.recv().await;
        let (req_a, req_b) = if first.payload[1] == "a" {
            (first, second)
        } else {
            (second, first)
        };

        // b's reply first, then a's.
        remote.send(json!([req_b.id, ["result-b", null]])).await;
        remote.send(json!([req_a.id, ["result-a", null]])).await;

        // Each call then issues its own redraw.
        for _ in 0..2 {
            let redraw = remote.recv().await;
            assert_eq!(redraw.payload[1], "redraw");
            remote.send(json!([redraw.id, [null, null]])).await;
        }

        assert_eq!(a.await.unwrap().unwrap(), json!("result-a"));
        assert_eq!(b.await.unwrap().unwrap(), json!("result-b"));
    }

    #[tokio::test]
    async fn call_as_deserializes_result() {
        let (host, mut remote) = host_pair();
        let call = tokio::spawn({
            let host = host.clone();
            async move { host.call_as::<Vec<u32>>("list", Vec::new()).await }
        });

        let request = remote.recv().await;
        remote.send(json!([request.id, [[1, 2, 3], null]])).await;
        let redraw = remote.recv().await;
        remote.send(json!([redraw.id, [null, null]])).await;

        assert_eq!(call.await.unwrap().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn listen_serves_echo_scenario() {
        let (host, mut remote) = host_pair();
        let invoker = Invoker::builder()
            .register_fn("echo", |args| async move {
                Ok(args.into_iter().next().unwrap_or(Value::Null))
            })
            .build();
        let _serving = host.listen(invoker);

        remote.send(json!([5, ["invoke", "echo", ["hi"]]])).await;
        assert_eq!(remote.recv().await.to_value(), json!([5, ["hi", null]]));

        remote.send(json!([0, ["invoke", "echo", ["hi"]]])).await;
        remote.send(json!([6, ["invoke", "echo", ["after"]]])).await;
        // The notification produced nothing; the next frame answers id 6.
        assert_eq!(remote.recv().await.to_value(), json!([6, ["after", null]]));
    }

    #[tokio::test]
    async fn listen_future_resolves_on_eof_and_fails_pending_calls() {
        let (host, mut remote) = host_pair();
        let serving = host.listen(Invoker::default());
        let call = tokio::spawn({
            let host = host.clone();
            async move { host.call("never", Vec::new()).await }
        });

        let _ = remote.recv().await;
        drop(remote);

        serving.await.unwrap();
        let err = call.await.unwrap().unwrap_err();
        assert!(matches!(err, SessionError::ChannelClosed));
    }

    #[tokio::test]
    async fn second_listen_replaces_the_invoker() {
        let (host, mut remote) = host_pair();
        let first = Invoker::builder()
            .register_fn("who", |_| async { Ok(json!("first")) })
            .build();
        let second = Invoker::builder()
            .register_fn("who", |_| async { Ok(json!("second")) })
            .build();

        let _first = host.listen(first);
        remote.send(json!([1, ["invoke", "who", []]])).await;
        assert_eq!(remote.recv().await.payload, json!(["first", null]));

        let _second = host.listen(second);
        remote.send(json!([2, ["invoke", "who", []]])).await;
        assert_eq!(remote.recv().await.payload, json!(["second", null]));
    }
}
