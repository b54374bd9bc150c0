#![cfg(all(unix, feature = "cli"))]

use std::process::Stdio;
use std::time::Duration;

use plugwire::host::Host;
use plugwire::session::SessionError;
use plugwire::transport::Channel;
use serde_json::json;

fn spawn_plugin() -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_plugwire"))
        .arg("--log-level")
        .arg("error")
        .arg("stdio")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .expect("stdio plugin should start")
}

#[tokio::test]
async fn host_drives_child_plugin_over_pipes() {
    let mut child = spawn_plugin();
    let host = Host::new(Channel::from_child(&mut child).expect("child should be piped"));

    let pong = host.call("ping", Vec::new()).await.expect("ping should succeed");
    assert_eq!(pong, json!("pong"));

    let echoed = host
        .call("echo", vec![json!({"nested": [1, 2, 3]})])
        .await
        .expect("echo should succeed");
    assert_eq!(echoed, json!({"nested": [1, 2, 3]}));

    let err = host.call("missing", Vec::new()).await.unwrap_err();
    assert!(matches!(err, SessionError::Remote(_)));

    // Closing our end is EOF for the plugin, which then exits cleanly.
    host.close().await;
    let status = tokio::time::timeout(Duration::from_secs(5), child.wait())
        .await
        .expect("plugin should exit after EOF")
        .expect("wait should succeed");
    assert!(status.success());
}

#[tokio::test]
async fn concurrent_calls_to_child_resolve_independently() {
    let mut child = spawn_plugin();
    let host = Host::new(Channel::from_child(&mut child).expect("child should be piped"));

    let (slow, fast) = tokio::join!(
        host.call("sleep", vec![json!(200)]),
        host.call("echo", vec![json!("quick")]),
    );
    assert_eq!(slow.unwrap(), json!(200));
    assert_eq!(fast.unwrap(), json!("quick"));

    host.close().await;
}
