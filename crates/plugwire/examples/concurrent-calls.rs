//! Host and plugin in one process over an in-memory pipe. Three calls are
//! issued at once; the slowest is sent first and still finishes last.
//!
//! Run with:
//!   cargo run --example concurrent-calls

use std::time::{Duration, Instant};

use plugwire::host::{parse_args, Host, Invoker};
use plugwire::session::{Session, SessionConfig};
use plugwire::transport::Channel;
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (host_end, plugin_end) = tokio::io::duplex(64 * 1024);
    let (host_read, host_write) = tokio::io::split(host_end);
    let (plugin_read, plugin_write) = tokio::io::split(plugin_end);

    let plugin = Session::new(
        Channel::from_parts(plugin_read, plugin_write),
        SessionConfig::plugin(),
    );
    let plugin_done = Host::from_session(plugin.clone()).listen(
        Invoker::builder()
            .register_fn("wait", |args| async move {
                let (ms,): (u64,) = parse_args(args)?;
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(json!(ms))
            })
            .register_fn("redraw", |_| async { Ok(Value::Null) })
            .build(),
    );

    let host = Host::new(Channel::from_parts(host_read, host_write));
    let started = Instant::now();
    let (slow, medium, fast) = tokio::join!(
        host.call("wait", vec![json!(300)]),
        host.call("wait", vec![json!(150)]),
        host.call("wait", vec![json!(10)]),
    );

    println!("slow   -> {}", slow?);
    println!("medium -> {}", medium?);
    println!("fast   -> {}", fast?);
    println!("all three in {:?} (not 460ms)", started.elapsed());

    host.close().await;
    plugin_done.await?;
    Ok(())
}
