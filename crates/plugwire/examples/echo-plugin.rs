//! Plugin end on a Unix socket: serves `echo` and `greet`, where `greet`
//! calls back into the host for a name before answering.
//!
//! Run with:
//!   cargo run --example echo-plugin
//!
//! In another terminal:
//!   cargo run --features cli -- call /tmp/plugwire-echo-<pid>/plugin.sock \
//!     echo --args '["hello"]'

use std::fs;

use plugwire::host::{parse_args, HandlerError, Host, Invoker};
use plugwire::session::SessionListener;
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sock_dir = std::env::temp_dir().join(format!("plugwire-echo-{}", std::process::id()));
    fs::create_dir_all(&sock_dir)?;
    let sock_path = sock_dir.join("plugin.sock");

    let listener = SessionListener::bind(&sock_path)?;
    eprintln!("Listening on {}", sock_path.display());

    // Accept one host and serve it until it disconnects.
    let session = listener.accept().await?;
    let plugin = Host::from_session(session.clone());

    let invoker = Invoker::builder()
        .register_fn("echo", |args: Vec<Value>| async move {
            eprintln!("echo {args:?}");
            Ok(args.into_iter().next().unwrap_or(Value::Null))
        })
        .register_fn("greet", move |args| {
            let session = session.clone();
            async move {
                let (greeting,): (String,) = parse_args(args)?;
                let name: String = serde_json::from_value(session.call("name", Vec::new()).await?)?;
                Ok::<_, HandlerError>(json!(format!("{greeting}, {name}")))
            }
        })
        .register_fn("redraw", |_| async { Ok(Value::Null) })
        .build();

    match plugin.listen(invoker).await {
        Ok(()) => eprintln!("Host disconnected"),
        Err(e) => eprintln!("Session failed: {e}"),
    }

    let _ = fs::remove_dir_all(&sock_dir);
    Ok(())
}
