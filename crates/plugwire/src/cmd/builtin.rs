use std::time::Duration;

use plugwire_host::{parse_args, HandlerError, Invoker};
use serde_json::{json, Value};

/// Longest `sleep` the built-in plugin will honor.
const MAX_SLEEP_MS: u64 = 60_000;

/// Methods served by `plugwire serve` and `plugwire stdio`.
///
/// - `echo(value)`: returns its first argument
/// - `ping()`: returns `"pong"`
/// - `sleep(ms)`: waits, then returns `ms`
/// - `redraw()`: no-op, so hosts can call this plugin directly
/// - `methods()`: sorted method names
pub fn invoker() -> Invoker {
    let names = json!(["echo", "methods", "ping", "redraw", "sleep"]);
    Invoker::builder()
        .register_fn("echo", |args| async move {
            Ok(args.into_iter().next().unwrap_or(Value::Null))
        })
        .register_fn("ping", |_| async { Ok(json!("pong")) })
        .register_fn("sleep", |args| async move {
            let (ms,): (u64,) = parse_args(args)?;
            if ms > MAX_SLEEP_MS {
                return Err(HandlerError::new(format!(
                    "sleep is limited to {MAX_SLEEP_MS} ms"
                )));
            }
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok(json!(ms))
        })
        .register_fn("redraw", |_| async { Ok(Value::Null) })
        .register_fn("methods", move |_| {
            let names = names.clone();
            async move { Ok(names) }
        })
        .build()
}
