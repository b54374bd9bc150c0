use std::time::Duration;

use plugwire_host::Host;
use plugwire_session::{Result as SessionResult, SessionConfig};
use serde_json::Value;
use tracing::debug;

use crate::cmd::{parse_duration, parse_json_args, session_config, CallArgs, Globals};
use crate::exit::{session_error, CliError, CliResult, SUCCESS, TIMEOUT};
use crate::output::print_result;

pub async fn run(args: CallArgs, globals: Globals) -> CliResult<i32> {
    let call_args = parse_json_args(&args.args)?;
    let timeout = args.timeout.as_deref().map(parse_duration).transpose()?;

    let config = session_config(SessionConfig::host(), &globals, false);
    let host = Host::connect(&args.path, config)
        .await
        .map_err(|err| session_error("connect failed", err))?;

    let result = with_timeout(timeout, invoke(&host, &args.method, call_args, args.no_redraw))
        .await
        .map_err(|_| {
            CliError::new(
                TIMEOUT,
                format!("call to '{}' timed out", args.method),
            )
        })
        .and_then(|result| result.map_err(|err| session_error("call failed", err)));

    host.close().await;
    let value = result?;
    print_result(&args.method, &value, globals.format);
    Ok(SUCCESS)
}

async fn invoke(host: &Host, method: &str, args: Vec<Value>, no_redraw: bool) -> SessionResult<Value> {
    if no_redraw {
        debug!(method, "calling without redraw");
        host.session().call(method, args).await
    } else {
        host.call(method, args).await
    }
}

async fn with_timeout<F: std::future::Future>(
    limit: Option<Duration>,
    future: F,
) -> Result<F::Output, tokio::time::error::Elapsed> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, future).await,
        None => Ok(future.await),
    }
}
