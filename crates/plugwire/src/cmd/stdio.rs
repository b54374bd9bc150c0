use std::sync::Arc;

use plugwire_host::DispatchHandler;
use plugwire_session::{Session, SessionConfig};
use plugwire_transport::Channel;
use tracing::info;

use crate::cmd::{builtin, session_config, shutdown_signal, Globals, StdioArgs};
use crate::exit::{session_error, CliResult, SUCCESS};

/// Serve over this process's stdin/stdout until the host closes its end.
pub async fn run(args: StdioArgs, globals: Globals) -> CliResult<i32> {
    let config = session_config(SessionConfig::plugin(), &globals, args.sequential);
    let session = Session::with_handler(
        Channel::stdio(),
        config,
        Arc::new(DispatchHandler::new(builtin::invoker())),
    );
    let done = session.listen();

    tokio::select! {
        result = done => {
            result.map_err(|err| session_error("session failed", err))?;
            info!("host closed the channel");
        }
        _ = shutdown_signal() => {
            info!("interrupted");
            session.close().await;
        }
    }
    Ok(SUCCESS)
}
