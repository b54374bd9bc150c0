use std::sync::Arc;

use plugwire_host::DispatchHandler;
use plugwire_session::{Session, SessionConfig, SessionListener};
use tracing::{info, warn};

use crate::cmd::{builtin, session_config, shutdown_signal, Globals, ServeArgs};
use crate::exit::{session_error, CliResult, SUCCESS};

pub async fn run(args: ServeArgs, globals: Globals) -> CliResult<i32> {
    let config = session_config(SessionConfig::plugin(), &globals, args.sequential);
    let listener = SessionListener::bind(&args.path)
        .map_err(|err| session_error("bind failed", err))?
        .with_config(config)
        .with_handler(Arc::new(DispatchHandler::new(builtin::invoker())));

    info!(path = %listener.path().display(), sequential = args.sequential, "serving");

    let mut sessions: Vec<Session> = Vec::new();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!(accepted = listener.accepted(), "shutting down");
                break;
            }
            accepted = listener.accept() => {
                let session = accepted.map_err(|err| session_error("accept failed", err))?;
                let connection = listener.accepted();
                let done = session.listen();
                tokio::spawn(async move {
                    match done.await {
                        Ok(()) => info!(connection, "session closed"),
                        Err(err) => warn!(connection, error = %err, "session failed"),
                    }
                });
                sessions.retain(|s| !s.is_closed());
                sessions.push(session);
            }
        }
    }

    for session in sessions {
        session.close().await;
    }
    Ok(SUCCESS)
}
