use plugwire_host::Host;
use plugwire_session::SessionConfig;

use crate::cmd::{parse_json_args, session_config, Globals, NotifyArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::print_notified;

pub async fn run(args: NotifyArgs, globals: Globals) -> CliResult<i32> {
    let notify_args = parse_json_args(&args.args)?;

    let config = session_config(SessionConfig::host(), &globals, false);
    let host = Host::connect(&args.path, config)
        .await
        .map_err(|err| session_error("connect failed", err))?;

    let sent = host.notify(&args.method, notify_args).await;
    // close() drains the writer queue, so the notification is on the wire
    // before the socket shuts down.
    host.close().await;
    sent.map_err(|err| session_error("notify failed", err))?;

    print_notified(&args.method, globals.format);
    Ok(SUCCESS)
}
