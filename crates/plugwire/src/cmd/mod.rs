use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use plugwire_session::{DispatchMode, SessionConfig};
use serde_json::Value;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod builtin;
pub mod call;
pub mod notify;
pub mod serve;
pub mod stdio;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the built-in plugin methods on a Unix socket.
    Serve(ServeArgs),
    /// Serve the built-in plugin methods over stdin/stdout.
    Stdio(StdioArgs),
    /// Call a method on a plugin and print the result.
    Call(CallArgs),
    /// Send a notification to a plugin.
    Notify(NotifyArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Copy)]
pub struct Globals {
    pub format: OutputFormat,
    pub max_payload_size: usize,
}

pub async fn run(command: Command, globals: Globals) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, globals).await,
        Command::Stdio(args) => stdio::run(args, globals).await,
        Command::Call(args) => call::run(args, globals).await,
        Command::Notify(args) => notify::run(args, globals).await,
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Socket path to bind.
    pub path: PathBuf,
    /// Handle inbound messages one at a time, in arrival order.
    #[arg(long)]
    pub sequential: bool,
}

#[derive(Args, Debug)]
pub struct StdioArgs {
    /// Handle inbound messages one at a time, in arrival order.
    #[arg(long)]
    pub sequential: bool,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// Method to invoke.
    pub method: String,
    /// Positional arguments as a JSON array.
    #[arg(long, default_value = "[]")]
    pub args: String,
    /// Give up after this long (e.g. 5s, 500ms).
    #[arg(long)]
    pub timeout: Option<String>,
    /// Skip the redraw that normally follows the call.
    #[arg(long)]
    pub no_redraw: bool,
}

#[derive(Args, Debug)]
pub struct NotifyArgs {
    /// Socket path to connect to.
    pub path: PathBuf,
    /// Method to invoke.
    pub method: String,
    /// Positional arguments as a JSON array.
    #[arg(long, default_value = "[]")]
    pub args: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn session_config(base: SessionConfig, globals: &Globals, sequential: bool) -> SessionConfig {
    let dispatch = if sequential {
        DispatchMode::Sequential
    } else {
        DispatchMode::Concurrent
    };
    base.with_max_payload_size(globals.max_payload_size)
        .with_dispatch(dispatch)
}

/// Parse `--args`, which must be a JSON array.
pub fn parse_json_args(input: &str) -> CliResult<Vec<Value>> {
    match serde_json::from_str::<Value>(input) {
        Ok(Value::Array(args)) => Ok(args),
        Ok(other) => Err(CliError::new(
            USAGE,
            format!("--args must be a JSON array, got {other}"),
        )),
        Err(err) => Err(CliError::new(
            USAGE,
            format!("--args is not valid JSON: {err}"),
        )),
    }
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

/// Resolves on Ctrl-C. If the handler cannot be installed, never resolves.
pub async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
