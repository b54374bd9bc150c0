use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct CallOutput<'a> {
    method: &'a str,
    result: &'a Value,
}

#[derive(Serialize)]
struct NotifyOutput<'a> {
    method: &'a str,
    notified: bool,
}

/// Print the result of a completed call.
pub fn print_result(method: &str, result: &Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = CallOutput { method, result };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["METHOD", "TYPE", "RESULT"])
                .add_row(vec![
                    method.to_string(),
                    type_name(result).to_string(),
                    result.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let body = serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string());
            println!("{method} => {body}");
        }
        OutputFormat::Raw => print_raw(result),
    }
}

pub fn print_notified(method: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = NotifyOutput {
                method,
                notified: true,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["METHOD", "STATUS"])
                .add_row(vec![method, "notified"]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{method} notified"),
        OutputFormat::Raw => {}
    }
}

/// Strings are written bare, anything else as compact JSON.
fn print_raw(value: &Value) {
    let mut out = std::io::stdout();
    let _ = match value {
        Value::String(text) => writeln!(out, "{text}"),
        other => writeln!(out, "{other}"),
    };
    let _ = out.flush();
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
