#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/pwcli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn wait_for_socket(path: &Path, timeout: Duration) {
    let start = Instant::now();
    while !path.exists() {
        if start.elapsed() >= timeout {
            panic!("socket did not appear: {}", path.display());
        }
        thread::sleep(Duration::from_millis(25));
    }
}

struct Server {
    child: Child,
    dir: PathBuf,
    sock_path: PathBuf,
}

impl Server {
    fn start(tag: &str) -> Self {
        let dir = unique_temp_dir(tag);
        let sock_path = dir.join("plugin.sock");
        let child = Command::new(env!("CARGO_BIN_EXE_plugwire"))
            .arg("--log-level")
            .arg("error")
            .arg("serve")
            .arg(&sock_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("serve command should start");
        wait_for_socket(&sock_path, Duration::from_secs(5));
        Self {
            child,
            dir,
            sock_path,
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

fn plugwire(args: &[&str], sock_path: Option<&Path>, rest: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_plugwire"));
    command.arg("--log-level").arg("error").args(args);
    if let Some(path) = sock_path {
        command.arg(path);
    }
    command.args(rest).output().expect("plugwire should run")
}

#[test]
fn call_echo_prints_json_result() {
    let server = Server::start("echo");
    let output = plugwire(
        &["--format", "json", "call"],
        Some(&server.sock_path),
        &["echo", "--args", r#"[{"hello":"world"}]"#],
    );

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let printed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(
        printed,
        serde_json::json!({"method": "echo", "result": {"hello": "world"}})
    );
}

#[test]
fn call_raw_format_prints_bare_string() {
    let server = Server::start("raw");
    let output = plugwire(&["--format", "raw", "call"], Some(&server.sock_path), &["ping"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "pong\n");
}

#[test]
fn unknown_method_exits_with_remote_error() {
    let server = Server::start("unknown");
    let output = plugwire(&["call"], Some(&server.sock_path), &["nope"]);

    assert_eq!(output.status.code(), Some(4));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("method 'nope' is not defined in the invoker"));
}

#[test]
fn server_keeps_serving_after_each_client() {
    let server = Server::start("many");
    for _ in 0..3 {
        let output = plugwire(&["call", "--no-redraw"], Some(&server.sock_path), &["ping"]);
        assert!(output.status.success());
    }
}

#[test]
fn call_timeout_returns_124() {
    let server = Server::start("timeout");
    let output = plugwire(
        &["call"],
        Some(&server.sock_path),
        &["sleep", "--args", "[2000]", "--timeout", "100ms"],
    );
    assert_eq!(output.status.code(), Some(124));
}

#[test]
fn notify_succeeds_without_reply() {
    let server = Server::start("notify");
    let output = plugwire(
        &["--format", "json", "notify"],
        Some(&server.sock_path),
        &["echo", "--args", r#"["fire and forget"]"#],
    );
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("\"notified\":true"));
}

#[test]
fn missing_socket_is_a_transport_error() {
    let dir = unique_temp_dir("missing");
    let output = plugwire(&["call"], Some(&dir.join("absent.sock")), &["ping"]);
    assert_eq!(output.status.code(), Some(3));
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn non_array_args_are_a_usage_error() {
    let output = plugwire(
        &["call"],
        Some(Path::new("/tmp/unused.sock")),
        &["echo", "--args", r#"{"not":"a list"}"#],
    );
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn version_prints_name() {
    let output = plugwire(&["version"], None, &[]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("plugwire "));

    let extended = plugwire(&["version", "--extended"], None, &[]);
    assert!(String::from_utf8_lossy(&extended.stdout).contains("features: session=true, host=true"));
}
