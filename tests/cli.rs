//! Binary Tests
//!
//! Launch the real `tts-bridge` executable the way the host application does
//! and check the stdout/stderr status lines and exit codes.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use serde_json::Value;

fn bridge_command() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_tts-bridge"));
    command
        .env("RUST_LOG", "warn")
        .env_remove("TTS_BRIDGE_HOST")
        .env_remove("TTS_BRIDGE_PORT")
        .env_remove("TTS_BRIDGE_PARENT_PID")
        .env_remove("TTS_BRIDGE_PARENT_POLL_SECONDS");
    command
}

fn wait_with_deadline(child: &mut Child, deadline: Duration) -> ExitStatus {
    let started = Instant::now();
    loop {
        if let Some(status) = child.try_wait().expect("poll child") {
            return status;
        }
        if started.elapsed() > deadline {
            let _ = child.kill();
            panic!("tts-bridge did not exit within {deadline:?}");
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// Read the readiness line and return the announced port.
fn read_ready_port(child: &mut Child) -> u16 {
    let stdout = child.stdout.take().expect("piped stdout");
    let mut line = String::new();
    BufReader::new(stdout)
        .read_line(&mut line)
        .expect("read readiness line");

    assert!(line.contains(r#""status": "ready""#), "unexpected line: {line}");
    let ready: Value = serde_json::from_str(&line).expect("readiness line is JSON");
    assert_eq!(
        ready["message"],
        "Fish Audio TTS Server started (task-per-connection mode)"
    );
    ready["port"].as_u64().expect("port number") as u16
}

/// Send one HTTP/1.1 request and return the raw response text.
fn post(port: u16, body: &str) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).expect("connect to bridge");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();
    write!(
        stream,
        "POST / HTTP/1.1\r\nHost: 127.0.0.1:{port}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
    .unwrap();

    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

fn stderr_of(child: &mut Child) -> String {
    let mut stderr = String::new();
    child
        .stderr
        .take()
        .expect("piped stderr")
        .read_to_string(&mut stderr)
        .unwrap();
    stderr
}

/// Test the ready line, the shutdown command, and the stopped line
#[test]
fn test_ready_then_shutdown_command() {
    let mut child = bridge_command()
        .arg("0")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn tts-bridge");

    let port = read_ready_port(&mut child);
    assert_ne!(port, 0);

    let response = post(port, r#"{"command": "shutdown"}"#);
    assert!(response.starts_with("HTTP/1.1 200"), "response: {response}");
    assert!(response.contains(r#""message":"Shutting down""#));

    let status = wait_with_deadline(&mut child, Duration::from_secs(10));
    assert!(status.success());
    assert!(stderr_of(&mut child).contains(r#"{"status": "stopped", "message": "Fish Audio TTS Server stopped"}"#));
}

/// Test an unparsable port exits with status 1 and a JSON error line
#[test]
fn test_invalid_port_argument() {
    let output = bridge_command()
        .arg("not-a-port")
        .output()
        .expect("run tts-bridge");

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains(r#"{"status": "error", "error": "Invalid port number: not-a-port"}"#),
        "stderr: {stderr}"
    );
}

/// Test an unparsable parent pid is ignored rather than fatal
#[test]
fn test_invalid_parent_pid_is_ignored() {
    let mut child = bridge_command()
        .args(["0", "not-a-pid"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn tts-bridge");

    let port = read_ready_port(&mut child);
    let response = post(port, r#"{"command": "shutdown"}"#);
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(wait_with_deadline(&mut child, Duration::from_secs(10)).success());
}

/// Test the preflight report is JSON on stdout
#[test]
fn test_check_subcommand() {
    let output = bridge_command()
        .arg("check")
        .output()
        .expect("run tts-bridge check");

    let report: Value = serde_json::from_slice(&output.stdout).expect("report is JSON");
    assert_eq!(report["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(report["success"], output.status.success());
    assert!(report["passed"].is_array());
    assert!(report["failed"].is_array());
}

/// Test the bridge exits by itself after its parent process dies
#[cfg(unix)]
#[test]
fn test_exits_when_parent_dies() {
    let mut parent = Command::new("sleep")
        .arg("30")
        .spawn()
        .expect("spawn stand-in parent");
    let parent_pid = parent.id();

    let mut child = bridge_command()
        .args(["0", &parent_pid.to_string()])
        .env("TTS_BRIDGE_PARENT_POLL_SECONDS", "1")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn tts-bridge");
    read_ready_port(&mut child);

    parent.kill().expect("kill stand-in parent");
    parent.wait().expect("reap stand-in parent");

    let status = wait_with_deadline(&mut child, Duration::from_secs(10));
    assert!(status.success());
}
