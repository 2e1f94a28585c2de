//! Integration tests for the ipfilter binary.
//!
//! The end-to-end test runs `ipfilter serve` with the `echo` wrapper, so no
//! firewall is touched and no privileges are needed.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Helper to get the path to the compiled binary
fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_ipfilter"))
}

/// Run ipfilter command and return output
fn run_ipfilter(args: &[&str]) -> std::process::Output {
    Command::new(get_binary_path())
        .args(args)
        .output()
        .expect("Failed to execute ipfilter")
}

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, content).unwrap();
    path
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn http(port: u16, request: &str) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    stream.write_all(request.as_bytes()).unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    response
}

#[test]
fn test_version_command() {
    let output = run_ipfilter(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ipfilter"));
}

#[test]
fn test_help_command() {
    let output = run_ipfilter(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("check-config"));
}

#[test]
fn test_default_config_is_valid() {
    let output = run_ipfilter(&["default-config"]);
    assert!(output.status.success());
    let yaml = String::from_utf8_lossy(&output.stdout);

    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, &yaml);
    let output = run_ipfilter(&["check-config", "--config", path.to_str().unwrap()]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("127.0.0.1:8080"));
    assert!(stdout.contains("Eviction TTL"));
}

#[test]
fn test_check_config_rejects_invalid_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "eviction:\n  ttl: forever\n");
    let output = run_ipfilter(&["check-config", "--config", path.to_str().unwrap()]);
    assert!(!output.status.success());
}

#[test]
fn test_check_config_requires_existing_file() {
    let output = run_ipfilter(&["check-config", "--config", "/nonexistent/ipfilter.yaml"]);
    assert!(!output.status.success());
}

#[test]
fn test_serve_rejects_invalid_listen() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "wrapper: echo\n");
    let output = run_ipfilter(&[
        "serve",
        "--config",
        path.to_str().unwrap(),
        "--listen",
        "not-an-address",
    ]);
    assert!(!output.status.success());
}

#[test]
fn test_serve_end_to_end_with_echo_wrapper() {
    let port = free_port();
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        &format!("listen: 127.0.0.1:{}\nwrapper: echo\nshutdown_grace: 1s\n", port),
    );

    let mut child = Command::new(get_binary_path())
        .args(["serve", "--config", path.to_str().unwrap()])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn ipfilter");

    let started = Instant::now();
    while TcpStream::connect(("127.0.0.1", port)).is_err() {
        assert!(
            started.elapsed() < Duration::from_secs(10),
            "server did not start"
        );
        std::thread::sleep(Duration::from_millis(50));
    }

    let body = "ip=198.51.100.4";
    let response = http(
        port,
        &format!(
            "POST /api/ip/add HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\
             Content-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        ),
    );
    assert!(response.starts_with("HTTP/1.1 303"), "{}", response);

    let response = http(port, "GET / HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 200"), "{}", response);
    assert!(response.contains("198.51.100.4"));

    // SIGTERM triggers the graceful shutdown path
    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGTERM);
    }
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let logs = String::from_utf8_lossy(&output.stdout);
    assert!(logs.contains("Received SIGTERM"), "{}", logs);
    assert!(logs.contains("Firewall entries"), "{}", logs);
    assert!(logs.contains("198.51.100.4"), "{}", logs);
}
