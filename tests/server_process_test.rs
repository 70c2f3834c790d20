//! End-to-end tests that drive the `server` binary with real signals.

#![cfg(unix)]

mod common;

use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::Duration;

use common::free_local_addr;

fn spawn_server(port: u16) -> Child {
    Command::new(env!("CARGO_BIN_EXE_server"))
        .args(["--host", "127.0.0.1", "--port", &port.to_string()])
        .args(["--log-level", "warn"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("Failed to spawn server binary")
}

async fn wait_for_exit(mut child: Child) -> ExitStatus {
    tokio::task::spawn_blocking(move || child.wait())
        .await
        .unwrap()
        .expect("Failed to wait for server")
}

async fn wait_until_healthy(url: &str) -> bool {
    for _ in 0..100 {
        if let Ok(response) = reqwest::get(url).await {
            if response.status().is_success() {
                return true;
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

/// Start the server, wait for it to serve, send `signal` via `kill`, and
/// return how it exited.
async fn exit_status_after(signal: &str) -> ExitStatus {
    let addr = free_local_addr();
    let mut child = spawn_server(addr.port());

    if !wait_until_healthy(&format!("http://{addr}/health")).await {
        let _ = child.kill();
        panic!("server never became healthy");
    }

    let sent = Command::new("kill")
        .args([signal, &child.id().to_string()])
        .status()
        .unwrap();
    assert!(sent.success());

    wait_for_exit(child).await
}

#[tokio::test]
async fn test_server_exits_zero_on_sigterm() {
    let status = exit_status_after("-TERM").await;
    assert!(status.success(), "server exited with {status}");
}

#[tokio::test]
async fn test_server_exits_zero_on_sigint() {
    let status = exit_status_after("-INT").await;
    assert!(status.success(), "server exited with {status}");
}

#[tokio::test]
async fn test_server_exits_non_zero_when_port_is_taken() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let status = wait_for_exit(spawn_server(port)).await;

    assert_eq!(status.code(), Some(1));
    drop(taken);
}
