//! Tests for startup validation and the background server helper.

use std::process::{Command, Stdio};

use axum::http::HeaderName;
use coachhub::{
    ServerConfig, db::Database, jwt::TokenSettings, rate_limit::RateLimits, start_server,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

fn run_binary(envs: &[(&str, &str)], args: &[&str]) -> String {
    let mut command = Command::new(env!("CARGO_BIN_EXE_coachhub"));
    command.env_remove("JWT_SECRET");
    for (key, value) in envs {
        command.env(key, value);
    }
    let output = command
        .args(args)
        .stderr(Stdio::piped())
        .stdout(Stdio::piped())
        .output()
        .expect("Failed to run binary");

    assert!(!output.status.success(), "Should exit with error");

    // tracing logs to stdout by default
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{}{}", stdout, stderr)
}

#[test]
fn test_missing_jwt_secret_exits_with_error() {
    let combined = run_binary(&[], &["--database", ":memory:"]);
    assert!(
        combined.contains("JWT_SECRET") && combined.contains("required"),
        "Should mention JWT_SECRET is required, got: {}",
        combined
    );
}

#[test]
fn test_short_jwt_secret_exits_with_error() {
    let combined = run_binary(&[("JWT_SECRET", "too-short")], &["--database", ":memory:"]);
    assert!(
        combined.contains("shorter than 32"),
        "Should mention the minimum length, got: {}",
        combined
    );
}

#[test]
fn test_unreadable_secret_file_exits_with_error() {
    let combined = run_binary(
        &[],
        &[
            "--database",
            ":memory:",
            "--jwt-secret-file",
            "/nonexistent/jwt-secret",
        ],
    );
    assert!(
        combined.contains("Failed to read JWT secret file"),
        "Should report the unreadable file, got: {}",
        combined
    );
}

#[tokio::test]
async fn test_start_server_serves_requests() {
    let media = tempfile::TempDir::new().unwrap();
    let config = ServerConfig {
        db: Database::open(":memory:").await.unwrap(),
        tokens: TokenSettings::new(b"test-jwt-secret-that-is-long-enough".to_vec(), 1800),
        media_root: media.path().to_path_buf(),
        ip_header: Some(HeaderName::from_static("x-forwarded-for")),
        rate_limits: RateLimits::generous(),
    };

    let (handle, addr) = start_server(config, 0).await.unwrap();

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /api/users/session HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 401"), "got: {}", response);
    assert!(response.contains("Unauthorized."));

    handle.abort();
}
