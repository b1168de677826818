#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderName, Request, Response, StatusCode},
};
use coachhub::{ServerConfig, create_app, db::Database, jwt::TokenSettings, rate_limit::RateLimits};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_IP: &str = "127.0.0.1";
pub const TEST_SECRET: &[u8] = b"test-jwt-secret-that-is-long-enough";
pub const STRONG_PASSWORD: &str = "Str0ngPassw0rd!";

/// Router plus the handles a test needs to inspect side effects.
pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub media: TempDir,
}

pub async fn create_test_app() -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let media = TempDir::new().expect("Failed to create media dir");
    let config = ServerConfig {
        db: db.clone(),
        tokens: TokenSettings::new(TEST_SECRET, 1800),
        media_root: media.path().to_path_buf(),
        ip_header: Some(HeaderName::from_static("x-forwarded-for")),
        rate_limits: RateLimits::generous(),
    };
    TestApp {
        app: create_app(&config),
        db,
        media,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn post_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-forwarded-for", TEST_IP);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let response = self
            .send(builder.body(Body::from(body.to_string())).unwrap())
            .await;
        read_json(response).await
    }

    pub async fn put_json(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("PUT")
            .uri(uri)
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::from(body.to_string()))
            .unwrap();
        read_json(self.send(request).await).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        read_json(self.send(builder.body(Body::empty()).unwrap()).await).await
    }

    /// Register an account and return its session token.
    pub async fn register(&self, username: &str, is_normal_user: bool) -> String {
        let (status, json) = self
            .post_json(
                "/api/users/register",
                None,
                serde_json::json!({
                    "username": username,
                    "password": STRONG_PASSWORD,
                    "isNormalUser": is_normal_user,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", json);
        json["token"].as_str().unwrap().to_string()
    }

    /// Account id behind a session token.
    pub async fn whoami(&self, token: &str) -> i64 {
        let (status, json) = self.get("/api/users/session", Some(token)).await;
        assert_eq!(status, StatusCode::OK, "session check failed: {}", json);
        json["id"].as_i64().unwrap()
    }

    pub async fn upload(
        &self,
        uri: &str,
        token: &str,
        filename: &str,
        data: &[u8],
    ) -> (StatusCode, Value) {
        let (content_type, body) = build_multipart_body(filename, data);
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", content_type)
            .header("authorization", format!("Bearer {}", token))
            .body(Body::from(body))
            .unwrap();
        read_json(self.send(request).await).await
    }
}

pub async fn read_json(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

/// Build a multipart/form-data body with a single file field.
pub fn build_multipart_body(filename: &str, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "----TestBoundary12345";
    let mut body = Vec::new();

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(b"\r\n");

    // End boundary
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    let content_type = format!("multipart/form-data; boundary={}", boundary);
    (content_type, body)
}
