pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod media;
pub mod password;
pub mod rate_limit;
pub mod upload;

use api::create_api_router;
use axum::{Router, http::HeaderName};
use db::Database;
use jwt::{JwtConfig, TokenSettings};
use media::MediaStorage;
use rate_limit::{RateLimitConfig, RateLimits};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Session signing secret and lifetime
    pub tokens: TokenSettings,
    /// Directory uploaded media is stored under
    pub media_root: PathBuf,
    /// Proxy header carrying the client IP; the socket address is used when unset
    pub ip_header: Option<HeaderName>,
    /// Quotas for login and registration
    pub rate_limits: RateLimits,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(&config.tokens));
    let rate_limit_config = Arc::new(RateLimitConfig::new(
        config.rate_limits,
        config.ip_header.clone(),
    ));

    let api_router = create_api_router(
        config.db.clone(),
        jwt,
        MediaStorage::new(config.media_root.clone()),
        rate_limit_config,
    );

    Router::new().nest("/api", api_router)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        run_server(config, listener).await.ok();
    });

    Ok((handle, local_addr))
}
