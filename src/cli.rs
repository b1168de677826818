//! CLI argument parsing, validation, and startup helpers.

use std::path::PathBuf;

use crate::ServerConfig;
use crate::db::Database;
use crate::jwt::{DEFAULT_SESSION_TTL_SECS, TokenSettings};
use crate::rate_limit::RateLimits;
use axum::http::HeaderName;
use clap::Parser;
use tracing::{error, info};

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "coachhub",
    about = "Backend for a personal training marketplace"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "COACHHUB_PORT", default_value = "7291")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "COACHHUB_DATABASE", default_value = "coachhub.db")]
    pub database: String,

    /// Directory for avatars, thumbnails and videos
    #[arg(short, long, env = "COACHHUB_MEDIA_DIR", default_value = "media")]
    pub media_dir: PathBuf,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Session lifetime in seconds
    #[arg(long, env = "COACHHUB_SESSION_TTL", default_value_t = DEFAULT_SESSION_TTL_SECS,
        value_parser = clap::value_parser!(u64).range(1..))]
    pub session_ttl: u64,

    /// Header holding the client IP when running behind a reverse proxy (e.g. "x-forwarded-for")
    #[arg(long, env = "COACHHUB_IP_HEADER", value_parser = parse_header_name)]
    pub ip_header: Option<HeaderName>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

fn parse_header_name(s: &str) -> Result<HeaderName, String> {
    HeaderName::try_from(s.trim()).map_err(|e| format!("Invalid header name {:?}: {}", s, e))
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    validate_jwt_secret(secret)
}

fn validate_jwt_secret(secret: String) -> Option<String> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }
    Some(secret)
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, jwt_secret: String) -> ServerConfig {
    ServerConfig {
        db,
        tokens: TokenSettings::new(jwt_secret.into_bytes(), args.session_ttl),
        media_root: args.media_dir.clone(),
        ip_header: args.ip_header.clone(),
        rate_limits: RateLimits::default(),
    }
}
