//! Authentication error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Message shared by every rejected token, unknown account and role mismatch.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized.";

/// Authorization failure.
///
/// `Unauthorized` deliberately carries no reason: a bad token, a token whose
/// account is gone and a token of the wrong role all look the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    Unauthorized,
    /// The account repository failed; unrelated to the token.
    Backend,
}

impl AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::Backend => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AuthError::Unauthorized => UNAUTHORIZED_MESSAGE,
            AuthError::Backend => "Database error",
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            result: &'static str,
            error: &'static str,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                result: "no",
                error: self.message(),
            }),
        )
            .into_response()
    }
}
