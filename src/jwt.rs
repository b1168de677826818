//! Session token generation and validation.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Default session duration: 30 minutes
pub const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;

/// Signing secret and expiry policy, supplied once at startup.
#[derive(Clone)]
pub struct TokenSettings {
    pub secret: Vec<u8>,
    pub ttl_secs: u64,
}

impl TokenSettings {
    pub fn new(secret: impl Into<Vec<u8>>, ttl_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs,
        }
    }
}

/// JWT claims for session tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject token stored on the account row
    pub token: String,
    /// True for athletes, false for trainers
    #[serde(rename = "isNormalUser")]
    pub is_normal_user: bool,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Payload recovered from a verified session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSubject {
    pub subject_token: String,
    pub is_normal_user: bool,
}

/// Result of issuing a session token.
#[derive(Debug, Clone)]
pub struct SessionToken {
    /// The JWT token string
    pub token: String,
    /// Issued at timestamp (Unix seconds)
    pub issued_at: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
}

/// Configuration for JWT operations.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: u64,
}

impl JwtConfig {
    pub fn new(settings: &TokenSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(&settings.secret),
            decoding_key: DecodingKey::from_secret(&settings.secret),
            ttl_secs: settings.ttl_secs,
        }
    }

    /// Issue a session token valid for the configured duration from now.
    pub fn encode(
        &self,
        subject_token: &str,
        is_normal_user: bool,
    ) -> Result<SessionToken, JwtError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| JwtError::TimeError)?
            .as_secs();
        self.encode_at(subject_token, is_normal_user, now)
    }

    /// Issue a session token as if it had been issued at `issued_at`.
    pub fn encode_at(
        &self,
        subject_token: &str,
        is_normal_user: bool,
        issued_at: u64,
    ) -> Result<SessionToken, JwtError> {
        let exp = issued_at.saturating_add(self.ttl_secs);

        let claims = SessionClaims {
            token: subject_token.to_string(),
            is_normal_user,
            iat: issued_at,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(SessionToken {
            token,
            issued_at,
            expires_at: exp,
        })
    }

    /// Verify signature and expiry, then return the embedded subject.
    /// Never touches the database.
    pub fn decode(&self, token: &str) -> Result<SessionSubject, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let token_data =
            jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &validation)
                .map_err(JwtError::InvalidToken)?;

        Ok(SessionSubject {
            subject_token: token_data.claims.token,
            is_normal_user: token_data.claims.is_normal_user,
        })
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Bad signature, malformed payload or expired token
    InvalidToken(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::InvalidToken(e) => write!(f, "Invalid token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}
