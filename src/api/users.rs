//! Registration, login and session check.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

use super::error::{ApiError, ResultExt, ok};
use crate::auth::{Auth, Identity, Role};
use crate::db::{Database, is_unique_violation};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::password::{check_password_requirements, hash_password, verify_dummy, verify_password};
use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_register};

const MAX_USERNAME_LEN: usize = 32;
const WRONG_CREDENTIALS: &str = "Wrong username or password.";
const USERNAME_TAKEN: &str = "Username already in use.";

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

impl_has_auth_backend!(UsersState);

pub fn router(state: UsersState) -> Router {
    let register_router = Router::new()
        .route("/register", post(register))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_register,
        ));

    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_login,
        ));

    Router::new()
        .route("/session", get(check_authentication))
        .with_state(state)
        .merge(register_router)
        .merge(login_router)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    username: String,
    password: String,
    is_normal_user: bool,
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    token: String,
    expires_at: u64,
    is_normal_user: bool,
}

#[derive(Serialize)]
struct IdentityResponse {
    id: i64,
    role: Role,
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::bad_request("Username cannot be empty"));
    }

    if username.len() > MAX_USERNAME_LEN {
        return Err(ApiError::bad_request(
            "Username cannot be longer than 32 characters",
        ));
    }

    // Only allow alphanumeric and underscores
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ApiError::bad_request(
            "Username can only contain letters, numbers, and underscores",
        ));
    }

    Ok(())
}

/// Run argon2 work on the blocking pool instead of an async worker.
async fn run_blocking<T, F>(task: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ApiError::internal(format!("Password task failed: {}", e)))
}

/// Verify `password` against each candidate account in order and return the
/// first that matches. With no candidates the dummy hash is verified instead.
fn match_password(candidates: Vec<(Identity, String)>, password: &str) -> Option<Identity> {
    if candidates.is_empty() {
        verify_dummy(password);
        return None;
    }
    candidates
        .into_iter()
        .find(|(_, hash)| verify_password(hash, password))
        .map(|(identity, _)| identity)
}

/// Rotate the account's subject token and sign a session for it.
/// Any session issued before stops resolving.
async fn start_session(
    state: &UsersState,
    identity: Identity,
) -> Result<SessionResponse, ApiError> {
    let subject_token = uuid::Uuid::new_v4().to_string();

    let updated = match identity {
        Identity::Athlete { id } => {
            state.db.athletes().set_subject_token(id, &subject_token).await
        }
        Identity::Trainer { id } => {
            state.db.trainers().set_subject_token(id, &subject_token).await
        }
    }
    .db_err("Failed to store subject token")?;

    if !updated {
        return Err(ApiError::internal("Account disappeared during login"));
    }

    let is_normal_user = identity.role().is_normal_user();
    let session = state
        .jwt
        .encode(&subject_token, is_normal_user)
        .map_err(|e| ApiError::internal(format!("Failed to sign session: {}", e)))?;

    Ok(SessionResponse {
        token: session.token,
        expires_at: session.expires_at,
        is_normal_user,
    })
}

async fn register(
    State(state): State<UsersState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim();
    validate_username(username)?;

    let available = state
        .db
        .is_username_available(username)
        .await
        .db_err("Failed to check username availability")?;

    if !available {
        return Err(ApiError::conflict(USERNAME_TAKEN));
    }

    check_password_requirements(&payload.password).map_err(ApiError::bad_request)?;

    let password = payload.password;
    let password_hash = run_blocking(move || hash_password(&password))
        .await?
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    let created = if payload.is_normal_user {
        state
            .db
            .athletes()
            .create(username, &password_hash)
            .await
            .map(|id| Identity::Athlete { id })
    } else {
        state
            .db
            .trainers()
            .create(username, &password_hash)
            .await
            .map(|id| Identity::Trainer { id })
    };

    // Losing a registration race against either role ends here
    let identity = match created {
        Ok(identity) => identity,
        Err(e) if is_unique_violation(&e) => return Err(ApiError::conflict(USERNAME_TAKEN)),
        Err(e) => return Err(ApiError::db_error("Failed to create account", e)),
    };

    info!(username = %username, role = identity.role().as_str(), "Account registered");

    let session = start_session(&state, identity).await?;
    Ok((StatusCode::CREATED, ok(session)))
}

async fn login(
    State(state): State<UsersState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = payload.username.trim();

    let athlete = state
        .db
        .athletes()
        .get_by_username(username)
        .await
        .db_err("Failed to look up athlete")?;

    let trainer = state
        .db
        .trainers()
        .get_by_username(username)
        .await
        .db_err("Failed to look up trainer")?;

    let candidates: Vec<(Identity, String)> = athlete
        .map(|a| (Identity::Athlete { id: a.id }, a.password_hash))
        .into_iter()
        .chain(trainer.map(|t| (Identity::Trainer { id: t.id }, t.password_hash)))
        .collect();

    let password = payload.password;
    let identity = run_blocking(move || match_password(candidates, &password)).await?;

    let Some(identity) = identity else {
        debug!(username = %username, "Login rejected");
        return Err(ApiError::unauthorized(WRONG_CREDENTIALS));
    };

    let session = start_session(&state, identity).await?;
    Ok(ok(session))
}

async fn check_authentication(Auth(identity, ..): Auth) -> impl IntoResponse {
    ok(IdentityResponse {
        id: identity.account_id(),
        role: identity.role(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_username_rules() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("coach_bob_2").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("alice@bob").is_err());
        assert!(validate_username(&"a".repeat(33)).is_err());
        assert!(validate_username(&"a".repeat(32)).is_ok());
    }

    #[test]
    fn test_match_password_tries_every_candidate() {
        let athlete_hash = hash_password("Athl3tePassword!").unwrap();
        let trainer_hash = hash_password("Tra1nerPassword!").unwrap();
        let candidates = || {
            vec![
                (Identity::Athlete { id: 1 }, athlete_hash.clone()),
                (Identity::Trainer { id: 7 }, trainer_hash.clone()),
            ]
        };

        assert_eq!(
            match_password(candidates(), "Athl3tePassword!"),
            Some(Identity::Athlete { id: 1 })
        );
        assert_eq!(
            match_password(candidates(), "Tra1nerPassword!"),
            Some(Identity::Trainer { id: 7 })
        );
        assert_eq!(match_password(candidates(), "Wr0ngPassword!"), None);
        assert_eq!(match_password(Vec::new(), "Athl3tePassword!"), None);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_hashing_leaves_runtime_responsive() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let ticker = tokio::spawn({
            let ticks = ticks.clone();
            async move {
                loop {
                    ticks.fetch_add(1, Ordering::Relaxed);
                    tokio::task::yield_now().await;
                }
            }
        });

        let hash = run_blocking(|| hash_password("Str0ngPassw0rd!"))
            .await
            .unwrap()
            .unwrap();
        ticker.abort();

        assert!(hash.starts_with("$argon2"));
        assert!(ticks.load(Ordering::Relaxed) > 0);
    }
}
