//! Trainer profiles.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, put},
};
use serde::Serialize;
use std::sync::Arc;

use super::error::{ApiError, Empty, ResultExt, ok};
use crate::auth::{AthleteOnly, Auth, TrainerOnly};
use crate::db::{Database, TrainerDetails, TrainerProfile, TrainerSummary};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct TrainersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(TrainersState);

pub fn router(state: TrainersState) -> Router {
    Router::new()
        .route("/me", get(get_own_profile))
        .route("/me/details", put(set_details))
        .route("/new", get(list_new_trainers))
        .route("/{id}", get(get_profile))
        .with_state(state)
}

#[derive(Serialize)]
struct ProfileResponse {
    id: i64,
    #[serde(flatten)]
    profile: TrainerProfile,
}

#[derive(Serialize)]
struct TrainerListResponse {
    trainers: Vec<TrainerSummary>,
}

async fn load_profile(state: &TrainersState, id: i64) -> Result<ProfileResponse, ApiError> {
    let trainer = state
        .db
        .trainers()
        .get_by_id(id)
        .await
        .db_err("Failed to get trainer")?
        .ok_or_else(|| ApiError::not_found("Trainer not found"))?;

    Ok(ProfileResponse {
        id: trainer.id,
        profile: trainer.profile,
    })
}

async fn get_profile(
    State(state): State<TrainersState>,
    Auth(..): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ok(load_profile(&state, id).await?))
}

async fn get_own_profile(
    State(state): State<TrainersState>,
    Auth(identity, ..): Auth<TrainerOnly>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(ok(load_profile(&state, identity.account_id()).await?))
}

async fn set_details(
    State(state): State<TrainersState>,
    Auth(identity, ..): Auth<TrainerOnly>,
    Json(details): Json<TrainerDetails>,
) -> Result<impl IntoResponse, ApiError> {
    if details.price.is_some_and(|p| !p.is_finite() || p < 0.0) {
        return Err(ApiError::bad_request("Price must be a non-negative number"));
    }
    if details.slots.is_some_and(|s| s < 0) {
        return Err(ApiError::bad_request("Slots cannot be negative"));
    }

    let updated = state
        .db
        .trainers()
        .update_details(identity.account_id(), &details)
        .await
        .db_err("Failed to update trainer details")?;

    if !updated {
        return Err(ApiError::not_found("Trainer not found"));
    }

    Ok(ok(Empty {}))
}

async fn list_new_trainers(
    State(state): State<TrainersState>,
    Auth(identity, ..): Auth<AthleteOnly>,
) -> Result<impl IntoResponse, ApiError> {
    let trainers = state
        .db
        .trainers()
        .not_subscribed_by(identity.account_id())
        .await
        .db_err("Failed to list trainers")?;

    Ok(ok(TrainerListResponse { trainers }))
}
