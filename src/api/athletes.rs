//! Athlete summaries and weight progress.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ResultExt, ok};
use crate::auth::{AthleteOnly, Auth};
use crate::db::{Database, WeightEntry};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct AthletesState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(AthletesState);

pub fn router(state: AthletesState) -> Router {
    Router::new()
        .route("/me/weight", get(list_weight).post(add_weight))
        .route("/{id}", get(get_athlete))
        .with_state(state)
}

#[derive(Deserialize)]
struct AddWeightRequest {
    weight: i64,
    date: String,
}

#[derive(Serialize)]
struct WeightProgressResponse {
    progress: Vec<WeightEntry>,
}

#[derive(Serialize)]
struct CreatedResponse {
    id: i64,
}

async fn get_athlete(
    State(state): State<AthletesState>,
    Auth(..): Auth,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .db
        .athletes()
        .get_summary(id)
        .await
        .db_err("Failed to get athlete")?
        .ok_or_else(|| ApiError::not_found("Athlete not found"))?;

    Ok(ok(summary))
}

async fn list_weight(
    State(state): State<AthletesState>,
    Auth(identity, ..): Auth<AthleteOnly>,
) -> Result<impl IntoResponse, ApiError> {
    let progress = state
        .db
        .athletes()
        .weight_progress(identity.account_id())
        .await
        .db_err("Failed to list weight progress")?;

    Ok(ok(WeightProgressResponse { progress }))
}

async fn add_weight(
    State(state): State<AthletesState>,
    Auth(identity, ..): Auth<AthleteOnly>,
    Json(payload): Json<AddWeightRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.weight <= 0 {
        return Err(ApiError::bad_request("Weight must be positive"));
    }
    let date = payload.date.trim();
    if date.is_empty() {
        return Err(ApiError::bad_request("Date cannot be empty"));
    }

    let id = state
        .db
        .athletes()
        .add_weight_progress(identity.account_id(), payload.weight, date)
        .await
        .db_err("Failed to add weight progress")?;

    Ok((StatusCode::CREATED, ok(CreatedResponse { id })))
}
