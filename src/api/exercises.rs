//! Trainer exercises and their common mistakes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ResultExt, ok};
use crate::auth::{Auth, TrainerOnly};
use crate::db::{Database, Exercise, NewExercise};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct ExercisesState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(ExercisesState);

pub fn router(state: ExercisesState) -> Router {
    Router::new()
        .route("/", get(list_exercises).post(create_exercise))
        .route("/{id}/common-mistakes", post(create_common_mistake))
        .with_state(state)
}

#[derive(Deserialize)]
struct NewCommonMistake {
    description: String,
}

#[derive(Serialize)]
struct CreatedResponse {
    id: i64,
}

#[derive(Serialize)]
struct ExerciseListResponse {
    exercises: Vec<Exercise>,
}

async fn create_exercise(
    State(state): State<ExercisesState>,
    Auth(identity, ..): Auth<TrainerOnly>,
    Json(mut exercise): Json<NewExercise>,
) -> Result<impl IntoResponse, ApiError> {
    exercise.name = exercise.name.trim().to_string();
    if exercise.name.is_empty() {
        return Err(ApiError::bad_request("Exercise name cannot be empty"));
    }

    let id = state
        .db
        .exercises()
        .create(identity.account_id(), &exercise)
        .await
        .db_err("Failed to create exercise")?;

    Ok((StatusCode::CREATED, ok(CreatedResponse { id })))
}

async fn list_exercises(
    State(state): State<ExercisesState>,
    Auth(identity, ..): Auth<TrainerOnly>,
) -> Result<impl IntoResponse, ApiError> {
    let exercises = state
        .db
        .exercises()
        .list_for_trainer(identity.account_id())
        .await
        .db_err("Failed to list exercises")?;

    Ok(ok(ExerciseListResponse { exercises }))
}

async fn create_common_mistake(
    State(state): State<ExercisesState>,
    Auth(identity, ..): Auth<TrainerOnly>,
    Path(exercise_id): Path<i64>,
    Json(payload): Json<NewCommonMistake>,
) -> Result<impl IntoResponse, ApiError> {
    let description = payload.description.trim();
    if description.is_empty() {
        return Err(ApiError::bad_request("Description cannot be empty"));
    }

    let exercise = state
        .db
        .exercises()
        .get_by_id(exercise_id)
        .await
        .db_err("Failed to get exercise")?
        .ok_or_else(|| ApiError::not_found("Exercise not found"))?;

    // Another trainer's exercise is reported like a missing one.
    if exercise.trainer_id != identity.account_id() {
        return Err(ApiError::not_found("Exercise not found"));
    }

    let id = state
        .db
        .exercises()
        .create_common_mistake(exercise.id, description)
        .await
        .db_err("Failed to create common mistake")?;

    Ok((StatusCode::CREATED, ok(CreatedResponse { id })))
}
