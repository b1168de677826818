//! Athlete to trainer subscriptions.

use axum::{
    Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::error::{ApiError, ResultExt, ok};
use crate::auth::{AthleteOnly, Auth, TrainerOnly};
use crate::db::{AthleteSummary, Database, TrainerSummary};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct SubscriptionsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(SubscriptionsState);

pub fn router(state: SubscriptionsState) -> Router {
    Router::new()
        .route("/", get(list_trainers))
        .route("/athletes", get(list_athletes))
        .route("/{trainer_id}", post(subscribe))
        .with_state(state)
}

#[derive(Serialize)]
struct SubscribeResponse {
    created: bool,
}

#[derive(Serialize)]
struct TrainerListResponse {
    trainers: Vec<TrainerSummary>,
}

#[derive(Serialize)]
struct AthleteListResponse {
    athletes: Vec<AthleteSummary>,
}

async fn subscribe(
    State(state): State<SubscriptionsState>,
    Auth(identity, ..): Auth<AthleteOnly>,
    Path(trainer_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .trainers()
        .get_by_id(trainer_id)
        .await
        .db_err("Failed to get trainer")?
        .ok_or_else(|| ApiError::not_found("Trainer not found"))?;

    let athlete_id = identity.account_id();
    let created = state
        .db
        .subscriptions()
        .create(athlete_id, trainer_id)
        .await
        .db_err("Failed to subscribe")?;

    if created {
        info!(athlete_id, trainer_id, "Subscription created");
    }

    Ok(ok(SubscribeResponse { created }))
}

async fn list_trainers(
    State(state): State<SubscriptionsState>,
    Auth(identity, ..): Auth<AthleteOnly>,
) -> Result<impl IntoResponse, ApiError> {
    let trainers = state
        .db
        .subscriptions()
        .trainers_for_athlete(identity.account_id())
        .await
        .db_err("Failed to list subscriptions")?;

    Ok(ok(TrainerListResponse { trainers }))
}

async fn list_athletes(
    State(state): State<SubscriptionsState>,
    Auth(identity, ..): Auth<TrainerOnly>,
) -> Result<impl IntoResponse, ApiError> {
    let athletes = state
        .db
        .subscriptions()
        .athletes_for_trainer(identity.account_id())
        .await
        .db_err("Failed to list subscribers")?;

    Ok(ok(AthleteListResponse { athletes }))
}
