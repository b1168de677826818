mod athletes;
mod error;
mod exercises;
mod media;
mod subscriptions;
mod trainers;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::media::MediaStorage;
use crate::rate_limit::RateLimitConfig;

pub use error::{ApiError, ResultExt};
pub use users::UsersState;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    storage: MediaStorage,
    rate_limit_config: Arc<RateLimitConfig>,
) -> Router {
    let users_state = users::UsersState {
        db: db.clone(),
        jwt: jwt.clone(),
        rate_limit_config,
    };

    let athletes_state = athletes::AthletesState {
        db: db.clone(),
        jwt: jwt.clone(),
    };

    let trainers_state = trainers::TrainersState {
        db: db.clone(),
        jwt: jwt.clone(),
    };

    let subscriptions_state = subscriptions::SubscriptionsState {
        db: db.clone(),
        jwt: jwt.clone(),
    };

    let exercises_state = exercises::ExercisesState {
        db: db.clone(),
        jwt: jwt.clone(),
    };

    let media_state = media::MediaState { db, jwt, storage };

    Router::new()
        .nest("/users", users::router(users_state))
        .nest("/athletes", athletes::router(athletes_state))
        .nest("/trainers", trainers::router(trainers_state))
        .nest("/subscriptions", subscriptions::router(subscriptions_state))
        .nest("/exercises", exercises::router(exercises_state))
        .nest("/media", media::router(media_state))
}
