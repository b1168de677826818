//! Media uploads: trainer avatars, exercise videos and thumbnails, and
//! common mistake videos.
//!
//! Each endpoint takes a multipart form with a single file field. The file
//! name carries the id of the row the media belongs to; the calling trainer
//! must own that row.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    response::IntoResponse,
    routing::post,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::error::{ApiError, OkReply, ResultExt, ok};
use crate::auth::{Auth, TrainerOnly, UNAUTHORIZED_MESSAGE};
use crate::db::Database;
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::media::{MediaKind, MediaStorage, stored_path};
use crate::upload::{OwningEntityKey, UploadError, receive_stream};

/// Room for multipart framing on top of the file ceiling, so oversized files
/// are caught by the receiver rather than by the body limit.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

#[derive(Clone)]
pub struct MediaState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub storage: MediaStorage,
}

impl_has_auth_backend!(MediaState);

fn body_limit(kind: MediaKind) -> DefaultBodyLimit {
    DefaultBodyLimit::max(kind.max_bytes() as usize + MULTIPART_OVERHEAD)
}

pub fn router(state: MediaState) -> Router {
    Router::new()
        .route(
            "/avatar",
            post(upload_avatar).layer(body_limit(MediaKind::TrainerAvatar)),
        )
        .route(
            "/exercise-video",
            post(upload_exercise_video).layer(body_limit(MediaKind::ExerciseVideo)),
        )
        .route(
            "/exercise-thumbnail",
            post(upload_exercise_thumbnail).layer(body_limit(MediaKind::ExerciseThumbnail)),
        )
        .route(
            "/common-mistake-video",
            post(upload_common_mistake_video).layer(body_limit(MediaKind::CommonMistakeVideo)),
        )
        .with_state(state)
}

#[derive(Serialize)]
struct UploadResponse {
    path: String,
    bytes: u64,
}

async fn upload_avatar(
    State(state): State<MediaState>,
    Auth(identity, ..): Auth<TrainerOnly>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    upload(&state, identity.account_id(), multipart, MediaKind::TrainerAvatar).await
}

async fn upload_exercise_video(
    State(state): State<MediaState>,
    Auth(identity, ..): Auth<TrainerOnly>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    upload(&state, identity.account_id(), multipart, MediaKind::ExerciseVideo).await
}

async fn upload_exercise_thumbnail(
    State(state): State<MediaState>,
    Auth(identity, ..): Auth<TrainerOnly>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    upload(&state, identity.account_id(), multipart, MediaKind::ExerciseThumbnail).await
}

async fn upload_common_mistake_video(
    State(state): State<MediaState>,
    Auth(identity, ..): Auth<TrainerOnly>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    upload(&state, identity.account_id(), multipart, MediaKind::CommonMistakeVideo).await
}

async fn upload(
    state: &MediaState,
    trainer_id: i64,
    mut multipart: Multipart,
    kind: MediaKind,
) -> Result<Json<OkReply<UploadResponse>>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("Invalid multipart data"))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        let key = kind.convention().extract(&filename)?;
        check_ownership(state, trainer_id, kind, &key).await?;

        let destination = state.storage.path_for(kind, &key);
        let committed = receive_stream(field, kind.max_bytes(), &destination)
            .await
            .map_err(|e| match e {
                UploadError::PayloadTooLarge { .. } => {
                    debug!(trainer_id, ?kind, "Upload over size ceiling");
                    ApiError::payload_too_large(kind.too_large_message())
                }
                other => ApiError::from(other),
            })?;

        let path = stored_path(kind, &key);
        record_path(state, kind, &key, &path).await?;

        info!(trainer_id, ?kind, path = %path, bytes = committed.bytes, "Media stored");
        return Ok(ok(UploadResponse {
            path,
            bytes: committed.bytes,
        }));
    }

    Err(ApiError::bad_request("No file in upload"))
}

/// The calling trainer must own the row named by the key. Rows that do not
/// exist are rejected the same way as rows owned by someone else.
async fn check_ownership(
    state: &MediaState,
    trainer_id: i64,
    kind: MediaKind,
    key: &OwningEntityKey,
) -> Result<(), ApiError> {
    let owned = match kind {
        MediaKind::TrainerAvatar => key.primary_id == trainer_id,
        MediaKind::ExerciseVideo => {
            exercise_owner(state, key.primary_id).await? == Some(trainer_id)
        }
        MediaKind::ExerciseThumbnail => {
            key.primary_id == trainer_id
                && exercise_owner(state, key.target_id()).await? == Some(trainer_id)
        }
        MediaKind::CommonMistakeVideo => {
            let mistake = state
                .db
                .exercises()
                .get_common_mistake(key.target_id())
                .await
                .db_err("Failed to get common mistake")?;
            mistake.is_some_and(|m| m.exercise_id == key.primary_id)
                && exercise_owner(state, key.primary_id).await? == Some(trainer_id)
        }
    };

    if owned {
        Ok(())
    } else {
        debug!(trainer_id, ?kind, ?key, "Upload target not owned by caller");
        Err(ApiError::unauthorized(UNAUTHORIZED_MESSAGE))
    }
}

async fn exercise_owner(state: &MediaState, exercise_id: i64) -> Result<Option<i64>, ApiError> {
    let exercise = state
        .db
        .exercises()
        .get_by_id(exercise_id)
        .await
        .db_err("Failed to get exercise")?;
    Ok(exercise.map(|e| e.trainer_id))
}

async fn record_path(
    state: &MediaState,
    kind: MediaKind,
    key: &OwningEntityKey,
    path: &str,
) -> Result<(), ApiError> {
    let id = key.target_id();
    let updated = match kind {
        MediaKind::TrainerAvatar => state.db.trainers().set_photo(id, path).await,
        MediaKind::ExerciseVideo => state.db.exercises().set_video(id, path).await,
        MediaKind::ExerciseThumbnail => state.db.exercises().set_thumbnail(id, path).await,
        MediaKind::CommonMistakeVideo => {
            state.db.exercises().set_common_mistake_video(id, path).await
        }
    }
    .db_err("Failed to record media path")?;

    if !updated {
        return Err(ApiError::not_found("Upload target no longer exists"));
    }
    Ok(())
}
