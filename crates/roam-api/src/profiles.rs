use axum::{
    Json,
    extract::State,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use roam_db::StoreError;
use roam_types::api::{DeleteUserRequest, Envelope, UpsertProfileRequest};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{JsonBody, PathParam};

/// PUT /profiles/{user_id}: the profile service pushes the public fields
/// the inbox shows.
pub async fn upsert_profile(
    State(state): State<AppState>,
    PathParam(user_id): PathParam<Uuid>,
    JsonBody(req): JsonBody<UpsertProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state
        .router
        .blocking(move |db| {
            db.upsert_profile(user_id, req.first_name.as_deref(), req.avatar.as_deref())
        })
        .await?;

    Ok(Json(Envelope::ok(profile)))
}

/// POST /delete: drop a user and cascade to their threads and matches.
pub async fn delete_user(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<DeleteUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let id = req.id;
    let deleted = state.router.blocking(move |db| db.delete_user(id)).await?;

    if deleted.is_empty() {
        return Err(StoreError::NotFound("user").into());
    }

    info!(
        "Deleted user {}: {} thread(s), {} message(s), {} match(es)",
        id, deleted.threads, deleted.messages, deleted.matches
    );
    Ok(Json(Envelope::ok(deleted)))
}
