use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use roam_types::api::{
    BothClickedResponse, CheckClickedRequest, ClickedResponse, CreateMatchRequest,
    CreateMatchResponse, Envelope, MatchStatusResponse, PairRequest, UpdateMatchRequest,
};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::JsonBody;

/// POST /create_match: 201 when created, 200 when the pair already has one.
pub async fn create_match(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateMatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user1_id, user2_id) = (req.user1_id, req.user2_id);
    let outcome = state
        .router
        .blocking(move |db| db.create_match(user1_id, user2_id))
        .await?;

    let status = if outcome.created {
        info!("Created match {} for {} and {}", outcome.record.id, user1_id, user2_id);
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(Envelope::ok(CreateMatchResponse {
            created: outcome.created,
            record: outcome.record,
        })),
    ))
}

/// POST /update_match: register a "let's go" click.
pub async fn update_match(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<UpdateMatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let UpdateMatchRequest {
        user1_id,
        user2_id,
        clicked_by,
    } = req;
    let record = state
        .router
        .blocking(move |db| db.register_click(user1_id, user2_id, clicked_by))
        .await?;

    if record.both_clicked {
        info!("Match {} confirmed by both users", record.id);
    }

    Ok(Json(Envelope::ok(MatchStatusResponse {
        match_id: record.id,
        state: record.state(),
        both_clicked: record.both_clicked,
    })))
}

/// POST /check_letsgo_btn: has the asking user clicked?
pub async fn check_letsgo_btn(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CheckClickedRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user1_id, user2_id) = (req.user1_id, req.user2_id);
    let asking = req.asking_user.unwrap_or(user1_id);
    let clicked = state
        .router
        .blocking(move |db| db.has_clicked(user1_id, user2_id, asking))
        .await?;

    Ok(Json(ClickedResponse {
        status: "ok".to_string(),
        clicked,
    }))
}

/// POST /check_both_clicked
pub async fn check_both_clicked(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<PairRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (user1_id, user2_id) = (req.user1_id, req.user2_id);
    let both_clicked = state
        .router
        .blocking(move |db| db.both_clicked(user1_id, user2_id))
        .await?;

    Ok(Json(BothClickedResponse {
        status: "ok".to_string(),
        both_clicked,
    }))
}
