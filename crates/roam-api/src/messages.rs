use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use roam_types::api::{Envelope, MarkReadRequest, MarkReadResponse, MessagesQuery, MessagesResponse};
use roam_types::events::SendMessage;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{JsonBody, PathParam, QueryParams};

/// GET /messages: full history for a pair, in either id order.
pub async fn get_messages(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<MessagesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let thread = state
        .router
        .fetch_messages(query.sender_id, query.receiver_id)
        .await?;

    Ok(Json(MessagesResponse {
        status: "ok".to_string(),
        data: thread.messages,
        match_ref: thread.match_ref,
    }))
}

/// POST /messages: same path as the gateway's SendMessage, but the caller
/// gets the stored message (or an error status) back.
pub async fn send_message(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SendMessage>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state.router.send_message(req).await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(message))))
}

/// GET /chat_users/{user_id}: inbox rows with unread badges.
pub async fn chat_users(
    State(state): State<AppState>,
    PathParam(user_id): PathParam<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let summaries = state.router.fetch_chat_summaries(user_id).await?;
    Ok(Json(Envelope::ok(summaries)))
}

/// POST /mark_as_read
pub async fn mark_as_read(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<MarkReadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state.router.mark_read(req.messages).await?;
    Ok(Json(Envelope::ok(MarkReadResponse { updated })))
}
