pub mod error;
pub mod extract;
pub mod matches;
pub mod messages;
pub mod profiles;

use std::sync::Arc;

use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{get, post, put},
};

use roam_gateway::router::MessageRouter;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub router: MessageRouter,
}

impl AppStateInner {
    pub fn new(router: MessageRouter) -> AppState {
        Arc::new(Self { router })
    }
}

/// Every request/response endpoint. The WebSocket route is mounted by the server.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/messages", get(messages::get_messages).post(messages::send_message))
        .route("/chat_users/{user_id}", get(messages::chat_users))
        .route("/mark_as_read", post(messages::mark_as_read))
        .route("/create_match", post(matches::create_match))
        .route("/update_match", post(matches::update_match))
        .route("/check_letsgo_btn", post(matches::check_letsgo_btn))
        .route("/check_both_clicked", post(matches::check_both_clicked))
        .route("/profiles/{user_id}", put(profiles::upsert_profile))
        .route("/delete", post(profiles::delete_user))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
