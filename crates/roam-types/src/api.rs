use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ChatMessage, Match, MatchState};

// -- JWT Claims --

/// Claims carried by gateway Identify tokens. Tokens are minted by the
/// auth service; the gateway only verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

// -- Envelope --

/// `{"status": "ok", "data": ...}` wrapper used by every successful response.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: String,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: "ok".to_string(),
            data,
        }
    }
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessagesQuery {
    #[serde(alias = "senderId")]
    pub sender_id: Uuid,
    #[serde(alias = "receiverId")]
    pub receiver_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub status: String,
    pub data: Vec<ChatMessage>,
    #[serde(rename = "match")]
    pub match_ref: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkReadRequest {
    pub messages: Vec<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkReadResponse {
    pub updated: usize,
}

// -- Matches --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateMatchRequest {
    #[serde(alias = "user1Id")]
    pub user1_id: Uuid,
    #[serde(alias = "user2Id")]
    pub user2_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateMatchResponse {
    pub created: bool,
    #[serde(rename = "match")]
    pub record: Match,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateMatchRequest {
    #[serde(alias = "user1Id")]
    pub user1_id: Uuid,
    #[serde(alias = "user2Id")]
    pub user2_id: Uuid,
    #[serde(alias = "clickedBy")]
    pub clicked_by: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MatchStatusResponse {
    pub match_id: Uuid,
    pub state: MatchState,
    pub both_clicked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckClickedRequest {
    #[serde(alias = "user1Id")]
    pub user1_id: Uuid,
    #[serde(alias = "user2Id")]
    pub user2_id: Uuid,
    /// Defaults to `user1_id`.
    #[serde(default, alias = "askingUser")]
    pub asking_user: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClickedResponse {
    pub status: String,
    pub clicked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PairRequest {
    #[serde(alias = "user1Id")]
    pub user1_id: Uuid,
    #[serde(alias = "user2Id")]
    pub user2_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BothClickedResponse {
    pub status: String,
    pub both_clicked: bool,
}

// -- Profiles --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpsertProfileRequest {
    pub first_name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteUserRequest {
    pub id: Uuid,
}

/// What a user deletion cascaded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeletedUser {
    pub profile: bool,
    pub threads: usize,
    pub messages: usize,
    pub matches: usize,
}

impl DeletedUser {
    pub fn is_empty(&self) -> bool {
        !self.profile && self.threads == 0 && self.matches == 0
    }
}
