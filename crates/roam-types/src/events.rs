use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ChatMessage;

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful identification
    Ready { user_id: Uuid, session_id: Uuid },

    /// A message was persisted
    ReceiveMessage(ChatMessage),

    /// Inbox badge raised or cleared for this session
    NewMessageBadge { pending: bool },
}

impl GatewayEvent {
    /// Users this event concerns. `None` means it is not tied to a
    /// particular pair and goes to whoever it is addressed to directly.
    pub fn participants(&self) -> Option<[Uuid; 2]> {
        match self {
            Self::ReceiveMessage(msg) => Some([msg.sender_id, msg.receiver_id]),
            _ => None,
        }
    }
}

/// Payload of the inbound `SendMessage` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendMessage {
    #[serde(alias = "senderId")]
    pub sender_id: Uuid,
    #[serde(alias = "receiverId")]
    pub receiver_id: Uuid,
    pub message: String,
    /// Attached to the thread only when this send creates it.
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub match_ref: Option<serde_json::Value>,
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Bind the connection to a user
    Identify { token: String },

    /// Persist a message and deliver it
    SendMessage(SendMessage),

    /// The user opened the inbox view
    OpenInbox,
}
