use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Pair identity --

/// Unordered pair of distinct users, normalized so that `lo < hi`.
///
/// Threads and matches are both keyed by this, so `(a, b)` and `(b, a)`
/// always resolve to the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey {
    lo: Uuid,
    hi: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PairError {
    #[error("a pair needs two distinct users, got {0} twice")]
    SameUser(Uuid),
}

impl PairKey {
    pub fn new(a: Uuid, b: Uuid) -> Result<Self, PairError> {
        if a == b {
            return Err(PairError::SameUser(a));
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        Ok(Self { lo, hi })
    }

    pub fn lo(&self) -> Uuid {
        self.lo
    }

    pub fn hi(&self) -> Uuid {
        self.hi
    }

}

// -- Chat --

/// A single message inside a thread. Only `is_read` ever changes after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    #[serde(rename = "message")]
    pub body: String,
    pub is_read: bool,
    /// Position in the thread, starting at 1.
    pub seq: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatThread {
    pub id: Uuid,
    /// Initiator first.
    pub participants: [Uuid; 2],
    #[serde(rename = "match")]
    pub match_ref: Option<serde_json::Value>,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
}

/// Public profile fields, owned by the profile service and mirrored here
/// so the inbox can render names and avatars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub id: Uuid,
    pub first_name: Option<String>,
    pub avatar: Option<String>,
}

/// One inbox row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub user: PublicProfile,
    pub last_message: Option<String>,
    pub unread_count: u64,
}

// -- Matches --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchState {
    Exists,
    OneClicked,
    BothClicked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSide {
    User1,
    User2,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub user1_clicked: bool,
    pub user2_clicked: bool,
    pub both_clicked: bool,
    pub created_at: DateTime<Utc>,
}

impl Match {
    pub fn state(&self) -> MatchState {
        match (self.both_clicked, self.user1_clicked || self.user2_clicked) {
            (true, _) => MatchState::BothClicked,
            (false, true) => MatchState::OneClicked,
            (false, false) => MatchState::Exists,
        }
    }

    pub fn side(&self, user_id: Uuid) -> Option<MatchSide> {
        if user_id == self.user1_id {
            Some(MatchSide::User1)
        } else if user_id == self.user2_id {
            Some(MatchSide::User2)
        } else {
            None
        }
    }

    /// Whether `user_id` has clicked. `None` when the user is not part of the match.
    pub fn clicked(&self, user_id: Uuid) -> Option<bool> {
        self.side(user_id).map(|side| match side {
            MatchSide::User1 => self.user1_clicked,
            MatchSide::User2 => self.user2_clicked,
        })
    }
}
