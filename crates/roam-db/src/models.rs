//! Database row types that map directly to SQLite rows.
//! Distinct from roam-types API models to keep the DB layer independent.
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::Row;
use uuid::Uuid;

use roam_types::models::{ChatMessage, Match};

use crate::{Result, StoreError};

pub(crate) const MESSAGE_COLUMNS: &str =
    "id, thread_id, seq, sender_id, receiver_id, body, is_read, created_at";

pub(crate) const THREAD_COLUMNS: &str = "id, initiator_id, user_lo, user_hi, match_ref, created_at";

pub(crate) const MATCH_COLUMNS: &str =
    "id, user1_id, user2_id, user1_clicked, user2_clicked, both_clicked, created_at";

pub struct MessageRow {
    pub id: String,
    pub thread_id: String,
    pub seq: i64,
    pub sender_id: String,
    pub receiver_id: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: String,
}

impl MessageRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            thread_id: row.get(1)?,
            seq: row.get(2)?,
            sender_id: row.get(3)?,
            receiver_id: row.get(4)?,
            body: row.get(5)?,
            is_read: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    pub fn into_message(self) -> Result<ChatMessage> {
        Ok(ChatMessage {
            id: parse_uuid(&self.id)?,
            thread_id: parse_uuid(&self.thread_id)?,
            sender_id: parse_uuid(&self.sender_id)?,
            receiver_id: parse_uuid(&self.receiver_id)?,
            body: self.body,
            is_read: self.is_read,
            seq: self.seq,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

pub struct ThreadRow {
    pub id: String,
    pub initiator_id: String,
    pub user_lo: String,
    pub user_hi: String,
    pub match_ref: Option<String>,
    pub created_at: String,
}

impl ThreadRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            initiator_id: row.get(1)?,
            user_lo: row.get(2)?,
            user_hi: row.get(3)?,
            match_ref: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    /// Participants with the initiator first.
    pub fn participants(&self) -> Result<[Uuid; 2]> {
        let initiator = parse_uuid(&self.initiator_id)?;
        let other = if self.initiator_id == self.user_lo {
            &self.user_hi
        } else {
            &self.user_lo
        };
        Ok([initiator, parse_uuid(other)?])
    }

    pub fn match_ref(&self) -> Result<Option<serde_json::Value>> {
        self.match_ref
            .as_deref()
            .map(|raw| {
                serde_json::from_str(raw)
                    .map_err(|e| StoreError::Corrupt(format!("match_ref on thread {}: {}", self.id, e)))
            })
            .transpose()
    }
}

pub struct MatchRow {
    pub id: String,
    pub user1_id: String,
    pub user2_id: String,
    pub user1_clicked: bool,
    pub user2_clicked: bool,
    pub both_clicked: bool,
    pub created_at: String,
}

impl MatchRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user1_id: row.get(1)?,
            user2_id: row.get(2)?,
            user1_clicked: row.get(3)?,
            user2_clicked: row.get(4)?,
            both_clicked: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    pub fn into_match(self) -> Result<Match> {
        Ok(Match {
            id: parse_uuid(&self.id)?,
            user1_id: parse_uuid(&self.user1_id)?,
            user2_id: parse_uuid(&self.user2_id)?,
            user1_clicked: self.user1_clicked,
            user2_clicked: self.user2_clicked,
            both_clicked: self.both_clicked,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically.
pub(crate) fn now_timestamp() -> (DateTime<Utc>, String) {
    let now = Utc::now().trunc_subsecs(6);
    (now, now.to_rfc3339_opts(SecondsFormat::Micros, true))
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid> {
    raw.parse()
        .map_err(|e| StoreError::Corrupt(format!("bad uuid '{}': {}", raw, e)))
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite defaults store "YYYY-MM-DD HH:MM:SS" without timezone.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp '{}': {}", raw, e)))
}
