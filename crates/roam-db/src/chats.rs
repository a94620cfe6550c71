use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use roam_types::models::{ChatMessage, ChatSummary, ChatThread, PairKey, PublicProfile};

use crate::models::{
    MESSAGE_COLUMNS, MessageRow, THREAD_COLUMNS, ThreadRow, now_timestamp, parse_timestamp,
    parse_uuid,
};
use crate::{Database, Result, StoreError};

/// SQLite caps bound parameters per statement; mark-read batches stay well under it.
const MARK_READ_BATCH: usize = 500;

/// Result of appending to a thread.
#[derive(Debug, Clone)]
pub struct Appended {
    pub message: ChatMessage,
    /// True when this append created the thread.
    pub thread_created: bool,
}

impl Database {
    // -- Chat store --

    /// Append a message to the thread for `{sender_id, receiver_id}`,
    /// creating the thread first if the pair has none.
    ///
    /// Find-or-create and the append share one transaction, and the
    /// `(user_lo, user_hi)` unique key makes concurrent first sends converge
    /// on a single thread. `match_ref` is only stored when the thread is new.
    pub fn append_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        body: &str,
        match_ref: Option<&serde_json::Value>,
    ) -> Result<Appended> {
        let key = PairKey::new(sender_id, receiver_id)?;
        let match_json = match_ref.map(|v| v.to_string());

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let (now, now_str) = now_timestamp();

            let created = tx.execute(
                "INSERT INTO threads (id, user_lo, user_hi, initiator_id, match_ref, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(user_lo, user_hi) DO NOTHING",
                params![
                    Uuid::new_v4().to_string(),
                    key.lo().to_string(),
                    key.hi().to_string(),
                    sender_id.to_string(),
                    match_json,
                    now_str,
                ],
            )?;

            let thread_id: String = tx.query_row(
                "SELECT id FROM threads WHERE user_lo = ?1 AND user_hi = ?2",
                params![key.lo().to_string(), key.hi().to_string()],
                |row| row.get(0),
            )?;

            let seq: i64 = tx.query_row(
                "SELECT COALESCE(MAX(seq), 0) + 1 FROM messages WHERE thread_id = ?1",
                [&thread_id],
                |row| row.get(0),
            )?;

            let message_id = Uuid::new_v4();
            tx.execute(
                "INSERT INTO messages (id, thread_id, seq, sender_id, receiver_id, body, is_read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
                params![
                    message_id.to_string(),
                    thread_id,
                    seq,
                    sender_id.to_string(),
                    receiver_id.to_string(),
                    body,
                    now_str,
                ],
            )?;

            tx.commit()?;

            Ok(Appended {
                message: ChatMessage {
                    id: message_id,
                    thread_id: parse_uuid(&thread_id)?,
                    sender_id,
                    receiver_id,
                    body: body.to_string(),
                    is_read: false,
                    seq,
                    created_at: now,
                },
                thread_created: created == 1,
            })
        })
    }

    /// Full thread for a pair, messages in append order.
    pub fn get_thread(&self, a: Uuid, b: Uuid) -> Result<ChatThread> {
        let key = PairKey::new(a, b)?;
        self.with_conn(|conn| {
            let row = query_thread(conn, &key)?.ok_or(StoreError::NotFound("chat"))?;
            let messages = query_thread_messages(conn, &row.id)?;

            Ok(ChatThread {
                id: parse_uuid(&row.id)?,
                participants: row.participants()?,
                match_ref: row.match_ref()?,
                messages,
                created_at: parse_timestamp(&row.created_at)?,
            })
        })
    }

    /// One inbox row per thread containing `user_id`, most recently active first.
    pub fn chat_summaries(&self, user_id: Uuid) -> Result<Vec<ChatSummary>> {
        let uid = user_id.to_string();
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT other_id, p.first_name, p.avatar,
                        (SELECT body FROM messages m
                          WHERE m.thread_id = t.id ORDER BY m.seq DESC LIMIT 1),
                        (SELECT COUNT(*) FROM messages m
                          WHERE m.thread_id = t.id AND m.sender_id != ?1 AND m.is_read = 0),
                        COALESCE((SELECT MAX(m.created_at) FROM messages m WHERE m.thread_id = t.id),
                                 t.created_at) AS last_activity
                 FROM (SELECT *, CASE WHEN user_lo = ?1 THEN user_hi ELSE user_lo END AS other_id
                         FROM threads WHERE user_lo = ?1 OR user_hi = ?1) t
                 LEFT JOIN profiles p ON p.id = t.other_id
                 ORDER BY last_activity DESC, t.created_at DESC",
            )?;

            let rows = stmt
                .query_map([&uid], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(other_id, first_name, avatar, last_message, unread)| {
                    Ok(ChatSummary {
                        user: PublicProfile {
                            id: parse_uuid(&other_id)?,
                            first_name,
                            avatar,
                        },
                        last_message,
                        unread_count: unread.max(0) as u64,
                    })
                })
                .collect()
        })
    }

    /// Flag every listed message as read, wherever it lives. Unknown ids are
    /// ignored. Returns how many messages went from unread to read, so a
    /// repeat call returns 0 and leaves the store unchanged.
    pub fn mark_read(&self, message_ids: &[Uuid]) -> Result<usize> {
        if message_ids.is_empty() {
            return Ok(0);
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut updated = 0;

            for batch in message_ids.chunks(MARK_READ_BATCH) {
                let placeholders: Vec<String> = (1..=batch.len()).map(|i| format!("?{}", i)).collect();
                let sql = format!(
                    "UPDATE messages SET is_read = 1 WHERE is_read = 0 AND id IN ({})",
                    placeholders.join(", ")
                );
                let ids: Vec<String> = batch.iter().map(Uuid::to_string).collect();
                updated += tx.execute(&sql, rusqlite::params_from_iter(ids.iter()))?;
            }

            tx.commit()?;
            Ok(updated)
        })
    }

    /// Unread messages addressed to `user_id` across all of their threads.
    pub fn unread_count(&self, user_id: Uuid) -> Result<u64> {
        let uid = user_id.to_string();
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM messages m
                 JOIN threads t ON t.id = m.thread_id
                 WHERE (t.user_lo = ?1 OR t.user_hi = ?1)
                   AND m.sender_id != ?1
                   AND m.is_read = 0",
                [&uid],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
    }
}

fn query_thread(conn: &Connection, key: &PairKey) -> Result<Option<ThreadRow>> {
    let sql = format!(
        "SELECT {} FROM threads WHERE user_lo = ?1 AND user_hi = ?2",
        THREAD_COLUMNS
    );
    let row = conn
        .query_row(
            &sql,
            params![key.lo().to_string(), key.hi().to_string()],
            ThreadRow::from_row,
        )
        .optional()?;
    Ok(row)
}

fn query_thread_messages(conn: &Connection, thread_id: &str) -> Result<Vec<ChatMessage>> {
    let sql = format!(
        "SELECT {} FROM messages WHERE thread_id = ?1 ORDER BY seq ASC",
        MESSAGE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([thread_id], MessageRow::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(MessageRow::into_message).collect()
}
