use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (chat + match schema)");
        conn.execute_batch(
            "
            CREATE TABLE profiles (
                id          TEXT PRIMARY KEY,
                first_name  TEXT,
                avatar      TEXT,
                updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            -- One thread per unordered pair: (user_lo, user_hi) is the normalized key
            CREATE TABLE threads (
                id            TEXT PRIMARY KEY,
                user_lo       TEXT NOT NULL,
                user_hi       TEXT NOT NULL,
                initiator_id  TEXT NOT NULL,
                match_ref     TEXT,
                created_at    TEXT NOT NULL,
                UNIQUE(user_lo, user_hi),
                CHECK(user_lo < user_hi)
            );

            CREATE INDEX idx_threads_hi ON threads(user_hi);

            CREATE TABLE messages (
                id           TEXT PRIMARY KEY,
                thread_id    TEXT NOT NULL REFERENCES threads(id) ON DELETE CASCADE,
                seq          INTEGER NOT NULL,
                sender_id    TEXT NOT NULL,
                receiver_id  TEXT NOT NULL,
                body         TEXT NOT NULL,
                is_read      INTEGER NOT NULL DEFAULT 0,
                created_at   TEXT NOT NULL,
                UNIQUE(thread_id, seq)
            );

            CREATE TABLE matches (
                id             TEXT PRIMARY KEY,
                user1_id       TEXT NOT NULL,
                user2_id       TEXT NOT NULL,
                user_lo        TEXT NOT NULL,
                user_hi        TEXT NOT NULL,
                user1_clicked  INTEGER NOT NULL DEFAULT 0,
                user2_clicked  INTEGER NOT NULL DEFAULT 0,
                both_clicked   INTEGER NOT NULL DEFAULT 0,
                created_at     TEXT NOT NULL,
                UNIQUE(user_lo, user_hi)
            );

            CREATE INDEX idx_matches_hi ON matches(user_hi);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
