use rusqlite::params;
use uuid::Uuid;

use roam_types::api::DeletedUser;
use roam_types::models::PublicProfile;

use crate::models::now_timestamp;
use crate::{Database, Result};

impl Database {
    // -- Profiles --

    pub fn upsert_profile(
        &self,
        id: Uuid,
        first_name: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<PublicProfile> {
        let (_, now_str) = now_timestamp();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, first_name, avatar, updated_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    first_name = excluded.first_name,
                    avatar = excluded.avatar,
                    updated_at = excluded.updated_at",
                params![id.to_string(), first_name, avatar, now_str],
            )?;
            Ok(())
        })?;

        Ok(PublicProfile {
            id,
            first_name: first_name.map(str::to_string),
            avatar: avatar.map(str::to_string),
        })
    }

    /// Remove a user and everything that references them: their profile,
    /// every thread they take part in (with its messages), and every match.
    pub fn delete_user(&self, id: Uuid) -> Result<DeletedUser> {
        let uid = id.to_string();
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let messages = tx.execute(
                "DELETE FROM messages WHERE thread_id IN
                    (SELECT id FROM threads WHERE user_lo = ?1 OR user_hi = ?1)",
                [&uid],
            )?;
            let threads = tx.execute(
                "DELETE FROM threads WHERE user_lo = ?1 OR user_hi = ?1",
                [&uid],
            )?;
            let matches = tx.execute(
                "DELETE FROM matches WHERE user1_id = ?1 OR user2_id = ?1",
                [&uid],
            )?;
            let profile = tx.execute("DELETE FROM profiles WHERE id = ?1", [&uid])?;

            tx.commit()?;

            Ok(DeletedUser {
                profile: profile > 0,
                threads,
                messages,
                matches,
            })
        })
    }
}
