use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use roam_types::models::{Match, MatchSide, PairKey};

use crate::models::{MATCH_COLUMNS, MatchRow, now_timestamp};
use crate::{Database, Result, StoreError};

#[derive(Debug, Clone)]
pub struct MatchCreated {
    pub record: Match,
    /// False when the pair already had a match record.
    pub created: bool,
}

impl Database {
    // -- Match store --

    /// Create the match record for a pair, or return the existing one.
    /// `user1_id`/`user2_id` are stored in the order given on first creation.
    pub fn create_match(&self, user1_id: Uuid, user2_id: Uuid) -> Result<MatchCreated> {
        let key = PairKey::new(user1_id, user2_id)?;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let (_, now_str) = now_timestamp();

            let created = tx.execute(
                "INSERT INTO matches (id, user1_id, user2_id, user_lo, user_hi, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(user_lo, user_hi) DO NOTHING",
                params![
                    Uuid::new_v4().to_string(),
                    user1_id.to_string(),
                    user2_id.to_string(),
                    key.lo().to_string(),
                    key.hi().to_string(),
                    now_str,
                ],
            )?;

            let record = query_match(&tx, &key)?.ok_or(StoreError::NotFound("match"))?;
            tx.commit()?;

            Ok(MatchCreated {
                record: record.into_match()?,
                created: created == 1,
            })
        })
    }

    pub fn get_match(&self, a: Uuid, b: Uuid) -> Result<Match> {
        let key = PairKey::new(a, b)?;
        self.with_conn(|conn| {
            query_match(conn, &key)?
                .ok_or(StoreError::NotFound("match"))?
                .into_match()
        })
    }

    /// Record a "let's go" click by `clicked_by` on the pair's match.
    ///
    /// The flag flip and the `both_clicked` recomputation are one UPDATE
    /// inside the same transaction as the lookup, so two users clicking at
    /// once cannot lose either click. Flags only ever go from 0 to 1.
    /// A clicker outside the pair is rejected.
    pub fn register_click(&self, a: Uuid, b: Uuid, clicked_by: Uuid) -> Result<Match> {
        let key = PairKey::new(a, b)?;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let current = query_match(&tx, &key)?
                .ok_or(StoreError::NotFound("match"))?
                .into_match()?;

            let side = current.side(clicked_by).ok_or_else(|| {
                StoreError::Validation(format!(
                    "{} is not part of match {}",
                    clicked_by, current.id
                ))
            })?;
            let side_flag: i64 = match side {
                MatchSide::User1 => 1,
                MatchSide::User2 => 2,
            };

            tx.execute(
                "UPDATE matches SET
                    user1_clicked = CASE WHEN ?2 = 1 THEN 1 ELSE user1_clicked END,
                    user2_clicked = CASE WHEN ?2 = 2 THEN 1 ELSE user2_clicked END,
                    both_clicked  = CASE
                        WHEN (user1_clicked = 1 OR ?2 = 1) AND (user2_clicked = 1 OR ?2 = 2) THEN 1
                        ELSE both_clicked
                    END
                 WHERE id = ?1",
                params![current.id.to_string(), side_flag],
            )?;

            let updated = query_match(&tx, &key)?
                .ok_or(StoreError::NotFound("match"))?
                .into_match()?;
            tx.commit()?;

            Ok(updated)
        })
    }

    /// Whether `asking_user` has clicked on the pair's match.
    pub fn has_clicked(&self, a: Uuid, b: Uuid, asking_user: Uuid) -> Result<bool> {
        let record = self.get_match(a, b)?;
        record.clicked(asking_user).ok_or_else(|| {
            StoreError::Validation(format!("{} is not part of match {}", asking_user, record.id))
        })
    }

    pub fn both_clicked(&self, a: Uuid, b: Uuid) -> Result<bool> {
        Ok(self.get_match(a, b)?.both_clicked)
    }
}

fn query_match(conn: &Connection, key: &PairKey) -> Result<Option<MatchRow>> {
    let sql = format!(
        "SELECT {} FROM matches WHERE user_lo = ?1 AND user_hi = ?2",
        MATCH_COLUMNS
    );
    let row = conn
        .query_row(
            &sql,
            params![key.lo().to_string(), key.hi().to_string()],
            MatchRow::from_row,
        )
        .optional()?;
    Ok(row)
}
