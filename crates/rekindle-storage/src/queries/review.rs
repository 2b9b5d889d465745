// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Manual review queue for steps automation gave up on.

use rusqlite::params;

use rekindle_core::RekindleError;

use crate::database::Database;
use crate::models::ReviewRow;

/// Queue a lead for human review.
pub async fn insert_review(
    db: &Database,
    lead_id: &str,
    followup_id: Option<i64>,
    reason: &str,
) -> Result<i64, RekindleError> {
    let lead_id = lead_id.to_string();
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO review_queue (lead_id, followup_id, reason) VALUES (?1, ?2, ?3)",
                params![lead_id, followup_id, reason],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Unresolved review entries, oldest first.
pub async fn list_unresolved(db: &Database) -> Result<Vec<ReviewRow>, RekindleError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, lead_id, followup_id, reason, resolved, created_at
                 FROM review_queue WHERE resolved = 0 ORDER BY id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(ReviewRow {
                        id: row.get(0)?,
                        lead_id: row.get(1)?,
                        followup_id: row.get(2)?,
                        reason: row.get(3)?,
                        resolved: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a review entry handled.
pub async fn resolve(db: &Database, id: i64) -> Result<(), RekindleError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE review_queue SET resolved = 1 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn review_entries_resolve() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();

        let id = insert_review(&db, "lead-1", None, "send_failed:max_attempts")
            .await
            .unwrap();
        insert_review(&db, "lead-2", Some(9), "reassigned")
            .await
            .unwrap();

        assert_eq!(list_unresolved(&db).await.unwrap().len(), 2);
        resolve(&db, id).await.unwrap();
        let open = list_unresolved(&db).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].lead_id, "lead-2");

        db.close().await.unwrap();
    }
}
