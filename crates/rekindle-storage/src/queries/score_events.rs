// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only score event ledger.

use rusqlite::params;

use rekindle_core::RekindleError;

use crate::database::Database;
use crate::models::ScoreEventRow;

/// Append a score event. The `(conversation, event, category)` unique key
/// makes duplicate delivery a no-op; returns whether the row was new.
pub async fn insert_score_event(
    db: &Database,
    conversation_id: i64,
    event_id: &str,
    delta: i64,
    category: &str,
    reason: &str,
) -> Result<bool, RekindleError> {
    let event_id = event_id.to_string();
    let category = category.to_string();
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO score_events
                     (conversation_id, event_id, delta, category, reason)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![conversation_id, event_id, delta, category, reason],
            )?;
            Ok(inserted > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All score events for a conversation, oldest first.
pub async fn list_score_events(
    db: &Database,
    conversation_id: i64,
) -> Result<Vec<ScoreEventRow>, RekindleError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, conversation_id, event_id, delta, category, reason, created_at
                 FROM score_events WHERE conversation_id = ?1 ORDER BY id",
            )?;
            let rows = stmt
                .query_map(params![conversation_id], |row| {
                    Ok(ScoreEventRow {
                        id: row.get(0)?,
                        conversation_id: row.get(1)?,
                        event_id: row.get(2)?,
                        delta: row.get(3)?,
                        category: row.get(4)?,
                        reason: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{conversations, leads};
    use tempfile::tempdir;

    #[tokio::test]
    async fn duplicate_events_do_not_double_score() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        let lead = crate::models::LeadRow {
            id: "lead-1".to_string(),
            org_id: "org-1".to_string(),
            timezone: "UTC".to_string(),
            sms_opt_in: true,
            email_opt_in: true,
            voice_opt_in: true,
            opted_out: false,
            created_at: String::new(),
        };
        leads::upsert_lead(&db, &lead).await.unwrap();
        let conv = conversations::create_conversation(&db, "lead-1", "org-1", "NEW")
            .await
            .unwrap();

        let first = insert_score_event(&db, conv.id, "evt-1", 35, "engagement", "keyword:works")
            .await
            .unwrap();
        let replay = insert_score_event(&db, conv.id, "evt-1", 35, "engagement", "keyword:works")
            .await
            .unwrap();
        assert!(first);
        assert!(!replay);

        let events = list_score_events(&db, conv.id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].delta, 35);

        // Same event, different category: a distinct fact, not a replay.
        let other =
            insert_score_event(&db, conv.id, "evt-1", 25, "time_commitment", "pattern:time")
                .await
                .unwrap();
        assert!(other);

        db.close().await.unwrap();
    }
}
