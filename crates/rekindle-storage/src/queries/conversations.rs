// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD and cycle management.
//!
//! All mutation here is requested by the state machine in the engine crate;
//! no other component writes conversation fields directly.

use rusqlite::params;

use rekindle_core::RekindleError;

use crate::database::Database;
use crate::models::ConversationRow;

const COLUMNS: &str = "id, lead_id, org_id, state, generation, score, message_count,
                       last_message_at, handoff_reason, ai_enabled, superseded,
                       created_at, updated_at";

fn row_to_conversation(row: &rusqlite::Row<'_>) -> Result<ConversationRow, rusqlite::Error> {
    Ok(ConversationRow {
        id: row.get(0)?,
        lead_id: row.get(1)?,
        org_id: row.get(2)?,
        state: row.get(3)?,
        generation: row.get(4)?,
        score: row.get(5)?,
        message_count: row.get(6)?,
        last_message_at: row.get(7)?,
        handoff_reason: row.get(8)?,
        ai_enabled: row.get(9)?,
        superseded: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

/// Create the first conversation for a lead. Fails if the lead already has
/// an active conversation (partial unique index).
pub async fn create_conversation(
    db: &Database,
    lead_id: &str,
    org_id: &str,
    initial_state: &str,
) -> Result<ConversationRow, RekindleError> {
    let lead_id = lead_id.to_string();
    let org_id = org_id.to_string();
    let initial_state = initial_state.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations (lead_id, org_id, state) VALUES (?1, ?2, ?3)",
                params![lead_id, org_id, initial_state],
            )?;
            let id = conn.last_insert_rowid();
            let mut stmt =
                conn.prepare(&format!("SELECT {COLUMNS} FROM conversations WHERE id = ?1"))?;
            let conversation = stmt.query_row(params![id], row_to_conversation)?;
            Ok(conversation)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the lead's single active conversation, if any.
pub async fn get_active(
    db: &Database,
    lead_id: &str,
) -> Result<Option<ConversationRow>, RekindleError> {
    let lead_id = lead_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM conversations WHERE lead_id = ?1 AND superseded = 0"
            ))?;
            let result = stmt.query_row(params![lead_id], row_to_conversation);
            match result {
                Ok(conversation) => Ok(Some(conversation)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Supersede the lead's current conversation (if any) and open a new cycle.
///
/// The old record is kept, never deleted; the new conversation continues the
/// generation counter so history and score stay auditable across cycles.
pub async fn begin_new_cycle(
    db: &Database,
    lead_id: &str,
    org_id: &str,
    initial_state: &str,
) -> Result<ConversationRow, RekindleError> {
    let lead_id = lead_id.to_string();
    let org_id = org_id.to_string();
    let initial_state = initial_state.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let prior_generation: i64 = tx
                .query_row(
                    "SELECT generation FROM conversations
                     WHERE lead_id = ?1 AND superseded = 0",
                    params![lead_id],
                    |row| row.get(0),
                )
                .unwrap_or(0);

            tx.execute(
                "UPDATE conversations SET superseded = 1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE lead_id = ?1 AND superseded = 0",
                params![lead_id],
            )?;

            tx.execute(
                "INSERT INTO conversations (lead_id, org_id, state, generation)
                 VALUES (?1, ?2, ?3, ?4)",
                params![lead_id, org_id, initial_state, prior_generation + 1],
            )?;
            let id = tx.last_insert_rowid();

            let conversation = {
                let mut stmt =
                    tx.prepare(&format!("SELECT {COLUMNS} FROM conversations WHERE id = ?1"))?;
                stmt.query_row(params![id], row_to_conversation)?
            };

            tx.commit()?;
            Ok(conversation)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Update the conversation's state. The state machine validates the
/// transition before requesting this.
pub async fn update_state(
    db: &Database,
    conversation_id: i64,
    new_state: &str,
) -> Result<(), RekindleError> {
    let new_state = new_state.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET state = ?1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![new_state, conversation_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record an inbound message: bump the count and the last-message marker.
pub async fn record_message(
    db: &Database,
    conversation_id: i64,
    received_at: &str,
) -> Result<(), RekindleError> {
    let received_at = received_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET message_count = message_count + 1,
                     last_message_at = ?1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![received_at, conversation_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Add a delta to the running score. The score is only ever read through
/// the conversation, never recomputed by consumers.
pub async fn apply_score_delta(
    db: &Database,
    conversation_id: i64,
    delta: i64,
) -> Result<(), RekindleError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET score = score + ?1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![delta, conversation_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record which rule produced a handoff.
pub async fn set_handoff_reason(
    db: &Database,
    conversation_id: i64,
    reason: &str,
) -> Result<(), RekindleError> {
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET handoff_reason = ?1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![reason, conversation_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Flip the per-conversation automation kill-switch.
pub async fn set_ai_enabled(
    db: &Database,
    conversation_id: i64,
    enabled: bool,
) -> Result<(), RekindleError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET ai_enabled = ?1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![enabled, conversation_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Active, non-terminal conversations silent since before `cutoff`.
///
/// Used by the slow tick's dormancy sweep. A conversation with no inbound
/// yet falls back to its creation time.
pub async fn silent_active(
    db: &Database,
    cutoff: &str,
) -> Result<Vec<ConversationRow>, RekindleError> {
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM conversations
                 WHERE superseded = 0
                   AND state NOT IN ('HANDED_OFF', 'OPTED_OUT', 'CLOSED', 'DORMANT')
                   AND COALESCE(last_message_at, created_at) < ?1"
            ))?;
            let rows = stmt
                .query_map(params![cutoff], row_to_conversation)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::leads;
    use tempfile::tempdir;

    async fn setup() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        let lead = crate::models::LeadRow {
            id: "lead-1".to_string(),
            org_id: "org-1".to_string(),
            timezone: "America/New_York".to_string(),
            sms_opt_in: true,
            email_opt_in: true,
            voice_opt_in: true,
            opted_out: false,
            created_at: String::new(),
        };
        leads::upsert_lead(&db, &lead).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn only_one_active_conversation_per_lead() {
        let (db, _dir) = setup().await;

        create_conversation(&db, "lead-1", "org-1", "NEW")
            .await
            .unwrap();
        // A second active conversation for the same lead must be rejected.
        let second = create_conversation(&db, "lead-1", "org-1", "NEW").await;
        assert!(second.is_err());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn new_cycle_supersedes_and_bumps_generation() {
        let (db, _dir) = setup().await;

        let first = create_conversation(&db, "lead-1", "org-1", "NEW")
            .await
            .unwrap();
        assert_eq!(first.generation, 1);

        let second = begin_new_cycle(&db, "lead-1", "org-1", "RETURNING")
            .await
            .unwrap();
        assert_eq!(second.generation, 2);
        assert_eq!(second.state, "RETURNING");

        let active = get_active(&db, "lead-1").await.unwrap().unwrap();
        assert_eq!(active.id, second.id);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn score_and_messages_accumulate() {
        let (db, _dir) = setup().await;
        let conv = create_conversation(&db, "lead-1", "org-1", "NEW")
            .await
            .unwrap();

        apply_score_delta(&db, conv.id, 35).await.unwrap();
        apply_score_delta(&db, conv.id, 25).await.unwrap();
        record_message(&db, conv.id, "2025-06-10T15:00:00.000Z")
            .await
            .unwrap();

        let active = get_active(&db, "lead-1").await.unwrap().unwrap();
        assert_eq!(active.score, 60);
        assert_eq!(active.message_count, 1);
        assert_eq!(
            active.last_message_at.as_deref(),
            Some("2025-06-10T15:00:00.000Z")
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn silent_sweep_finds_quiet_conversations() {
        let (db, _dir) = setup().await;
        let conv = create_conversation(&db, "lead-1", "org-1", "ENGAGED")
            .await
            .unwrap();
        record_message(&db, conv.id, "2025-01-01T00:00:00.000Z")
            .await
            .unwrap();

        let quiet = silent_active(&db, "2025-03-01T00:00:00.000Z").await.unwrap();
        assert_eq!(quiet.len(), 1);
        assert_eq!(quiet[0].id, conv.id);

        // Terminal conversations never surface.
        update_state(&db, conv.id, "HANDED_OFF").await.unwrap();
        let quiet = silent_active(&db, "2025-03-01T00:00:00.000Z").await.unwrap();
        assert!(quiet.is_empty());

        db.close().await.unwrap();
    }
}
