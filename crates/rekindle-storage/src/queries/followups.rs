// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduled follow-up operations.
//!
//! The dispatcher loop in the engine crate is the only writer of follow-up
//! status; everything here is invoked under that loop's per-lead lock.

use rusqlite::params;

use rekindle_core::RekindleError;

use crate::database::Database;
use crate::models::{DueStep, FollowUpRow};

const COLUMNS: &str = "f.id, f.lead_id, f.conversation_id, f.template, f.step_index,
                       f.fire_at, f.channel, f.message_type, f.status, f.attempts,
                       f.defer_count, f.failure_reason, f.variant, f.sent_at,
                       f.created_at, f.updated_at";

fn row_to_followup(row: &rusqlite::Row<'_>) -> Result<FollowUpRow, rusqlite::Error> {
    Ok(FollowUpRow {
        id: row.get(0)?,
        lead_id: row.get(1)?,
        conversation_id: row.get(2)?,
        template: row.get(3)?,
        step_index: row.get(4)?,
        fire_at: row.get(5)?,
        channel: row.get(6)?,
        message_type: row.get(7)?,
        status: row.get(8)?,
        attempts: row.get(9)?,
        defer_count: row.get(10)?,
        failure_reason: row.get(11)?,
        variant: row.get(12)?,
        sent_at: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

/// A step to persist at enrollment time.
#[derive(Debug, Clone)]
pub struct NewFollowUp {
    pub step_index: i64,
    pub fire_at: String,
    pub channel: String,
    pub message_type: String,
    /// `pending` or `skipped` (skip-gated step on a disabled channel).
    pub status: String,
}

/// Insert all steps materialized from a template, in one transaction.
pub async fn insert_planned(
    db: &Database,
    lead_id: &str,
    conversation_id: i64,
    template: &str,
    variant: &str,
    steps: Vec<NewFollowUp>,
) -> Result<(), RekindleError> {
    let lead_id = lead_id.to_string();
    let template = template.to_string();
    let variant = variant.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO scheduled_followups
                         (lead_id, conversation_id, template, step_index, fire_at,
                          channel, message_type, status, variant)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )?;
                for step in &steps {
                    stmt.execute(params![
                        lead_id,
                        conversation_id,
                        template,
                        step.step_index,
                        step.fire_at,
                        step.channel,
                        step.message_type,
                        step.status,
                        variant,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Select due steps (`pending`/`deferred`, `fire_at <= now`) joined with the
/// lead and conversation fields the dispatcher gates on.
///
/// `hot_since`: when set, only leads with inbound activity at or after the
/// cutoff (the fast poll). When unset, all leads (the slow poll).
pub async fn due_steps(
    db: &Database,
    now: &str,
    hot_since: Option<&str>,
) -> Result<Vec<DueStep>, RekindleError> {
    let now = now.to_string();
    let hot_since = hot_since.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let base = format!(
                "SELECT {COLUMNS}, l.org_id, l.timezone, l.opted_out, c.state, c.ai_enabled
                 FROM scheduled_followups f
                 JOIN leads l ON l.id = f.lead_id
                 JOIN conversations c ON c.id = f.conversation_id
                 WHERE f.status IN ('pending', 'deferred') AND f.fire_at <= ?1"
            );
            let rows = if let Some(cutoff) = hot_since {
                let sql = format!("{base} AND c.last_message_at >= ?2 ORDER BY f.lead_id, f.fire_at");
                let mut stmt = conn.prepare(&sql)?;
                stmt.query_map(params![now, cutoff], |row| {
                    Ok(DueStep {
                        followup: row_to_followup(row)?,
                        org_id: row.get(16)?,
                        timezone: row.get(17)?,
                        lead_opted_out: row.get(18)?,
                        conversation_state: row.get(19)?,
                        ai_enabled: row.get(20)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?
            } else {
                let sql = format!("{base} ORDER BY f.lead_id, f.fire_at");
                let mut stmt = conn.prepare(&sql)?;
                stmt.query_map(params![now], |row| {
                    Ok(DueStep {
                        followup: row_to_followup(row)?,
                        org_id: row.get(16)?,
                        timezone: row.get(17)?,
                        lead_opted_out: row.get(18)?,
                        conversation_state: row.get(19)?,
                        ai_enabled: row.get(20)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?
            };
            Ok(rows)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Cancel every `pending`/`deferred` step for a lead. Returns the count.
///
/// Called within the same per-lead critical section as the terminal state
/// transition, so a cancelled lead can never receive a queued send.
pub async fn cancel_active_for_lead(db: &Database, lead_id: &str) -> Result<usize, RekindleError> {
    let lead_id = lead_id.to_string();
    db.connection()
        .call(move |conn| {
            let count = conn.execute(
                "UPDATE scheduled_followups SET status = 'cancelled',
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE lead_id = ?1 AND status IN ('pending', 'deferred')",
                params![lead_id],
            )?;
            Ok(count)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a step sent.
pub async fn mark_sent(db: &Database, id: i64, sent_at: &str) -> Result<(), RekindleError> {
    let sent_at = sent_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE scheduled_followups SET status = 'sent', sent_at = ?1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![sent_at, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a step deferred until `retry_at` (compliance deferral).
pub async fn mark_deferred(db: &Database, id: i64, retry_at: &str) -> Result<(), RekindleError> {
    let retry_at = retry_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE scheduled_followups SET status = 'deferred', fire_at = ?1,
                     defer_count = defer_count + 1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![retry_at, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a step skipped with a reason (stale deferral, exhausted retries,
/// inconsistent lead state). The row stays for the audit trail.
pub async fn mark_skipped(db: &Database, id: i64, reason: &str) -> Result<(), RekindleError> {
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE scheduled_followups SET status = 'skipped', failure_reason = ?1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![reason, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a failed send attempt and push the retry time (backoff).
pub async fn record_failed_attempt(
    db: &Database,
    id: i64,
    retry_at: &str,
) -> Result<(), RekindleError> {
    let retry_at = retry_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE scheduled_followups SET attempts = attempts + 1, fire_at = ?1,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![retry_at, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// `fire_at` of the next live step after `step_index`, if any. Used for the
/// stale-deferral bound.
pub async fn next_step_fire_at(
    db: &Database,
    conversation_id: i64,
    step_index: i64,
) -> Result<Option<String>, RekindleError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT MIN(fire_at) FROM scheduled_followups
                 WHERE conversation_id = ?1 AND step_index > ?2
                   AND status IN ('pending', 'deferred')",
                params![conversation_id, step_index],
                |row| row.get::<_, Option<String>>(0),
            );
            match result {
                Ok(v) => Ok(v),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Count of live (`pending`/`deferred`) steps for a conversation.
pub async fn remaining_active_count(
    db: &Database,
    conversation_id: i64,
) -> Result<i64, RekindleError> {
    db.connection()
        .call(move |conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM scheduled_followups
                 WHERE conversation_id = ?1 AND status IN ('pending', 'deferred')",
                params![conversation_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Timestamps of sends to this lead at or after `since` (rate-cap input).
pub async fn recent_sent_ats(
    db: &Database,
    lead_id: &str,
    since: &str,
) -> Result<Vec<String>, RekindleError> {
    let lead_id = lead_id.to_string();
    let since = since.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT sent_at FROM scheduled_followups
                 WHERE lead_id = ?1 AND status = 'sent' AND sent_at >= ?2",
            )?;
            let rows = stmt
                .query_map(params![lead_id, since], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch one follow-up by id.
pub async fn get_followup(db: &Database, id: i64) -> Result<Option<FollowUpRow>, RekindleError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM scheduled_followups f WHERE f.id = ?1"
            ))?;
            let result = stmt.query_row(params![id], row_to_followup);
            match result {
                Ok(row) => Ok(Some(row)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All follow-ups for a lead, ordered by step index (audit/test helper).
pub async fn list_for_lead(db: &Database, lead_id: &str) -> Result<Vec<FollowUpRow>, RekindleError> {
    let lead_id = lead_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM scheduled_followups f
                 WHERE f.lead_id = ?1 ORDER BY f.step_index"
            ))?;
            let rows = stmt
                .query_map(params![lead_id], row_to_followup)?
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

    async fn setup() -> (Database, tempfile::TempDir, i64) {
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
        let conv = conversations::create_conversation(&db, "lead-1", "org-1", "NEW")
            .await
            .unwrap();
        (db, dir, conv.id)
    }

    fn step(index: i64, fire_at: &str, status: &str) -> NewFollowUp {
        NewFollowUp {
            step_index: index,
            fire_at: fire_at.to_string(),
            channel: "sms".to_string(),
            message_type: "intro".to_string(),
            status: status.to_string(),
        }
    }

    #[tokio::test]
    async fn insert_and_select_due() {
        let (db, _dir, conv_id) = setup().await;

        insert_planned(
            &db,
            "lead-1",
            conv_id,
            "NEW_LEAD",
            "A",
            vec![
                step(0, "2025-06-10T15:00:00.000Z", "pending"),
                step(1, "2025-06-11T15:00:00.000Z", "pending"),
                step(2, "2025-06-12T15:00:00.000Z", "skipped"),
            ],
        )
        .await
        .unwrap();

        let due = due_steps(&db, "2025-06-10T16:00:00.000Z", None).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].followup.step_index, 0);
        assert_eq!(due[0].timezone, "America/New_York");
        assert_eq!(due[0].conversation_state, "NEW");

        // Skipped steps are never due, even past their fire_at.
        let due = due_steps(&db, "2025-06-13T00:00:00.000Z", None).await.unwrap();
        assert_eq!(due.len(), 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn hot_filter_excludes_quiet_leads() {
        let (db, _dir, conv_id) = setup().await;

        insert_planned(
            &db,
            "lead-1",
            conv_id,
            "NEW_LEAD",
            "A",
            vec![step(0, "2025-06-10T15:00:00.000Z", "pending")],
        )
        .await
        .unwrap();

        // No inbound yet: the fast poll sees nothing.
        let due = due_steps(
            &db,
            "2025-06-10T16:00:00.000Z",
            Some("2025-06-09T00:00:00.000Z"),
        )
        .await
        .unwrap();
        assert!(due.is_empty());

        conversations::record_message(&db, conv_id, "2025-06-10T12:00:00.000Z")
            .await
            .unwrap();
        let due = due_steps(
            &db,
            "2025-06-10T16:00:00.000Z",
            Some("2025-06-09T00:00:00.000Z"),
        )
        .await
        .unwrap();
        assert_eq!(due.len(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn cancel_covers_pending_and_deferred_only() {
        let (db, _dir, conv_id) = setup().await;

        insert_planned(
            &db,
            "lead-1",
            conv_id,
            "NEW_LEAD",
            "A",
            vec![
                step(0, "2025-06-10T15:00:00.000Z", "pending"),
                step(1, "2025-06-11T15:00:00.000Z", "pending"),
                step(2, "2025-06-12T15:00:00.000Z", "skipped"),
            ],
        )
        .await
        .unwrap();

        let rows = list_for_lead(&db, "lead-1").await.unwrap();
        mark_deferred(&db, rows[1].id, "2025-06-11T18:00:00.000Z")
            .await
            .unwrap();

        let cancelled = cancel_active_for_lead(&db, "lead-1").await.unwrap();
        assert_eq!(cancelled, 2);

        let rows = list_for_lead(&db, "lead-1").await.unwrap();
        assert_eq!(rows[0].status, "cancelled");
        assert_eq!(rows[1].status, "cancelled");
        assert_eq!(rows[2].status, "skipped");
        assert_eq!(remaining_active_count(&db, conv_id).await.unwrap(), 0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn sent_steps_feed_the_rate_cap() {
        let (db, _dir, conv_id) = setup().await;

        insert_planned(
            &db,
            "lead-1",
            conv_id,
            "NEW_LEAD",
            "A",
            vec![
                step(0, "2025-06-10T15:00:00.000Z", "pending"),
                step(1, "2025-06-10T16:00:00.000Z", "pending"),
            ],
        )
        .await
        .unwrap();

        let rows = list_for_lead(&db, "lead-1").await.unwrap();
        mark_sent(&db, rows[0].id, "2025-06-10T15:01:00.000Z")
            .await
            .unwrap();

        let sent = recent_sent_ats(&db, "lead-1", "2025-06-10T00:00:00.000Z")
            .await
            .unwrap();
        assert_eq!(sent, vec!["2025-06-10T15:01:00.000Z".to_string()]);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn next_step_fire_at_looks_past_current() {
        let (db, _dir, conv_id) = setup().await;

        insert_planned(
            &db,
            "lead-1",
            conv_id,
            "NEW_LEAD",
            "A",
            vec![
                step(0, "2025-06-10T15:00:00.000Z", "pending"),
                step(1, "2025-06-12T15:00:00.000Z", "pending"),
            ],
        )
        .await
        .unwrap();

        let next = next_step_fire_at(&db, conv_id, 0).await.unwrap();
        assert_eq!(next.as_deref(), Some("2025-06-12T15:00:00.000Z"));
        let after_last = next_step_fire_at(&db, conv_id, 1).await.unwrap();
        assert!(after_last.is_none());

        db.close().await.unwrap();
    }
}
