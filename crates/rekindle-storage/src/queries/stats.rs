// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregate counts for the `rekindle status` command.

use rekindle_core::RekindleError;

use crate::database::Database;

/// Snapshot of pipeline volume.
#[derive(Debug, Clone, Default)]
pub struct StatusCounts {
    pub leads: i64,
    pub active_conversations: i64,
    pub pending_followups: i64,
    pub unresolved_reviews: i64,
}

/// Count leads, live conversations, schedulable steps, and open reviews.
pub async fn counts(db: &Database) -> Result<StatusCounts, RekindleError> {
    db.connection()
        .call(move |conn| {
            let scalar = |sql: &str| -> Result<i64, rusqlite::Error> {
                conn.query_row(sql, [], |row| row.get(0))
            };
            Ok(StatusCounts {
                leads: scalar("SELECT COUNT(*) FROM leads")?,
                active_conversations: scalar(
                    "SELECT COUNT(*) FROM conversations
                     WHERE superseded = 0
                       AND state NOT IN ('HANDED_OFF', 'OPTED_OUT', 'CLOSED', 'DORMANT')",
                )?,
                pending_followups: scalar(
                    "SELECT COUNT(*) FROM scheduled_followups
                     WHERE status IN ('pending', 'deferred')",
                )?,
                unresolved_reviews: scalar("SELECT COUNT(*) FROM review_queue WHERE resolved = 0")?,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}
