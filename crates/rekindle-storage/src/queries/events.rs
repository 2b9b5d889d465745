// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound event idempotency ledger.
//!
//! The engine checks the ledger before applying an event's effects and
//! records the id only after every effect has landed. An id in the ledger
//! therefore means the event was fully processed, never half-processed.

use rusqlite::params;

use rekindle_core::RekindleError;

use crate::database::Database;

/// Whether an event id has already been fully processed.
pub async fn is_processed(db: &Database, event_id: &str) -> Result<bool, RekindleError> {
    let event_id = event_id.to_string();
    db.connection()
        .call(move |conn| {
            let seen = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM processed_events WHERE event_id = ?1)",
                params![event_id],
                |row| row.get(0),
            )?;
            Ok(seen)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record an event id as fully processed. Idempotent; recording the same id
/// twice is harmless.
pub async fn mark_processed(
    db: &Database,
    event_id: &str,
    lead_id: &str,
) -> Result<(), RekindleError> {
    let event_id = event_id.to_string();
    let lead_id = lead_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO processed_events (event_id, lead_id) VALUES (?1, ?2)",
                params![event_id, lead_id],
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
    async fn ledger_round_trip() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();

        assert!(!is_processed(&db, "evt-1").await.unwrap());
        mark_processed(&db, "evt-1", "lead-1").await.unwrap();
        assert!(is_processed(&db, "evt-1").await.unwrap());
        // Recording again does not fail.
        mark_processed(&db, "evt-1", "lead-1").await.unwrap();
        // A different event id is independent.
        assert!(!is_processed(&db, "evt-2").await.unwrap());

        db.close().await.unwrap();
    }
}
