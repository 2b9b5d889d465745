// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead CRUD operations.

use rusqlite::params;

use rekindle_core::RekindleError;

use crate::database::Database;
use crate::models::LeadRow;

/// Insert a lead if it does not exist yet. Identity fields are immutable;
/// re-delivery of the same lead is a no-op.
pub async fn upsert_lead(db: &Database, lead: &LeadRow) -> Result<(), RekindleError> {
    let lead = lead.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO leads
                     (id, org_id, timezone, sms_opt_in, email_opt_in, voice_opt_in, opted_out)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    lead.id,
                    lead.org_id,
                    lead.timezone,
                    lead.sms_opt_in,
                    lead.email_opt_in,
                    lead.voice_opt_in,
                    lead.opted_out,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a lead by id.
pub async fn get_lead(db: &Database, id: &str) -> Result<Option<LeadRow>, RekindleError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, org_id, timezone, sms_opt_in, email_opt_in, voice_opt_in,
                        opted_out, created_at
                 FROM leads WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], |row| {
                Ok(LeadRow {
                    id: row.get(0)?,
                    org_id: row.get(1)?,
                    timezone: row.get(2)?,
                    sms_opt_in: row.get(3)?,
                    email_opt_in: row.get(4)?,
                    voice_opt_in: row.get(5)?,
                    opted_out: row.get(6)?,
                    created_at: row.get(7)?,
                })
            });
            match result {
                Ok(lead) => Ok(Some(lead)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set the lead-level opt-out flag.
pub async fn set_opted_out(db: &Database, id: &str, opted_out: bool) -> Result<(), RekindleError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE leads SET opted_out = ?1 WHERE id = ?2",
                params![opted_out, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
