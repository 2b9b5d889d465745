// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A/B variant assignment bookkeeping.

use rusqlite::params;

use rekindle_core::RekindleError;

use crate::database::Database;
use crate::models::VariantRow;

/// Record a variant assignment. A lead keeps its first assignment per
/// template; re-enrollment returns the existing variant.
pub async fn assign_variant(
    db: &Database,
    lead_id: &str,
    template: &str,
    variant: &str,
) -> Result<String, RekindleError> {
    let lead_id = lead_id.to_string();
    let template = template.to_string();
    let variant = variant.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO variant_assignments (lead_id, template, variant)
                 VALUES (?1, ?2, ?3)",
                params![lead_id, template, variant],
            )?;
            let assigned = conn.query_row(
                "SELECT variant FROM variant_assignments
                 WHERE lead_id = ?1 AND template = ?2",
                params![lead_id, template],
                |row| row.get(0),
            )?;
            Ok(assigned)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record the terminal outcome for a lead's assignment (`responded`,
/// `handed_off`, `exhausted`, `opted_out`). First outcome wins.
pub async fn record_outcome(
    db: &Database,
    lead_id: &str,
    template: &str,
    outcome: &str,
) -> Result<(), RekindleError> {
    let lead_id = lead_id.to_string();
    let template = template.to_string();
    let outcome = outcome.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE variant_assignments
                 SET outcome = ?1, resolved_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE lead_id = ?2 AND template = ?3 AND outcome IS NULL",
                params![outcome, lead_id, template],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a terminal outcome on every unresolved assignment for a lead.
///
/// Used when the outcome is keyed to the lead rather than one template
/// (handoff, opt-out).
pub async fn record_outcome_for_lead(
    db: &Database,
    lead_id: &str,
    outcome: &str,
) -> Result<(), RekindleError> {
    let lead_id = lead_id.to_string();
    let outcome = outcome.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE variant_assignments
                 SET outcome = ?1, resolved_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE lead_id = ?2 AND outcome IS NULL",
                params![outcome, lead_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch an assignment (test and reporting helper).
pub async fn get_assignment(
    db: &Database,
    lead_id: &str,
    template: &str,
) -> Result<Option<VariantRow>, RekindleError> {
    let lead_id = lead_id.to_string();
    let template = template.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, lead_id, template, variant, outcome, assigned_at, resolved_at
                 FROM variant_assignments WHERE lead_id = ?1 AND template = ?2",
            )?;
            let result = stmt.query_row(params![lead_id, template], |row| {
                Ok(VariantRow {
                    id: row.get(0)?,
                    lead_id: row.get(1)?,
                    template: row.get(2)?,
                    variant: row.get(3)?,
                    outcome: row.get(4)?,
                    assigned_at: row.get(5)?,
                    resolved_at: row.get(6)?,
                })
            });
            match result {
                Ok(row) => Ok(Some(row)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}
