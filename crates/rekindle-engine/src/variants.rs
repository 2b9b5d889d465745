// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A/B variant assignment for message copy experiments.
//!
//! Assignment is a coin flip at enrollment, sticky per (lead, template).
//! Outcome recording is best-effort bookkeeping: failures log a warning and
//! never block the pipeline that triggered them.

use rand::Rng;
use tracing::warn;

use rekindle_core::RekindleError;
use rekindle_storage::queries::variants;
use rekindle_storage::Database;

/// The two copy arms. Copy differences live in the rendering collaborator;
/// the core only tracks which arm each lead saw and how it ended.
pub const VARIANTS: [&str; 2] = ["A", "B"];

/// Assign (or recover) the lead's variant for a template.
pub async fn assign(
    db: &Database,
    lead_id: &str,
    template: &str,
) -> Result<String, RekindleError> {
    let pick = VARIANTS[rand::thread_rng().gen_range(0..VARIANTS.len())];
    variants::assign_variant(db, lead_id, template, pick).await
}

/// Record how the lead's enrollment ended. First outcome wins; errors are
/// logged and dropped.
pub async fn record_outcome(db: &Database, lead_id: &str, template: &str, outcome: &str) {
    if let Err(e) = variants::record_outcome(db, lead_id, template, outcome).await {
        warn!(lead_id, template, outcome, error = %e, "variant outcome not recorded");
    }
}

/// Record a lead-keyed terminal outcome (handoff, opt-out) across all of the
/// lead's unresolved assignments. Best-effort.
pub async fn record_outcome_for_lead(db: &Database, lead_id: &str, outcome: &str) {
    if let Err(e) = variants::record_outcome_for_lead(db, lead_id, outcome).await {
        warn!(lead_id, outcome, error = %e, "variant outcome not recorded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rekindle_storage::models::LeadRow;
    use rekindle_storage::queries::leads;
    use tempfile::tempdir;

    #[tokio::test]
    async fn assignment_is_one_of_the_arms_and_sticky() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        leads::upsert_lead(
            &db,
            &LeadRow {
                id: "lead-1".to_string(),
                org_id: "org-1".to_string(),
                timezone: "UTC".to_string(),
                sms_opt_in: true,
                email_opt_in: true,
                voice_opt_in: true,
                opted_out: false,
                created_at: String::new(),
            },
        )
        .await
        .unwrap();

        let first = assign(&db, "lead-1", "NEW_LEAD").await.unwrap();
        assert!(VARIANTS.contains(&first.as_str()));
        for _ in 0..10 {
            assert_eq!(assign(&db, "lead-1", "NEW_LEAD").await.unwrap(), first);
        }

        db.close().await.unwrap();
    }
}
