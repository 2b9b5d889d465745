// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage fixtures: a migrated temp-file database and canned rows.

use tempfile::TempDir;

use rekindle_core::RekindleError;
use rekindle_storage::models::LeadRow;
use rekindle_storage::queries::leads;
use rekindle_storage::Database;

/// A migrated database in a temp directory. Dropping the fixture removes
/// the files; keep it alive for the test's duration.
pub struct TestDb {
    pub db: Database,
    _dir: TempDir,
}

/// Open a fresh, fully migrated database under a temp directory.
pub async fn test_db() -> Result<TestDb, RekindleError> {
    let dir = tempfile::tempdir().map_err(|e| RekindleError::Storage {
        source: Box::new(e),
    })?;
    let path = dir.path().join("rekindle-test.db");
    let db = Database::open(&path.to_string_lossy()).await?;
    Ok(TestDb { db, _dir: dir })
}

/// A lead row with sensible defaults for tests.
pub fn sample_lead(id: &str) -> LeadRow {
    LeadRow {
        id: id.to_string(),
        org_id: "org-test".to_string(),
        timezone: "America/New_York".to_string(),
        sms_opt_in: true,
        email_opt_in: true,
        voice_opt_in: true,
        opted_out: false,
        created_at: String::new(),
    }
}

/// Insert a default lead and return its id.
pub async fn seed_lead(db: &Database, id: &str) -> Result<String, RekindleError> {
    leads::upsert_lead(db, &sample_lead(id)).await?;
    Ok(id.to_string())
}
