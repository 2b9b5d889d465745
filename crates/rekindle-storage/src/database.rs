// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use tokio_rusqlite::Connection;
use tracing::debug;

use rekindle_core::RekindleError;

use crate::migrations;

/// Handle to the single-writer SQLite database.
///
/// Wraps one `tokio_rusqlite::Connection`; every query module accepts
/// `&Database` and routes through [`Database::connection`], which serializes
/// all closure calls on one background thread and eliminates SQLITE_BUSY
/// under concurrent access.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`, set PRAGMAs, and run
    /// embedded migrations.
    pub async fn open(path: &str) -> Result<Self, RekindleError> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| map_tr_err(e.into()))?;

        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            migrations::run_migrations(conn)
                .map_err(|e| rusqlite::Error::ModuleError(e.to_string()))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        debug!(path, "database opened");
        Ok(Self { conn })
    }

    /// The underlying single-writer connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(&self) -> Result<(), RekindleError> {
        self.conn
            .call(|conn| {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

/// Map a tokio-rusqlite error into the workspace error type.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> RekindleError {
    RekindleError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let tables: Vec<String> = db
            .connection()
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
                )?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok::<_, rusqlite::Error>(names)
            })
            .await
            .unwrap();

        for expected in [
            "leads",
            "conversations",
            "score_events",
            "scheduled_followups",
            "processed_events",
            "variant_assignments",
            "review_queue",
        ] {
            assert!(
                tables.iter().any(|t| t == expected),
                "missing table {expected}, got {tables:?}"
            );
        }

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let path = db_path.to_str().unwrap();

        let db = Database::open(path).await.unwrap();
        db.close().await.unwrap();
        drop(db);

        // Migrations must not re-run or fail on a second open.
        let db = Database::open(path).await.unwrap();
        db.close().await.unwrap();
    }
}
