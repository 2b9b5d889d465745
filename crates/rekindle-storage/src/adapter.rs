// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use rekindle_config::model::StorageConfig;
use rekindle_core::types::AdapterType;
use rekindle_core::{Adapter, HealthStatus, RekindleError, StorageAdapter};

use crate::database::Database;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle; typed entity operations live in the
/// [`crate::queries`] modules and take the database directly. The database
/// is lazily initialized on the first call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`]
    /// is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// The underlying Database, or an error if not initialized.
    pub fn db(&self) -> Result<&Database, RekindleError> {
        self.db.get().ok_or_else(|| RekindleError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl Adapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RekindleError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RekindleError> {
        // Shutdown delegates to close if the DB was initialized.
        if let Some(db) = self.db.get() {
            db.close().await?;
            debug!("shutdown: storage closed");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), RekindleError> {
        let path = self.config.database_path.clone();
        let db = Database::open(&path).await?;
        self.db.set(db).map_err(|_| RekindleError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), RekindleError> {
        self.db()?.close().await
    }
}
