// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;

use crate::error::RekindleError;
use crate::traits::adapter::Adapter;

/// Collaborator that manages the persistence backend lifecycle.
///
/// Typed entity operations live in the storage crate's query modules; this
/// trait covers only lifecycle so the engine can bring a backend up and down
/// without knowing its technology.
#[async_trait]
pub trait StorageAdapter: Adapter {
    /// Initializes the storage backend (migrations, connection, PRAGMAs).
    async fn initialize(&self) -> Result<(), RekindleError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), RekindleError>;
}
