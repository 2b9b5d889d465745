// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait that all collaborator adapters must implement.

use async_trait::async_trait;

use crate::error::RekindleError;
use crate::types::{AdapterType, HealthStatus};

/// The base trait for all Rekindle collaborator adapters.
///
/// Every external collaborator (channel send, notification sink, settings
/// provider, storage) implements this trait, which provides identity,
/// lifecycle, and health check capabilities.
#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    /// Returns the human-readable name of this adapter instance.
    fn name(&self) -> &str;

    /// Returns the semantic version of this adapter.
    fn version(&self) -> semver::Version;

    /// Returns the type of adapter (channel, storage, notification, settings).
    fn adapter_type(&self) -> AdapterType;

    /// Performs a health check and returns the adapter's current status.
    async fn health_check(&self) -> Result<HealthStatus, RekindleError>;

    /// Gracefully shuts down the adapter, releasing any held resources.
    async fn shutdown(&self) -> Result<(), RekindleError>;
}
