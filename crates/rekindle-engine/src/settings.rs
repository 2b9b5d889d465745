// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static settings provider backed by the loaded configuration.
//!
//! Production deployments back [`SettingsProvider`] with the CRM's live
//! per-organization settings; this implementation serves one shared snapshot
//! from config, hot-swappable without locking readers.

use arc_swap::ArcSwap;
use async_trait::async_trait;
use std::sync::Arc;

use rekindle_core::types::{AdapterType, HealthStatus, OrgId, OrgSettings};
use rekindle_core::{Adapter, RekindleError, SettingsProvider};

/// Settings provider that serves the same snapshot to every organization.
pub struct StaticSettings {
    current: ArcSwap<OrgSettings>,
}

impl StaticSettings {
    pub fn new(settings: OrgSettings) -> Self {
        Self {
            current: ArcSwap::from_pointee(settings),
        }
    }

    /// Replace the snapshot. In-flight evaluation cycles keep the snapshot
    /// they captured; the change applies from the next cycle.
    pub fn update(&self, settings: OrgSettings) {
        self.current.store(Arc::new(settings));
    }
}

#[async_trait]
impl Adapter for StaticSettings {
    fn name(&self) -> &str {
        "static-settings"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Settings
    }

    async fn health_check(&self) -> Result<HealthStatus, RekindleError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RekindleError> {
        Ok(())
    }
}

#[async_trait]
impl SettingsProvider for StaticSettings {
    async fn snapshot(&self, _org_id: &OrgId) -> Result<OrgSettings, RekindleError> {
        Ok(self.current.load().as_ref().clone())
    }
}
