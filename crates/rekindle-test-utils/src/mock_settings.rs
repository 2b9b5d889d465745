// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory settings provider with scriptable failures.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use rekindle_core::types::{AdapterType, HealthStatus, OrgId, OrgSettings};
use rekindle_core::{Adapter, RekindleError, SettingsProvider};

pub struct MockSettings {
    current: Arc<Mutex<OrgSettings>>,
    failing: Arc<Mutex<bool>>,
}

impl MockSettings {
    pub fn new(settings: OrgSettings) -> Self {
        Self {
            current: Arc::new(Mutex::new(settings)),
            failing: Arc::new(Mutex::new(false)),
        }
    }

    pub async fn update(&self, settings: OrgSettings) {
        *self.current.lock().await = settings;
    }

    /// Make `snapshot()` fail; consumers must take the no-send posture.
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.lock().await = failing;
    }
}

impl Default for MockSettings {
    fn default() -> Self {
        Self::new(OrgSettings::default())
    }
}

#[async_trait]
impl Adapter for MockSettings {
    fn name(&self) -> &str {
        "mock-settings"
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
impl SettingsProvider for MockSettings {
    async fn snapshot(&self, _org_id: &OrgId) -> Result<OrgSettings, RekindleError> {
        if *self.failing.lock().await {
            return Err(RekindleError::SettingsUnavailable(
                "scripted settings failure".to_string(),
            ));
        }
        Ok(self.current.lock().await.clone())
    }
}
