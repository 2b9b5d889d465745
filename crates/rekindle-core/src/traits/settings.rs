// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Settings provider trait for per-organization toggles and thresholds.

use async_trait::async_trait;

use crate::error::RekindleError;
use crate::traits::adapter::Adapter;
use crate::types::{OrgId, OrgSettings};

/// Collaborator exposing per-organization configuration.
///
/// Read-only from the core's perspective. Callers capture one snapshot per
/// evaluation cycle; changes take effect on the next cycle, never
/// retroactively.
#[async_trait]
pub trait SettingsProvider: Adapter {
    /// Returns the current settings snapshot for an organization.
    ///
    /// An error here puts the scheduler into its most conservative no-send
    /// posture for that organization's leads.
    async fn snapshot(&self, org_id: &OrgId) -> Result<OrgSettings, RekindleError>;
}
