// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `rekindle status` command implementation.
//!
//! Opens the configured database, runs the storage health check, and prints
//! pipeline volume: leads, live conversations, schedulable steps, and open
//! review entries. `--json` emits structured output for scripting.

use serde::Serialize;

use rekindle_config::RekindleConfig;
use rekindle_core::types::HealthStatus;
use rekindle_core::{Adapter, RekindleError, StorageAdapter};
use rekindle_storage::queries::stats;
use rekindle_storage::SqliteStorage;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub storage: String,
    pub database_path: String,
    pub leads: i64,
    pub active_conversations: i64,
    pub pending_followups: i64,
    pub unresolved_reviews: i64,
}

/// Run the `rekindle status` command.
pub async fn run_status(config: &RekindleConfig, json: bool) -> Result<(), RekindleError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;

    let health = storage.health_check().await?;
    let counts = stats::counts(storage.db()?).await?;
    storage.close().await?;

    let storage_status = match health {
        HealthStatus::Healthy => "healthy".to_string(),
        HealthStatus::Degraded(detail) => format!("degraded: {detail}"),
        HealthStatus::Unhealthy(detail) => format!("unhealthy: {detail}"),
    };

    let response = StatusResponse {
        storage: storage_status,
        database_path: config.storage.database_path.clone(),
        leads: counts.leads,
        active_conversations: counts.active_conversations,
        pending_followups: counts.pending_followups,
        unresolved_reviews: counts.unresolved_reviews,
    };

    if json {
        let rendered = serde_json::to_string_pretty(&response)
            .map_err(|e| RekindleError::Internal(format!("cannot render status: {e}")))?;
        println!("{rendered}");
    } else {
        println!("storage:              {}", response.storage);
        println!("database:             {}", response.database_path);
        println!("leads:                {}", response.leads);
        println!("active conversations: {}", response.active_conversations);
        println!("pending follow-ups:   {}", response.pending_followups);
        println!("unresolved reviews:   {}", response.unresolved_reviews);
    }

    Ok(())
}
