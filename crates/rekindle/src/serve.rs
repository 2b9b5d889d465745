// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `rekindle serve` command implementation.
//!
//! Starts the follow-up scheduler daemon: SQLite storage, the config-backed
//! settings provider, console channel senders, and the fast/slow dispatch
//! loops with the dormancy sweep. Inbound replies and lifecycle events enter
//! through the `rekindle-engine` library API when the engine is embedded in
//! a host; the standalone daemon drives the outbound side.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use rekindle_config::RekindleConfig;
use rekindle_core::types::Channel;
use rekindle_core::{
    Adapter, ChannelSend, NotificationSink, RekindleError, SettingsProvider, StorageAdapter,
};
use rekindle_engine::{shutdown, CannedRenderer, Dispatcher, LeadLocks, StaticSettings};
use rekindle_storage::SqliteStorage;

use crate::console::{ConsoleChannel, ConsoleSink};

/// Runs the `rekindle serve` command.
///
/// Initializes storage, wires the dispatcher collaborators, and runs the
/// scheduler loops until SIGINT or SIGTERM. Adapters are shut down in
/// reverse initialization order.
pub async fn run_serve(config: RekindleConfig) -> Result<(), RekindleError> {
    init_tracing(&config.engine.log_level);

    info!(name = config.engine.name.as_str(), "starting rekindle serve");

    // Initialize storage.
    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    let db = storage.db()?.clone();

    // Settings snapshot served from config; a CRM-backed provider replaces
    // this when the engine is embedded.
    let settings: Arc<StaticSettings> = Arc::new(StaticSettings::new(config.org_settings()));

    // Console senders for every channel the settings allow.
    let mut channels: HashMap<Channel, Arc<dyn ChannelSend>> = HashMap::new();
    for channel in [Channel::Sms, Channel::Email, Channel::Voice, Channel::Rvm] {
        channels.insert(channel, Arc::new(ConsoleChannel::new(channel)));
    }
    info!(count = channels.len(), "console channel senders registered");

    let sink: Arc<dyn NotificationSink> = Arc::new(ConsoleSink);
    let locks = Arc::new(LeadLocks::new());

    let dispatcher = Arc::new(Dispatcher::new(
        db,
        locks,
        channels,
        settings.clone() as Arc<dyn SettingsProvider>,
        sink,
        Arc::new(CannedRenderer),
        config.scheduler.clone(),
        config.sequence.clone(),
    ));

    // Install signal handler.
    let cancel = shutdown::install_signal_handler();

    dispatcher.run(cancel).await;

    storage.shutdown().await?;
    info!("rekindle serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rekindle={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
