// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Log-only channel and notification adapters.
//!
//! Real deployments register provider-backed [`ChannelSend`] and
//! [`NotificationSink`] implementations; the standalone binary ships these
//! console adapters so the scheduler runs end to end with every delivery
//! and notification visible in the log stream.

use async_trait::async_trait;
use tracing::{info, warn};

use rekindle_core::types::{
    AdapterType, Channel, HandoffNotification, HealthStatus, MessageId, OutboundMessage,
    ReviewNotice,
};
use rekindle_core::{Adapter, ChannelSend, NotificationSink, RekindleError};

/// Outbound sender that logs the rendered message instead of delivering it.
pub struct ConsoleChannel {
    channel: Channel,
}

impl ConsoleChannel {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl Adapter for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, RekindleError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RekindleError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelSend for ConsoleChannel {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, RekindleError> {
        info!(
            lead_id = %msg.lead_id.0,
            channel = %msg.channel,
            message_type = msg.message_type.as_str(),
            text = msg.rendered_text.as_str(),
            "console delivery"
        );
        Ok(MessageId(format!("console-{}", uuid::Uuid::new_v4())))
    }
}

/// Notification sink that logs handoffs and review notices.
pub struct ConsoleSink;

#[async_trait]
impl Adapter for ConsoleSink {
    fn name(&self) -> &str {
        "console-sink"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Notification
    }

    async fn health_check(&self) -> Result<HealthStatus, RekindleError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RekindleError> {
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for ConsoleSink {
    async fn notify_handoff(
        &self,
        notification: HandoffNotification,
    ) -> Result<(), RekindleError> {
        info!(
            lead_id = %notification.lead_id.0,
            conversation_id = notification.conversation_id.0,
            reason = notification.reason.as_str(),
            "lead handed off to a human"
        );
        Ok(())
    }

    async fn queue_review(&self, notice: ReviewNotice) -> Result<(), RekindleError> {
        warn!(
            lead_id = %notice.lead_id.0,
            followup_id = ?notice.followup_id,
            reason = notice.reason.as_str(),
            "step queued for manual review"
        );
        Ok(())
    }
}
