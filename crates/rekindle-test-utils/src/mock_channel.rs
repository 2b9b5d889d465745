// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel-send collaborator for deterministic testing.
//!
//! Captures outbound messages for assertion and supports scripted failures
//! and artificial latency for retry/timeout paths.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use rekindle_core::types::{AdapterType, Channel, HealthStatus, MessageId, OutboundMessage};
use rekindle_core::{Adapter, ChannelSend, RekindleError};

/// A mock outbound channel.
///
/// `send()` captures the message and succeeds unless failures are scripted
/// with [`fail_next`](MockChannel::fail_next). An optional per-send delay
/// exercises the dispatcher's timeout handling.
pub struct MockChannel {
    channel: Channel,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    failures_remaining: Arc<Mutex<u32>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl MockChannel {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            sent: Arc::new(Mutex::new(Vec::new())),
            failures_remaining: Arc::new(Mutex::new(0)),
            delay: Arc::new(Mutex::new(None)),
        }
    }

    /// Make the next `n` sends fail with a channel error.
    pub async fn fail_next(&self, n: u32) {
        *self.failures_remaining.lock().await = n;
    }

    /// Delay every send by `duration` before completing.
    pub async fn set_delay(&self, duration: Duration) {
        *self.delay.lock().await = Some(duration);
    }

    /// All messages accepted by `send()`.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }
}

#[async_trait]
impl Adapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
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
impl ChannelSend for MockChannel {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, RekindleError> {
        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut failures = self.failures_remaining.lock().await;
        if *failures > 0 {
            *failures -= 1;
            return Err(RekindleError::Channel {
                message: "scripted provider failure".to_string(),
                source: None,
            });
        }
        drop(failures);

        self.sent.lock().await.push(msg);
        Ok(MessageId(format!("mock-msg-{}", uuid::Uuid::new_v4())))
    }
}
