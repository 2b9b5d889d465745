// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock notification sink: captures handoff notifications and review
//! notices for assertion.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use rekindle_core::types::{AdapterType, HandoffNotification, HealthStatus, ReviewNotice};
use rekindle_core::{Adapter, NotificationSink, RekindleError};

#[derive(Default)]
pub struct MockSink {
    handoffs: Arc<Mutex<Vec<HandoffNotification>>>,
    reviews: Arc<Mutex<Vec<ReviewNotice>>>,
    failing: Arc<Mutex<bool>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every notification call fail; the pipeline must still proceed.
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.lock().await = failing;
    }

    pub async fn handoffs(&self) -> Vec<HandoffNotification> {
        self.handoffs.lock().await.clone()
    }

    pub async fn reviews(&self) -> Vec<ReviewNotice> {
        self.reviews.lock().await.clone()
    }
}

#[async_trait]
impl Adapter for MockSink {
    fn name(&self) -> &str {
        "mock-sink"
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
impl NotificationSink for MockSink {
    async fn notify_handoff(
        &self,
        notification: HandoffNotification,
    ) -> Result<(), RekindleError> {
        if *self.failing.lock().await {
            return Err(RekindleError::Internal("scripted sink failure".to_string()));
        }
        self.handoffs.lock().await.push(notification);
        Ok(())
    }

    async fn queue_review(&self, notice: ReviewNotice) -> Result<(), RekindleError> {
        if *self.failing.lock().await {
            return Err(RekindleError::Internal("scripted sink failure".to_string()));
        }
        self.reviews.lock().await.push(notice);
        Ok(())
    }
}
