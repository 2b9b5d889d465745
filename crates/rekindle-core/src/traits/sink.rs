// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task/notification sink trait for human-facing escalations.

use async_trait::async_trait;

use crate::error::RekindleError;
use crate::traits::adapter::Adapter;
use crate::types::{HandoffNotification, ReviewNotice};

/// Collaborator that receives handoff notifications and review-queue entries.
///
/// Best-effort: a sink failure must never block the scheduler tick or the
/// state transition that produced the notification.
#[async_trait]
pub trait NotificationSink: Adapter {
    /// Notifies a human that a lead has been handed off.
    async fn notify_handoff(&self, notification: HandoffNotification)
    -> Result<(), RekindleError>;

    /// Queues a failed or skipped step for manual review.
    async fn queue_review(&self, notice: ReviewNotice) -> Result<(), RekindleError>;
}
