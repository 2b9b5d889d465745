// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel-send trait for outbound message providers (SMS, email, voice, RVM).

use async_trait::async_trait;

use crate::error::RekindleError;
use crate::traits::adapter::Adapter;
use crate::types::{Channel, MessageId, OutboundMessage};

/// Collaborator that delivers one channel's outbound messages.
///
/// The core treats delivery as fire-and-confirm: a successful return means
/// the provider accepted the message, not that the lead read it. Message
/// content generation happens upstream; the core only routes.
#[async_trait]
pub trait ChannelSend: Adapter {
    /// The channel variant this sender covers.
    fn channel(&self) -> Channel;

    /// Sends a message through the channel provider.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, RekindleError>;
}
