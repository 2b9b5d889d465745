// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Rekindle lead re-engagement engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Rekindle workspace. All collaborator
//! adapters (channel send, notification sink, settings, storage) implement
//! traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::RekindleError;
pub use types::{
    Channel, ConversationId, ConversationState, EventId, FollowUpId, FollowUpStatus, HealthStatus,
    LeadId, MessageId, OrgId, OrgSettings, ScoreCategory,
};

// Re-export all collaborator traits at crate root.
pub use traits::{Adapter, ChannelSend, NotificationSink, SettingsProvider, StorageAdapter};
