// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator adapter traits.
//!
//! These are the seams between the core engine and everything it does not
//! own: message delivery, human notification, per-organization settings, and
//! persistence.

pub mod adapter;
pub mod channel;
pub mod settings;
pub mod sink;
pub mod storage;

pub use adapter::Adapter;
pub use channel::ChannelSend;
pub use settings::SettingsProvider;
pub use sink::NotificationSink;
pub use storage::StorageAdapter;
