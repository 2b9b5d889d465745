// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock collaborators and fixtures for Rekindle integration tests.

pub mod fixtures;
pub mod mock_channel;
pub mod mock_settings;
pub mod mock_sink;

pub use fixtures::{sample_lead, seed_lead, test_db, TestDb};
pub use mock_channel::MockChannel;
pub use mock_settings::MockSettings;
pub use mock_sink::MockSink;
