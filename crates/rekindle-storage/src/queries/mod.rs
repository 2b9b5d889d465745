// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each module owns the SQL for one table family.

pub mod conversations;
pub mod events;
pub mod followups;
pub mod leads;
pub mod review;
pub mod score_events;
pub mod stats;
pub mod variants;
