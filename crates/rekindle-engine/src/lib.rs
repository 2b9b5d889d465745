// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Rekindle engine: conversation state machine, inbound event pipeline,
//! enrollment, and the compliance-gated dispatch loop.
//!
//! Everything external is a collaborator trait from `rekindle-core`; the
//! engine owns the conversation record and the one hard concurrency
//! invariant: all mutation for a lead happens under that lead's lock.

pub mod dispatch;
pub mod enroll;
pub mod events;
pub mod locks;
pub mod render;
pub mod settings;
pub mod shutdown;
pub mod state;
pub mod variants;

pub use dispatch::{Dispatcher, TickSummary};
pub use enroll::{enroll, EnrollmentOutcome};
pub use events::{EventProcessor, InboundOutcome};
pub use locks::LeadLocks;
pub use render::{CannedRenderer, MessageRenderer};
pub use settings::StaticSettings;
pub use state::{transition, TransitionInput};
