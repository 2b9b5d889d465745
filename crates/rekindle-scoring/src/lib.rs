// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead scoring and handoff decisions for the Rekindle engine.
//!
//! Two deliberately redundant safety nets: the scorer accumulates capped
//! per-message deltas toward the handoff threshold, and the handoff trigger
//! table short-circuits on high-confidence intent regardless of score.

pub mod handoff;
pub mod scorer;

pub use handoff::{HandoffDecision, HandoffEngine, HandoffTrigger, default_triggers};
pub use scorer::{LeadScorer, ScoreDelta};
