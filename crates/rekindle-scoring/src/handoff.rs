// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Handoff decision engine.
//!
//! Two independent paths to a human handoff, either sufficient:
//! 1. cumulative score at or above the organization threshold;
//! 2. a message matching a curated high-confidence intent pattern,
//!    regardless of current score.
//!
//! The pattern path force-boosts the stored score to the threshold so
//! analytics never show a handoff at an implausibly low score. The engine
//! only decides; acknowledgment messaging is a collaborator concern.

use regex::Regex;
use tracing::debug;

/// A named high-confidence intent matcher.
///
/// Triggers are a data-driven table: adding a rule is additive, not a code
/// path change.
pub struct HandoffTrigger {
    /// Stable rule name, recorded as the `handoff_reason` for support.
    pub name: &'static str,
    matcher: Regex,
}

impl HandoffTrigger {
    pub fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            matcher: Regex::new(pattern).expect("trigger pattern must compile"),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }
}

/// The curated default trigger table.
///
/// Explicit appointment agreement and explicit requests for a human. Opt-out
/// phrasing is deliberately absent: opt-out is a lifecycle signal, not a
/// handoff.
pub fn default_triggers() -> Vec<HandoffTrigger> {
    vec![
        HandoffTrigger::new(
            "appointment_agreement",
            // A day (or relative day) together with a clock time reads as a
            // concrete appointment commitment.
            r"(?i)\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday|today|tomorrow|tonight)\b.{0,40}?\b\d{1,2}(:\d{2})?\s*(a\.?m\.?|p\.?m\.?)\b",
        ),
        HandoffTrigger::new(
            "explicit_booking",
            r"(?i)\b(let'?s (book|schedule|do) (it|that|a time)|book it|sign me up|i'?m ready to (buy|move|sign))\b",
        ),
        HandoffTrigger::new(
            "human_requested",
            r"(?i)\b((talk|speak) (to|with) (a |an )?(person|human|agent|someone|realtor)|real person|call me\b)",
        ),
    ]
}

/// The outcome of a handoff evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffDecision {
    /// Which rule produced the handoff: a trigger name, or
    /// `"score_threshold"` for the cumulative path.
    pub reason: String,
    /// Score delta required to lift the stored score to the threshold.
    /// Zero on the threshold path and whenever the score already clears it.
    pub forced_boost: i64,
}

/// Evaluates handoff conditions against a message and the running score.
pub struct HandoffEngine {
    triggers: Vec<HandoffTrigger>,
    threshold: i64,
}

impl HandoffEngine {
    /// Build an engine with the default trigger table.
    pub fn new(threshold: i64) -> Self {
        Self::with_triggers(threshold, default_triggers())
    }

    /// Build an engine with a custom trigger table.
    pub fn with_triggers(threshold: i64, triggers: Vec<HandoffTrigger>) -> Self {
        Self {
            triggers,
            threshold,
        }
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// Evaluate a message against both handoff paths.
    ///
    /// `score_after_message` is the conversation's cumulative score with this
    /// message's deltas already applied. Returns `None` when neither path
    /// fires; the sequence continues.
    pub fn evaluate(&self, text: &str, score_after_message: i64) -> Option<HandoffDecision> {
        self.evaluate_at(text, score_after_message, self.threshold)
    }

    /// Evaluate against a caller-supplied threshold.
    ///
    /// The trigger table compiles once; the threshold comes from the
    /// per-organization settings snapshot captured for the event.
    pub fn evaluate_at(
        &self,
        text: &str,
        score_after_message: i64,
        threshold: i64,
    ) -> Option<HandoffDecision> {
        if let Some(trigger) = self.triggers.iter().find(|t| t.matches(text)) {
            let forced_boost = (threshold - score_after_message).max(0);
            debug!(
                trigger = trigger.name,
                forced_boost, "handoff pattern matched"
            );
            return Some(HandoffDecision {
                reason: format!("pattern:{}", trigger.name),
                forced_boost,
            });
        }

        if score_after_message >= threshold {
            return Some(HandoffDecision {
                reason: "score_threshold".to_string(),
                forced_boost: 0,
            });
        }

        None
    }
}
