// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Heuristic lead scoring over inbound message text.
//!
//! Scores messages into weighted categories using zero-cost keyword and
//! pattern rules. No network, no model call, no latency. The running score
//! lives on the conversation; this module only produces per-message deltas.

use regex::Regex;

use rekindle_config::model::ScoringConfig;
use rekindle_core::types::ScoreCategory;

/// A single scoring signal extracted from one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreDelta {
    pub category: ScoreCategory,
    pub delta: i64,
    /// Human-readable reason naming the matched signal.
    pub reason: String,
}

/// Scheduling/viewing intent keywords (contains, case-insensitive).
///
/// The largest single delta: a lead asking to see the property or set a time
/// is the core engagement signal.
const ENGAGEMENT_KEYWORDS: &[&str] = &[
    "schedule",
    "appointment",
    "tour",
    "showing",
    "viewing",
    "visit",
    "see the place",
    "see the house",
    "see the property",
    "come by",
    "stop by",
    "when can",
    "are you available",
    "works for me",
    "works",
    "interested",
    "book",
];

/// Generic acknowledgment keywords (exact match on the trimmed message,
/// case-insensitive). Small delta: the lead is alive, nothing more.
const ACKNOWLEDGMENT_EXACT: &[&str] = &[
    "ok",
    "okay",
    "k",
    "sure",
    "thanks",
    "thank you",
    "got it",
    "sounds good",
    "yes",
    "yep",
    "yeah",
    "alright",
    "will do",
];

/// Heuristic lead scorer with configurable category weights.
///
/// Multiple categories stack additively per message, capped at
/// `per_message_cap` so a single message cannot cross the handoff threshold
/// on score alone. The handoff pattern table is the deliberately redundant
/// second net for that case.
pub struct LeadScorer {
    engagement_weight: i64,
    time_commitment_weight: i64,
    acknowledgment_weight: i64,
    per_message_cap: i64,
    time_pattern: Regex,
    day_pattern: Regex,
}

impl LeadScorer {
    /// Build a scorer from the scoring configuration section.
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            engagement_weight: config.engagement_weight,
            time_commitment_weight: config.time_commitment_weight,
            acknowledgment_weight: config.acknowledgment_weight,
            per_message_cap: config.per_message_cap,
            // "6pm", "6:30 pm", "at 10am", "around noon"
            time_pattern: Regex::new(r"(?i)\b\d{1,2}(:\d{2})?\s*(a\.?m\.?|p\.?m\.?)\b|\bnoon\b|\bmidday\b")
                .expect("static time pattern must compile"),
            day_pattern: Regex::new(
                r"(?i)\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday|today|tomorrow|tonight|this weekend|next week)\b",
            )
            .expect("static day pattern must compile"),
        }
    }

    /// Score one inbound message, returning the per-category deltas.
    ///
    /// Deltas are emitted in weight order (engagement, time commitment,
    /// acknowledgment) and clamped so their sum never exceeds the
    /// per-message cap. A delta clamped to zero is dropped entirely rather
    /// than recorded as noise.
    pub fn score(&self, text: &str) -> Vec<ScoreDelta> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        let lower = trimmed.to_lowercase();

        let mut raw = Vec::new();

        if let Some(keyword) = ENGAGEMENT_KEYWORDS.iter().find(|k| lower.contains(*k)) {
            raw.push((
                ScoreCategory::Engagement,
                self.engagement_weight,
                format!("engagement keyword `{keyword}`"),
            ));
        }

        // A concrete time-of-day or day-of-week mention is the strongest
        // buying signal short of explicit agreement.
        let has_time = self.time_pattern.is_match(&lower);
        let has_day = self.day_pattern.is_match(&lower);
        if has_time || has_day {
            let which = match (has_day, has_time) {
                (true, true) => "day and time mention",
                (true, false) => "day-of-week mention",
                _ => "time-of-day mention",
            };
            raw.push((
                ScoreCategory::TimeCommitment,
                self.time_commitment_weight,
                which.to_string(),
            ));
        }

        if ACKNOWLEDGMENT_EXACT.iter().any(|k| lower == *k) {
            raw.push((
                ScoreCategory::Acknowledgment,
                self.acknowledgment_weight,
                "generic acknowledgment".to_string(),
            ));
        }

        // Additive stacking, capped per message.
        let mut remaining = self.per_message_cap;
        let mut deltas = Vec::with_capacity(raw.len());
        for (category, weight, reason) in raw {
            let delta = weight.min(remaining);
            if delta <= 0 {
                continue;
            }
            remaining -= delta;
            deltas.push(ScoreDelta {
                category,
                delta,
                reason,
            });
        }

        deltas
    }
}
