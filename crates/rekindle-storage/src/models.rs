// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types and timestamp helpers for storage entities.
//!
//! Timestamps are stored as fixed-width UTC text (`%Y-%m-%dT%H:%M:%S%.3fZ`)
//! so lexicographic comparison in SQL matches chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use rekindle_core::RekindleError;

/// Format a timestamp for storage. Fixed width, millisecond precision, UTC.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp back into `DateTime<Utc>`.
pub fn parse_ts(value: &str) -> Result<DateTime<Utc>, RekindleError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RekindleError::Storage {
            source: Box::new(e),
        })
}

/// A lead row. Identity is immutable; only opt flags mutate, and only via
/// lifecycle events from the CRM collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadRow {
    pub id: String,
    pub org_id: String,
    pub timezone: String,
    pub sms_opt_in: bool,
    pub email_opt_in: bool,
    pub voice_opt_in: bool,
    pub opted_out: bool,
    pub created_at: String,
}

/// A conversation row: the stateful automation record for one lead's
/// current engagement cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRow {
    pub id: i64,
    pub lead_id: String,
    pub org_id: String,
    pub state: String,
    /// Incremented each time a dormant lead re-enters the pipeline; history
    /// and score survive across cycles.
    pub generation: i64,
    pub score: i64,
    pub message_count: i64,
    pub last_message_at: Option<String>,
    pub handoff_reason: Option<String>,
    pub ai_enabled: bool,
    pub superseded: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A scheduled follow-up row: one per (lead, sequence step).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpRow {
    pub id: i64,
    pub lead_id: String,
    pub conversation_id: i64,
    pub template: String,
    pub step_index: i64,
    pub fire_at: String,
    pub channel: String,
    pub message_type: String,
    pub status: String,
    pub attempts: i64,
    pub defer_count: i64,
    pub failure_reason: Option<String>,
    pub variant: Option<String>,
    pub sent_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A due follow-up joined with the lead and conversation fields the
/// dispatcher needs to evaluate it.
#[derive(Debug, Clone)]
pub struct DueStep {
    pub followup: FollowUpRow,
    pub org_id: String,
    pub timezone: String,
    pub lead_opted_out: bool,
    pub conversation_state: String,
    pub ai_enabled: bool,
}

/// An append-only score event row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreEventRow {
    pub id: i64,
    pub conversation_id: i64,
    pub event_id: String,
    pub delta: i64,
    pub category: String,
    pub reason: String,
    pub created_at: String,
}

/// An A/B variant assignment row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantRow {
    pub id: i64,
    pub lead_id: String,
    pub template: String,
    pub variant: String,
    pub outcome: Option<String>,
    pub assigned_at: String,
    pub resolved_at: Option<String>,
}

/// A review-queue row for failed or skipped steps needing human eyes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRow {
    pub id: i64,
    pub lead_id: String,
    pub followup_id: Option<i64>,
    pub reason: String,
    pub resolved: bool,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_round_trip() {
        let ts = Utc.with_ymd_and_hms(2025, 6, 10, 14, 30, 5).unwrap();
        let text = format_ts(ts);
        assert_eq!(parse_ts(&text).unwrap(), ts);
    }

    #[test]
    fn formatted_timestamps_sort_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2025, 6, 10, 21, 0, 0).unwrap();
        assert!(format_ts(earlier) < format_ts(later));
        // Fixed width even across sub-second precision.
        assert_eq!(format_ts(earlier).len(), format_ts(later).len());
    }
}
