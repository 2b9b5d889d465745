// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Rekindle workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a lead (prospective customer).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub String);

/// Unique identifier for an organization (tenant scope).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrgId(pub String);

/// Unique identifier for an inbound event, as assigned by the event source.
///
/// Duplicate delivery of the same event id must be a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

/// Database identifier for a conversation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub i64);

/// Database identifier for a scheduled follow-up row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FollowUpId(pub i64);

/// Identifier returned by a channel provider for a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// The closed set of outbound channels.
///
/// The channel set is small and stable; steps select a variant rather than
/// registering open-ended plugins.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Sms,
    Email,
    Voice,
    /// Ringless voicemail drop.
    Rvm,
}

/// Conversation lifecycle states.
///
/// `HandedOff` and `OptedOut` are entered only through the handoff decision
/// engine and an explicit opt-out signal respectively.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationState {
    New,
    Engaged,
    Qualified,
    Scheduling,
    HandedOff,
    OptedOut,
    Dormant,
    Returning,
    Closed,
}

impl ConversationState {
    /// States from which no further automated activity may occur.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ConversationState::HandedOff | ConversationState::OptedOut | ConversationState::Closed
        )
    }

    /// Entering this state cancels all pending and deferred follow-ups.
    pub fn cancels_followups(self) -> bool {
        self.is_terminal()
    }
}

/// Status of a scheduled follow-up step.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FollowUpStatus {
    Pending,
    Deferred,
    Sent,
    Skipped,
    Cancelled,
}

/// Scoring categories for inbound message signals.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ScoreCategory {
    /// Scheduling or viewing intent keywords.
    Engagement,
    /// Explicit time-of-day or day-of-week mention.
    TimeCommitment,
    /// Generic acknowledgment ("ok", "sounds good").
    Acknowledgment,
    /// Synthetic boost applied when a handoff pattern fires below threshold.
    Adjustment,
}

/// An inbound message event delivered by the external event source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub event_id: EventId,
    pub lead_id: LeadId,
    pub channel: Channel,
    pub text: String,
    pub received_at: DateTime<Utc>,
}

/// Lead lifecycle signals delivered by the external event source.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LifecycleKind {
    /// Automation (re-)enabled for the lead.
    Enabled,
    /// Lead opted out; terminal for the conversation.
    OptedOut,
    /// Lead reassigned to a different agent; automation pauses for review.
    Reassigned,
}

/// A lead lifecycle event with its idempotency key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub event_id: EventId,
    pub lead_id: LeadId,
    pub kind: LifecycleKind,
    pub occurred_at: DateTime<Utc>,
}

/// An outbound message handed to a channel-send collaborator.
///
/// The core does not generate message bodies; `rendered_text` arrives from
/// the templated-response collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub lead_id: LeadId,
    pub channel: Channel,
    pub message_type: String,
    pub rendered_text: String,
}

/// A handoff notification delivered to the task/notification sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffNotification {
    pub lead_id: LeadId,
    pub conversation_id: ConversationId,
    /// Which rule produced the handoff (threshold or trigger name).
    pub reason: String,
}

/// A review-queue notice for a failed or skipped step needing human eyes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewNotice {
    pub lead_id: LeadId,
    pub followup_id: Option<FollowUpId>,
    pub reason: String,
}

/// Per-organization settings snapshot captured once per evaluation cycle.
///
/// Components never read settings ambiently; each tick or event captures one
/// snapshot so a mid-evaluation settings change cannot produce an
/// inconsistent decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgSettings {
    /// Channel toggles referenced by `skip_if_disabled` on sequence steps.
    pub sms_enabled: bool,
    pub email_enabled: bool,
    pub voice_enabled: bool,
    pub rvm_enabled: bool,
    /// Cumulative score at which a lead is handed to a human.
    pub handoff_threshold: i64,
    /// Maximum sends to one lead in any trailing 24-hour period.
    pub max_sends_per_day: u32,
    /// Local-time contact window, inclusive open / exclusive close, "HH:MM".
    pub window_open: String,
    pub window_close: String,
}

impl Default for OrgSettings {
    fn default() -> Self {
        Self {
            sms_enabled: true,
            email_enabled: true,
            voice_enabled: true,
            rvm_enabled: true,
            handoff_threshold: 60,
            max_sends_per_day: 3,
            window_open: "08:00".to_string(),
            window_close: "20:00".to_string(),
        }
    }
}

impl OrgSettings {
    /// Whether the named channel is enabled for this organization.
    ///
    /// Voicemail drops sit under the voice umbrella: disabling voice
    /// disables RVM too, while `rvm_enabled` can switch off drops alone.
    pub fn channel_enabled(&self, channel: Channel) -> bool {
        match channel {
            Channel::Sms => self.sms_enabled,
            Channel::Email => self.email_enabled,
            Channel::Voice => self.voice_enabled,
            Channel::Rvm => self.voice_enabled && self.rvm_enabled,
        }
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of collaborator adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Storage,
    Notification,
    Settings,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn conversation_state_round_trips_through_strings() {
        let states = [
            ConversationState::New,
            ConversationState::Engaged,
            ConversationState::Qualified,
            ConversationState::Scheduling,
            ConversationState::HandedOff,
            ConversationState::OptedOut,
            ConversationState::Dormant,
            ConversationState::Returning,
            ConversationState::Closed,
        ];
        for state in states {
            let s = state.to_string();
            let parsed = ConversationState::from_str(&s).expect("should parse back");
            assert_eq!(state, parsed);
        }
        assert_eq!(ConversationState::HandedOff.to_string(), "HANDED_OFF");
    }

    #[test]
    fn terminal_states_cancel_followups() {
        assert!(ConversationState::HandedOff.cancels_followups());
        assert!(ConversationState::OptedOut.cancels_followups());
        assert!(ConversationState::Closed.cancels_followups());
        assert!(!ConversationState::Dormant.cancels_followups());
        assert!(!ConversationState::Engaged.cancels_followups());
    }

    #[test]
    fn channel_serialization_is_snake_case() {
        assert_eq!(Channel::Rvm.to_string(), "rvm");
        assert_eq!(Channel::from_str("sms").unwrap(), Channel::Sms);
        let json = serde_json::to_string(&Channel::Email).unwrap();
        assert_eq!(json, "\"email\"");
    }

    #[test]
    fn default_settings_enable_all_channels() {
        let settings = OrgSettings::default();
        for channel in [Channel::Sms, Channel::Email, Channel::Voice, Channel::Rvm] {
            assert!(settings.channel_enabled(channel));
        }
        assert_eq!(settings.handoff_threshold, 60);
        assert_eq!(settings.max_sends_per_day, 3);
    }

    #[test]
    fn voice_toggle_covers_voicemail_drops() {
        let settings = OrgSettings {
            voice_enabled: false,
            ..OrgSettings::default()
        };
        assert!(!settings.channel_enabled(Channel::Voice));
        assert!(!settings.channel_enabled(Channel::Rvm));

        // Drops can also go dark on their own without touching live calls.
        let settings = OrgSettings {
            rvm_enabled: false,
            ..OrgSettings::default()
        };
        assert!(settings.channel_enabled(Channel::Voice));
        assert!(!settings.channel_enabled(Channel::Rvm));
    }

    #[test]
    fn followup_status_strings_match_storage_values() {
        assert_eq!(FollowUpStatus::Pending.to_string(), "pending");
        assert_eq!(FollowUpStatus::Deferred.to_string(), "deferred");
        assert_eq!(FollowUpStatus::Cancelled.to_string(), "cancelled");
    }
}
