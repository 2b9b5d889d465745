// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Rekindle engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

use rekindle_core::types::OrgSettings;

/// Top-level Rekindle configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RekindleConfig {
    /// Engine identity and logging settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Compliance window and rate cap settings.
    #[serde(default)]
    pub compliance: ComplianceConfig,

    /// Lead scoring weights.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Handoff decision settings.
    #[serde(default)]
    pub handoff: HandoffConfig,

    /// Scheduler/dispatcher cadence and retry settings.
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Sequence classification thresholds.
    #[serde(default)]
    pub sequence: SequenceConfig,

    /// Default per-organization channel toggles.
    #[serde(default)]
    pub channels: ChannelsConfig,
}

/// Engine identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Display name of the engine instance.
    #[serde(default = "default_engine_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: default_engine_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_engine_name() -> String {
    "rekindle".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    "rekindle.db".to_string()
}

/// Compliance window and rate cap configuration.
///
/// The window is evaluated in the lead's local timezone; these are
/// wall-clock bounds, stable across DST transitions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ComplianceConfig {
    /// Local window open, "HH:MM", inclusive.
    #[serde(default = "default_window_open")]
    pub window_open: String,

    /// Local window close, "HH:MM", exclusive.
    #[serde(default = "default_window_close")]
    pub window_close: String,

    /// Maximum sends to one lead in any trailing 24-hour period.
    #[serde(default = "default_max_sends_per_day")]
    pub max_sends_per_day: u32,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            window_open: default_window_open(),
            window_close: default_window_close(),
            max_sends_per_day: default_max_sends_per_day(),
        }
    }
}

fn default_window_open() -> String {
    "08:00".to_string()
}

fn default_window_close() -> String {
    "20:00".to_string()
}

fn default_max_sends_per_day() -> u32 {
    3
}

/// Lead scoring weights.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringConfig {
    /// Delta for scheduling/viewing intent keywords.
    #[serde(default = "default_engagement_weight")]
    pub engagement_weight: i64,

    /// Delta for explicit time-of-day or day-of-week mentions.
    #[serde(default = "default_time_commitment_weight")]
    pub time_commitment_weight: i64,

    /// Delta for generic acknowledgment.
    #[serde(default = "default_acknowledgment_weight")]
    pub acknowledgment_weight: i64,

    /// Cap on the summed deltas from a single message. Must stay below the
    /// handoff threshold so score alone cannot hand off on one message.
    #[serde(default = "default_per_message_cap")]
    pub per_message_cap: i64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            engagement_weight: default_engagement_weight(),
            time_commitment_weight: default_time_commitment_weight(),
            acknowledgment_weight: default_acknowledgment_weight(),
            per_message_cap: default_per_message_cap(),
        }
    }
}

fn default_engagement_weight() -> i64 {
    35
}

fn default_time_commitment_weight() -> i64 {
    25
}

fn default_acknowledgment_weight() -> i64 {
    5
}

fn default_per_message_cap() -> i64 {
    55
}

/// Handoff decision configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct HandoffConfig {
    /// Cumulative score at which a lead is handed to a human.
    #[serde(default = "default_score_threshold")]
    pub score_threshold: i64,
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            score_threshold: default_score_threshold(),
        }
    }
}

fn default_score_threshold() -> i64 {
    60
}

/// Scheduler/dispatcher cadence and retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Poll interval for hot leads (recent inbound activity), seconds.
    #[serde(default = "default_fast_poll_secs")]
    pub fast_poll_secs: u64,

    /// Poll interval for everyone else, seconds.
    #[serde(default = "default_slow_poll_secs")]
    pub slow_poll_secs: u64,

    /// A lead is "hot" if its last inbound message is within this many hours.
    #[serde(default = "default_hot_window_hours")]
    pub hot_window_hours: u32,

    /// Maximum concurrent dispatch workers per tick.
    #[serde(default = "default_worker_pool_size")]
    pub worker_pool_size: usize,

    /// Timeout on a single channel provider call, seconds.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Attempts before a failed send is skipped and queued for review.
    #[serde(default = "default_max_send_attempts")]
    pub max_send_attempts: u32,

    /// Base delay for exponential send-retry backoff, seconds.
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fast_poll_secs: default_fast_poll_secs(),
            slow_poll_secs: default_slow_poll_secs(),
            hot_window_hours: default_hot_window_hours(),
            worker_pool_size: default_worker_pool_size(),
            send_timeout_secs: default_send_timeout_secs(),
            max_send_attempts: default_max_send_attempts(),
            backoff_base_secs: default_backoff_base_secs(),
        }
    }
}

fn default_fast_poll_secs() -> u64 {
    300
}

fn default_slow_poll_secs() -> u64 {
    900
}

fn default_hot_window_hours() -> u32 {
    48
}

fn default_worker_pool_size() -> usize {
    8
}

fn default_send_timeout_secs() -> u64 {
    10
}

fn default_max_send_attempts() -> u32 {
    3
}

fn default_backoff_base_secs() -> u64 {
    120
}

/// Sequence classification thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SequenceConfig {
    /// Days of silence before an active conversation goes dormant.
    #[serde(default = "default_dormancy_days")]
    pub dormancy_days: u32,

    /// A previously-contacted lead silent longer than this enrolls in
    /// REVIVAL; shorter gaps enroll in NURTURE.
    #[serde(default = "default_revival_after_days")]
    pub revival_after_days: u32,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            dormancy_days: default_dormancy_days(),
            revival_after_days: default_revival_after_days(),
        }
    }
}

fn default_dormancy_days() -> u32 {
    30
}

fn default_revival_after_days() -> u32 {
    90
}

/// Default per-organization channel toggles.
///
/// The config-backed settings provider serves these to every organization;
/// a real deployment overrides per org through the settings collaborator.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelsConfig {
    #[serde(default = "default_true")]
    pub sms_enabled: bool,

    #[serde(default = "default_true")]
    pub email_enabled: bool,

    #[serde(default = "default_true")]
    pub voice_enabled: bool,

    /// Voicemail drops. Effective only while `voice_enabled` is on; turning
    /// voice off silences drops as well.
    #[serde(default = "default_true")]
    pub rvm_enabled: bool,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            sms_enabled: true,
            email_enabled: true,
            voice_enabled: true,
            rvm_enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl RekindleConfig {
    /// Build the organization settings snapshot served by the config-backed
    /// settings provider.
    pub fn org_settings(&self) -> OrgSettings {
        OrgSettings {
            sms_enabled: self.channels.sms_enabled,
            email_enabled: self.channels.email_enabled,
            voice_enabled: self.channels.voice_enabled,
            rvm_enabled: self.channels.rvm_enabled,
            handoff_threshold: self.handoff.score_threshold,
            max_sends_per_day: self.compliance.max_sends_per_day,
            window_open: self.compliance.window_open.clone(),
            window_close: self.compliance.window_close.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_consistent() {
        let config = RekindleConfig::default();
        assert_eq!(config.engine.name, "rekindle");
        assert_eq!(config.compliance.window_open, "08:00");
        assert_eq!(config.compliance.window_close, "20:00");
        assert!(config.scoring.per_message_cap < config.handoff.score_threshold);
        assert!(config.scheduler.fast_poll_secs <= config.scheduler.slow_poll_secs);
    }

    #[test]
    fn org_settings_reflect_channel_toggles() {
        let mut config = RekindleConfig::default();
        config.channels.voice_enabled = false;
        config.channels.rvm_enabled = false;
        let settings = config.org_settings();
        assert!(settings.sms_enabled);
        assert!(!settings.voice_enabled);
        assert!(!settings.rvm_enabled);
        assert_eq!(settings.handoff_threshold, 60);
    }
}
