// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Follow-up sequencer: template materialization and re-evaluation rules.
//!
//! The sequencer is pure planning logic. It turns a template into dated,
//! channel-tagged steps at enrollment, and encodes the rules the engine
//! applies on replies and deferrals. Persistence and locking live in the
//! engine crate.

use chrono::{DateTime, Utc};
use tracing::debug;

use rekindle_core::types::{Channel, FollowUpStatus, OrgSettings};

use crate::templates::SequenceTemplate;

/// A materialized step, ready to persist as a `scheduled_followups` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    /// Zero-based index into the template's step list.
    pub step_index: usize,
    pub fire_at: DateTime<Utc>,
    pub channel: Channel,
    pub message_type: String,
    /// `Pending`, or `Skipped` when the step's channel is disabled and the
    /// step carries the skip flag. Skips stay in the audit trail.
    pub status: FollowUpStatus,
}

/// Materialize a template into concrete steps for one lead.
///
/// `fire_at = enrollment_time + step.delay`. A skip-gated step whose channel
/// the organization has disabled materializes as `Skipped` immediately; it
/// must never silently vanish from the audit trail.
pub fn materialize(
    template: &SequenceTemplate,
    enrollment_time: DateTime<Utc>,
    settings: &OrgSettings,
) -> Vec<PlannedStep> {
    template
        .steps
        .iter()
        .enumerate()
        .map(|(step_index, step)| {
            let status = if step.skip_if_disabled && !settings.channel_enabled(step.channel) {
                debug!(
                    step_index,
                    channel = %step.channel,
                    "step skipped at enrollment: channel disabled"
                );
                FollowUpStatus::Skipped
            } else {
                FollowUpStatus::Pending
            };
            PlannedStep {
                step_index,
                fire_at: enrollment_time + step.delay,
                channel: step.channel,
                message_type: step.message_type.to_string(),
                status,
            }
        })
        .collect()
}

/// Whether a deferral has pushed a step past its successor.
///
/// A step repeatedly deferred beyond the next step's `fire_at` is skipped
/// rather than sent stale; the sequence's later steps carry the thread.
pub fn defer_is_stale(retry_at: DateTime<Utc>, next_step_fire_at: Option<DateTime<Utc>>) -> bool {
    match next_step_fire_at {
        Some(next) => retry_at >= next,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    use crate::templates::{TemplateName, TemplateRegistry};

    fn enrollment() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 15, 0, 0).unwrap()
    }

    #[test]
    fn fire_at_is_enrollment_plus_delay() {
        let registry = TemplateRegistry::builtin();
        let template = registry.get(TemplateName::Revival).unwrap();
        let planned = materialize(template, enrollment(), &OrgSettings::default());

        assert_eq!(planned.len(), 5);
        assert_eq!(planned[0].fire_at, enrollment());
        assert_eq!(planned[1].fire_at, enrollment() + Duration::days(3));
        assert_eq!(planned[4].fire_at, enrollment() + Duration::days(21));
        assert!(planned.iter().all(|s| s.status == FollowUpStatus::Pending));
    }

    #[test]
    fn voice_disabled_yields_seven_pending_four_skipped() {
        // Voice-off covers both live calls and voicemail drops; one toggle
        // gates all four voice-family steps.
        let registry = TemplateRegistry::builtin();
        let template = registry.get(TemplateName::NewLead).unwrap();
        let settings = OrgSettings {
            voice_enabled: false,
            ..OrgSettings::default()
        };
        let planned = materialize(template, enrollment(), &settings);

        assert_eq!(planned.len(), 11);
        let pending = planned
            .iter()
            .filter(|s| s.status == FollowUpStatus::Pending)
            .count();
        let skipped = planned
            .iter()
            .filter(|s| s.status == FollowUpStatus::Skipped)
            .count();
        assert_eq!(pending, 7);
        assert_eq!(skipped, 4);
    }

    #[test]
    fn skipped_steps_keep_their_schedule_metadata() {
        let registry = TemplateRegistry::builtin();
        let template = registry.get(TemplateName::NewLead).unwrap();
        let settings = OrgSettings {
            voice_enabled: false,
            ..OrgSettings::default()
        };
        let planned = materialize(template, enrollment(), &settings);
        let first_skip = planned
            .iter()
            .find(|s| s.status == FollowUpStatus::Skipped)
            .unwrap();
        // The audit trail still shows when the step would have fired.
        assert_eq!(first_skip.fire_at, enrollment() + Duration::days(3));
        assert_eq!(first_skip.channel, Channel::Voice);
    }

    #[test]
    fn ungated_steps_ignore_channel_toggles() {
        // An SMS step has no skip flag; toggles do not touch it here. The
        // dispatcher still refuses to fire on a disabled channel at send time.
        let registry = TemplateRegistry::builtin();
        let template = registry.get(TemplateName::Nurture).unwrap();
        let settings = OrgSettings {
            sms_enabled: false,
            ..OrgSettings::default()
        };
        let planned = materialize(template, enrollment(), &settings);
        assert!(planned.iter().all(|s| s.status == FollowUpStatus::Pending));
    }

    #[test]
    fn stale_defer_detection() {
        let next = enrollment() + Duration::days(2);
        assert!(defer_is_stale(next, Some(next)));
        assert!(defer_is_stale(next + Duration::hours(1), Some(next)));
        assert!(!defer_is_stale(next - Duration::hours(1), Some(next)));
        // The last step of a template can defer indefinitely.
        assert!(!defer_is_stale(next + Duration::days(365), None));
    }
}
