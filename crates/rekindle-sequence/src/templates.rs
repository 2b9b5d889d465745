// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static sequence template definitions.
//!
//! Templates are fixed, named step lists -- not user-composable graphs. Each
//! step carries a delay from enrollment, a channel, a message type for the
//! rendering collaborator, and a skip flag for optionally-enabled channels.

use std::collections::HashMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use rekindle_core::types::{Channel, ConversationState};

/// The built-in campaign template names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateName {
    NewLead,
    Revival,
    Nurture,
}

impl TemplateName {
    /// The state a conversation enters when this template's last step
    /// completes with no handoff.
    ///
    /// A fresh lead that never bit goes dormant and may return; a revival or
    /// nurture lead that exhausted its script is closed.
    pub fn exhaustion_state(self) -> ConversationState {
        match self {
            TemplateName::NewLead => ConversationState::Dormant,
            TemplateName::Revival | TemplateName::Nurture => ConversationState::Closed,
        }
    }
}

/// One step of a sequence template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceStep {
    /// Delay from enrollment time to this step's `fire_at`.
    pub delay: Duration,
    pub channel: Channel,
    /// Message type handed to the rendering collaborator.
    pub message_type: &'static str,
    /// When set, the step is materialized as `skipped` (not `pending`) if
    /// the organization has the step's channel disabled. The skip stays in
    /// the audit trail; it never silently vanishes.
    pub skip_if_disabled: bool,
}

impl SequenceStep {
    const fn new(
        delay: Duration,
        channel: Channel,
        message_type: &'static str,
        skip_if_disabled: bool,
    ) -> Self {
        Self {
            delay,
            channel,
            message_type,
            skip_if_disabled,
        }
    }
}

/// A named, ordered, immutable sequence of follow-up steps.
#[derive(Debug, Clone)]
pub struct SequenceTemplate {
    pub name: TemplateName,
    pub steps: Vec<SequenceStep>,
}

/// Registry of the built-in templates, selected once per lead at enrollment.
pub struct TemplateRegistry {
    templates: HashMap<TemplateName, SequenceTemplate>,
}

impl TemplateRegistry {
    /// Build the registry with the three built-in campaigns.
    pub fn builtin() -> Self {
        let mut templates = HashMap::new();
        for template in [new_lead_template(), revival_template(), nurture_template()] {
            templates.insert(template.name, template);
        }
        Self { templates }
    }

    pub fn get(&self, name: TemplateName) -> Option<&SequenceTemplate> {
        self.templates.get(&name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// The 11-step new-lead cadence: fast SMS/email touches up front, voice and
/// voicemail drops interleaved (skip-gated), a break-up email at the end.
fn new_lead_template() -> SequenceTemplate {
    SequenceTemplate {
        name: TemplateName::NewLead,
        steps: vec![
            SequenceStep::new(Duration::zero(), Channel::Sms, "intro", false),
            SequenceStep::new(Duration::days(1), Channel::Email, "intro_detail", false),
            SequenceStep::new(Duration::days(2), Channel::Sms, "nudge", false),
            SequenceStep::new(Duration::days(3), Channel::Voice, "intro_call", true),
            SequenceStep::new(Duration::days(5), Channel::Sms, "value_prop", false),
            SequenceStep::new(Duration::days(7), Channel::Email, "listing_update", false),
            SequenceStep::new(Duration::days(10), Channel::Rvm, "voicemail_drop", true),
            SequenceStep::new(Duration::days(14), Channel::Sms, "check_in", false),
            SequenceStep::new(Duration::days(18), Channel::Voice, "follow_up_call", true),
            SequenceStep::new(Duration::days(21), Channel::Email, "final_value", false),
            SequenceStep::new(Duration::days(28), Channel::Rvm, "breakup_drop", true),
        ],
    }
}

/// Re-engagement cadence for leads dormant past the revival threshold.
fn revival_template() -> SequenceTemplate {
    SequenceTemplate {
        name: TemplateName::Revival,
        steps: vec![
            SequenceStep::new(Duration::zero(), Channel::Sms, "revival_intro", false),
            SequenceStep::new(Duration::days(3), Channel::Email, "market_update", false),
            SequenceStep::new(Duration::days(7), Channel::Sms, "revival_nudge", false),
            SequenceStep::new(Duration::days(14), Channel::Email, "revival_value", false),
            SequenceStep::new(Duration::days(21), Channel::Sms, "breakup", false),
        ],
    }
}

/// Low-cadence nurture for recently-contacted but quiet leads.
fn nurture_template() -> SequenceTemplate {
    SequenceTemplate {
        name: TemplateName::Nurture,
        steps: vec![
            SequenceStep::new(Duration::zero(), Channel::Email, "nurture_intro", false),
            SequenceStep::new(Duration::days(7), Channel::Sms, "nurture_check_in", false),
            SequenceStep::new(Duration::days(14), Channel::Email, "nurture_content", false),
            SequenceStep::new(Duration::days(30), Channel::Sms, "breakup", false),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn registry_holds_three_templates() {
        let registry = TemplateRegistry::builtin();
        assert_eq!(registry.len(), 3);
        assert!(registry.get(TemplateName::NewLead).is_some());
        assert!(registry.get(TemplateName::Revival).is_some());
        assert!(registry.get(TemplateName::Nurture).is_some());
    }

    #[test]
    fn new_lead_has_eleven_steps_four_gated() {
        let registry = TemplateRegistry::builtin();
        let template = registry.get(TemplateName::NewLead).unwrap();
        assert_eq!(template.steps.len(), 11);
        let gated = template.steps.iter().filter(|s| s.skip_if_disabled).count();
        assert_eq!(gated, 4);
        // Every gated step is a call or voicemail drop.
        assert!(
            template
                .steps
                .iter()
                .filter(|s| s.skip_if_disabled)
                .all(|s| matches!(s.channel, Channel::Voice | Channel::Rvm))
        );
    }

    #[test]
    fn step_delays_are_monotonic() {
        let registry = TemplateRegistry::builtin();
        for name in [TemplateName::NewLead, TemplateName::Revival, TemplateName::Nurture] {
            let template = registry.get(name).unwrap();
            for pair in template.steps.windows(2) {
                assert!(
                    pair[0].delay < pair[1].delay,
                    "{name}: delays must strictly increase"
                );
            }
        }
    }

    #[test]
    fn exhaustion_policy_matches_campaign_intent() {
        assert_eq!(
            TemplateName::NewLead.exhaustion_state(),
            ConversationState::Dormant
        );
        assert_eq!(
            TemplateName::Revival.exhaustion_state(),
            ConversationState::Closed
        );
        assert_eq!(
            TemplateName::Nurture.exhaustion_state(),
            ConversationState::Closed
        );
    }

    #[test]
    fn template_names_round_trip_through_strings() {
        for name in [TemplateName::NewLead, TemplateName::Revival, TemplateName::Nurture] {
            let parsed = TemplateName::from_str(&name.to_string()).unwrap();
            assert_eq!(name, parsed);
        }
        assert_eq!(TemplateName::NewLead.to_string(), "NEW_LEAD");
    }
}
