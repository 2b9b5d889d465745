// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead classification at enrollment time.
//!
//! Classification runs once per enrollment and picks the campaign template:
//! never-contacted leads get the full new-lead cadence, long-dormant leads
//! get revival, everyone else gets the low-cadence nurture drip.

use chrono::{DateTime, Duration, Utc};

use rekindle_config::model::SequenceConfig;

use crate::templates::TemplateName;

/// How a lead looked at enrollment time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadClassification {
    /// Never contacted before.
    New,
    /// Previously contacted, silent past the revival threshold.
    Cold,
    /// Previously contacted, still within the nurture window.
    Warm,
}

impl LeadClassification {
    /// The template this classification enrolls into.
    pub fn template(self) -> TemplateName {
        match self {
            LeadClassification::New => TemplateName::NewLead,
            LeadClassification::Cold => TemplateName::Revival,
            LeadClassification::Warm => TemplateName::Nurture,
        }
    }
}

/// Classify a lead from its contact history.
///
/// `last_contact` is the most recent inbound or outbound touch, `None` if the
/// lead has never been contacted.
pub fn classify(
    last_contact: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    config: &SequenceConfig,
) -> LeadClassification {
    match last_contact {
        None => LeadClassification::New,
        Some(last) => {
            let gap = now - last;
            if gap >= Duration::days(i64::from(config.revival_after_days)) {
                LeadClassification::Cold
            } else {
                LeadClassification::Warm
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn never_contacted_is_new() {
        let classification = classify(None, now(), &SequenceConfig::default());
        assert_eq!(classification, LeadClassification::New);
        assert_eq!(classification.template(), TemplateName::NewLead);
    }

    #[test]
    fn long_dormant_is_cold() {
        let last = now() - Duration::days(120);
        let classification = classify(Some(last), now(), &SequenceConfig::default());
        assert_eq!(classification, LeadClassification::Cold);
        assert_eq!(classification.template(), TemplateName::Revival);
    }

    #[test]
    fn recently_contacted_is_warm() {
        let last = now() - Duration::days(10);
        let classification = classify(Some(last), now(), &SequenceConfig::default());
        assert_eq!(classification, LeadClassification::Warm);
        assert_eq!(classification.template(), TemplateName::Nurture);
    }

    #[test]
    fn revival_boundary_is_inclusive() {
        let config = SequenceConfig::default();
        let last = now() - Duration::days(i64::from(config.revival_after_days));
        assert_eq!(
            classify(Some(last), now(), &config),
            LeadClassification::Cold
        );
    }
}
