// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compliance window evaluator for the Rekindle engine.
//!
//! A pure function over a settings snapshot: given a lead's timezone, a
//! candidate send instant, and the lead's recent send history, decide whether
//! the send is allowed now or deferred, and if deferred, until when. No
//! clocks, no I/O, no side effects -- the scheduler owns "now".
//!
//! Two gates, both of which must pass:
//! 1. The candidate instant falls inside the configured local-time window
//!    (default 08:00-20:00 in the lead's timezone, DST-correct).
//! 2. The lead has received fewer than the configured maximum sends in the
//!    trailing 24 hours.

use chrono::{DateTime, Days, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use rekindle_core::types::OrgSettings;
use rekindle_core::RekindleError;

/// The window and rate-cap parameters for one evaluation.
///
/// Built from an [`OrgSettings`] snapshot so a mid-cycle settings change
/// cannot split one decision across two configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompliancePolicy {
    /// Local window open, inclusive.
    pub window_open: NaiveTime,
    /// Local window close, exclusive.
    pub window_close: NaiveTime,
    /// Maximum sends in any trailing 24-hour period.
    pub max_sends_per_day: u32,
}

impl CompliancePolicy {
    /// Build a policy from an organization settings snapshot.
    ///
    /// Fails if the snapshot's window bounds do not parse as "HH:MM"; the
    /// caller treats that as settings-unavailable and takes the no-send
    /// posture.
    pub fn from_settings(settings: &OrgSettings) -> Result<Self, RekindleError> {
        let window_open = parse_bound(&settings.window_open)?;
        let window_close = parse_bound(&settings.window_close)?;
        Ok(Self {
            window_open,
            window_close,
            max_sends_per_day: settings.max_sends_per_day,
        })
    }
}

fn parse_bound(value: &str) -> Result<NaiveTime, RekindleError> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| {
        RekindleError::SettingsUnavailable(format!("unparseable window bound `{value}`"))
    })
}

/// The outcome of a compliance evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplianceDecision {
    /// The send may fire at the candidate instant.
    Allowed,
    /// The send must wait. `retry_at` is never earlier than the candidate.
    Deferred { retry_at: DateTime<Utc> },
}

/// Evaluate whether a send at `candidate` complies with the policy.
///
/// `recent_sends` is the lead's send history; only sends in the 24 hours up
/// to and including `candidate` are counted. Order does not matter.
///
/// Deferral targets:
/// - outside the window: the next window-open instant in the lead's local
///   timezone (wall-clock stable across DST transitions);
/// - rate cap hit: 24 hours after the oldest counted send, at which point
///   that send ages out of the trailing window.
pub fn evaluate(
    policy: &CompliancePolicy,
    timezone: Tz,
    candidate: DateTime<Utc>,
    recent_sends: &[DateTime<Utc>],
) -> ComplianceDecision {
    let local = candidate.with_timezone(&timezone);
    let time = local.time();

    if time < policy.window_open || time >= policy.window_close {
        let open_date = if time < policy.window_open {
            local.date_naive()
        } else {
            // At or past close: the window reopens tomorrow.
            local
                .date_naive()
                .checked_add_days(Days::new(1))
                .unwrap_or(local.date_naive())
        };
        let retry_at = resolve_local(timezone, open_date, policy.window_open);
        return ComplianceDecision::Deferred { retry_at };
    }

    let floor = candidate - Duration::hours(24);
    let counted: Vec<DateTime<Utc>> = recent_sends
        .iter()
        .copied()
        .filter(|t| *t > floor && *t <= candidate)
        .collect();

    if counted.len() >= policy.max_sends_per_day as usize {
        // Retry when the oldest counted send leaves the trailing window.
        let oldest = counted.iter().min().copied().unwrap_or(candidate);
        return ComplianceDecision::Deferred {
            retry_at: oldest + Duration::hours(24),
        };
    }

    ComplianceDecision::Allowed
}

/// Resolve a local wall-clock instant to UTC, DST-aware.
///
/// Ambiguous times (fall-back hour repeats) take the earlier offset so the
/// retry never lands later than the wall clock promises. Nonexistent times
/// (spring-forward gap) advance to the first valid instant after the gap.
fn resolve_local(timezone: Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let naive = date.and_time(time);
    match timezone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earlier, _later) => earlier.with_timezone(&Utc),
        LocalResult::None => {
            // Walk forward in 15-minute increments until the wall clock exists
            // again. DST gaps are at most an hour in every IANA zone we serve.
            let mut probe = naive;
            for _ in 0..8 {
                probe += Duration::minutes(15);
                if let LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) =
                    timezone.from_local_datetime(&probe)
                {
                    return dt.with_timezone(&Utc);
                }
            }
            // Out of probes: fall back to interpreting the instant as UTC.
            Utc.from_utc_datetime(&naive)
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::Timelike;
    use proptest::prelude::*;

    proptest! {
        /// No candidate outside the window is ever allowed, on either side of
        /// a DST transition.
        #[test]
        fn never_allowed_outside_window(day in 1u32..28, hour in 0u32..24, minute in 0u32..60) {
            let tz: Tz = "America/New_York".parse().unwrap();
            let policy = CompliancePolicy {
                window_open: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
                window_close: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
                max_sends_per_day: 3,
            };
            // March straddles the US spring-forward transition.
            if let chrono::LocalResult::Single(local) =
                tz.with_ymd_and_hms(2025, 3, day, hour, minute, 0)
            {
                let decision = evaluate(&policy, tz, local.to_utc(), &[]);
                let inside = local.time() >= policy.window_open && local.time() < policy.window_close;
                match decision {
                    ComplianceDecision::Allowed => prop_assert!(inside),
                    ComplianceDecision::Deferred { retry_at } => {
                        prop_assert!(retry_at > local.to_utc() || inside);
                        // A window deferral always lands on the opening wall clock.
                        if !inside {
                            let rl = retry_at.with_timezone(&tz);
                            prop_assert_eq!(rl.hour(), 8);
                            prop_assert_eq!(rl.minute(), 0);
                        }
                    }
                }
            }
        }
    }
}
