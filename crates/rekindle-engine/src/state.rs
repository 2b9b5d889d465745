// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation state machine.
//!
//! The transition table is data, not control flow: every (state, input) pair
//! is either listed here or rejected with [`RekindleError::InvalidTransition`].
//! Rejections are logged by callers, never silently swallowed. `HandedOff`
//! is reachable only through [`TransitionInput::Handoff`] and `OptedOut`
//! only through [`TransitionInput::OptOut`].

use tracing::warn;

use rekindle_core::types::ConversationState;
use rekindle_core::RekindleError;

/// Inputs that can drive a conversation transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionInput {
    /// An inbound reply from the lead.
    Reply,
    /// The running score crossed the qualification mark.
    Qualify,
    /// The lead committed to a concrete time.
    ScheduleIntent,
    /// The handoff engine decided; carries no data, the decision does.
    Handoff,
    /// Explicit opt-out lifecycle signal.
    OptOut,
    /// The sequence ran out of steps with no reply. The target state is
    /// template-dependent (`DORMANT` for fresh leads, `CLOSED` otherwise).
    Exhausted(ConversationState),
    /// The dormancy sweep found the conversation silent past the window.
    Silence,
    /// A dormant lead came back; a new cycle re-enters at `RETURNING`.
    Returned,
}

/// Compute the successor state for `(from, input)`.
///
/// Pure and total over the listed pairs; everything else is an error.
pub fn transition(
    from: ConversationState,
    input: TransitionInput,
) -> Result<ConversationState, RekindleError> {
    use ConversationState::*;
    use TransitionInput::*;

    let to = match (from, input) {
        (New | Returning, Reply) => Engaged,
        // Replies inside progress states hold position; forward movement
        // comes from Qualify/ScheduleIntent, never from volume alone.
        (Engaged, Reply) => Engaged,
        (Qualified, Reply) => Qualified,
        (Scheduling, Reply) => Scheduling,

        (Engaged, Qualify) => Qualified,
        // Already past the mark; qualification never moves backward.
        (Qualified | Scheduling, Qualify) => from,
        (New | Returning, Qualify) => Qualified,

        (New | Engaged | Qualified | Returning, ScheduleIntent) => Scheduling,
        (Scheduling, ScheduleIntent) => Scheduling,

        (s, Handoff) if !s.is_terminal() => HandedOff,
        (s, OptOut) if !s.is_terminal() => OptedOut,

        (s, Exhausted(target)) if !s.is_terminal() && s != Dormant => match target {
            Dormant | Closed => target,
            other => {
                return Err(RekindleError::Internal(format!(
                    "exhaustion cannot target {other}"
                )));
            }
        },

        (s, Silence) if !s.is_terminal() && s != Dormant => Dormant,
        (Dormant, Returned) => Returning,

        (from, input) => {
            return Err(RekindleError::InvalidTransition {
                from: from.to_string(),
                input: format!("{input:?}"),
            });
        }
    };
    Ok(to)
}

/// Apply a transition, logging and propagating rejections.
pub fn apply(
    from: ConversationState,
    input: TransitionInput,
) -> Result<ConversationState, RekindleError> {
    match transition(from, input) {
        Ok(to) => Ok(to),
        Err(e) => {
            warn!(%from, ?input, "rejected conversation transition");
            Err(e)
        }
    }
}
