// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound event pipeline.
//!
//! Replies and lifecycle signals arrive here from the external event source.
//! The whole of an event runs under the lead's lock: the idempotency ledger
//! is consulted first and written last, so an id lands in the ledger only
//! after every effect has landed. A transient failure mid-event leaves the
//! id unclaimed and redelivery completes the work; the effect writes are
//! individually replay-safe, so finishing a half-applied event changes
//! nothing that already happened. Score deltas are written as ledger rows
//! first and applied to the conversation only when the row is new.

use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, info, warn};

use rekindle_core::types::{
    ConversationId, ConversationState, HandoffNotification, InboundMessage, LeadId,
    LifecycleEvent, LifecycleKind, OrgId, ReviewNotice, ScoreCategory,
};
use rekindle_core::{NotificationSink, RekindleError, SettingsProvider};
use rekindle_scoring::{HandoffEngine, LeadScorer};
use rekindle_storage::models::format_ts;
use rekindle_storage::queries::{conversations, events, followups, leads, review, score_events};
use rekindle_storage::Database;

use crate::locks::LeadLocks;
use crate::state::{self, TransitionInput};
use crate::variants;

/// What processing an inbound event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// The event id was already processed; nothing changed.
    Duplicate,
    /// The event was recorded but took no automated action.
    Ignored { reason: &'static str },
    /// The event was scored and drove the conversation.
    Processed {
        state: ConversationState,
        score: i64,
        handed_off: bool,
    },
}

/// The reply/lifecycle processing pipeline.
pub struct EventProcessor {
    db: Database,
    locks: Arc<LeadLocks>,
    scorer: LeadScorer,
    handoff: HandoffEngine,
    settings: Arc<dyn SettingsProvider>,
    sink: Arc<dyn NotificationSink>,
}

impl EventProcessor {
    pub fn new(
        db: Database,
        locks: Arc<LeadLocks>,
        scorer: LeadScorer,
        handoff: HandoffEngine,
        settings: Arc<dyn SettingsProvider>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            db,
            locks,
            scorer,
            handoff,
            settings,
            sink,
        }
    }

    /// Process one inbound message from the lead.
    pub async fn handle_inbound(
        &self,
        msg: InboundMessage,
    ) -> Result<InboundOutcome, RekindleError> {
        let lead_id = msg.lead_id.0.clone();
        let _guard = self.locks.acquire(&lead_id).await;

        if events::is_processed(&self.db, &msg.event_id.0).await? {
            debug!(lead_id, event_id = %msg.event_id.0, "duplicate inbound event dropped");
            return Ok(InboundOutcome::Duplicate);
        }

        let outcome = self.apply_inbound(&lead_id, &msg).await?;
        // The ledger write comes last. A failure anywhere above leaves the
        // id unclaimed, so redelivery re-runs the pipeline to completion.
        events::mark_processed(&self.db, &msg.event_id.0, &lead_id).await?;
        Ok(outcome)
    }

    async fn apply_inbound(
        &self,
        lead_id: &str,
        msg: &InboundMessage,
    ) -> Result<InboundOutcome, RekindleError> {
        let lead = leads::get_lead(&self.db, lead_id)
            .await?
            .ok_or_else(|| RekindleError::InconsistentLead {
                lead_id: lead_id.to_string(),
                detail: "inbound message for unknown lead".to_string(),
            })?;
        if lead.opted_out {
            debug!(lead_id, "inbound from opted-out lead ignored");
            return Ok(InboundOutcome::Ignored {
                reason: "lead opted out",
            });
        }

        // A conversation is created on the first qualifying inbound event.
        let mut conversation = match conversations::get_active(&self.db, lead_id).await? {
            Some(c) => c,
            None => {
                conversations::create_conversation(
                    &self.db,
                    lead_id,
                    &lead.org_id,
                    &ConversationState::New.to_string(),
                )
                .await?
            }
        };

        let mut current = parse_state(&conversation)?;
        if current.is_terminal() {
            debug!(lead_id, state = %current, "inbound on terminal conversation ignored");
            return Ok(InboundOutcome::Ignored {
                reason: "conversation terminal",
            });
        }

        // A dormant lead coming back opens a new cycle; the old record stays.
        if current == ConversationState::Dormant {
            let next = state::apply(current, TransitionInput::Returned)?;
            conversation = conversations::begin_new_cycle(
                &self.db,
                lead_id,
                &lead.org_id,
                &next.to_string(),
            )
            .await?;
            current = next;
            info!(lead_id, generation = conversation.generation, "dormant lead returned");
        }

        conversations::record_message(&self.db, conversation.id, &format_ts(msg.received_at))
            .await?;

        if !conversation.ai_enabled {
            debug!(lead_id, "automation disabled; message recorded only");
            return Ok(InboundOutcome::Ignored {
                reason: "automation disabled",
            });
        }

        // Score: ledger row first, conversation delta only when the row is new.
        let deltas = self.scorer.score(&msg.text);
        let mut applied: i64 = 0;
        let mut time_commitment = false;
        for delta in &deltas {
            if delta.category == ScoreCategory::TimeCommitment {
                time_commitment = true;
            }
            let inserted = score_events::insert_score_event(
                &self.db,
                conversation.id,
                &msg.event_id.0,
                delta.delta,
                &delta.category.to_string(),
                &delta.reason,
            )
            .await?;
            if inserted {
                conversations::apply_score_delta(&self.db, conversation.id, delta.delta).await?;
                applied += delta.delta;
            }
        }
        let mut score = conversation.score + applied;

        let threshold = match self.settings.snapshot(&OrgId(lead.org_id.clone())).await {
            Ok(snapshot) => snapshot.handoff_threshold,
            Err(e) => {
                warn!(lead_id, error = %e, "settings snapshot unavailable; using configured threshold");
                self.handoff.threshold()
            }
        };

        if let Some(decision) = self.handoff.evaluate_at(&msg.text, score, threshold) {
            if decision.forced_boost > 0 {
                let inserted = score_events::insert_score_event(
                    &self.db,
                    conversation.id,
                    &msg.event_id.0,
                    decision.forced_boost,
                    &ScoreCategory::Adjustment.to_string(),
                    &decision.reason,
                )
                .await?;
                if inserted {
                    conversations::apply_score_delta(
                        &self.db,
                        conversation.id,
                        decision.forced_boost,
                    )
                    .await?;
                    score += decision.forced_boost;
                }
            }

            let next = state::apply(current, TransitionInput::Handoff)?;
            conversations::update_state(&self.db, conversation.id, &next.to_string()).await?;
            conversations::set_handoff_reason(&self.db, conversation.id, &decision.reason)
                .await?;
            // Cancellation happens inside this same locked section; there is
            // no window where a handed-off lead still has a live step.
            let cancelled =
                followups::cancel_active_for_lead(&self.db, lead_id).await?;
            variants::record_outcome_for_lead(&self.db, lead_id, "converted").await;

            info!(
                lead_id,
                reason = %decision.reason,
                score,
                cancelled,
                "lead handed off"
            );
            if let Err(e) = self
                .sink
                .notify_handoff(HandoffNotification {
                    lead_id: LeadId(lead_id.to_string()),
                    conversation_id: ConversationId(conversation.id),
                    reason: decision.reason.clone(),
                })
                .await
            {
                warn!(lead_id, error = %e, "handoff notification failed");
            }

            return Ok(InboundOutcome::Processed {
                state: next,
                score,
                handed_off: true,
            });
        }

        // No handoff: pick the furthest forward state this message justifies.
        let input = if time_commitment {
            TransitionInput::ScheduleIntent
        } else if score >= threshold / 2 {
            TransitionInput::Qualify
        } else {
            TransitionInput::Reply
        };
        let next = state::apply(current, input)?;
        if next != current {
            conversations::update_state(&self.db, conversation.id, &next.to_string()).await?;
        }

        Ok(InboundOutcome::Processed {
            state: next,
            score,
            handed_off: false,
        })
    }

    /// Process one lead lifecycle signal.
    pub async fn handle_lifecycle(&self, event: LifecycleEvent) -> Result<(), RekindleError> {
        let lead_id = event.lead_id.0.clone();
        let _guard = self.locks.acquire(&lead_id).await;

        if events::is_processed(&self.db, &event.event_id.0).await? {
            debug!(lead_id, event_id = %event.event_id.0, "duplicate lifecycle event dropped");
            return Ok(());
        }

        self.apply_lifecycle(&lead_id, &event).await?;
        events::mark_processed(&self.db, &event.event_id.0, &lead_id).await?;
        Ok(())
    }

    async fn apply_lifecycle(
        &self,
        lead_id: &str,
        event: &LifecycleEvent,
    ) -> Result<(), RekindleError> {
        match event.kind {
            LifecycleKind::OptedOut => {
                leads::set_opted_out(&self.db, lead_id, true).await?;
                if let Some(conversation) = conversations::get_active(&self.db, lead_id).await? {
                    let current = parse_state(&conversation)?;
                    if !current.is_terminal() {
                        let next = state::apply(current, TransitionInput::OptOut)?;
                        conversations::update_state(&self.db, conversation.id, &next.to_string())
                            .await?;
                        let cancelled =
                            followups::cancel_active_for_lead(&self.db, lead_id).await?;
                        variants::record_outcome_for_lead(&self.db, lead_id, "opted_out").await;
                        info!(lead_id, cancelled, "lead opted out");
                    }
                }
            }
            LifecycleKind::Reassigned => {
                if let Some(conversation) = conversations::get_active(&self.db, lead_id).await? {
                    conversations::set_ai_enabled(&self.db, conversation.id, false).await?;
                }
                review::insert_review(&self.db, lead_id, None, "reassigned").await?;
                if let Err(e) = self
                    .sink
                    .queue_review(ReviewNotice {
                        lead_id: LeadId(lead_id.to_string()),
                        followup_id: None,
                        reason: "reassigned".to_string(),
                    })
                    .await
                {
                    warn!(lead_id, error = %e, "review notice failed");
                }
                info!(lead_id, "lead reassigned; automation paused for review");
            }
            LifecycleKind::Enabled => {
                leads::set_opted_out(&self.db, lead_id, false).await?;
                if let Some(conversation) = conversations::get_active(&self.db, lead_id).await? {
                    conversations::set_ai_enabled(&self.db, conversation.id, true).await?;
                }
                info!(lead_id, "automation enabled");
            }
        }
        Ok(())
    }
}

fn parse_state(
    conversation: &rekindle_storage::models::ConversationRow,
) -> Result<ConversationState, RekindleError> {
    ConversationState::from_str(&conversation.state).map_err(|_| {
        RekindleError::InconsistentLead {
            lead_id: conversation.lead_id.clone(),
            detail: format!("unknown conversation state `{}`", conversation.state),
        }
    })
}
