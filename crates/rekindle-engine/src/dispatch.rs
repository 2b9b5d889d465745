// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduler/dispatcher loop.
//!
//! Two cadences: a fast poll over hot leads (recent inbound activity) and a
//! slow poll over everyone, plus the dormancy sweep on the slow tick. Each
//! tick selects due steps, groups them by lead, and processes each lead's
//! group under that lead's lock inside a bounded worker pool. The dispatcher
//! is the only writer of follow-up status.
//!
//! Ordering invariants:
//! - at most one send per lead per tick; the rest of a lead's due group is
//!   deferred to the next fast poll;
//! - a lead's lock is held for the whole evaluate-and-fire section, so a
//!   reply arriving mid-tick serializes against the send;
//! - channel calls run under a mandatory timeout so a hung provider cannot
//!   hold the lead's lock open-endedly.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use rekindle_compliance::{evaluate, ComplianceDecision, CompliancePolicy};
use rekindle_config::model::{SchedulerConfig, SequenceConfig};
use rekindle_core::types::{
    Channel, ConversationState, FollowUpId, LeadId, OrgId, OutboundMessage, ReviewNotice,
};
use rekindle_core::{ChannelSend, NotificationSink, RekindleError, SettingsProvider};
use rekindle_sequence::templates::TemplateName;
use rekindle_sequence::defer_is_stale;
use rekindle_storage::models::{format_ts, parse_ts, DueStep};
use rekindle_storage::queries::{conversations, followups, review};
use rekindle_storage::Database;

use crate::locks::LeadLocks;
use crate::render::MessageRenderer;
use crate::state::{self, TransitionInput};
use crate::variants;

/// Counters from one tick, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub due: usize,
    pub sent: usize,
    pub deferred: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl TickSummary {
    fn absorb(&mut self, other: TickSummary) {
        self.due += other.due;
        self.sent += other.sent;
        self.deferred += other.deferred;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// The follow-up dispatcher.
pub struct Dispatcher {
    db: Database,
    locks: Arc<LeadLocks>,
    channels: HashMap<Channel, Arc<dyn ChannelSend>>,
    settings: Arc<dyn SettingsProvider>,
    sink: Arc<dyn NotificationSink>,
    renderer: Arc<dyn MessageRenderer>,
    config: SchedulerConfig,
    sequence_config: SequenceConfig,
    workers: Arc<Semaphore>,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Database,
        locks: Arc<LeadLocks>,
        channels: HashMap<Channel, Arc<dyn ChannelSend>>,
        settings: Arc<dyn SettingsProvider>,
        sink: Arc<dyn NotificationSink>,
        renderer: Arc<dyn MessageRenderer>,
        config: SchedulerConfig,
        sequence_config: SequenceConfig,
    ) -> Self {
        let workers = Arc::new(Semaphore::new(config.worker_pool_size.max(1)));
        Self {
            db,
            locks,
            channels,
            settings,
            sink,
            renderer,
            config,
            sequence_config,
            workers,
        }
    }

    /// Run the fast/slow loops until the token cancels.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let mut fast = tokio::time::interval(StdDuration::from_secs(self.config.fast_poll_secs));
        let mut slow = tokio::time::interval(StdDuration::from_secs(self.config.slow_poll_secs));
        info!(
            fast_poll_secs = self.config.fast_poll_secs,
            slow_poll_secs = self.config.slow_poll_secs,
            workers = self.config.worker_pool_size,
            "dispatcher started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = fast.tick() => {
                    if let Err(e) = self.tick(Utc::now(), true).await {
                        warn!(error = %e, "fast tick failed");
                    }
                }
                _ = slow.tick() => {
                    if let Err(e) = self.tick(Utc::now(), false).await {
                        warn!(error = %e, "slow tick failed");
                    }
                    if let Err(e) = self.dormancy_sweep(Utc::now()).await {
                        warn!(error = %e, "dormancy sweep failed");
                    }
                }
            }
        }
        info!("dispatcher stopped");
    }

    /// One evaluation pass. `hot_only` restricts to leads with inbound
    /// activity inside the hot window (the fast cadence).
    pub async fn tick(
        self: &Arc<Self>,
        now: DateTime<Utc>,
        hot_only: bool,
    ) -> Result<TickSummary, RekindleError> {
        let now_ts = format_ts(now);
        let hot_cutoff = hot_only
            .then(|| format_ts(now - Duration::hours(i64::from(self.config.hot_window_hours))));
        let due = followups::due_steps(&self.db, &now_ts, hot_cutoff.as_deref()).await?;

        let mut by_lead: BTreeMap<String, Vec<DueStep>> = BTreeMap::new();
        for step in due {
            by_lead
                .entry(step.followup.lead_id.clone())
                .or_default()
                .push(step);
        }

        let mut summary = TickSummary::default();
        let mut handles = Vec::with_capacity(by_lead.len());
        for (lead_id, steps) in by_lead {
            summary.due += steps.len();
            let this = Arc::clone(self);
            let permit = match Arc::clone(&self.workers).acquire_owned().await {
                Ok(permit) => permit,
                // The semaphore only closes during teardown.
                Err(_) => break,
            };
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                this.process_lead(&lead_id, steps, now).await
            }));
        }
        for handle in handles {
            match handle.await {
                Ok(lead_summary) => summary.absorb(lead_summary),
                Err(e) => warn!(error = %e, "lead dispatch task panicked"),
            }
        }

        debug!(
            due = summary.due,
            sent = summary.sent,
            deferred = summary.deferred,
            skipped = summary.skipped,
            failed = summary.failed,
            hot_only,
            "tick complete"
        );
        Ok(summary)
    }

    /// Evaluate and fire one lead's due steps under that lead's lock.
    async fn process_lead(
        &self,
        lead_id: &str,
        steps: Vec<DueStep>,
        now: DateTime<Utc>,
    ) -> TickSummary {
        let mut summary = TickSummary::default();
        let _guard = self.locks.acquire(lead_id).await;

        // Snapshot once per lead per tick; a mid-tick settings change cannot
        // split one lead's decisions across two configurations.
        let snapshot = match self
            .settings
            .snapshot(&OrgId(steps[0].org_id.clone()))
            .await
        {
            Ok(s) => s,
            Err(e) => {
                // No-send posture: the steps stay pending for a later tick.
                warn!(lead_id, error = %e, "settings unavailable; lead held this tick");
                return summary;
            }
        };
        let policy = match CompliancePolicy::from_settings(&snapshot) {
            Ok(p) => p,
            Err(e) => {
                warn!(lead_id, error = %e, "unusable compliance settings; lead held this tick");
                return summary;
            }
        };

        let mut queue = steps.into_iter();
        while let Some(step) = queue.next() {
            match self
                .process_step(lead_id, &step, &snapshot, &policy, now)
                .await
            {
                Ok(StepResolution::Sent) => {
                    summary.sent += 1;
                    // At most one send per lead per tick. The rest of the
                    // group rolls forward to the next fast poll instead of
                    // sitting overdue as `pending`.
                    let retry_at =
                        format_ts(now + Duration::seconds(self.config.fast_poll_secs as i64));
                    for rest in queue.by_ref() {
                        match self.defer_after_send(&rest, &retry_at).await {
                            Ok(true) => summary.deferred += 1,
                            Ok(false) => {}
                            Err(e) => {
                                summary.failed += 1;
                                warn!(lead_id, followup_id = rest.followup.id, error = %e, "post-send deferral failed");
                            }
                        }
                    }
                    break;
                }
                Ok(StepResolution::Deferred) => summary.deferred += 1,
                Ok(StepResolution::Skipped) => summary.skipped += 1,
                Ok(StepResolution::Retrying) => summary.failed += 1,
                Ok(StepResolution::Untouched) => {}
                Err(e) => {
                    summary.failed += 1;
                    warn!(lead_id, followup_id = step.followup.id, error = %e, "step processing failed");
                }
            }
        }
        summary
    }

    /// Defer a still-live step after a send consumed this lead's slot for
    /// the tick.
    async fn defer_after_send(
        &self,
        due: &DueStep,
        retry_at: &str,
    ) -> Result<bool, RekindleError> {
        match followups::get_followup(&self.db, due.followup.id).await? {
            Some(f) if f.status == "pending" || f.status == "deferred" => {
                followups::mark_deferred(&self.db, f.id, retry_at).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn process_step(
        &self,
        lead_id: &str,
        due: &DueStep,
        snapshot: &rekindle_core::types::OrgSettings,
        policy: &CompliancePolicy,
        now: DateTime<Utc>,
    ) -> Result<StepResolution, RekindleError> {
        // Re-fetch under the lock: a reply processed since the select may
        // have cancelled or resolved the step.
        let followup = match followups::get_followup(&self.db, due.followup.id).await? {
            Some(f) if f.status == "pending" || f.status == "deferred" => f,
            _ => return Ok(StepResolution::Untouched),
        };

        if due.lead_opted_out {
            self.skip(lead_id, followup.id, "lead opted out", false).await?;
            return Ok(StepResolution::Skipped);
        }
        let conversation_state = ConversationState::from_str(&due.conversation_state)
            .map_err(|_| RekindleError::InconsistentLead {
                lead_id: lead_id.to_string(),
                detail: format!("unknown conversation state `{}`", due.conversation_state),
            })?;
        if conversation_state.is_terminal() {
            // Should have been cancelled with the transition; never send.
            self.skip(lead_id, followup.id, "conversation terminal", true).await?;
            return Ok(StepResolution::Skipped);
        }
        if !due.ai_enabled {
            debug!(lead_id, followup_id = followup.id, "automation paused; step held");
            return Ok(StepResolution::Untouched);
        }

        let channel = Channel::from_str(&followup.channel).map_err(|_| {
            RekindleError::Internal(format!("unknown channel `{}`", followup.channel))
        })?;
        if !snapshot.channel_enabled(channel) {
            self.skip(lead_id, followup.id, "channel disabled", false).await?;
            return Ok(StepResolution::Skipped);
        }

        let timezone: Tz = due.timezone.parse().map_err(|_| {
            RekindleError::InconsistentLead {
                lead_id: lead_id.to_string(),
                detail: format!("invalid timezone `{}`", due.timezone),
            }
        })?;

        let since = format_ts(now - Duration::hours(24));
        let mut recent = Vec::new();
        for ts in followups::recent_sent_ats(&self.db, lead_id, &since).await? {
            recent.push(parse_ts(&ts)?);
        }

        match evaluate(policy, timezone, now, &recent) {
            ComplianceDecision::Allowed => self.fire(lead_id, &followup, channel, now).await,
            ComplianceDecision::Deferred { retry_at } => {
                let next = followups::next_step_fire_at(
                    &self.db,
                    followup.conversation_id,
                    followup.step_index,
                )
                .await?;
                let next = next.as_deref().map(parse_ts).transpose()?;
                if defer_is_stale(retry_at, next) {
                    // Deferred past its successor; the later step carries
                    // the thread instead.
                    self.skip(lead_id, followup.id, "stale", false).await?;
                    self.check_exhaustion(lead_id, &followup).await?;
                    Ok(StepResolution::Skipped)
                } else {
                    followups::mark_deferred(&self.db, followup.id, &format_ts(retry_at)).await?;
                    debug!(
                        lead_id,
                        followup_id = followup.id,
                        retry_at = %format_ts(retry_at),
                        "step deferred"
                    );
                    Ok(StepResolution::Deferred)
                }
            }
        }
    }

    /// Hand the step to its channel provider, with the mandatory timeout.
    async fn fire(
        &self,
        lead_id: &str,
        followup: &rekindle_storage::models::FollowUpRow,
        channel: Channel,
        now: DateTime<Utc>,
    ) -> Result<StepResolution, RekindleError> {
        let adapter = self.channels.get(&channel).ok_or_else(|| {
            RekindleError::AdapterNotFound {
                adapter_type: "channel".to_string(),
                name: channel.to_string(),
            }
        })?;

        let variant = followup.variant.as_deref().unwrap_or("A");
        let outbound = OutboundMessage {
            lead_id: LeadId(lead_id.to_string()),
            channel,
            message_type: followup.message_type.clone(),
            rendered_text: self
                .renderer
                .render(lead_id, channel, &followup.message_type, variant),
        };

        let timeout = StdDuration::from_secs(self.config.send_timeout_secs);
        let result = match tokio::time::timeout(timeout, adapter.send(outbound)).await {
            Ok(inner) => inner,
            Err(_) => Err(RekindleError::Timeout { duration: timeout }),
        };

        match result {
            Ok(message_id) => {
                followups::mark_sent(&self.db, followup.id, &format_ts(now)).await?;
                info!(
                    lead_id,
                    followup_id = followup.id,
                    channel = %channel,
                    message_id = %message_id.0,
                    step_index = followup.step_index,
                    "step sent"
                );
                self.check_exhaustion(lead_id, followup).await?;
                Ok(StepResolution::Sent)
            }
            Err(e) => {
                let attempts = followup.attempts + 1;
                if attempts >= i64::from(self.config.max_send_attempts) {
                    let reason = format!("send_failed:{e}");
                    self.skip(lead_id, followup.id, &reason, true).await?;
                    self.check_exhaustion(lead_id, followup).await?;
                    Ok(StepResolution::Skipped)
                } else {
                    // Exponential backoff on the same step.
                    let backoff = self.config.backoff_base_secs * 2u64.pow(followup.attempts as u32);
                    let retry_at = now + Duration::seconds(backoff as i64);
                    followups::record_failed_attempt(&self.db, followup.id, &format_ts(retry_at))
                        .await?;
                    warn!(
                        lead_id,
                        followup_id = followup.id,
                        attempts,
                        retry_at = %format_ts(retry_at),
                        error = %e,
                        "send failed; retrying"
                    );
                    Ok(StepResolution::Retrying)
                }
            }
        }
    }

    /// Mark a step skipped, optionally flagging the lead for manual review.
    async fn skip(
        &self,
        lead_id: &str,
        followup_id: i64,
        reason: &str,
        flag_for_review: bool,
    ) -> Result<(), RekindleError> {
        followups::mark_skipped(&self.db, followup_id, reason).await?;
        warn!(lead_id, followup_id, reason, "step skipped");
        if flag_for_review {
            review::insert_review(&self.db, lead_id, Some(followup_id), reason).await?;
            if let Err(e) = self
                .sink
                .queue_review(ReviewNotice {
                    lead_id: LeadId(lead_id.to_string()),
                    followup_id: Some(FollowUpId(followup_id)),
                    reason: reason.to_string(),
                })
                .await
            {
                warn!(lead_id, error = %e, "review notice failed");
            }
        }
        Ok(())
    }

    /// When the lead's last live step resolves with no handoff, the sequence
    /// is exhausted: `NEW_LEAD` goes dormant, the others close.
    async fn check_exhaustion(
        &self,
        lead_id: &str,
        followup: &rekindle_storage::models::FollowUpRow,
    ) -> Result<(), RekindleError> {
        let remaining =
            followups::remaining_active_count(&self.db, followup.conversation_id).await?;
        if remaining > 0 {
            return Ok(());
        }

        let Some(conversation) = conversations::get_active(&self.db, lead_id).await? else {
            return Ok(());
        };
        if conversation.id != followup.conversation_id {
            return Ok(());
        }
        let current = ConversationState::from_str(&conversation.state).map_err(|_| {
            RekindleError::InconsistentLead {
                lead_id: lead_id.to_string(),
                detail: format!("unknown conversation state `{}`", conversation.state),
            }
        })?;
        if current.is_terminal() || current == ConversationState::Dormant {
            return Ok(());
        }

        let template = TemplateName::from_str(&followup.template).map_err(|_| {
            RekindleError::Internal(format!("unknown template `{}`", followup.template))
        })?;
        let target = template.exhaustion_state();
        let next = state::apply(current, TransitionInput::Exhausted(target))?;
        conversations::update_state(&self.db, conversation.id, &next.to_string()).await?;
        if next == ConversationState::Closed {
            variants::record_outcome(&self.db, lead_id, &followup.template, "exhausted").await;
        }
        info!(lead_id, template = %template, state = %next, "sequence exhausted");
        Ok(())
    }

    /// Slow-cadence sweep: conversations silent past the dormancy window go
    /// `DORMANT`; they can return through a new cycle later.
    pub async fn dormancy_sweep(&self, now: DateTime<Utc>) -> Result<usize, RekindleError> {
        let cutoff = format_ts(now - Duration::days(i64::from(self.sequence_config.dormancy_days)));
        let quiet = conversations::silent_active(&self.db, &cutoff).await?;
        let mut swept = 0;

        for conversation in quiet {
            let _guard = self.locks.acquire(&conversation.lead_id).await;
            // Re-check under the lock; a reply may have landed since select.
            let Some(current_row) =
                conversations::get_active(&self.db, &conversation.lead_id).await?
            else {
                continue;
            };
            if current_row.id != conversation.id {
                continue;
            }
            let Ok(current) = ConversationState::from_str(&current_row.state) else {
                continue;
            };
            if current.is_terminal() || current == ConversationState::Dormant {
                continue;
            }
            let last = current_row
                .last_message_at
                .as_deref()
                .unwrap_or(&current_row.created_at);
            if parse_ts(last)? >= parse_ts(&cutoff)? {
                continue;
            }
            let next = state::apply(current, TransitionInput::Silence)?;
            conversations::update_state(&self.db, current_row.id, &next.to_string()).await?;
            info!(lead_id = %conversation.lead_id, "conversation dormant after silence");
            swept += 1;
        }
        Ok(swept)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepResolution {
    Sent,
    Deferred,
    Skipped,
    /// Failed send with retries remaining.
    Retrying,
    /// Not eligible this tick; the row was not modified.
    Untouched,
}
