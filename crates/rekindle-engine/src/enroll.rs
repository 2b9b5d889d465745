// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead enrollment: classification, template selection, step materialization.

use chrono::{DateTime, Utc};
use tracing::info;

use rekindle_config::model::SequenceConfig;
use rekindle_core::types::{ConversationState, FollowUpStatus, OrgSettings};
use rekindle_core::RekindleError;
use rekindle_sequence::templates::{TemplateName, TemplateRegistry};
use rekindle_sequence::{classify, materialize};
use rekindle_storage::models::{format_ts, LeadRow};
use rekindle_storage::queries::followups::{self, NewFollowUp};
use rekindle_storage::queries::{conversations, leads};
use rekindle_storage::Database;

use crate::variants;

/// What enrollment produced, for logging and tests.
#[derive(Debug, Clone)]
pub struct EnrollmentOutcome {
    pub conversation_id: i64,
    pub template: TemplateName,
    pub variant: String,
    pub pending: usize,
    pub skipped: usize,
}

/// Enroll a lead into the campaign its history selects.
///
/// Creates the lead record if new, opens (or re-opens) the conversation,
/// assigns the A/B variant, and persists every materialized step. A lead with
/// a live non-dormant conversation cannot be enrolled twice; a dormant lead
/// re-enters through a new `RETURNING` cycle.
pub async fn enroll(
    db: &Database,
    registry: &TemplateRegistry,
    sequence_config: &SequenceConfig,
    settings: &OrgSettings,
    lead: &LeadRow,
    last_contact: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<EnrollmentOutcome, RekindleError> {
    if lead.opted_out {
        return Err(RekindleError::InconsistentLead {
            lead_id: lead.id.clone(),
            detail: "cannot enroll an opted-out lead".to_string(),
        });
    }

    leads::upsert_lead(db, lead).await?;

    let classification = classify(last_contact, now, sequence_config);
    let template_name = classification.template();
    let template = registry
        .get(template_name)
        .ok_or_else(|| RekindleError::Internal(format!("missing template {template_name}")))?;

    let conversation = match conversations::get_active(db, &lead.id).await? {
        None => {
            conversations::create_conversation(
                db,
                &lead.id,
                &lead.org_id,
                &ConversationState::New.to_string(),
            )
            .await?
        }
        Some(existing) if existing.state == ConversationState::Dormant.to_string() => {
            conversations::begin_new_cycle(
                db,
                &lead.id,
                &lead.org_id,
                &ConversationState::Returning.to_string(),
            )
            .await?
        }
        Some(existing) => {
            return Err(RekindleError::InconsistentLead {
                lead_id: lead.id.clone(),
                detail: format!("already enrolled with conversation in {}", existing.state),
            });
        }
    };

    let variant = variants::assign(db, &lead.id, &template_name.to_string()).await?;

    let planned = materialize(template, now, settings);
    let pending = planned
        .iter()
        .filter(|s| s.status == FollowUpStatus::Pending)
        .count();
    let skipped = planned.len() - pending;

    let rows: Vec<NewFollowUp> = planned
        .into_iter()
        .map(|step| NewFollowUp {
            step_index: step.step_index as i64,
            fire_at: format_ts(step.fire_at),
            channel: step.channel.to_string(),
            message_type: step.message_type,
            status: step.status.to_string(),
        })
        .collect();
    followups::insert_planned(
        db,
        &lead.id,
        conversation.id,
        &template_name.to_string(),
        &variant,
        rows,
    )
    .await?;

    info!(
        lead_id = %lead.id,
        template = %template_name,
        variant = %variant,
        pending,
        skipped,
        "lead enrolled"
    );

    Ok(EnrollmentOutcome {
        conversation_id: conversation.id,
        template: template_name,
        variant,
        pending,
        skipped,
    })
}
