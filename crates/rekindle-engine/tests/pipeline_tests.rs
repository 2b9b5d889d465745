// SPDX-FileCopyrightText: 2026 Rekindle Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the inbound pipeline: enrollment, scoring, handoff,
//! lifecycle signals, and replay idempotence.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use rekindle_config::model::{ScoringConfig, SequenceConfig};
use rekindle_core::types::{
    Channel, ConversationState, EventId, InboundMessage, LeadId, LifecycleEvent, LifecycleKind,
    OrgSettings,
};
use rekindle_engine::{enroll, EventProcessor, InboundOutcome, LeadLocks};
use rekindle_scoring::{HandoffEngine, LeadScorer};
use rekindle_sequence::templates::TemplateRegistry;
use rekindle_storage::queries::{conversations, followups, score_events};
use rekindle_storage::Database;
use rekindle_test_utils::{sample_lead, test_db, MockSettings, MockSink, TestDb};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 10, 15, 0, 0).unwrap()
}

fn inbound(event_id: &str, lead_id: &str, text: &str) -> InboundMessage {
    InboundMessage {
        event_id: EventId(event_id.to_string()),
        lead_id: LeadId(lead_id.to_string()),
        channel: Channel::Sms,
        text: text.to_string(),
        received_at: now(),
    }
}

struct Harness {
    _fixture: TestDb,
    db: Database,
    processor: EventProcessor,
    sink: Arc<MockSink>,
}

async fn harness() -> Harness {
    let fixture = test_db().await.unwrap();
    let db = fixture.db.clone();
    let sink = Arc::new(MockSink::new());
    let processor = EventProcessor::new(
        db.clone(),
        Arc::new(LeadLocks::new()),
        LeadScorer::new(&ScoringConfig::default()),
        HandoffEngine::new(60),
        Arc::new(MockSettings::default()),
        sink.clone(),
    );
    Harness {
        _fixture: fixture,
        db,
        processor,
        sink,
    }
}

async fn enroll_lead(db: &Database, id: &str) {
    enroll(
        db,
        &TemplateRegistry::builtin(),
        &SequenceConfig::default(),
        &OrgSettings::default(),
        &sample_lead(id),
        None,
        now(),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn friday_six_pm_scores_and_hands_off() {
    let h = harness().await;
    enroll_lead(&h.db, "lead-1").await;

    let outcome = h
        .processor
        .handle_inbound(inbound("evt-1", "lead-1", "Friday around 6pm works"))
        .await
        .unwrap();

    // Engagement (35) + time commitment (25) capped at 55, then the
    // appointment pattern boosts to the 60 threshold.
    let InboundOutcome::Processed {
        state,
        score,
        handed_off,
    } = outcome
    else {
        panic!("expected processed outcome, got {outcome:?}");
    };
    assert!(handed_off);
    assert_eq!(state, ConversationState::HandedOff);
    assert_eq!(score, 60);

    let conversation = conversations::get_active(&h.db, "lead-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.state, "HANDED_OFF");
    assert_eq!(conversation.score, 60);
    assert_eq!(
        conversation.handoff_reason.as_deref(),
        Some("pattern:appointment_agreement")
    );

    // The boost is a real, auditable score event.
    let events = score_events::list_score_events(&h.db, conversation.id)
        .await
        .unwrap();
    let adjustment = events.iter().find(|e| e.category == "adjustment").unwrap();
    assert_eq!(adjustment.delta, 5);
    assert_eq!(adjustment.reason, "pattern:appointment_agreement");

    // All remaining steps cancelled, exactly one notification.
    let rows = followups::list_for_lead(&h.db, "lead-1").await.unwrap();
    assert!(rows.iter().all(|r| r.status == "cancelled"));
    assert_eq!(h.sink.handoffs().await.len(), 1);
}

#[tokio::test]
async fn replaying_an_event_changes_nothing() {
    let h = harness().await;
    enroll_lead(&h.db, "lead-1").await;

    h.processor
        .handle_inbound(inbound("evt-1", "lead-1", "can we schedule a tour?"))
        .await
        .unwrap();
    let conversation = conversations::get_active(&h.db, "lead-1")
        .await
        .unwrap()
        .unwrap();
    let score_before = conversation.score;
    let events_before = score_events::list_score_events(&h.db, conversation.id)
        .await
        .unwrap()
        .len();

    let replay = h
        .processor
        .handle_inbound(inbound("evt-1", "lead-1", "can we schedule a tour?"))
        .await
        .unwrap();
    assert_eq!(replay, InboundOutcome::Duplicate);

    let conversation = conversations::get_active(&h.db, "lead-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.score, score_before);
    let events_after = score_events::list_score_events(&h.db, conversation.id)
        .await
        .unwrap()
        .len();
    assert_eq!(events_after, events_before);
}

#[tokio::test]
async fn storage_failure_leaves_the_event_reprocessable() {
    let h = harness().await;
    enroll_lead(&h.db, "lead-1").await;

    // Take the score ledger away so the first delivery fails mid-pipeline,
    // after the message is recorded but before any scoring lands.
    h.db.connection()
        .call(|conn| {
            conn.execute_batch("ALTER TABLE score_events RENAME TO score_events_offline;")?;
            Ok::<_, rusqlite::Error>(())
        })
        .await
        .unwrap();
    let result = h
        .processor
        .handle_inbound(inbound("evt-1", "lead-1", "can we schedule a tour?"))
        .await;
    assert!(result.is_err());

    h.db.connection()
        .call(|conn| {
            conn.execute_batch("ALTER TABLE score_events_offline RENAME TO score_events;")?;
            Ok::<_, rusqlite::Error>(())
        })
        .await
        .unwrap();

    // The failed attempt never claimed the event id, so redelivery of the
    // same event completes the scoring and the state change.
    let outcome = h
        .processor
        .handle_inbound(inbound("evt-1", "lead-1", "can we schedule a tour?"))
        .await
        .unwrap();
    let InboundOutcome::Processed { state, score, .. } = outcome else {
        panic!("expected processed outcome, got {outcome:?}");
    };
    assert_eq!(state, ConversationState::Scheduling);
    assert!(score > 0);

    let conversation = conversations::get_active(&h.db, "lead-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.score, score);
    assert!(!score_events::list_score_events(&h.db, conversation.id)
        .await
        .unwrap()
        .is_empty());

    // And only now does a third delivery read as a duplicate.
    let replay = h
        .processor
        .handle_inbound(inbound("evt-1", "lead-1", "can we schedule a tour?"))
        .await
        .unwrap();
    assert_eq!(replay, InboundOutcome::Duplicate);
}

#[tokio::test]
async fn plain_reply_engages_without_cancelling_steps() {
    let h = harness().await;
    enroll_lead(&h.db, "lead-1").await;

    let outcome = h
        .processor
        .handle_inbound(inbound("evt-1", "lead-1", "who is this?"))
        .await
        .unwrap();
    let InboundOutcome::Processed { state, handed_off, .. } = outcome else {
        panic!("expected processed outcome");
    };
    assert!(!handed_off);
    assert_eq!(state, ConversationState::Engaged);

    // Replies never reset timers or cancel the script.
    let rows = followups::list_for_lead(&h.db, "lead-1").await.unwrap();
    assert_eq!(rows.iter().filter(|r| r.status == "pending").count(), 11);
    assert!(h.sink.handoffs().await.is_empty());
}

#[tokio::test]
async fn time_commitment_moves_to_scheduling() {
    let h = harness().await;
    enroll_lead(&h.db, "lead-1").await;

    let outcome = h
        .processor
        .handle_inbound(inbound("evt-1", "lead-1", "maybe around 3pm?"))
        .await
        .unwrap();
    let InboundOutcome::Processed { state, handed_off, .. } = outcome else {
        panic!("expected processed outcome");
    };
    assert!(!handed_off);
    assert_eq!(state, ConversationState::Scheduling);
}

#[tokio::test]
async fn first_inbound_creates_the_conversation() {
    let h = harness().await;
    // Lead exists but was never enrolled.
    rekindle_test_utils::seed_lead(&h.db, "lead-1").await.unwrap();

    let outcome = h
        .processor
        .handle_inbound(inbound("evt-1", "lead-1", "hello there"))
        .await
        .unwrap();
    assert!(matches!(outcome, InboundOutcome::Processed { .. }));
    assert!(conversations::get_active(&h.db, "lead-1")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn dormant_lead_returns_in_a_new_cycle() {
    let h = harness().await;
    enroll_lead(&h.db, "lead-1").await;
    let first = conversations::get_active(&h.db, "lead-1")
        .await
        .unwrap()
        .unwrap();
    conversations::update_state(&h.db, first.id, "DORMANT")
        .await
        .unwrap();

    let outcome = h
        .processor
        .handle_inbound(inbound("evt-1", "lead-1", "hey, still around?"))
        .await
        .unwrap();
    let InboundOutcome::Processed { state, .. } = outcome else {
        panic!("expected processed outcome");
    };
    // RETURNING then ENGAGED on the same reply.
    assert_eq!(state, ConversationState::Engaged);

    let active = conversations::get_active(&h.db, "lead-1")
        .await
        .unwrap()
        .unwrap();
    assert_ne!(active.id, first.id);
    assert_eq!(active.generation, first.generation + 1);
}

#[tokio::test]
async fn opt_out_cancels_everything_once() {
    let h = harness().await;
    enroll_lead(&h.db, "lead-1").await;

    let event = LifecycleEvent {
        event_id: EventId("life-1".to_string()),
        lead_id: LeadId("lead-1".to_string()),
        kind: LifecycleKind::OptedOut,
        occurred_at: now(),
    };
    h.processor.handle_lifecycle(event.clone()).await.unwrap();
    // Duplicate delivery is a no-op.
    h.processor.handle_lifecycle(event).await.unwrap();

    let conversation = conversations::get_active(&h.db, "lead-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.state, "OPTED_OUT");
    let rows = followups::list_for_lead(&h.db, "lead-1").await.unwrap();
    assert!(rows.iter().all(|r| r.status == "cancelled"));

    // Messages after opt-out are ignored.
    let outcome = h
        .processor
        .handle_inbound(inbound("evt-2", "lead-1", "wait, actually"))
        .await
        .unwrap();
    assert!(matches!(outcome, InboundOutcome::Ignored { .. }));
}

#[tokio::test]
async fn reassignment_pauses_automation_and_queues_review() {
    let h = harness().await;
    enroll_lead(&h.db, "lead-1").await;

    h.processor
        .handle_lifecycle(LifecycleEvent {
            event_id: EventId("life-1".to_string()),
            lead_id: LeadId("lead-1".to_string()),
            kind: LifecycleKind::Reassigned,
            occurred_at: now(),
        })
        .await
        .unwrap();

    let conversation = conversations::get_active(&h.db, "lead-1")
        .await
        .unwrap()
        .unwrap();
    assert!(!conversation.ai_enabled);
    assert_eq!(h.sink.reviews().await.len(), 1);

    // A reply is recorded but drives nothing while automation is paused.
    let outcome = h
        .processor
        .handle_inbound(inbound("evt-1", "lead-1", "let's book it"))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        InboundOutcome::Ignored {
            reason: "automation disabled"
        }
    );
    let conversation = conversations::get_active(&h.db, "lead-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.message_count, 1);
    assert_eq!(conversation.score, 0);
}

#[tokio::test]
async fn sink_failure_does_not_block_the_handoff() {
    let h = harness().await;
    enroll_lead(&h.db, "lead-1").await;
    h.sink.set_failing(true).await;

    let outcome = h
        .processor
        .handle_inbound(inbound("evt-1", "lead-1", "I want to talk to a person"))
        .await
        .unwrap();
    let InboundOutcome::Processed { handed_off, .. } = outcome else {
        panic!("expected processed outcome");
    };
    assert!(handed_off);

    let conversation = conversations::get_active(&h.db, "lead-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(conversation.state, "HANDED_OFF");
}
