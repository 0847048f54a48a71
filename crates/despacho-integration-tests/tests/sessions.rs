//! Per-session isolation and serialization.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::TurnHarness;
use despacho_core::SessionId;
use despacho_drafts::DraftStatus;
use despacho_runtime::{RuntimeError, TurnStatus};
use despacho_test::{MockDecision, MockDecisionLayer, RecordingEmailBackend, test_email};
use futures::future::join_all;

#[tokio::test]
async fn test_pending_actions_are_per_session() {
    let h = TurnHarness::new(
        MockDecisionLayer::new()
            .with_decision(MockDecision::propose(test_email()))
            .with_decision(MockDecision::propose(test_email())),
    );
    let alice = SessionId::new("alice");
    let bob = SessionId::new("bob");

    let a = h.turn(&alice, "email the broker").await.draft_id.unwrap();
    let b = h.turn(&bob, "email the broker too").await.draft_id.unwrap();

    // Bob cancelling does not touch Alice's draft.
    h.turn(&bob, "no").await;
    assert_eq!(h.draft(b).await.status, DraftStatus::Cancelled);
    assert_eq!(h.draft(a).await.status, DraftStatus::Pending);
    assert_eq!(h.controller.pending(&alice).unwrap().draft_id, a);

    let outcome = h.turn(&alice, "yes").await;
    assert_eq!(outcome.status, TurnStatus::Sent);
    assert_eq!(outcome.draft_id, Some(a));
    assert_eq!(h.email.calls(), 1);
}

#[tokio::test]
async fn test_retry_from_other_session_is_rejected() {
    let h = TurnHarness::builder(MockDecisionLayer::new().with_decision(MockDecision::propose(test_email())))
        .email(RecordingEmailBackend::new().failing_next(1))
        .build();
    let owner = SessionId::new("owner");

    let draft_id = h.turn(&owner, "email the broker").await.draft_id.unwrap();
    assert_eq!(h.turn(&owner, "yes").await.status, TurnStatus::DeliveryFailed);

    let err = h
        .controller
        .retry_delivery(&SessionId::new("intruder"), draft_id)
        .await
        .unwrap_err();
    assert!(matches!(err, RuntimeError::WrongSession { .. }));
    assert_eq!(h.email.calls(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_confirmation_racing_revision_is_serialized() {
    let h = TurnHarness::new(MockDecisionLayer::new().with_decision(MockDecision::propose(test_email())));
    let s = SessionId::new("race");
    let draft_id = h.turn(&s, "email the broker").await.draft_id.unwrap();

    let confirm = {
        let controller = Arc::clone(&h.controller);
        let s = s.clone();
        tokio::spawn(async move { controller.handle_turn(&s, "yes").await })
    };
    let revise = {
        let controller = Arc::clone(&h.controller);
        let s = s.clone();
        tokio::spawn(async move { controller.handle_turn(&s, "improve it").await })
    };
    let confirm = confirm.await.unwrap();
    let revise = revise.await.unwrap();

    // Whichever ran first, the draft is sent exactly once and never revised
    // after sending.
    let draft = h.draft(draft_id).await;
    assert_eq!(draft.status, DraftStatus::Sent);
    assert_eq!(h.email.calls(), 1);
    let sent_revision = draft.revision;
    let history = h.controller.drafts().history(draft_id).await.unwrap();
    assert_eq!(history.len(), usize::try_from(sent_revision).unwrap());

    match (confirm.status, revise.status) {
        // Revision first, then the confirmation sent revision 2.
        (TurnStatus::Sent, TurnStatus::Revised) => assert_eq!(sent_revision, 2),
        // Confirmation first; "improve it" found nothing pending.
        (TurnStatus::Sent, TurnStatus::Replied) => assert_eq!(sent_revision, 1),
        other => panic!("unexpected outcomes: {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sessions_run_in_parallel() {
    let mut decisions = MockDecisionLayer::new();
    for _ in 0..8 {
        decisions = decisions.with_decision(MockDecision::propose(test_email()));
    }
    let h = TurnHarness::builder(decisions)
        .email(RecordingEmailBackend::new().with_delay(Duration::from_millis(50)))
        .build();

    let sessions: Vec<SessionId> = (0..8).map(|i| SessionId::new(format!("p{i}"))).collect();
    for s in &sessions {
        h.turn(s, "email the broker").await;
    }

    let started = std::time::Instant::now();
    let outcomes = join_all(sessions.iter().map(|s| h.turn(s, "yes"))).await;

    assert!(outcomes.iter().all(|o| o.status == TurnStatus::Sent));
    assert_eq!(h.email.calls(), 8);
    // Eight serialized deliveries would take at least 400ms.
    assert!(started.elapsed() < Duration::from_millis(400));
}
