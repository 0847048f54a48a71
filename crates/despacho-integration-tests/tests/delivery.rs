//! Delivery failures and explicit retry.

mod common;

use std::time::Duration;

use common::TurnHarness;
use despacho_core::SessionId;
use despacho_drafts::{DeliveryState, DraftStatus};
use despacho_runtime::{RuntimeError, TurnStatus};
use despacho_test::{MockDecision, MockDecisionLayer, RecordingEmailBackend, test_email};

#[tokio::test]
async fn test_failed_delivery_is_not_resent_automatically() {
    let h = TurnHarness::builder(MockDecisionLayer::new().with_decision(MockDecision::propose(test_email())))
        .email(RecordingEmailBackend::new().failing_next(1))
        .build();
    let s = SessionId::new("delivery");

    let draft_id = h.turn(&s, "email the broker").await.draft_id.unwrap();
    let outcome = h.turn(&s, "yes").await;

    assert_eq!(outcome.status, TurnStatus::DeliveryFailed);
    assert!(outcome.response_text.contains("will not be resent automatically"));
    let draft = h.draft(draft_id).await;
    assert_eq!(draft.status, DraftStatus::Sent);
    assert!(matches!(draft.delivery, DeliveryState::Failed { .. }));

    // Saying "yes" again is a fresh turn, not a resend.
    h.turn(&s, "yes").await;
    assert_eq!(h.email.calls(), 1);

    let retried = h.controller.retry_delivery(&s, draft_id).await.unwrap();
    assert_eq!(retried.status, TurnStatus::Sent);
    assert_eq!(h.email.calls(), 2);
    let draft = h.draft(draft_id).await;
    assert!(draft.delivery.is_delivered());
    assert_eq!(draft.attempts, 2);
}

#[tokio::test]
async fn test_retry_after_success_is_idempotent() {
    let h = TurnHarness::new(MockDecisionLayer::new().with_decision(MockDecision::propose(test_email())));
    let s = SessionId::new("delivered");

    let draft_id = h.turn(&s, "email the broker").await.draft_id.unwrap();
    h.turn(&s, "yes").await;

    let outcome = h.controller.retry_delivery(&s, draft_id).await.unwrap();
    assert_eq!(outcome.status, TurnStatus::AlreadyDelivered);
    assert_eq!(h.email.calls(), 1);
}

#[tokio::test]
async fn test_retry_of_cancelled_draft_is_rejected() {
    let h = TurnHarness::new(MockDecisionLayer::new().with_decision(MockDecision::propose(test_email())));
    let s = SessionId::new("cancelled");

    let draft_id = h.turn(&s, "email the broker").await.draft_id.unwrap();
    h.turn(&s, "cancel").await;

    let err = h.controller.retry_delivery(&s, draft_id).await.unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::NotRetryable {
            status: DraftStatus::Cancelled,
            ..
        }
    ));
    assert_eq!(h.email.calls(), 0);
}

#[tokio::test]
async fn test_backend_timeout_is_a_delivery_failure() {
    let h = TurnHarness::builder(MockDecisionLayer::new().with_decision(MockDecision::propose(test_email())))
        .email(RecordingEmailBackend::new().with_delay(Duration::from_millis(500)))
        .timeout(Duration::from_millis(20))
        .build();
    let s = SessionId::new("timeout");

    let draft_id = h.turn(&s, "email the broker").await.draft_id.unwrap();
    let outcome = h.turn(&s, "yes").await;

    assert_eq!(outcome.status, TurnStatus::DeliveryFailed);
    let draft = h.draft(draft_id).await;
    assert_eq!(draft.status, DraftStatus::Sent);
    assert!(matches!(draft.delivery, DeliveryState::Failed { .. }));
}
