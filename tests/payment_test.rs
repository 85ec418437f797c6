mod common;

use common::*;
use phoros::error::PhorosError;
use phoros::payment::{PaymentMethod, PaymentStatus};
use phoros::tracker::TrackerState;
use std::sync::Arc;
use std::sync::atomic::Ordering;

async fn booted_completed_unpaid(
    api: &Arc<MockChargingApi>,
    store: &SharedRecoveryStore,
) -> phoros::SessionTracker {
    let mut tracker = new_tracker(Arc::clone(api), store.clone());
    tracker.boot().await.unwrap();
    assert!(matches!(
        tracker.state(),
        TrackerState::CompletedUnpaid { .. }
    ));
    tracker
}

#[tokio::test]
async fn wallet_settlement_reaches_paid_and_clears_store() {
    let api = Arc::new(MockChargingApi::new());
    api.insert_session(completed_session("s1", 12.5, Some(4000.0)));
    let store = SharedRecoveryStore::with_record(record_for("s1", 12.5, Some(4000.0)));
    let mut tracker = booted_completed_unpaid(&api, &store).await;

    let summary = tracker.settle(PaymentMethod::Wallet, "u1").await.unwrap();

    assert_eq!(summary.status, PaymentStatus::Completed);
    assert!((summary.amount - 50_000.0).abs() < f64::EPSILON);
    assert!(matches!(tracker.state(), TrackerState::Paid { .. }));
    assert!(store.snapshot().is_none());

    // Polling does not resume after settlement
    tracker.poll_tick().await;
    assert_eq!(api.status_calls.load(Ordering::SeqCst), 0);

    // A second submission is rejected outright
    assert!(tracker.settle(PaymentMethod::Wallet, "u1").await.is_err());
    assert_eq!(api.wallet_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn onsite_settlement_stays_unpaid_until_staff_confirm() {
    let api = Arc::new(MockChargingApi::new());
    api.insert_session(completed_session("s1", 12.5, Some(4000.0)));
    let store = SharedRecoveryStore::with_record(record_for("s1", 12.5, Some(4000.0)));
    let mut tracker = booted_completed_unpaid(&api, &store).await;

    let summary = tracker.settle(PaymentMethod::Cash, "u1").await.unwrap();

    // The record operation succeeded, so the local slot is released even
    // though the payment itself awaits staff confirmation
    assert_eq!(summary.status, PaymentStatus::Pending);
    assert!(store.snapshot().is_none());
    assert!(matches!(
        tracker.state(),
        TrackerState::CompletedUnpaid { .. }
    ));

    assert_eq!(api.onsite_amounts.lock().unwrap()[0], 50_000.0);
    assert_eq!(api.onsite_methods.lock().unwrap()[0], PaymentMethod::Cash);

    // Re-submitting while the recorded payment is outstanding is rejected
    assert!(tracker.settle(PaymentMethod::Cash, "u1").await.is_err());
    assert_eq!(api.onsite_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dismissing_payment_ui_changes_nothing() {
    let api = Arc::new(MockChargingApi::new());
    api.insert_session(completed_session("s1", 12.5, Some(4000.0)));
    let store = SharedRecoveryStore::with_record(record_for("s1", 12.5, Some(4000.0)));
    let tracker = booted_completed_unpaid(&api, &store).await;

    // "Closing" and "reopening" the payment surface is just reading again:
    // the computed amount is identical and the record is untouched
    let first = tracker.amount_due().unwrap();
    let second = tracker.amount_due().unwrap();
    assert_eq!(first.to_bits(), second.to_bits());
    assert_eq!(first, 50_000.0);
    assert!(store.snapshot().is_some());
    assert!(matches!(
        tracker.state(),
        TrackerState::CompletedUnpaid { .. }
    ));
}

#[tokio::test]
async fn failed_settlement_keeps_record_for_retry() {
    let api = Arc::new(MockChargingApi::new());
    api.insert_session(completed_session("s1", 12.5, Some(4000.0)));
    api.wallet_responses
        .lock()
        .unwrap()
        .push_back(Err(PhorosError::network("gateway unreachable")));
    let store = SharedRecoveryStore::with_record(record_for("s1", 12.5, Some(4000.0)));
    let mut tracker = booted_completed_unpaid(&api, &store).await;

    assert!(tracker.settle(PaymentMethod::Wallet, "u1").await.is_err());

    // No silent loss of the unpaid session
    assert!(matches!(
        tracker.state(),
        TrackerState::CompletedUnpaid { .. }
    ));
    assert!(store.snapshot().is_some());
    assert_eq!(tracker.amount_due(), Some(50_000.0));

    // Retry with a different method succeeds
    let summary = tracker.settle(PaymentMethod::Qr, "u1").await.unwrap();
    assert_eq!(summary.status, PaymentStatus::Pending);
    assert!(store.snapshot().is_none());
}

#[tokio::test]
async fn wallet_submission_uses_fallback_price_when_absent() {
    let api = Arc::new(MockChargingApi::new());
    api.insert_session(completed_session("s1", 10.0, None));
    let store = SharedRecoveryStore::with_record(record_for("s1", 10.0, None));
    let mut tracker = booted_completed_unpaid(&api, &store).await;

    // Fallback unit price (4000 by default) applies only because the
    // backend assigned none at capture time
    assert_eq!(tracker.amount_due(), Some(40_000.0));

    let summary = tracker.settle(PaymentMethod::Wallet, "u1").await.unwrap();
    assert!((summary.amount - 40_000.0).abs() < f64::EPSILON);
    assert_eq!(api.wallet_prices.lock().unwrap()[0], 4000.0);
}

#[tokio::test]
async fn settle_is_rejected_without_a_completed_session() {
    let api = Arc::new(MockChargingApi::new());
    let mut tracker = new_tracker(api, SharedRecoveryStore::new());
    tracker.boot().await.unwrap();

    assert!(matches!(tracker.state(), TrackerState::NoSession));
    assert!(tracker.settle(PaymentMethod::Cash, "u1").await.is_err());
    assert!(tracker.amount_due().is_none());
}
