//! Deferred finalization, recovery and ledger anchoring.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::Harness;
use terra_ledger::{AnchorConfig, AnchorRecord, LedgerSynchronizer};
use terra_nullables::NullLedger;
use terra_types::{CaseStatus, Recommendation};
use terra_workflow::WorkflowError;

fn fast_anchors() -> AnchorConfig {
    AnchorConfig {
        request_timeout: Duration::from_millis(200),
        max_attempts: 3,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(4),
        queue_capacity: 16,
    }
}

#[tokio::test]
async fn failed_finalization_is_recovered() {
    let h = Harness::new();
    let (asset, case) = h.inspected_case("SRV-REC-1", Recommendation::Approve).await;

    h.store.set_fail_asset_writes(true);
    let approved = h.engine.approve(&h.admin.sign("approve"), case.id).await.unwrap();
    assert_eq!(approved.status, CaseStatus::Approved);
    assert!(approved.completed_at.is_none());
    let held = h.engine.get_asset(asset.id).unwrap();
    assert_eq!(held.owner, *h.owner.address());
    assert_eq!(held.active_case, Some(case.id));

    // Still failing: recovery leaves the case for the next run.
    assert!(h.engine.recover_pending_finalizations().unwrap().is_empty());

    h.store.set_fail_asset_writes(false);
    h.tick();
    assert_eq!(h.engine.recover_pending_finalizations().unwrap(), vec![case.id]);

    let done = h.engine.get_case(case.id).unwrap();
    assert_eq!(done.status, CaseStatus::Completed);
    assert!(done.completed_at.is_some());
    let moved = h.engine.get_asset(asset.id).unwrap();
    assert_eq!(moved.owner, *h.buyer.address());
    assert_eq!(moved.active_case, None);
    assert!(!moved.listed_for_sale);
    assert!(moved.invariants_hold());

    assert!(h.engine.recover_pending_finalizations().unwrap().is_empty());
}

#[tokio::test]
async fn finalize_after_partial_reassignment_only_completes_the_case() {
    let h = Harness::new();
    let (asset, case) = h.inspected_case("SRV-REC-2", Recommendation::Approve).await;
    h.store.set_fail_asset_writes(true);
    h.engine.approve(&h.admin.sign("approve"), case.id).await.unwrap();
    h.store.set_fail_asset_writes(false);

    let mut reassigned = h.engine.get_asset(asset.id).unwrap();
    reassigned.owner = h.buyer.address().clone();
    h.store.force_asset(reassigned.clone());
    let notes = reassigned.notifications.len();

    let done = h
        .engine
        .finalize_transfer(&h.admin.sign("finalize"), case.id)
        .await
        .unwrap();
    assert_eq!(done.status, CaseStatus::Completed);
    let stored = h.engine.get_asset(asset.id).unwrap();
    assert_eq!(stored.owner, *h.buyer.address());
    assert_eq!(stored.active_case, None);
    assert_eq!(stored.notifications.len(), notes);
}

#[tokio::test]
async fn finalize_requires_admin_and_an_approved_case() {
    let h = Harness::new();
    let (_, case) = h.inspected_case("SRV-REC-3", Recommendation::Approve).await;

    let err = h
        .engine
        .finalize_transfer(&h.admin.sign("finalize"), case.id)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition { .. }));

    h.store.set_fail_asset_writes(true);
    h.engine.approve(&h.admin.sign("approve"), case.id).await.unwrap();
    h.store.set_fail_asset_writes(false);

    let err = h
        .engine
        .finalize_transfer(&h.buyer.sign("finalize"), case.id)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AuthorizationDenied { .. }));
    assert_eq!(h.engine.get_case(case.id).unwrap().status, CaseStatus::Approved);

    h.engine
        .finalize_transfer(&h.admin.sign("finalize"), case.id)
        .await
        .unwrap();
    let err = h
        .engine
        .finalize_transfer(&h.admin.sign("finalize"), case.id)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
}

#[tokio::test]
async fn completed_transfers_are_anchored() {
    let ledger = Arc::new(NullLedger::new());
    let (anchors, worker) = LedgerSynchronizer::spawn(ledger.clone(), fast_anchors());
    let stats = anchors.stats();
    let h = Harness::new().with_ledger(anchors);

    let (asset, case) = h.inspected_case("SRV-REC-4", Recommendation::Approve).await;
    let done = h.engine.approve(&h.admin.sign("approve"), case.id).await.unwrap();
    let (seller, buyer) = (h.owner.address().clone(), h.buyer.address().clone());
    drop(h);
    worker.await.unwrap();

    let anchored = ledger.anchored();
    assert_eq!(anchored.len(), 1);
    let record = &anchored[0];
    assert_eq!(record.case_id, case.id);
    assert_eq!(record.asset_id, asset.id);
    assert_eq!(record.survey_id, asset.survey_id);
    assert_eq!(record.completed_at, done.completed_at.unwrap());
    assert_eq!(record.previous_owner, seller);
    assert_eq!(record.new_owner, buyer);
    let rebuilt = AnchorRecord::new(
        case.id,
        asset.id,
        asset.survey_id.clone(),
        seller.clone(),
        buyer.clone(),
        record.completed_at,
    );
    assert_eq!(record.transfer_hash, rebuilt.transfer_hash);
    let snapshot = stats.snapshot();
    assert_eq!((snapshot.submitted, snapshot.succeeded), (1, 1));
}

#[tokio::test]
async fn ledger_outage_does_not_undo_completion() {
    let ledger = Arc::new(NullLedger::new());
    ledger.fail_next(u32::MAX);
    let (anchors, worker) = LedgerSynchronizer::spawn(ledger.clone(), fast_anchors());
    let stats = anchors.stats();
    let h = Harness::new().with_ledger(anchors);

    let (asset, case) = h.inspected_case("SRV-REC-5", Recommendation::Approve).await;
    let done = h.engine.approve(&h.admin.sign("approve"), case.id).await.unwrap();
    assert_eq!(done.status, CaseStatus::Completed);
    assert_eq!(h.engine.get_asset(asset.id).unwrap().owner, *h.buyer.address());

    drop(h);
    worker.await.unwrap();
    assert!(ledger.anchored().is_empty());
    assert_eq!(ledger.calls(), 3);
    let snapshot = stats.snapshot();
    assert_eq!((snapshot.failed, snapshot.retried), (1, 2));
}
