//! Identity, role, and actor checks.

mod common;

use common::Harness;
use terra_types::{CaseStatus, EvidenceKind, Recommendation, Role, VerificationStatus};
use terra_workflow::{EvidenceInput, InspectionReport, Snapshot, WorkflowError};

#[tokio::test]
async fn forged_signature_is_rejected_before_anything_else() {
    let h = Harness::new();
    let asset = h.submitted("SRV-AUTH-1").await;
    let before = h.store.commit_count();

    let forged = h.admin.forged_by(&h.stranger, "assign");
    let err = h
        .engine
        .assign_inspector(&forged, asset.id, h.inspector.address())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AuthenticationFailed { .. }));
    assert!(!err.is_retryable());
    assert!(err.current().is_none());
    assert_eq!(h.store.commit_count(), before);
}

#[tokio::test]
async fn owner_cannot_assign_inspector() {
    let h = Harness::new();
    let asset = h.submitted("SRV-AUTH-2").await;

    let err = h
        .engine
        .assign_inspector(&h.owner.sign("assign"), asset.id, h.inspector.address())
        .await
        .unwrap_err();
    match &err {
        WorkflowError::AuthorizationDenied { role, .. } => assert_eq!(*role, Some(Role::Owner)),
        other => panic!("unexpected {other}"),
    }
    match err.current() {
        Some(Snapshot::Asset(current)) => assert_eq!(current.status, VerificationStatus::Pending),
        other => panic!("expected asset snapshot, got {other:?}"),
    }
}

#[tokio::test]
async fn unregistered_account_cannot_submit() {
    let h = Harness::new();
    let err = h
        .engine
        .submit_for_verification(&h.stranger.sign("submit"), Harness::submission("SRV-AUTH-3"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        WorkflowError::AuthorizationDenied { role: None, .. }
    ));
    assert!(h.evidence.is_empty());
}

#[tokio::test]
async fn only_assigned_inspector_schedules_and_reports() {
    let h = Harness::new();
    let asset = h.submitted("SRV-AUTH-4").await;
    h.engine
        .assign_inspector(&h.admin.sign("assign"), asset.id, h.inspector.address())
        .await
        .unwrap();

    let err = h
        .engine
        .schedule_inspection(&h.other_inspector.sign("schedule"), asset.id)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AuthorizationDenied { .. }));

    // Admin may schedule on the inspector's behalf.
    h.engine
        .schedule_inspection(&h.admin.sign("schedule"), asset.id)
        .await
        .unwrap();

    let err = h
        .engine
        .submit_inspection_report(
            &h.other_inspector.sign("report"),
            asset.id,
            Harness::report(Recommendation::Approve),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AuthorizationDenied { .. }));

    let err = h
        .engine
        .submit_inspection_report(
            &h.admin.sign("report"),
            asset.id,
            Harness::report(Recommendation::Approve),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AuthorizationDenied { .. }));
}

#[tokio::test]
async fn inspector_verdicts_follow_assignment() {
    let h = Harness::new();

    // Unassigned: any inspector may decide.
    let pending = h.submitted("SRV-AUTH-5").await;
    let verified = h
        .engine
        .verify(&h.other_inspector.sign("verify"), pending.id)
        .await
        .unwrap();
    assert_eq!(verified.status, VerificationStatus::Verified);

    // Assigned: only that inspector (or an admin).
    let assigned = h.submitted("SRV-AUTH-6").await;
    h.engine
        .assign_inspector(&h.admin.sign("assign"), assigned.id, h.inspector.address())
        .await
        .unwrap();
    let err = h
        .engine
        .reject(&h.other_inspector.sign("reject"), assigned.id, "not mine")
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AuthorizationDenied { .. }));
    let rejected = h
        .engine
        .reject(&h.inspector.sign("reject"), assigned.id, "encroaches on road reserve")
        .await
        .unwrap();
    assert_eq!(rejected.status, VerificationStatus::Rejected);
    assert!(rejected.assigned_inspector.is_none());
    assert!(rejected.invariants_hold());
}

#[tokio::test]
async fn assignee_must_hold_inspector_role() {
    let h = Harness::new();
    let asset = h.submitted("SRV-AUTH-7").await;
    let err = h
        .engine
        .assign_inspector(&h.admin.sign("assign"), asset.id, h.buyer.address())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PreconditionFailed { .. }));
}

#[tokio::test]
async fn missing_payload_is_a_precondition_failure() {
    let h = Harness::new();
    let asset = h.submitted("SRV-AUTH-8").await;

    let err = h
        .engine
        .reject(&h.admin.sign("reject"), asset.id, "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PreconditionFailed { .. }));

    h.engine
        .assign_inspector(&h.admin.sign("assign"), asset.id, h.inspector.address())
        .await
        .unwrap();
    h.engine
        .schedule_inspection(&h.inspector.sign("schedule"), asset.id)
        .await
        .unwrap();
    let no_recommendation = InspectionReport {
        recommendation: None,
        ..Harness::report(Recommendation::Approve)
    };
    let err = h
        .engine
        .submit_inspection_report(&h.inspector.sign("report"), asset.id, no_recommendation)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PreconditionFailed { .. }));

    let no_document = InspectionReport {
        report: None,
        ..Harness::report(Recommendation::Approve)
    };
    let err = h
        .engine
        .submit_inspection_report(&h.inspector.sign("report"), asset.id, no_document)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PreconditionFailed { .. }));

    let mut no_evidence = Harness::submission("SRV-AUTH-9");
    no_evidence.evidence.clear();
    let err = h
        .engine
        .submit_for_verification(&h.owner.sign("submit"), no_evidence)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PreconditionFailed { snapshot: None, .. }));
}

#[tokio::test]
async fn blank_case_rejection_reason_is_a_precondition_failure() {
    let h = Harness::new();
    let (_, case) = h.inspected_case("SRV-AUTH-13", Recommendation::Reject).await;

    for reason in ["", "  \t "] {
        let err = h
            .engine
            .reject_case(&h.admin.sign("reject case"), case.id, reason)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::PreconditionFailed { .. }));
        match err.current() {
            Some(Snapshot::Case(current)) => assert_eq!(current.status, CaseStatus::Inspected),
            other => panic!("expected case snapshot, got {other:?}"),
        }
    }
    let current = h.engine.get_case(case.id).unwrap();
    assert_eq!(current.status, CaseStatus::Inspected);
    assert!(current.rejection_reason.is_none());
    assert_eq!(current.version, case.version);
}

fn upload(name: &str) -> EvidenceInput {
    EvidenceInput::Upload {
        kind: EvidenceKind::InspectionReport,
        name: name.into(),
        bytes: format!("unsolicited {name}").into_bytes(),
    }
}

#[tokio::test]
async fn denied_callers_store_no_evidence() {
    let h = Harness::new();
    let asset = h.submitted("SRV-AUTH-14").await;
    h.engine
        .assign_inspector(&h.admin.sign("assign"), asset.id, h.inspector.address())
        .await
        .unwrap();
    h.engine
        .schedule_inspection(&h.inspector.sign("schedule"), asset.id)
        .await
        .unwrap();
    let stored = h.evidence.len();

    for actor in [&h.owner, &h.other_inspector, &h.stranger] {
        let report = InspectionReport {
            report: Some(upload("asset-report.pdf")),
            ..Harness::report(Recommendation::Approve)
        };
        let err = h
            .engine
            .submit_inspection_report(&actor.sign("report"), asset.id, report)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::AuthorizationDenied { .. }));
    }
    assert_eq!(h.evidence.len(), stored);
    assert_eq!(
        h.engine.get_asset(asset.id).unwrap().status,
        VerificationStatus::InspectionScheduled
    );

    let listed = h.verified("SRV-AUTH-15").await;
    let stored = h.evidence.len();
    let err = h
        .engine
        .create_transfer_request(
            &h.buyer.sign("transfer"),
            listed.id,
            h.buyer.address(),
            vec![upload("agreement.pdf")],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AuthorizationDenied { .. }));
    assert_eq!(h.evidence.len(), stored);

    let case = h
        .engine
        .create_transfer_request(&h.owner.sign("transfer"), listed.id, h.buyer.address(), Vec::new())
        .await
        .unwrap();
    h.engine
        .assign_case_inspector(&h.admin.sign("assign case"), case.id, h.inspector.address())
        .await
        .unwrap();
    let stored = h.evidence.len();
    for actor in [&h.other_inspector, &h.buyer] {
        let report = InspectionReport {
            report: Some(upload("case-report.pdf")),
            ..Harness::report(Recommendation::Approve)
        };
        let err = h
            .engine
            .submit_case_inspection_report(&actor.sign("case report"), case.id, report)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::AuthorizationDenied { .. }));
    }
    assert_eq!(h.evidence.len(), stored);
    assert_eq!(h.engine.get_case(case.id).unwrap().status, CaseStatus::InspectionScheduled);
}

#[tokio::test]
async fn invalid_transition_names_both_states() {
    let h = Harness::new();
    let asset = h.submitted("SRV-AUTH-10").await;
    let err = h
        .engine
        .schedule_inspection(&h.admin.sign("schedule"), asset.id)
        .await
        .unwrap_err();
    match err {
        WorkflowError::InvalidTransition {
            current,
            requested,
            snapshot,
        } => {
            assert_eq!(current, "Pending");
            assert_eq!(requested, "InspectionScheduled");
            assert!(matches!(snapshot, Snapshot::Asset(_)));
        }
        other => panic!("unexpected {other}"),
    }
}

#[tokio::test]
async fn role_changes_apply_on_next_lookup() {
    let h = Harness::new();
    let asset = h.submitted("SRV-AUTH-11").await;
    h.directory.set_role(h.stranger.address(), Role::Admin);
    h.engine
        .assign_inspector(&h.stranger.sign("assign"), asset.id, h.inspector.address())
        .await
        .unwrap();

    h.directory.remove(h.stranger.address());
    let err = h
        .engine
        .schedule_inspection(&h.stranger.sign("schedule"), asset.id)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AuthorizationDenied { role: None, .. }));
}

#[tokio::test]
async fn case_operations_are_admin_or_assignee_only() {
    let h = Harness::new();
    let asset = h.verified("SRV-AUTH-12").await;

    let err = h
        .engine
        .create_transfer_request(&h.buyer.sign("transfer"), asset.id, h.owner.address(), Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AuthorizationDenied { .. }));

    let err = h
        .engine
        .create_transfer_request(&h.owner.sign("transfer"), asset.id, h.stranger.address(), Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PreconditionFailed { .. }));

    let err = h
        .engine
        .create_transfer_request(&h.owner.sign("transfer"), asset.id, h.owner.address(), Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::PreconditionFailed { .. }));

    let case = h
        .engine
        .create_transfer_request(&h.owner.sign("transfer"), asset.id, h.buyer.address(), Vec::new())
        .await
        .unwrap();

    let err = h
        .engine
        .assign_case_inspector(&h.inspector.sign("assign"), case.id, h.inspector.address())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::AuthorizationDenied { .. }));

    let err = h
        .engine
        .approve(&h.admin.sign("approve"), case.id)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
}
