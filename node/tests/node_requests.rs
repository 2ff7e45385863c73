//! End-to-end requests through a node backed by a real LMDB environment.

use std::sync::Arc;

use terra_ledger::LedgerAdapter;
use terra_node::{AccountEntry, NodeConfig, NodeError, Operation, Reply, SignedRequest, TerraNode};
use terra_nullables::{NullClock, NullLedger, TestActor};
use terra_store::{RecordStore, WriteSet};
use terra_store_lmdb::LmdbEnvironment;
use terra_types::{
    Area, AreaUnit, CaseStatus, EvidenceKind, Recommendation, Role, SurveyId, VerificationStatus,
};
use terra_workflow::{AssetSubmission, EvidenceInput, InspectionReport, Snapshot, WorkflowError};

struct Cast {
    owner: TestActor,
    buyer: TestActor,
    inspector: TestActor,
    admin: TestActor,
}

impl Cast {
    fn new() -> Self {
        Self {
            owner: TestActor::new(11),
            buyer: TestActor::new(12),
            inspector: TestActor::new(13),
            admin: TestActor::new(14),
        }
    }

    fn accounts(&self) -> Vec<AccountEntry> {
        [
            (&self.owner, Role::Owner),
            (&self.buyer, Role::Owner),
            (&self.inspector, Role::Inspector),
            (&self.admin, Role::Admin),
        ]
        .into_iter()
        .map(|(actor, role)| AccountEntry {
            address: actor.address().clone(),
            role,
        })
        .collect()
    }
}

fn config(dir: &tempfile::TempDir, cast: &Cast) -> NodeConfig {
    NodeConfig {
        data_dir: dir.path().to_path_buf(),
        map_size_mb: 16,
        enable_metrics: true,
        accounts: cast.accounts(),
        ..NodeConfig::default()
    }
}

async fn open(
    dir: &tempfile::TempDir,
    cast: &Cast,
    ledger: Option<Arc<NullLedger>>,
) -> TerraNode {
    let adapter = ledger.map(|l| l as Arc<dyn LedgerAdapter>);
    TerraNode::open_with(config(dir, cast), Arc::new(NullClock::new(1_700_000_000)), adapter)
        .await
        .unwrap()
}

fn signed(actor: &TestActor, operation: Operation) -> SignedRequest {
    SignedRequest::sign(actor.keypair(), operation).unwrap()
}

fn report(recommendation: Recommendation) -> InspectionReport {
    InspectionReport {
        report: Some(EvidenceInput::Upload {
            kind: EvidenceKind::InspectionReport,
            name: "visit.pdf".into(),
            bytes: b"visited".to_vec(),
        }),
        recommendation: Some(recommendation),
        notes: String::new(),
    }
}

fn submission(survey: &str) -> AssetSubmission {
    AssetSubmission {
        survey_id: SurveyId::parse(survey).unwrap(),
        location: "Lot 4, Hill Road".into(),
        category: "agricultural".into(),
        area: Area {
            value: 2.5,
            unit: AreaUnit::Hectares,
        },
        declared_price: None,
        evidence: vec![EvidenceInput::Upload {
            kind: EvidenceKind::Deed,
            name: "deed.pdf".into(),
            bytes: b"deed".to_vec(),
        }],
    }
}

fn asset_of(snapshot: Snapshot) -> terra_types::LandAsset {
    match snapshot {
        Snapshot::Asset(asset) => *asset,
        other => panic!("expected asset, got {other:?}"),
    }
}

fn case_of(snapshot: Snapshot) -> terra_types::TransferCase {
    match snapshot {
        Snapshot::Case(case) => *case,
        other => panic!("expected case, got {other:?}"),
    }
}

/// Submit and verify an asset, then open a case to the buyer and inspect it.
async fn inspected_case(node: &TerraNode, cast: &Cast, survey: &str) -> terra_types::TransferCase {
    let asset = asset_of(
        node.apply(&signed(&cast.owner, Operation::SubmitForVerification { submission: submission(survey) }))
            .await
            .unwrap(),
    );
    let steps = [
        (&cast.admin, Operation::AssignInspector { asset_id: asset.id, inspector: cast.inspector.address().clone() }),
        (&cast.inspector, Operation::ScheduleInspection { asset_id: asset.id }),
        (&cast.inspector, Operation::SubmitInspectionReport { asset_id: asset.id, report: report(Recommendation::Approve) }),
        (&cast.admin, Operation::Verify { asset_id: asset.id }),
    ];
    for (actor, operation) in steps {
        node.apply(&signed(actor, operation)).await.unwrap();
    }
    assert_eq!(node.get_asset(asset.id).unwrap().status, VerificationStatus::Verified);

    let case = case_of(
        node.apply(&signed(
            &cast.owner,
            Operation::CreateTransferRequest {
                asset_id: asset.id,
                to: cast.buyer.address().clone(),
                evidence: Vec::new(),
            },
        ))
        .await
        .unwrap(),
    );
    node.apply(&signed(
        &cast.admin,
        Operation::AssignCaseInspector { case_id: case.id, inspector: cast.inspector.address().clone() },
    ))
    .await
    .unwrap();
    case_of(
        node.apply(&signed(
            &cast.inspector,
            Operation::SubmitCaseInspectionReport { case_id: case.id, report: report(Recommendation::Approve) },
        ))
        .await
        .unwrap(),
    )
}

#[tokio::test]
async fn full_transfer_over_signed_requests() {
    let dir = tempfile::tempdir().unwrap();
    let cast = Cast::new();
    let ledger = Arc::new(NullLedger::new());
    let node = open(&dir, &cast, Some(ledger.clone())).await;

    let case = inspected_case(&node, &cast, "SRV-NODE-1").await;
    let done = case_of(
        node.apply(&signed(&cast.admin, Operation::Approve { case_id: case.id }))
            .await
            .unwrap(),
    );
    assert_eq!(done.status, CaseStatus::Completed);
    assert_eq!(node.get_asset(case.asset_id).unwrap().owner, *cast.buyer.address());

    let notes = node.list_notifications(cast.buyer.address()).unwrap();
    assert!(notes.iter().any(|n| n.notification.message.contains("completed")));

    let metrics = node.metrics().unwrap().clone();
    let stats = node.stop().await.unwrap().unwrap();
    assert_eq!(stats.succeeded, 1);
    assert_eq!(ledger.anchored().len(), 1);
    assert_eq!(
        metrics.transitions.with_label_values(&["approve", "ok"]).get(),
        1
    );
    assert_eq!(metrics.anchor_succeeded.get(), 1);
}

#[tokio::test]
async fn records_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let cast = Cast::new();
    let asset_id = {
        let node = open(&dir, &cast, None).await;
        let asset = asset_of(
            node.apply(&signed(&cast.owner, Operation::SubmitForVerification { submission: submission("SRV-NODE-2") }))
                .await
                .unwrap(),
        );
        node.stop().await.unwrap();
        asset.id
    };

    let node = open(&dir, &cast, None).await;
    let asset = node.get_asset(asset_id).unwrap();
    assert_eq!(asset.status, VerificationStatus::Pending);
    assert_eq!(asset.version, 1);
    assert_eq!(asset.evidence.len(), 1);
}

#[tokio::test]
async fn message_must_match_operation() {
    let dir = tempfile::tempdir().unwrap();
    let cast = Cast::new();
    let node = open(&dir, &cast, None).await;

    let mut request = signed(&cast.owner, Operation::SubmitForVerification { submission: submission("SRV-NODE-3") });
    request.operation = Operation::SubmitForVerification { submission: submission("SRV-NODE-4") };
    let err = node.apply(&request).await.unwrap_err();
    assert!(matches!(
        err,
        NodeError::Workflow(WorkflowError::AuthenticationFailed { .. })
    ));

    let mut forged = signed(&cast.owner, Operation::Verify { asset_id: terra_types::AssetId(1) });
    forged.account = cast.admin.address().clone();
    assert_eq!(node.apply(&forged).await.unwrap_err().kind(), "authentication_failed");
}

#[tokio::test]
async fn crlf_rewritten_message_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let cast = Cast::new();
    let node = open(&dir, &cast, None).await;

    let mut request = signed(&cast.owner, Operation::SubmitForVerification { submission: submission("SRV-NODE-CRLF") });
    request.message = request.message.replace('\n', "\r\n");
    request.message.push_str("  \r\n");
    let asset = asset_of(node.apply(&request).await.unwrap());
    assert_eq!(asset.owner, *cast.owner.address());
    assert_eq!(asset.status, VerificationStatus::Pending);

    let mut swapped = signed(&cast.owner, Operation::SubmitForVerification { submission: submission("SRV-NODE-CRLF2") });
    swapped.message = swapped.message.replace('\n', "\r\n");
    swapped.operation = Operation::SubmitForVerification { submission: submission("SRV-NODE-CRLF3") };
    assert_eq!(node.apply(&swapped).await.unwrap_err().kind(), "authentication_failed");
}

#[tokio::test]
async fn rejections_render_current_state() {
    let dir = tempfile::tempdir().unwrap();
    let cast = Cast::new();
    let node = open(&dir, &cast, None).await;
    let asset = asset_of(
        node.apply(&signed(&cast.owner, Operation::SubmitForVerification { submission: submission("SRV-NODE-5") }))
            .await
            .unwrap(),
    );

    let reply = node
        .handle(&signed(&cast.owner, Operation::Verify { asset_id: asset.id }))
        .await;
    assert!(!reply.is_ok());
    let json = serde_json::to_value(&reply).unwrap();
    assert_eq!(json["status"], "error");
    assert_eq!(json["kind"], "authorization_denied");
    assert_eq!(json["retryable"], false);
    assert_eq!(json["current"]["kind"], "asset");
    assert_eq!(json["current"]["record"]["status"], "Pending");

    let ok = node
        .handle(&signed(&cast.admin, Operation::Reject { asset_id: asset.id, reason: "survey plan unreadable".into() }))
        .await;
    assert!(matches!(ok, Reply::Ok { .. }));
}

#[tokio::test]
async fn startup_completes_approved_transfers() {
    let dir = tempfile::tempdir().unwrap();
    let cast = Cast::new();
    let case = {
        let node = open(&dir, &cast, None).await;
        let case = inspected_case(&node, &cast, "SRV-NODE-6").await;
        node.stop().await.unwrap();
        case
    };

    // Mark the case approved directly, as if the process died between the
    // two commits of an approval.
    {
        let env = LmdbEnvironment::open(dir.path(), 16 * 1024 * 1024).unwrap();
        let store = env.record_store();
        let mut approved = store.get_case(case.id).unwrap().unwrap();
        approved.status = CaseStatus::Approved;
        store.commit(WriteSet::new().update_case(approved)).unwrap();
    }

    let node = open(&dir, &cast, None).await;
    assert_eq!(node.recovered_at_startup(), &[case.id]);
    let case = node.get_case(case.id).unwrap();
    assert_eq!(case.status, CaseStatus::Completed);
    assert_eq!(node.get_asset(case.asset_id).unwrap().owner, *cast.buyer.address());
    assert!(node.recover().unwrap().is_empty());
}

#[tokio::test]
async fn http_ledger_is_used_when_enabled() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/anchors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"receipt_id": "rcpt-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cast = Cast::new();
    let mut config = config(&dir, &cast);
    config.ledger.enabled = true;
    config.ledger.endpoint = server.uri();
    config.ledger.request_timeout_ms = 2_000;
    let node = TerraNode::open(config).await.unwrap();

    let case = inspected_case(&node, &cast, "SRV-NODE-7").await;
    node.apply(&signed(&cast.admin, Operation::Approve { case_id: case.id }))
        .await
        .unwrap();
    let stats = node.stop().await.unwrap().unwrap();
    assert_eq!((stats.submitted, stats.succeeded), (1, 1));
}
