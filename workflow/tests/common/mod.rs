//! Shared fixture: an orchestrator wired to nullables plus a cast of actors.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use terra_ledger::LedgerSynchronizer;
use terra_nullables::{NullClock, NullDirectory, NullEvidenceStore, NullStore, TestActor};
use terra_types::{
    Area, AreaUnit, CaseStatus, EvidenceKind, LandAsset, Recommendation, Role, SurveyId,
    TransferCase, VerificationStatus,
};
use terra_workflow::{AssetSubmission, EvidenceInput, InspectionReport, Orchestrator, WorkflowConfig};

pub struct Harness {
    pub store: Arc<NullStore>,
    pub evidence: Arc<NullEvidenceStore>,
    pub directory: Arc<NullDirectory>,
    pub clock: Arc<NullClock>,
    pub engine: Orchestrator,
    pub owner: TestActor,
    pub buyer: TestActor,
    pub inspector: TestActor,
    pub other_inspector: TestActor,
    pub admin: TestActor,
    pub stranger: TestActor,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(WorkflowConfig {
            collaborator_timeout: Duration::from_secs(2),
        })
    }

    pub fn with_config(config: WorkflowConfig) -> Self {
        let store = Arc::new(NullStore::new());
        let evidence = Arc::new(NullEvidenceStore::new());
        let directory = Arc::new(NullDirectory::new());
        let clock = Arc::new(NullClock::new(1_700_000_000));
        let engine = Orchestrator::new(
            store.clone(),
            evidence.clone(),
            directory.clone(),
            clock.clone(),
            config,
        );

        let harness = Self {
            store,
            evidence,
            directory,
            clock,
            engine,
            owner: TestActor::new(1),
            buyer: TestActor::new(2),
            inspector: TestActor::new(3),
            other_inspector: TestActor::new(4),
            admin: TestActor::new(5),
            stranger: TestActor::new(6),
        };
        harness.directory.set_role(harness.owner.address(), Role::Owner);
        harness.directory.set_role(harness.buyer.address(), Role::Owner);
        harness.directory.set_role(harness.inspector.address(), Role::Inspector);
        harness
            .directory
            .set_role(harness.other_inspector.address(), Role::Inspector);
        harness.directory.set_role(harness.admin.address(), Role::Admin);
        harness
    }

    /// Anchor completed transfers through `anchors`.
    pub fn with_ledger(mut self, anchors: LedgerSynchronizer) -> Self {
        self.engine = self.engine.with_ledger(anchors);
        self
    }

    pub fn tick(&self) {
        self.clock.advance(1);
    }

    pub fn submission(survey: &str) -> AssetSubmission {
        AssetSubmission {
            survey_id: SurveyId::parse(survey).unwrap(),
            location: "Plot 12, Riverside Estate".into(),
            category: "residential".into(),
            area: Area {
                value: 600.0,
                unit: AreaUnit::SquareMetres,
            },
            declared_price: Some(250_000),
            evidence: vec![EvidenceInput::Upload {
                kind: EvidenceKind::Deed,
                name: format!("{survey}-deed.pdf"),
                bytes: format!("deed for {survey}").into_bytes(),
            }],
        }
    }

    pub fn report(recommendation: Recommendation) -> InspectionReport {
        InspectionReport {
            report: Some(EvidenceInput::Upload {
                kind: EvidenceKind::InspectionReport,
                name: "site-visit.pdf".into(),
                bytes: format!("site visit: {recommendation}").into_bytes(),
            }),
            recommendation: Some(recommendation),
            notes: "boundary markers match the survey plan".into(),
        }
    }

    pub async fn submitted(&self, survey: &str) -> LandAsset {
        self.tick();
        let asset = self
            .engine
            .submit_for_verification(&self.owner.sign("submit"), Self::submission(survey))
            .await
            .unwrap();
        assert_eq!(asset.status, VerificationStatus::Pending);
        asset
    }

    /// Drive a fresh asset through the full inspection path to `Verified`.
    pub async fn verified(&self, survey: &str) -> LandAsset {
        let asset = self.submitted(survey).await;
        self.tick();
        self.engine
            .assign_inspector(&self.admin.sign("assign"), asset.id, self.inspector.address())
            .await
            .unwrap();
        self.tick();
        self.engine
            .schedule_inspection(&self.inspector.sign("schedule"), asset.id)
            .await
            .unwrap();
        self.tick();
        self.engine
            .submit_inspection_report(
                &self.inspector.sign("report"),
                asset.id,
                Self::report(Recommendation::Approve),
            )
            .await
            .unwrap();
        self.tick();
        let asset = self
            .engine
            .verify(&self.admin.sign("verify"), asset.id)
            .await
            .unwrap();
        assert!(asset.listed_for_sale);
        asset
    }

    /// A verified asset with a case from owner to buyer at `Inspected`.
    pub async fn inspected_case(
        &self,
        survey: &str,
        recommendation: Recommendation,
    ) -> (LandAsset, TransferCase) {
        let asset = self.verified(survey).await;
        self.tick();
        let case = self
            .engine
            .create_transfer_request(
                &self.owner.sign("transfer"),
                asset.id,
                self.buyer.address(),
                Vec::new(),
            )
            .await
            .unwrap();
        self.tick();
        self.engine
            .assign_case_inspector(&self.admin.sign("assign case"), case.id, self.inspector.address())
            .await
            .unwrap();
        self.tick();
        let case = self
            .engine
            .submit_case_inspection_report(
                &self.inspector.sign("case report"),
                case.id,
                Self::report(recommendation),
            )
            .await
            .unwrap();
        assert_eq!(case.status, CaseStatus::Inspected);
        (self.engine.get_asset(asset.id).unwrap(), case)
    }
}
