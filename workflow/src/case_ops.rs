//! Transfer case sub-machine, including two-phase approve/finalize.
//!
//! Approval first commits the case as `Approved`, which is the durable
//! marker that the transfer was granted. Finalization then reassigns the
//! asset and completes the case in one write set. If finalization does not
//! land, the case stays `Approved` and
//! [`Orchestrator::recover_pending_finalizations`] completes it later.

use terra_crypto::Credentials;
use terra_ledger::AnchorRecord;
use terra_store::{next_version, WriteSet};
use terra_types::{
    AssetId, CaseId, CaseStatus, InspectionOutcome, LandAsset, Notification, Role, Severity,
    TransferCase, VerificationStatus, WalletAddress,
};

use crate::{CaseAction, EvidenceInput, InspectionReport, Orchestrator, RecordRef, WorkflowError};

const OPEN_TRANSFER: &str = "open a transfer request";

fn gate(case: &TransferCase, action: CaseAction) -> Result<CaseStatus, WorkflowError> {
    action.apply(case.status).ok_or_else(|| {
        tracing::warn!(case = %case.id, current = %case.status, requested = %action.target(), "invalid case transition");
        WorkflowError::InvalidTransition {
            current: case.status.to_string(),
            requested: action.target().to_string(),
            snapshot: case.clone().into(),
        }
    })
}

impl Orchestrator {
    fn save_case(&self, mut case: TransferCase) -> Result<TransferCase, WorkflowError> {
        self.commit(WriteSet::new().update_case(case.clone()), RecordRef::Case(case.id))?;
        case.version = next_version(Some(case.version));
        Ok(case)
    }

    fn authorize_seller(
        &self,
        caller: &WalletAddress,
        role: Option<Role>,
        asset: LandAsset,
    ) -> Result<LandAsset, WorkflowError> {
        if role.is_none() || asset.owner != *caller {
            return Err(self.deny(caller, role, OPEN_TRANSFER, asset));
        }
        Ok(asset)
    }

    fn authorize_case_report(
        &self,
        caller: &WalletAddress,
        role: Option<Role>,
        case: &TransferCase,
    ) -> Result<CaseStatus, WorkflowError> {
        let action = CaseAction::SubmitInspectionReport;
        if role != Some(Role::Inspector) {
            return Err(self.deny(caller, role, action.describe(), case.clone()));
        }
        let next = gate(case, action)?;
        if case.assigned_inspector.as_ref() != Some(caller) {
            return Err(self.deny(caller, role, action.describe(), case.clone()));
        }
        Ok(next)
    }

    /// Open a `Pending` case against a listed asset. The asset is taken off
    /// the market in the same commit that creates the case, so at most one
    /// open case can exist per asset.
    pub async fn create_transfer_request(
        &self,
        credentials: &Credentials,
        asset_id: AssetId,
        to: &WalletAddress,
        evidence: Vec<EvidenceInput>,
    ) -> Result<TransferCase, WorkflowError> {
        let caller = self.authenticate(credentials)?;
        let role = self.role_of(&caller).await?;
        let buyer_role = self.role_of(to).await?;
        // A caller who does not own the asset never reaches the evidence store.
        self.authorize_seller(&caller, role, self.load_asset(asset_id)?)?;
        let now = self.now();
        let evidence = self.resolve_evidence(&evidence, now).await?;

        let mut asset = self.authorize_seller(&caller, role, self.load_asset(asset_id)?)?;
        if !asset.listed_for_sale {
            return Err(WorkflowError::precondition(
                format!("asset {asset_id} is not listed for sale"),
                asset,
            ));
        }
        if let Some(open) = asset.active_case {
            return Err(WorkflowError::precondition(
                format!("transfer {open} is still open on asset {asset_id}"),
                asset,
            ));
        }
        if *to == caller {
            return Err(WorkflowError::precondition(
                "buyer and seller must be different accounts",
                asset,
            ));
        }
        if buyer_role.is_none() {
            return Err(WorkflowError::precondition(
                format!("{to} is not a registered account"),
                asset,
            ));
        }

        let id = self.records.allocate_case_id()?;
        let mut case = TransferCase {
            id,
            asset_id,
            from: caller.clone(),
            to: to.clone(),
            status: CaseStatus::Pending,
            assigned_inspector: None,
            inspection: None,
            evidence,
            notifications: Vec::new(),
            rejection_reason: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            version: 0,
        };
        case.notifications.push(Notification::new(
            format!("Transfer {id} of asset {asset_id} from {caller} to {to} requested"),
            now,
            case.audience(),
            Severity::Info,
        ));

        asset.listed_for_sale = false;
        asset.active_case = Some(id);
        asset.updated_at = now;
        asset.notifications.push(Notification::new(
            format!("Asset {asset_id} withdrawn from sale while transfer {id} is processed"),
            now,
            [caller.clone()],
            Severity::Info,
        ));

        self.commit(
            WriteSet::new()
                .insert_case(case.clone())
                .update_asset(asset),
            RecordRef::Asset(asset_id),
        )?;
        case.version = next_version(None);
        tracing::info!(case = %id, asset = %asset_id, from = %caller, %to, "transfer requested");
        Ok(case)
    }

    /// `Pending -> InspectionScheduled`. Admin only.
    pub async fn assign_case_inspector(
        &self,
        credentials: &Credentials,
        case_id: CaseId,
        inspector: &WalletAddress,
    ) -> Result<TransferCase, WorkflowError> {
        let action = CaseAction::AssignInspector;
        let caller = self.authenticate(credentials)?;
        let role = self.role_of(&caller).await?;
        let inspector_role = self.role_of(inspector).await?;

        let mut case = self.load_case(case_id)?;
        if role != Some(Role::Admin) {
            return Err(self.deny(&caller, role, action.describe(), case));
        }
        let next = gate(&case, action)?;
        if inspector_role != Some(Role::Inspector) {
            return Err(WorkflowError::precondition(
                format!("{inspector} does not hold the inspector role"),
                case,
            ));
        }
        if *inspector == case.from || *inspector == case.to {
            return Err(WorkflowError::precondition(
                "a party to the transfer cannot inspect it",
                case,
            ));
        }

        let now = self.now();
        case.status = next;
        case.assigned_inspector = Some(inspector.clone());
        case.updated_at = now;
        case.notifications.push(Notification::new(
            format!("Inspector {inspector} assigned to transfer {case_id}; inspection scheduled"),
            now,
            case.audience(),
            Severity::Info,
        ));
        let case = self.save_case(case)?;
        tracing::info!(case = %case_id, %inspector, by = %caller, "case inspector assigned");
        Ok(case)
    }

    /// `InspectionScheduled -> Inspected`. Assigned inspector only.
    pub async fn submit_case_inspection_report(
        &self,
        credentials: &Credentials,
        case_id: CaseId,
        report: InspectionReport,
    ) -> Result<TransferCase, WorkflowError> {
        let caller = self.authenticate(credentials)?;
        let role = self.role_of(&caller).await?;
        self.authorize_case_report(&caller, role, &self.load_case(case_id)?)?;

        let now = self.now();
        let document = match &report.report {
            Some(input) => Some(self.resolve_one(input, now).await?),
            None => None,
        };

        let mut case = self.load_case(case_id)?;
        let next = self.authorize_case_report(&caller, role, &case)?;
        let Some(recommendation) = report.recommendation else {
            return Err(WorkflowError::precondition("a recommendation is required", case));
        };
        let Some(document) = document else {
            return Err(WorkflowError::precondition(
                "an inspection report document is required",
                case,
            ));
        };

        case.status = next;
        case.updated_at = now;
        case.inspection = Some(InspectionOutcome {
            report: document.hash,
            recommendation,
            notes: report.notes,
            inspector: caller.clone(),
            submitted_at: now,
        });
        case.evidence.push(document);
        case.notifications.push(Notification::new(
            format!("Inspection report for transfer {case_id} submitted; inspector recommends {recommendation}"),
            now,
            case.audience(),
            Severity::Info,
        ));
        let case = self.save_case(case)?;
        tracing::info!(case = %case_id, %recommendation, by = %caller, "case inspection report submitted");
        Ok(case)
    }

    /// `Inspected -> Approved -> Completed`. Admin only.
    ///
    /// Returns the case as `Completed`, or as `Approved` if finalization was
    /// deferred to recovery.
    pub async fn approve(
        &self,
        credentials: &Credentials,
        case_id: CaseId,
    ) -> Result<TransferCase, WorkflowError> {
        let action = CaseAction::Approve;
        let caller = self.authenticate(credentials)?;
        let role = self.role_of(&caller).await?;

        let mut case = self.load_case(case_id)?;
        if role != Some(Role::Admin) {
            return Err(self.deny(&caller, role, action.describe(), case));
        }
        let next = gate(&case, action)?;

        let now = self.now();
        case.status = next;
        case.updated_at = now;
        case.notifications.push(Notification::new(
            format!("Transfer {case_id} approved by {caller}"),
            now,
            case.audience(),
            Severity::Success,
        ));
        let approved = self.save_case(case)?;
        tracing::info!(case = %case_id, by = %caller, "transfer approved");

        match self.finalize(approved.clone()) {
            Ok(completed) => Ok(completed),
            Err(e) => {
                tracing::warn!(case = %case_id, error = %e, "finalization deferred, case stays approved");
                Ok(self
                    .records
                    .get_case(case_id)
                    .ok()
                    .flatten()
                    .unwrap_or(approved))
            }
        }
    }

    /// Retry finalization of an `Approved` case. Admin only.
    pub async fn finalize_transfer(
        &self,
        credentials: &Credentials,
        case_id: CaseId,
    ) -> Result<TransferCase, WorkflowError> {
        let caller = self.authenticate(credentials)?;
        let role = self.role_of(&caller).await?;
        let case = self.load_case(case_id)?;
        if role != Some(Role::Admin) {
            return Err(self.deny(&caller, role, CaseAction::Finalize.describe(), case));
        }
        self.finalize(case)
    }

    /// Complete every case left `Approved` by an interrupted finalization.
    /// Returns the ids that were completed; failures are logged and left
    /// for the next run.
    pub fn recover_pending_finalizations(&self) -> Result<Vec<CaseId>, WorkflowError> {
        let pending = self.records.cases_with_status(CaseStatus::Approved)?;
        let mut completed = Vec::with_capacity(pending.len());
        for case in pending {
            let id = case.id;
            match self.finalize(case) {
                Ok(_) => completed.push(id),
                Err(e) => tracing::warn!(case = %id, error = %e, "could not finalize approved transfer"),
            }
        }
        if !completed.is_empty() {
            tracing::info!(count = completed.len(), "recovered approved transfers");
        }
        Ok(completed)
    }

    /// `Approved -> Completed`, reassigning the asset in the same write set.
    ///
    /// If the asset already belongs to the buyer, only the case advances.
    fn finalize(&self, mut case: TransferCase) -> Result<TransferCase, WorkflowError> {
        let next = gate(&case, CaseAction::Finalize)?;
        let mut asset = self.load_asset(case.asset_id)?;
        let now = self.now();
        let mut writes = WriteSet::new();

        if asset.owner == case.to {
            if asset.active_case == Some(case.id) {
                asset.active_case = None;
                asset.updated_at = now;
                writes = writes.update_asset(asset.clone());
            }
        } else if asset.owner == case.from && asset.active_case == Some(case.id) {
            asset.owner = case.to.clone();
            asset.listed_for_sale = false;
            asset.active_case = None;
            asset.updated_at = now;
            asset.notifications.push(Notification::new(
                format!(
                    "Ownership of asset {} transferred from {} to {} under transfer {}",
                    asset.id, case.from, case.to, case.id
                ),
                now,
                [case.from.clone(), case.to.clone()],
                Severity::Success,
            ));
            writes = writes.update_asset(asset.clone());
        } else {
            return Err(WorkflowError::precondition(
                format!("asset {} is not held for transfer {}", asset.id, case.id),
                case,
            ));
        }

        case.status = next;
        case.completed_at = Some(now);
        case.updated_at = now;
        case.notifications.push(Notification::new(
            format!("Transfer {} completed; {} now owns asset {}", case.id, case.to, case.asset_id),
            now,
            case.audience(),
            Severity::Success,
        ));
        writes = writes.update_case(case.clone());
        self.commit(writes, RecordRef::Case(case.id))?;
        case.version = next_version(Some(case.version));
        tracing::info!(case = %case.id, asset = %case.asset_id, owner = %case.to, "transfer completed");

        if let Some(anchors) = &self.anchors {
            if let Some(record) = AnchorRecord::for_completed(&case, asset.survey_id.clone()) {
                anchors.submit(record);
            }
        }
        Ok(case)
    }

    /// `Inspected -> Rejected` with a mandatory reason. Admin only. The
    /// asset goes back on the market.
    pub async fn reject_case(
        &self,
        credentials: &Credentials,
        case_id: CaseId,
        reason: &str,
    ) -> Result<TransferCase, WorkflowError> {
        let action = CaseAction::Reject;
        let caller = self.authenticate(credentials)?;
        let role = self.role_of(&caller).await?;

        let mut case = self.load_case(case_id)?;
        if role != Some(Role::Admin) {
            return Err(self.deny(&caller, role, action.describe(), case));
        }
        let next = gate(&case, action)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::precondition("a rejection reason is required", case));
        }
        let mut asset = self.load_asset(case.asset_id)?;

        let now = self.now();
        case.status = next;
        case.rejection_reason = Some(reason.to_string());
        case.updated_at = now;
        case.notifications.push(Notification::new(
            format!("Transfer {case_id} rejected: {reason}"),
            now,
            case.audience(),
            Severity::Warning,
        ));
        let mut writes = WriteSet::new().update_case(case.clone());
        if asset.active_case == Some(case_id) {
            asset.active_case = None;
            asset.listed_for_sale = asset.status == VerificationStatus::Verified;
            asset.updated_at = now;
            asset.notifications.push(Notification::new(
                format!("Asset {} relisted for sale after transfer {case_id} was rejected", asset.id),
                now,
                [asset.owner.clone()],
                Severity::Info,
            ));
            writes = writes.update_asset(asset);
        }
        self.commit(writes, RecordRef::Case(case_id))?;
        case.version = next_version(Some(case.version));
        tracing::info!(case = %case_id, by = %caller, reason, "transfer rejected");
        Ok(case)
    }
}
