//! Asset verification sub-machine.

use terra_crypto::Credentials;
use terra_store::{next_version, WriteSet};
use terra_types::{
    AssetId, InspectionOutcome, LandAsset, Notification, Role, Severity, VerificationStatus,
    WalletAddress,
};

use crate::{
    AssetAction, AssetSubmission, InspectionReport, Orchestrator, RecordRef, Snapshot,
    WorkflowError,
};

const SUBMIT: &str = "submit an asset for verification";
const CHANGE_LISTING: &str = "change the sale listing of an asset";

fn gate(asset: &LandAsset, action: AssetAction) -> Result<VerificationStatus, WorkflowError> {
    action.apply(asset.status).ok_or_else(|| {
        tracing::warn!(asset = %asset.id, current = %asset.status, requested = %action.target(), "invalid asset transition");
        WorkflowError::InvalidTransition {
            current: asset.status.to_string(),
            requested: action.target().to_string(),
            snapshot: asset.clone().into(),
        }
    })
}

fn no_snapshot_precondition(reason: impl Into<String>) -> WorkflowError {
    WorkflowError::PreconditionFailed {
        reason: reason.into(),
        snapshot: None,
    }
}

impl Orchestrator {
    fn save_asset(&self, mut asset: LandAsset) -> Result<LandAsset, WorkflowError> {
        self.commit(WriteSet::new().update_asset(asset.clone()), RecordRef::Asset(asset.id))?;
        asset.version = next_version(Some(asset.version));
        Ok(asset)
    }

    /// Register a new parcel as `Pending`. The caller becomes its owner.
    ///
    /// A survey identifier can only be submitted again once its latest
    /// record was rejected; the resubmission is a new record.
    pub async fn submit_for_verification(
        &self,
        credentials: &Credentials,
        submission: AssetSubmission,
    ) -> Result<LandAsset, WorkflowError> {
        let caller = self.authenticate(credentials)?;
        let role = self.role_of(&caller).await?;
        if role.is_none() {
            tracing::warn!(account = %caller, "unregistered account tried to submit an asset");
            return Err(WorkflowError::AuthorizationDenied {
                account: caller,
                role,
                action: SUBMIT,
                snapshot: None,
            });
        }
        if submission.evidence.is_empty() {
            return Err(no_snapshot_precondition("at least one evidence item is required"));
        }
        if submission.location.trim().is_empty() {
            return Err(no_snapshot_precondition("location is required"));
        }
        if !(submission.area.value.is_finite() && submission.area.value > 0.0) {
            return Err(no_snapshot_precondition("area must be a positive number"));
        }

        let now = self.now();
        let evidence = self.resolve_evidence(&submission.evidence, now).await?;

        let previous = self.records.asset_for_survey(&submission.survey_id)?;
        if let Some(previous_id) = previous {
            let existing = self.load_asset(previous_id)?;
            if existing.status != VerificationStatus::Rejected {
                return Err(WorkflowError::precondition(
                    format!(
                        "survey {} is already registered as {} ({})",
                        submission.survey_id, existing.id, existing.status
                    ),
                    existing,
                ));
            }
        }

        let id = self.records.allocate_asset_id()?;
        let mut asset = LandAsset {
            id,
            survey_id: submission.survey_id,
            location: submission.location.trim().to_string(),
            category: submission.category,
            area: submission.area,
            declared_price: submission.declared_price,
            owner: caller.clone(),
            listed_for_sale: false,
            status: VerificationStatus::Pending,
            assigned_inspector: None,
            evidence,
            inspection: None,
            notifications: Vec::new(),
            rejection_reason: None,
            active_case: None,
            created_at: now,
            updated_at: now,
            version: 0,
        };
        asset.notifications.push(Notification::new(
            format!("Asset {} (survey {}) submitted for verification", id, asset.survey_id),
            now,
            [caller.clone()],
            Severity::Info,
        ));

        let survey = asset.survey_id.clone();
        self.commit(
            WriteSet::new()
                .insert_asset(asset.clone())
                .point_survey(survey.clone(), previous, id),
            RecordRef::Asset(id),
        )
        .map_err(|e| match e {
            WorkflowError::ConcurrentModification { key, snapshot: None } => {
                let latest = self
                    .records
                    .asset_for_survey(&survey)
                    .ok()
                    .flatten()
                    .and_then(|winner| self.records.get_asset(winner).ok().flatten());
                WorkflowError::ConcurrentModification {
                    key,
                    snapshot: latest.map(Snapshot::from),
                }
            }
            other => other,
        })?;
        asset.version = next_version(None);

        tracing::info!(asset = %id, survey = %asset.survey_id, owner = %caller, resubmission = previous.is_some(), "asset submitted for verification");
        Ok(asset)
    }

    /// `Pending -> Assigned`. Admin only; the target must hold the inspector role.
    pub async fn assign_inspector(
        &self,
        credentials: &Credentials,
        asset_id: AssetId,
        inspector: &WalletAddress,
    ) -> Result<LandAsset, WorkflowError> {
        let action = AssetAction::AssignInspector;
        let caller = self.authenticate(credentials)?;
        let role = self.role_of(&caller).await?;
        let inspector_role = self.role_of(inspector).await?;

        let mut asset = self.load_asset(asset_id)?;
        if role != Some(Role::Admin) {
            return Err(self.deny(&caller, role, action.describe(), asset));
        }
        let next = gate(&asset, action)?;
        if inspector_role != Some(Role::Inspector) {
            return Err(WorkflowError::precondition(
                format!("{inspector} does not hold the inspector role"),
                asset,
            ));
        }

        let now = self.now();
        asset.status = next;
        asset.assigned_inspector = Some(inspector.clone());
        asset.updated_at = now;
        asset.notifications.push(Notification::new(
            format!("Inspector {inspector} assigned to asset {asset_id}"),
            now,
            [asset.owner.clone(), inspector.clone()],
            Severity::Info,
        ));
        let asset = self.save_asset(asset)?;
        tracing::info!(asset = %asset_id, %inspector, by = %caller, "inspector assigned");
        Ok(asset)
    }

    /// `Assigned -> InspectionScheduled`. The assigned inspector or an admin.
    pub async fn schedule_inspection(
        &self,
        credentials: &Credentials,
        asset_id: AssetId,
    ) -> Result<LandAsset, WorkflowError> {
        let action = AssetAction::ScheduleInspection;
        let caller = self.authenticate(credentials)?;
        let role = self.role_of(&caller).await?;

        let mut asset = self.load_asset(asset_id)?;
        if !matches!(role, Some(Role::Admin | Role::Inspector)) {
            return Err(self.deny(&caller, role, action.describe(), asset));
        }
        let next = gate(&asset, action)?;
        if role != Some(Role::Admin) && asset.assigned_inspector.as_ref() != Some(&caller) {
            return Err(self.deny(&caller, role, action.describe(), asset));
        }

        let now = self.now();
        asset.status = next;
        asset.updated_at = now;
        let recipients = [Some(asset.owner.clone()), asset.assigned_inspector.clone()];
        asset.notifications.push(Notification::new(
            format!("Inspection of asset {asset_id} scheduled"),
            now,
            recipients.into_iter().flatten(),
            Severity::Info,
        ));
        let asset = self.save_asset(asset)?;
        tracing::info!(asset = %asset_id, by = %caller, "inspection scheduled");
        Ok(asset)
    }

    /// `InspectionScheduled -> Inspected`. Assigned inspector only; needs a
    /// recommendation and a report document.
    pub async fn submit_inspection_report(
        &self,
        credentials: &Credentials,
        asset_id: AssetId,
        report: InspectionReport,
    ) -> Result<LandAsset, WorkflowError> {
        let caller = self.authenticate(credentials)?;
        let role = self.role_of(&caller).await?;
        // Only the assigned inspector may write a report into the evidence store.
        self.authorize_report(&caller, role, &self.load_asset(asset_id)?)?;

        let now = self.now();
        let document = match &report.report {
            Some(input) => Some(self.resolve_one(input, now).await?),
            None => None,
        };

        let mut asset = self.load_asset(asset_id)?;
        let next = self.authorize_report(&caller, role, &asset)?;
        let Some(recommendation) = report.recommendation else {
            return Err(WorkflowError::precondition("a recommendation is required", asset));
        };
        let Some(document) = document else {
            return Err(WorkflowError::precondition(
                "an inspection report document is required",
                asset,
            ));
        };

        asset.status = next;
        asset.updated_at = now;
        asset.inspection = Some(InspectionOutcome {
            report: document.hash,
            recommendation,
            notes: report.notes,
            inspector: caller.clone(),
            submitted_at: now,
        });
        asset.evidence.push(document);
        asset.notifications.push(Notification::new(
            format!("Inspection report for asset {asset_id} submitted; inspector recommends {recommendation}"),
            now,
            [asset.owner.clone(), caller.clone()],
            Severity::Info,
        ));
        let asset = self.save_asset(asset)?;
        tracing::info!(asset = %asset_id, %recommendation, by = %caller, "inspection report submitted");
        Ok(asset)
    }

    fn authorize_report(
        &self,
        caller: &WalletAddress,
        role: Option<Role>,
        asset: &LandAsset,
    ) -> Result<VerificationStatus, WorkflowError> {
        let action = AssetAction::SubmitInspectionReport;
        if role != Some(Role::Inspector) {
            return Err(self.deny(caller, role, action.describe(), asset.clone()));
        }
        let next = gate(asset, action)?;
        if asset.assigned_inspector.as_ref() != Some(caller) {
            return Err(self.deny(caller, role, action.describe(), asset.clone()));
        }
        Ok(next)
    }

    /// Check an admin or inspector may hand down a verdict on `asset`.
    /// Inspectors must be the assigned inspector once one is set.
    fn authorize_verdict(
        &self,
        caller: &WalletAddress,
        role: Option<Role>,
        asset: &LandAsset,
        action: AssetAction,
    ) -> Result<VerificationStatus, WorkflowError> {
        if !matches!(role, Some(Role::Admin | Role::Inspector)) {
            return Err(self.deny(caller, role, action.describe(), asset.clone()));
        }
        let next = gate(asset, action)?;
        if role == Some(Role::Inspector)
            && asset
                .assigned_inspector
                .as_ref()
                .is_some_and(|assigned| assigned != caller)
        {
            return Err(self.deny(caller, role, action.describe(), asset.clone()));
        }
        Ok(next)
    }

    /// `Inspected | Pending | Assigned -> Verified`; lists the asset for sale.
    pub async fn verify(
        &self,
        credentials: &Credentials,
        asset_id: AssetId,
    ) -> Result<LandAsset, WorkflowError> {
        let caller = self.authenticate(credentials)?;
        let role = self.role_of(&caller).await?;

        let mut asset = self.load_asset(asset_id)?;
        let next = self.authorize_verdict(&caller, role, &asset, AssetAction::Verify)?;

        let now = self.now();
        let recipients = [Some(asset.owner.clone()), asset.assigned_inspector.take()];
        asset.status = next;
        asset.listed_for_sale = true;
        asset.updated_at = now;
        asset.notifications.push(Notification::new(
            format!("Asset {asset_id} verified and automatically listed for sale"),
            now,
            recipients.into_iter().flatten(),
            Severity::Success,
        ));
        let asset = self.save_asset(asset)?;
        tracing::info!(asset = %asset_id, by = %caller, "asset verified");
        Ok(asset)
    }

    /// `Inspected | Pending | Assigned -> Rejected` with a mandatory reason.
    pub async fn reject(
        &self,
        credentials: &Credentials,
        asset_id: AssetId,
        reason: &str,
    ) -> Result<LandAsset, WorkflowError> {
        let caller = self.authenticate(credentials)?;
        let role = self.role_of(&caller).await?;

        let mut asset = self.load_asset(asset_id)?;
        let next = self.authorize_verdict(&caller, role, &asset, AssetAction::Reject)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::precondition("a rejection reason is required", asset));
        }

        let now = self.now();
        let recipients = [Some(asset.owner.clone()), asset.assigned_inspector.take()];
        asset.status = next;
        asset.listed_for_sale = false;
        asset.rejection_reason = Some(reason.to_string());
        asset.updated_at = now;
        asset.notifications.push(Notification::new(
            format!("Asset {asset_id} rejected: {reason}"),
            now,
            recipients.into_iter().flatten(),
            Severity::Warning,
        ));
        let asset = self.save_asset(asset)?;
        tracing::info!(asset = %asset_id, by = %caller, reason, "asset rejected");
        Ok(asset)
    }

    /// Owner puts a verified asset on the market, or takes it off. This is
    /// how an asset re-enters circulation after a completed transfer.
    pub async fn set_listing(
        &self,
        credentials: &Credentials,
        asset_id: AssetId,
        listed: bool,
    ) -> Result<LandAsset, WorkflowError> {
        let caller = self.authenticate(credentials)?;
        let role = self.role_of(&caller).await?;

        let mut asset = self.load_asset(asset_id)?;
        if role.is_none() || asset.owner != caller {
            return Err(self.deny(&caller, role, CHANGE_LISTING, asset));
        }
        if asset.status != VerificationStatus::Verified {
            return Err(WorkflowError::precondition(
                format!("asset {asset_id} is {} and cannot be listed", asset.status),
                asset,
            ));
        }
        if let Some(open) = asset.active_case {
            return Err(WorkflowError::precondition(
                format!("transfer {open} is still open on asset {asset_id}"),
                asset,
            ));
        }
        if asset.listed_for_sale == listed {
            let state = if listed { "listed" } else { "unlisted" };
            return Err(WorkflowError::precondition(
                format!("asset {asset_id} is already {state}"),
                asset,
            ));
        }

        let now = self.now();
        asset.listed_for_sale = listed;
        asset.updated_at = now;
        let message = if listed {
            format!("Asset {asset_id} listed for sale")
        } else {
            format!("Asset {asset_id} withdrawn from sale")
        };
        asset.notifications.push(Notification::new(
            message,
            now,
            [caller.clone()],
            Severity::Info,
        ));
        let asset = self.save_asset(asset)?;
        tracing::info!(asset = %asset_id, listed, "sale listing changed");
        Ok(asset)
    }
}
