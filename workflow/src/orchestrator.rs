//! The orchestrator and the plumbing shared by every operation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use terra_crypto::{Credentials, IdentityVerifier};
use terra_ledger::LedgerSynchronizer;
use terra_store::{AccountDirectory, EvidenceStore, RecordStore, StoreError, WriteSet};
use terra_types::{
    Area, AssetId, CaseId, Clock, LandAsset, Role, SurveyId, Timestamp, TransferCase, WalletAddress,
};

use crate::{EvidenceInput, RecordRef, Snapshot, WorkflowError};

#[derive(Clone, Debug)]
pub struct WorkflowConfig {
    /// Bound on every evidence store and account directory call.
    pub collaborator_timeout: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            collaborator_timeout: Duration::from_secs(5),
        }
    }
}

/// Static attributes of a parcel submitted for verification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssetSubmission {
    pub survey_id: SurveyId,
    pub location: String,
    pub category: String,
    pub area: Area,
    #[serde(default)]
    pub declared_price: Option<u128>,
    pub evidence: Vec<EvidenceInput>,
}

/// Drives assets and transfer cases through their state machines.
///
/// Holds no record state of its own: every operation reads the latest
/// committed record and writes through a conditional commit, so any number
/// of handlers may share one orchestrator (or run separate ones against the
/// same store).
pub struct Orchestrator {
    pub(crate) records: Arc<dyn RecordStore>,
    pub(crate) evidence: Arc<dyn EvidenceStore>,
    pub(crate) directory: Arc<dyn AccountDirectory>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) verifier: IdentityVerifier,
    pub(crate) anchors: Option<LedgerSynchronizer>,
    pub(crate) config: WorkflowConfig,
}

impl Orchestrator {
    pub fn new(
        records: Arc<dyn RecordStore>,
        evidence: Arc<dyn EvidenceStore>,
        directory: Arc<dyn AccountDirectory>,
        clock: Arc<dyn Clock>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            records,
            evidence,
            directory,
            clock,
            verifier: IdentityVerifier::new(),
            anchors: None,
            config,
        }
    }

    /// Anchor completed transfers through `anchors`.
    pub fn with_ledger(mut self, anchors: LedgerSynchronizer) -> Self {
        self.anchors = Some(anchors);
        self
    }

    pub fn ledger(&self) -> Option<&LedgerSynchronizer> {
        self.anchors.as_ref()
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Confirm the caller controls the claimed account.
    pub(crate) fn authenticate(&self, credentials: &Credentials) -> Result<WalletAddress, WorkflowError> {
        if self.verifier.verify_credentials(credentials) {
            Ok(credentials.account.clone())
        } else {
            tracing::warn!(account = %credentials.account, "authentication failed");
            Err(WorkflowError::AuthenticationFailed {
                account: credentials.account.to_string(),
            })
        }
    }

    /// Run a collaborator call under the configured timeout.
    pub(crate) async fn bounded<F: Future>(&self, what: &str, call: F) -> Result<F::Output, WorkflowError> {
        tokio::time::timeout(self.config.collaborator_timeout, call)
            .await
            .map_err(|_| {
                tracing::warn!(collaborator = what, timeout = ?self.config.collaborator_timeout, "collaborator timed out");
                WorkflowError::CollaboratorUnavailable(format!(
                    "{what} did not answer within {:?}",
                    self.config.collaborator_timeout
                ))
            })
    }

    pub(crate) async fn role_of(&self, account: &WalletAddress) -> Result<Option<Role>, WorkflowError> {
        self.bounded("account directory", self.directory.role_of(account))
            .await?
            .map_err(|e| WorkflowError::CollaboratorUnavailable(format!("account directory: {e}")))
    }

    pub(crate) fn load_asset(&self, id: AssetId) -> Result<LandAsset, WorkflowError> {
        self.records
            .get_asset(id)?
            .ok_or_else(|| WorkflowError::NotFound(id.to_string()))
    }

    pub(crate) fn load_case(&self, id: CaseId) -> Result<TransferCase, WorkflowError> {
        self.records
            .get_case(id)?
            .ok_or_else(|| WorkflowError::NotFound(id.to_string()))
    }

    /// Commit `writes`; a lost race re-reads `target` so the caller can
    /// resynchronize.
    pub(crate) fn commit(&self, writes: WriteSet, target: RecordRef) -> Result<(), WorkflowError> {
        match self.records.commit(writes) {
            Ok(()) => Ok(()),
            Err(StoreError::Conflict { key, expected, found }) => {
                tracing::warn!(%key, ?expected, ?found, "lost optimistic concurrency race");
                let snapshot = match target {
                    RecordRef::Asset(id) => self.records.get_asset(id).ok().flatten().map(Snapshot::from),
                    RecordRef::Case(id) => self.records.get_case(id).ok().flatten().map(Snapshot::from),
                };
                Err(WorkflowError::ConcurrentModification {
                    key: target.to_string(),
                    snapshot,
                })
            }
            Err(e) => Err(WorkflowError::Store(e)),
        }
    }

    pub(crate) fn deny(
        &self,
        account: &WalletAddress,
        role: Option<Role>,
        action: &'static str,
        snapshot: impl Into<Snapshot>,
    ) -> WorkflowError {
        tracing::warn!(%account, ?role, action, "authorization denied");
        WorkflowError::AuthorizationDenied {
            account: account.clone(),
            role,
            action,
            snapshot: Some(snapshot.into()),
        }
    }
}
