//! The Terra node: one LMDB environment, the workflow orchestrator, and an
//! optional ledger anchor worker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use terra_ledger::{AnchorStats, AnchorStatsSnapshot, HttpLedgerAdapter, LedgerAdapter, LedgerSynchronizer};
use terra_store_lmdb::{check_integrity, LmdbEnvironment, LmdbError};
use terra_types::{AssetId, CaseId, Clock, LandAsset, SystemClock, TransferCase, WalletAddress};
use terra_workflow::{NotificationEntry, Orchestrator, Snapshot, WorkflowError};

use crate::config::NodeConfig;
use crate::directory::ConfigDirectory;
use crate::error::NodeError;
use crate::metrics::NodeMetrics;
use crate::request::{Operation, Reply, SignedRequest};

struct AnchorWorker {
    stats: Arc<AnchorStats>,
    handle: JoinHandle<()>,
}

pub struct TerraNode {
    config: NodeConfig,
    environment: LmdbEnvironment,
    engine: Orchestrator,
    directory: Arc<ConfigDirectory>,
    metrics: Option<Arc<NodeMetrics>>,
    anchors: Option<AnchorWorker>,
    recovered_at_startup: Vec<CaseId>,
}

impl TerraNode {
    /// Open the node described by `config`: wall-clock time, and an HTTP
    /// ledger adapter when `[ledger]` is enabled.
    pub async fn open(config: NodeConfig) -> Result<Self, NodeError> {
        let adapter: Option<Arc<dyn LedgerAdapter>> = config.ledger.enabled.then(|| {
            Arc::new(HttpLedgerAdapter::new(
                config.ledger.endpoint.clone(),
                Duration::from_millis(config.ledger.request_timeout_ms),
            )) as Arc<dyn LedgerAdapter>
        });
        Self::open_with(config, Arc::new(SystemClock), adapter).await
    }

    /// Open with an explicit clock and ledger adapter.
    ///
    /// Checks database integrity before accepting requests, then completes
    /// any transfer left `Approved` by an interrupted finalization.
    pub async fn open_with(
        config: NodeConfig,
        clock: Arc<dyn Clock>,
        adapter: Option<Arc<dyn LedgerAdapter>>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let environment = LmdbEnvironment::open(&config.data_dir, config.map_size_bytes())?;

        let report = check_integrity(&environment)?;
        if !report.is_healthy() {
            for error in &report.errors {
                tracing::error!(%error, "integrity check");
            }
            return Err(NodeError::Integrity(report.errors.join("; ")));
        }
        tracing::info!(
            path = %config.data_dir.display(),
            assets = report.assets,
            cases = report.cases,
            "database opened"
        );

        let directory = Arc::new(ConfigDirectory::from_entries(&config.accounts));
        let mut engine = Orchestrator::new(
            Arc::new(environment.record_store()),
            Arc::new(environment.evidence_store()),
            directory.clone(),
            clock,
            config.workflow_config(),
        );

        let anchors = match adapter {
            Some(adapter) => {
                let (synchronizer, handle) =
                    LedgerSynchronizer::spawn(adapter, config.ledger.anchor_config());
                let stats = synchronizer.stats();
                engine = engine.with_ledger(synchronizer);
                tracing::info!(endpoint = %config.ledger.endpoint, "ledger anchoring enabled");
                Some(AnchorWorker { stats, handle })
            }
            None => None,
        };

        let metrics = config.enable_metrics.then(|| Arc::new(NodeMetrics::new()));
        let mut node = Self {
            config,
            environment,
            engine,
            directory,
            metrics,
            anchors,
            recovered_at_startup: Vec::new(),
        };
        node.recovered_at_startup = node.recover()?;
        Ok(node)
    }

    /// Verify, dispatch and meter one signed request.
    pub async fn apply(&self, request: &SignedRequest) -> Result<Snapshot, NodeError> {
        let started = Instant::now();
        let operation = request.operation.name();
        let result = self.dispatch(request).await;

        match &result {
            Ok(_) => tracing::debug!(operation, account = %request.account, "request applied"),
            Err(e) => tracing::debug!(operation, account = %request.account, error = %e, "request rejected"),
        }
        if let Some(metrics) = &self.metrics {
            let outcome = result.as_ref().map_or_else(NodeError::kind, |_| "ok");
            metrics.record_transition(operation, outcome, started.elapsed());
            if let Some(stats) = self.anchor_stats() {
                metrics.observe_anchors(&stats);
            }
        }
        result
    }

    /// [`TerraNode::apply`] rendered as a reply.
    pub async fn handle(&self, request: &SignedRequest) -> Reply {
        self.apply(request).await.into()
    }

    async fn dispatch(&self, request: &SignedRequest) -> Result<Snapshot, NodeError> {
        let credentials = request.credentials()?;
        if !request.message_matches(&credentials)? {
            tracing::warn!(account = %request.account, operation = request.operation.name(), "signed message does not match operation");
            return Err(WorkflowError::AuthenticationFailed {
                account: request.account.to_string(),
            }
            .into());
        }

        let engine = &self.engine;
        let c = &credentials;
        let snapshot = match request.operation.clone() {
            Operation::SubmitForVerification { submission } => {
                engine.submit_for_verification(c, submission).await?.into()
            }
            Operation::AssignInspector { asset_id, inspector } => {
                engine.assign_inspector(c, asset_id, &inspector).await?.into()
            }
            Operation::ScheduleInspection { asset_id } => {
                engine.schedule_inspection(c, asset_id).await?.into()
            }
            Operation::SubmitInspectionReport { asset_id, report } => {
                engine.submit_inspection_report(c, asset_id, report).await?.into()
            }
            Operation::Verify { asset_id } => engine.verify(c, asset_id).await?.into(),
            Operation::Reject { asset_id, reason } => {
                engine.reject(c, asset_id, &reason).await?.into()
            }
            Operation::SetListing { asset_id, listed } => {
                engine.set_listing(c, asset_id, listed).await?.into()
            }
            Operation::CreateTransferRequest {
                asset_id,
                to,
                evidence,
            } => engine
                .create_transfer_request(c, asset_id, &to, evidence)
                .await?
                .into(),
            Operation::AssignCaseInspector { case_id, inspector } => engine
                .assign_case_inspector(c, case_id, &inspector)
                .await?
                .into(),
            Operation::SubmitCaseInspectionReport { case_id, report } => engine
                .submit_case_inspection_report(c, case_id, report)
                .await?
                .into(),
            Operation::Approve { case_id } => engine.approve(c, case_id).await?.into(),
            Operation::FinalizeTransfer { case_id } => {
                engine.finalize_transfer(c, case_id).await?.into()
            }
            Operation::RejectCase { case_id, reason } => {
                engine.reject_case(c, case_id, &reason).await?.into()
            }
        };
        Ok(snapshot)
    }

    /// Complete transfers left `Approved`. Runs at startup; safe to repeat.
    pub fn recover(&self) -> Result<Vec<CaseId>, NodeError> {
        let recovered = self.engine.recover_pending_finalizations()?;
        if !recovered.is_empty() {
            tracing::info!(cases = ?recovered, "completed interrupted transfers");
        }
        Ok(recovered)
    }

    pub fn get_asset(&self, id: AssetId) -> Result<LandAsset, NodeError> {
        Ok(self.engine.get_asset(id)?)
    }

    pub fn get_case(&self, id: CaseId) -> Result<TransferCase, NodeError> {
        Ok(self.engine.get_case(id)?)
    }

    pub fn cases_for_asset(&self, id: AssetId) -> Result<Vec<TransferCase>, NodeError> {
        Ok(self.engine.cases_for_asset(id)?)
    }

    pub fn list_notifications(
        &self,
        account: &WalletAddress,
    ) -> Result<Vec<NotificationEntry>, NodeError> {
        Ok(self.engine.list_notifications(account)?)
    }

    /// Cases completed by the recovery pass in [`TerraNode::open_with`].
    pub fn recovered_at_startup(&self) -> &[CaseId] {
        &self.recovered_at_startup
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn directory(&self) -> &Arc<ConfigDirectory> {
        &self.directory
    }

    pub fn metrics(&self) -> Option<&Arc<NodeMetrics>> {
        self.metrics.as_ref()
    }

    pub fn anchor_stats(&self) -> Option<AnchorStatsSnapshot> {
        self.anchors.as_ref().map(|a| a.stats.snapshot())
    }

    /// Stop accepting work, let queued anchors finish, and flush the
    /// database. Returns the final anchor counters when anchoring was on.
    pub async fn stop(self) -> Result<Option<AnchorStatsSnapshot>, NodeError> {
        let Self {
            engine,
            environment,
            metrics,
            anchors,
            ..
        } = self;
        drop(engine);

        let stats = match anchors {
            Some(AnchorWorker { stats, handle }) => {
                handle.await.map_err(|e| NodeError::Worker(e.to_string()))?;
                let snapshot = stats.snapshot();
                if let Some(metrics) = &metrics {
                    metrics.observe_anchors(&snapshot);
                }
                tracing::info!(
                    succeeded = snapshot.succeeded,
                    failed = snapshot.failed,
                    dropped = snapshot.dropped,
                    "anchor worker drained"
                );
                Some(snapshot)
            }
            None => None,
        };

        environment.env().force_sync().map_err(LmdbError::from)?;
        tracing::info!("node stopped");
        Ok(stats)
    }
}
