//! Read-only queries. Every call reads the store directly.

use std::fmt;

use serde::{Deserialize, Serialize};

use terra_types::{AssetId, CaseId, LandAsset, Notification, TransferCase, WalletAddress};

use crate::{Orchestrator, WorkflowError};

/// Which record something belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum RecordRef {
    Asset(AssetId),
    Case(CaseId),
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asset(id) => write!(f, "{id}"),
            Self::Case(id) => write!(f, "{id}"),
        }
    }
}

/// A notification together with the record whose log it came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NotificationEntry {
    pub source: RecordRef,
    #[serde(flatten)]
    pub notification: Notification,
}

impl Orchestrator {
    pub fn get_asset(&self, id: AssetId) -> Result<LandAsset, WorkflowError> {
        self.load_asset(id)
    }

    pub fn get_case(&self, id: CaseId) -> Result<TransferCase, WorkflowError> {
        self.load_case(id)
    }

    /// Every case ever opened against an asset, oldest first.
    pub fn cases_for_asset(&self, asset_id: AssetId) -> Result<Vec<TransferCase>, WorkflowError> {
        Ok(self
            .records
            .cases()?
            .into_iter()
            .filter(|c| c.asset_id == asset_id)
            .collect())
    }

    /// All notifications addressed to `account`, oldest first.
    pub fn list_notifications(
        &self,
        account: &WalletAddress,
    ) -> Result<Vec<NotificationEntry>, WorkflowError> {
        let assets = self.records.assets()?;
        let cases = self.records.cases()?;

        let from_assets = assets.into_iter().flat_map(|asset| {
            let source = RecordRef::Asset(asset.id);
            asset
                .notifications
                .into_iter()
                .map(move |notification| NotificationEntry {
                    source,
                    notification,
                })
        });
        let from_cases = cases.into_iter().flat_map(|case| {
            let source = RecordRef::Case(case.id);
            case.notifications
                .into_iter()
                .map(move |notification| NotificationEntry {
                    source,
                    notification,
                })
        });

        let mut entries: Vec<NotificationEntry> = from_assets
            .chain(from_cases)
            .filter(|entry| entry.notification.is_addressed_to(account))
            .collect();
        entries.sort_by_key(|entry| entry.notification.sent_at);
        Ok(entries)
    }
}
