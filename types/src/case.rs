//! The ownership-transfer case record.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    AssetId, CaseId, EvidenceItem, InspectionOutcome, Notification, Timestamp, WalletAddress,
};

/// Status of a transfer case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseStatus {
    Pending,
    InspectionScheduled,
    Inspected,
    /// Approved by an admin; ownership reassignment not yet finalized.
    Approved,
    Rejected,
    Completed,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InspectionScheduled => "InspectionScheduled",
            Self::Inspected => "Inspected",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
            Self::Completed => "Completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected | Self::Completed)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ownership-transfer request against a listed asset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferCase {
    pub id: CaseId,
    pub asset_id: AssetId,
    pub from: WalletAddress,
    pub to: WalletAddress,
    pub status: CaseStatus,
    pub assigned_inspector: Option<WalletAddress>,
    pub inspection: Option<InspectionOutcome>,
    pub evidence: Vec<EvidenceItem>,
    pub notifications: Vec<Notification>,
    pub rejection_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    /// Optimistic-concurrency version, bumped by the store on every write.
    pub version: u64,
}

impl TransferCase {
    /// Parties plus the assigned inspector once set.
    pub fn audience(&self) -> Vec<WalletAddress> {
        let mut out = vec![self.from.clone(), self.to.clone()];
        if let Some(inspector) = &self.assigned_inspector {
            out.push(inspector.clone());
        }
        out
    }
}
