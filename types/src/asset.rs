//! The land asset record.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    AssetId, CaseId, EvidenceItem, InspectionOutcome, Notification, SurveyId, Timestamp,
    WalletAddress,
};

/// Verification status of a land asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationStatus {
    /// Submitted by the owner, awaiting an inspector.
    Pending,
    /// An inspector has been assigned.
    Assigned,
    /// The site inspection has been scheduled.
    InspectionScheduled,
    /// The inspection report is in.
    Inspected,
    /// Verified and eligible for sale.
    Verified,
    /// Rejected; the record stays as an audit trail.
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Assigned => "Assigned",
            Self::InspectionScheduled => "InspectionScheduled",
            Self::Inspected => "Inspected",
            Self::Verified => "Verified",
            Self::Rejected => "Rejected",
        }
    }

    /// Whether an inspector must be assigned while in this status.
    pub fn requires_inspector(&self) -> bool {
        matches!(
            self,
            Self::Assigned | Self::InspectionScheduled | Self::Inspected
        )
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaUnit {
    SquareMetres,
    Hectares,
    Acres,
    SquareFeet,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Area {
    pub value: f64,
    pub unit: AreaUnit,
}

/// The canonical record of a land parcel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LandAsset {
    pub id: AssetId,
    pub survey_id: SurveyId,
    pub location: String,
    pub category: String,
    pub area: Area,
    /// Declared price in minor currency units; `None` when unset.
    pub declared_price: Option<u128>,
    pub owner: WalletAddress,
    pub listed_for_sale: bool,
    pub status: VerificationStatus,
    pub assigned_inspector: Option<WalletAddress>,
    pub evidence: Vec<EvidenceItem>,
    pub inspection: Option<InspectionOutcome>,
    pub notifications: Vec<Notification>,
    pub rejection_reason: Option<String>,
    /// The transfer case currently open against this asset, if any.
    pub active_case: Option<CaseId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Optimistic-concurrency version, bumped by the store on every write.
    pub version: u64,
}

impl LandAsset {
    /// `listed_for_sale ⟹ Verified` and `assigned_inspector ⟺ status needs one`.
    pub fn invariants_hold(&self) -> bool {
        let listing_ok = !self.listed_for_sale || self.status == VerificationStatus::Verified;
        let inspector_ok =
            self.assigned_inspector.is_some() == self.status.requires_inspector();
        let rejection_ok = self.status != VerificationStatus::Rejected
            || self
                .rejection_reason
                .as_deref()
                .is_some_and(|r| !r.trim().is_empty());
        listing_ok && inspector_ok && rejection_ok
    }
}
