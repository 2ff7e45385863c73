//! Evidence references and inspection outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ContentHash, Timestamp, WalletAddress};

/// What a piece of evidence is.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceKind {
    Deed,
    SurveyPlan,
    IdentityProof,
    InspectionReport,
    SaleAgreement,
    Other(String),
}

/// A content-addressed reference to a supporting document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub kind: EvidenceKind,
    pub hash: ContentHash,
    pub size: u64,
    pub submitted_at: Timestamp,
}

/// An inspector's recommendation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Approve,
    Reject,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approve => f.write_str("approve"),
            Self::Reject => f.write_str("reject"),
        }
    }
}

/// The stored result of an inspection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionOutcome {
    pub report: ContentHash,
    pub recommendation: Recommendation,
    pub notes: String,
    pub inspector: WalletAddress,
    pub submitted_at: Timestamp,
}
