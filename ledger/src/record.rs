//! What gets anchored for a completed transfer.

use std::fmt;

use serde::{Deserialize, Serialize};
use terra_crypto::transfer_digest;
use terra_types::{AssetId, CaseId, ContentHash, SurveyId, Timestamp, TransferCase, WalletAddress};

/// Receipt handed back by the ledger for an accepted anchor.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiptId(pub String);

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorRecord {
    pub case_id: CaseId,
    pub asset_id: AssetId,
    pub survey_id: SurveyId,
    pub previous_owner: WalletAddress,
    pub new_owner: WalletAddress,
    pub completed_at: Timestamp,
    /// Digest over every other field, so the ledger entry can be matched
    /// against the off-chain record.
    pub transfer_hash: ContentHash,
}

impl AnchorRecord {
    pub fn new(
        case_id: CaseId,
        asset_id: AssetId,
        survey_id: SurveyId,
        previous_owner: WalletAddress,
        new_owner: WalletAddress,
        completed_at: Timestamp,
    ) -> Self {
        let transfer_hash = transfer_digest(&[
            &case_id.to_be_bytes(),
            &asset_id.to_be_bytes(),
            survey_id.as_str().as_bytes(),
            previous_owner.as_str().as_bytes(),
            new_owner.as_str().as_bytes(),
            &completed_at.as_secs().to_be_bytes(),
        ]);
        Self {
            case_id,
            asset_id,
            survey_id,
            previous_owner,
            new_owner,
            completed_at,
            transfer_hash,
        }
    }

    /// Anchor for a completed case. `None` if the case has not completed.
    pub fn for_completed(case: &TransferCase, survey_id: SurveyId) -> Option<Self> {
        let completed_at = case.completed_at?;
        Some(Self::new(
            case.id,
            case.asset_id,
            survey_id,
            case.from.clone(),
            case.to.clone(),
            completed_at,
        ))
    }
}
