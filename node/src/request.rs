//! Signed request envelope and JSON replies.
//!
//! A client signs the canonical text of one [`Operation`]
//! ([`Operation::signing_message`]) and sends it as a [`SignedRequest`]. The
//! node refuses envelopes whose signed message is not the canonical text of
//! the enclosed operation.

use serde::{Deserialize, Serialize};

use terra_crypto::{derive_address, sign_message, Credentials, IdentityVerifier};
use terra_types::{AssetId, CaseId, KeyPair, Signature, WalletAddress};
use terra_workflow::{AssetSubmission, EvidenceInput, InspectionReport, Snapshot};

use crate::NodeError;

const SIGNING_DOMAIN: &str = "terra-request-v1";

/// Every state-changing operation the node exposes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    SubmitForVerification {
        submission: AssetSubmission,
    },
    AssignInspector {
        asset_id: AssetId,
        inspector: WalletAddress,
    },
    ScheduleInspection {
        asset_id: AssetId,
    },
    SubmitInspectionReport {
        asset_id: AssetId,
        report: InspectionReport,
    },
    Verify {
        asset_id: AssetId,
    },
    Reject {
        asset_id: AssetId,
        reason: String,
    },
    SetListing {
        asset_id: AssetId,
        listed: bool,
    },
    CreateTransferRequest {
        asset_id: AssetId,
        to: WalletAddress,
        #[serde(default)]
        evidence: Vec<EvidenceInput>,
    },
    AssignCaseInspector {
        case_id: CaseId,
        inspector: WalletAddress,
    },
    SubmitCaseInspectionReport {
        case_id: CaseId,
        report: InspectionReport,
    },
    Approve {
        case_id: CaseId,
    },
    FinalizeTransfer {
        case_id: CaseId,
    },
    RejectCase {
        case_id: CaseId,
        reason: String,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SubmitForVerification { .. } => "submit_for_verification",
            Self::AssignInspector { .. } => "assign_inspector",
            Self::ScheduleInspection { .. } => "schedule_inspection",
            Self::SubmitInspectionReport { .. } => "submit_inspection_report",
            Self::Verify { .. } => "verify",
            Self::Reject { .. } => "reject",
            Self::SetListing { .. } => "set_listing",
            Self::CreateTransferRequest { .. } => "create_transfer_request",
            Self::AssignCaseInspector { .. } => "assign_case_inspector",
            Self::SubmitCaseInspectionReport { .. } => "submit_case_inspection_report",
            Self::Approve { .. } => "approve",
            Self::FinalizeTransfer { .. } => "finalize_transfer",
            Self::RejectCase { .. } => "reject_case",
        }
    }

    /// The exact text a client signs to authorise this operation.
    pub fn signing_message(&self) -> Result<String, NodeError> {
        Ok(format!("{SIGNING_DOMAIN}\n{}", serde_json::to_string(self)?))
    }
}

/// An operation plus proof of who sent it. The signature travels as hex.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignedRequest {
    pub account: WalletAddress,
    pub message: String,
    pub signature: String,
    pub operation: Operation,
}

impl SignedRequest {
    /// Sign `operation` with `keypair`.
    pub fn sign(keypair: &KeyPair, operation: Operation) -> Result<Self, NodeError> {
        let message = operation.signing_message()?;
        let signature = sign_message(message.as_bytes(), &keypair.private);
        Ok(Self {
            account: derive_address(&keypair.public),
            message,
            signature: signature.to_hex(),
            operation,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, NodeError> {
        serde_json::from_str(json)
            .map_err(|e| NodeError::InvalidRequest(format!("malformed request: {e}")))
    }

    pub fn credentials(&self) -> Result<Credentials, NodeError> {
        let signature = Signature::from_hex(&self.signature).ok_or_else(|| {
            NodeError::InvalidRequest("signature must be 128 hex characters".into())
        })?;
        Ok(Credentials {
            account: self.account.clone(),
            message: self.message.clone(),
            signature,
        })
    }

    /// Whether the signed text is the canonical text of the operation.
    ///
    /// Both texts are compared under the canonical form the signature was
    /// accepted in, so a message whose line endings or spacing were rewritten
    /// in transit still matches. An unverifiable signature never matches.
    pub fn message_matches(&self, credentials: &Credentials) -> Result<bool, NodeError> {
        let canonical = self.operation.signing_message()?;
        let Some(form) = IdentityVerifier::new().verify_detailed(
            &credentials.message,
            &credentials.signature,
            credentials.account.as_str(),
        ) else {
            return Ok(false);
        };
        Ok(form.apply(&credentials.message) == form.apply(&canonical))
    }
}

/// The JSON answer to a request.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply {
    Ok {
        record: Snapshot,
    },
    Error {
        kind: &'static str,
        message: String,
        retryable: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        current: Option<Snapshot>,
    },
}

impl Reply {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }
}

impl From<Result<Snapshot, NodeError>> for Reply {
    fn from(result: Result<Snapshot, NodeError>) -> Self {
        match result {
            Ok(record) => Self::Ok { record },
            Err(e) => {
                let current = match &e {
                    NodeError::Workflow(w) => w.current().cloned(),
                    _ => None,
                };
                Self::Error {
                    kind: e.kind(),
                    message: e.to_string(),
                    retryable: e.is_retryable(),
                    current,
                }
            }
        }
    }
}
