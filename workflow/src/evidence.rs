//! Evidence inputs and their resolution against the evidence store.
//!
//! Resolution is the only step of a transition that touches slow I/O, so it
//! always runs before the target record is loaded for the commit.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use terra_store::StoreError;
use terra_types::{ContentHash, EvidenceItem, EvidenceKind, Recommendation, Timestamp};

use crate::{Orchestrator, WorkflowError};

/// Evidence as supplied by a caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum EvidenceInput {
    /// A new document; stored and fingerprinted on resolution.
    Upload {
        kind: EvidenceKind,
        name: String,
        #[serde(serialize_with = "to_hex", deserialize_with = "from_hex")]
        bytes: Vec<u8>,
    },
    /// A document already in the store, named by its fingerprint.
    Existing { kind: EvidenceKind, hash: String },
}

impl EvidenceInput {
    pub fn kind(&self) -> &EvidenceKind {
        match self {
            Self::Upload { kind, .. } | Self::Existing { kind, .. } => kind,
        }
    }
}

/// An inspector's report payload. Missing fields are precondition failures,
/// not decoding errors, so the caller learns the current record state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionReport {
    #[serde(default)]
    pub report: Option<EvidenceInput>,
    #[serde(default)]
    pub recommendation: Option<Recommendation>,
    #[serde(default)]
    pub notes: String,
}

fn to_hex<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

fn from_hex<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let s = String::deserialize(deserializer)?;
    hex::decode(s).map_err(serde::de::Error::custom)
}

fn unavailable(what: &str, e: StoreError) -> WorkflowError {
    WorkflowError::CollaboratorUnavailable(format!("{what}: {e}"))
}

fn missing(reason: String) -> WorkflowError {
    WorkflowError::PreconditionFailed {
        reason,
        snapshot: None,
    }
}

impl Orchestrator {
    pub(crate) async fn resolve_evidence(
        &self,
        inputs: &[EvidenceInput],
        now: Timestamp,
    ) -> Result<Vec<EvidenceItem>, WorkflowError> {
        let mut items = Vec::with_capacity(inputs.len());
        for input in inputs {
            items.push(self.resolve_one(input, now).await?);
        }
        Ok(items)
    }

    pub(crate) async fn resolve_one(
        &self,
        input: &EvidenceInput,
        now: Timestamp,
    ) -> Result<EvidenceItem, WorkflowError> {
        let (hash, size) = match input {
            EvidenceInput::Upload { name, bytes, .. } => {
                if bytes.is_empty() {
                    return Err(missing(format!("evidence document '{name}' is empty")));
                }
                let hash = self
                    .bounded("evidence store", self.evidence.put(bytes, name))
                    .await?
                    .map_err(|e| unavailable("evidence store", e))?;
                (hash, bytes.len() as u64)
            }
            EvidenceInput::Existing { hash, .. } => {
                let hash = ContentHash::parse(hash)
                    .map_err(|e| missing(format!("malformed evidence reference: {e}")))?;
                let exists = self
                    .bounded("evidence store", self.evidence.exists(&hash))
                    .await?
                    .map_err(|e| unavailable("evidence store", e))?;
                if !exists {
                    return Err(missing(format!("evidence {hash} is not in the store")));
                }
                let size = match self
                    .bounded("evidence store", self.evidence.get(&hash))
                    .await?
                {
                    Ok(bytes) => bytes.len() as u64,
                    Err(StoreError::NotFound(_)) => {
                        return Err(missing(format!("evidence {hash} is not in the store")))
                    }
                    Err(e) => return Err(unavailable("evidence store", e)),
                };
                (hash, size)
            }
        };
        Ok(EvidenceItem {
            kind: input.kind().clone(),
            hash,
            size,
            submitted_at: now,
        })
    }
}
