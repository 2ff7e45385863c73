use serde::Serialize;
use thiserror::Error;

use terra_store::StoreError;
use terra_types::{LandAsset, Role, TransferCase, WalletAddress};

/// The authoritative record state returned alongside a rejection.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum Snapshot {
    Asset(Box<LandAsset>),
    Case(Box<TransferCase>),
}

impl From<LandAsset> for Snapshot {
    fn from(asset: LandAsset) -> Self {
        Self::Asset(Box::new(asset))
    }
}

impl From<TransferCase> for Snapshot {
    fn from(case: TransferCase) -> Self {
        Self::Case(Box::new(case))
    }
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("signature does not prove control of {account}")]
    AuthenticationFailed { account: String },

    #[error("{account} ({}) may not {action}", .role.as_ref().map_or("unregistered", Role::as_str))]
    AuthorizationDenied {
        account: WalletAddress,
        role: Option<Role>,
        action: &'static str,
        snapshot: Option<Snapshot>,
    },

    #[error("cannot move from {current} to {requested}")]
    InvalidTransition {
        current: String,
        requested: String,
        snapshot: Snapshot,
    },

    #[error("precondition failed: {reason}")]
    PreconditionFailed {
        reason: String,
        snapshot: Option<Snapshot>,
    },

    #[error("{key} was modified concurrently; retry against the current state")]
    ConcurrentModification {
        key: String,
        snapshot: Option<Snapshot>,
    },

    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl WorkflowError {
    /// The record state at the time of the rejection, when one was loaded.
    pub fn current(&self) -> Option<&Snapshot> {
        match self {
            Self::AuthorizationDenied { snapshot, .. }
            | Self::PreconditionFailed { snapshot, .. }
            | Self::ConcurrentModification { snapshot, .. } => snapshot.as_ref(),
            Self::InvalidTransition { snapshot, .. } => Some(snapshot),
            _ => None,
        }
    }

    /// Whether the caller may retry unchanged. Nothing was committed for any
    /// retryable error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConcurrentModification { .. } | Self::CollaboratorUnavailable(_)
        )
    }

    /// Stable machine-readable name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed { .. } => "authentication_failed",
            Self::AuthorizationDenied { .. } => "authorization_denied",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::PreconditionFailed { .. } => "precondition_failed",
            Self::ConcurrentModification { .. } => "concurrent_modification",
            Self::CollaboratorUnavailable(_) => "collaborator_unavailable",
            Self::NotFound(_) => "not_found",
            Self::Store(_) => "store",
        }
    }

    pub(crate) fn precondition(reason: impl Into<String>, snapshot: impl Into<Snapshot>) -> Self {
        Self::PreconditionFailed {
            reason: reason.into(),
            snapshot: Some(snapshot.into()),
        }
    }
}
