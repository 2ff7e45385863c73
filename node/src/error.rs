use thiserror::Error;

use terra_workflow::WorkflowError;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("store error: {0}")]
    Store(#[from] terra_store::StoreError),

    #[error("database error: {0}")]
    Lmdb(#[from] terra_store_lmdb::LmdbError),

    #[error("database integrity check failed: {0}")]
    Integrity(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("anchor worker failed: {0}")]
    Worker(String),
}

impl NodeError {
    /// Stable machine-readable name, used in replies and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Workflow(e) => e.kind(),
            Self::Store(_) | Self::Lmdb(_) | Self::Integrity(_) => "storage",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Config(_) => "config",
            Self::Metrics(_) => "metrics",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
            Self::Worker(_) => "internal",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Workflow(e) => e.is_retryable(),
            _ => false,
        }
    }
}
