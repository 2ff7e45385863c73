use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("ledger unreachable: {0}")]
    Unreachable(String),

    #[error("ledger call timed out after {0:?}")]
    Timeout(Duration),

    #[error("ledger rejected anchor with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid ledger response: {0}")]
    InvalidResponse(String),
}

impl LedgerError {
    /// Whether another attempt could succeed. Client errors other than
    /// request-timeout and rate limiting will fail the same way again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rejected { status, .. } => {
                !(400..500).contains(status) || *status == 408 || *status == 429
            }
            Self::InvalidResponse(_) => false,
            Self::Unreachable(_) | Self::Timeout(_) => true,
        }
    }
}
