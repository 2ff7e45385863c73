use async_trait::async_trait;

use crate::{AnchorRecord, LedgerError, ReceiptId};

/// Write-only view of the external ledger. The engine never reads
/// authoritative state back from it.
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    async fn anchor(&self, record: &AnchorRecord) -> Result<ReceiptId, LedgerError>;
}
