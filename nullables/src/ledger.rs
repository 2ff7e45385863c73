//! Nullable ledger: records anchors instead of sending them.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use terra_ledger::{AnchorRecord, LedgerAdapter, LedgerError, ReceiptId};

#[derive(Default)]
pub struct NullLedger {
    anchored: Mutex<Vec<AnchorRecord>>,
    failures_left: AtomicU32,
    calls: AtomicU32,
}

impl NullLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` calls as unreachable.
    pub fn fail_next(&self, n: u32) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    /// Records accepted so far, in order.
    pub fn anchored(&self) -> Vec<AnchorRecord> {
        self.anchored.lock().unwrap().clone()
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerAdapter for NullLedger {
    async fn anchor(&self, record: &AnchorRecord) -> Result<ReceiptId, LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(LedgerError::Unreachable("null ledger offline".into()));
        }
        let mut anchored = self.anchored.lock().unwrap();
        anchored.push(record.clone());
        Ok(ReceiptId(format!("null-{}", anchored.len())))
    }
}
