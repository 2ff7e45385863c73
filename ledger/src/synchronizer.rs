//! Background anchor worker.
//!
//! Records are handed over with a non-blocking `try_send` on a bounded
//! channel. One worker task drains the channel and runs each delivery as
//! its own task, so a slow ledger never holds up the next record. A full
//! queue drops the record; the drop is counted and logged.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use crate::{AnchorRecord, LedgerAdapter, LedgerError};

#[derive(Clone, Debug)]
pub struct AnchorConfig {
    /// Bound on each individual ledger call.
    pub request_timeout: Duration,
    /// Total attempts per record, including the first.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub queue_capacity: usize,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            queue_capacity: 1024,
        }
    }
}

/// Delay before retry number `attempt` (1-based): doubles from
/// `initial_backoff` and is capped at `max_backoff`.
pub fn backoff_delay(config: &AnchorConfig, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
    config
        .initial_backoff
        .saturating_mul(factor)
        .min(config.max_backoff)
}

/// Delivery counters.
#[derive(Debug, Default)]
pub struct AnchorStats {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    retried: AtomicU64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnchorStatsSnapshot {
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub dropped: u64,
    pub retried: u64,
}

impl AnchorStats {
    pub fn snapshot(&self) -> AnchorStatsSnapshot {
        AnchorStatsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
        }
    }
}

/// Handle for queueing anchors. Cloning shares the queue; the worker stops
/// once every handle is dropped and in-flight deliveries have finished.
#[derive(Clone)]
pub struct LedgerSynchronizer {
    tx: mpsc::Sender<AnchorRecord>,
    stats: Arc<AnchorStats>,
}

impl LedgerSynchronizer {
    /// Start the worker on the current tokio runtime.
    pub fn spawn(adapter: Arc<dyn LedgerAdapter>, config: AnchorConfig) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let stats = Arc::new(AnchorStats::default());
        let worker = tokio::spawn(run_worker(rx, adapter, config, stats.clone()));
        (Self { tx, stats }, worker)
    }

    /// Queue a record without waiting. Returns `false` if it was dropped.
    pub fn submit(&self, record: AnchorRecord) -> bool {
        match self.tx.try_send(record) {
            Ok(()) => {
                self.stats.submitted.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(mpsc::error::TrySendError::Full(record)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(case = %record.case_id, "anchor queue full, dropping record");
                false
            }
            Err(mpsc::error::TrySendError::Closed(record)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(case = %record.case_id, "anchor worker stopped, dropping record");
                false
            }
        }
    }

    pub fn stats(&self) -> Arc<AnchorStats> {
        self.stats.clone()
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<AnchorRecord>,
    adapter: Arc<dyn LedgerAdapter>,
    config: AnchorConfig,
    stats: Arc<AnchorStats>,
) {
    let mut inflight = JoinSet::new();
    loop {
        tokio::select! {
            next = rx.recv() => match next {
                Some(record) => {
                    inflight.spawn(deliver(adapter.clone(), record, config.clone(), stats.clone()));
                }
                None => break,
            },
            Some(_) = inflight.join_next(), if !inflight.is_empty() => {}
        }
    }
    while inflight.join_next().await.is_some() {}
    tracing::debug!("anchor worker stopped");
}

async fn deliver(
    adapter: Arc<dyn LedgerAdapter>,
    record: AnchorRecord,
    config: AnchorConfig,
    stats: Arc<AnchorStats>,
) {
    let max_attempts = config.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        let error = match tokio::time::timeout(config.request_timeout, adapter.anchor(&record)).await {
            Ok(Ok(receipt)) => {
                stats.succeeded.fetch_add(1, Ordering::Relaxed);
                tracing::info!(case = %record.case_id, asset = %record.asset_id, %receipt, attempt, "transfer anchored");
                return;
            }
            Ok(Err(e)) => e,
            Err(_) => LedgerError::Timeout(config.request_timeout),
        };

        if !error.is_retryable() || attempt == max_attempts {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            tracing::error!(case = %record.case_id, attempt, error = %error, "giving up on ledger anchor");
            return;
        }

        let delay = backoff_delay(&config, attempt);
        tracing::warn!(case = %record.case_id, attempt, error = %error, retry_in = ?delay, "ledger anchor failed");
        stats.retried.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(delay).await;
    }
}
