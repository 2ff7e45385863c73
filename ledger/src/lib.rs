//! Ledger synchronizer for the Terra engine.
//!
//! Completed transfers are anchored to an external immutable ledger after
//! the off-chain state has been committed. Anchoring is advisory: the queue
//! is bounded, delivery is retried a bounded number of times with backoff,
//! and failures only ever surface through logs and [`AnchorStats`].

pub mod adapter;
pub mod error;
pub mod http;
pub mod record;
pub mod synchronizer;

pub use adapter::LedgerAdapter;
pub use error::LedgerError;
pub use http::HttpLedgerAdapter;
pub use record::{AnchorRecord, ReceiptId};
pub use synchronizer::{backoff_delay, AnchorConfig, AnchorStats, AnchorStatsSnapshot, LedgerSynchronizer};
