//! Terra node: hosts the land registry workflow engine.
//!
//! The node wires the LMDB store, the config-seeded account directory and
//! the optional ledger anchor worker into one [`TerraNode`], verifies and
//! dispatches [`SignedRequest`]s, and keeps Prometheus metrics.

pub mod config;
pub mod directory;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod request;

pub use config::{AccountEntry, LedgerConfig, NodeConfig};
pub use directory::ConfigDirectory;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::TerraNode;
pub use request::{Operation, Reply, SignedRequest};
