//! Nullable infrastructure for deterministic testing.
//!
//! Every collaborator the engine talks to (clock, record store, evidence
//! store, account directory, ledger) has an in-memory stand-in here that:
//! - Returns deterministic values
//! - Can be controlled programmatically (outages, latency, injected failures)
//! - Never touches the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod actor;
pub mod clock;
pub mod directory;
pub mod evidence;
pub mod ledger;
pub mod store;

pub use actor::TestActor;
pub use clock::NullClock;
pub use directory::NullDirectory;
pub use evidence::NullEvidenceStore;
pub use ledger::NullLedger;
pub use store::NullStore;
