//! LMDB storage backend for the Terra engine.
//!
//! Implements the record and evidence traits from `terra-store` using the
//! `heed` LMDB bindings. All logical stores live in one LMDB environment, so
//! a [`terra_store::WriteSet`] spanning an asset and a case commits in a
//! single write transaction. LMDB admits one writer at a time, which is what
//! makes the version checks inside that transaction a true compare-and-set.

pub mod environment;
pub mod error;
pub mod evidence;
pub mod integrity;
pub mod records;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use evidence::LmdbEvidenceStore;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use records::LmdbRecordStore;
