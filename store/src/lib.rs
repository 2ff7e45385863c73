//! Storage and collaborator traits for the Terra engine.
//!
//! Every record backend (LMDB, in-memory for testing) implements
//! [`RecordStore`]. The evidence store and account directory are external
//! collaborators the orchestrator only sees through [`EvidenceStore`] and
//! [`AccountDirectory`]. The rest of the codebase depends only on the traits.

pub mod directory;
pub mod error;
pub mod evidence;
pub mod record;
pub mod write_set;

pub use directory::AccountDirectory;
pub use error::StoreError;
pub use evidence::EvidenceStore;
pub use record::RecordStore;
pub use write_set::{next_version, RecordWrite, WriteSet};
