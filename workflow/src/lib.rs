//! Workflow orchestrator for land assets and transfer cases.
//!
//! Every operation follows the same pipeline: authenticate the caller,
//! perform collaborator I/O (role lookups, evidence resolution) under a
//! timeout, load the target record, authorize, validate the transition
//! against the central state table, check payload preconditions, and
//! commit through a conditional [`terra_store::WriteSet`]. Nothing is
//! written unless every check passes, and a lost race is reported as
//! [`WorkflowError::ConcurrentModification`] rather than overwritten.

mod asset_ops;
mod case_ops;
pub mod error;
pub mod evidence;
pub mod orchestrator;
pub mod query;
pub mod transitions;

pub use error::{Snapshot, WorkflowError};
pub use evidence::{EvidenceInput, InspectionReport};
pub use orchestrator::{AssetSubmission, Orchestrator, WorkflowConfig};
pub use query::{NotificationEntry, RecordRef};
pub use transitions::{AssetAction, CaseAction};
