//! Fundamental types for the Terra land registry engine.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! account addresses, record identifiers, content hashes, timestamps, key material,
//! and the persisted record model for land assets and transfer cases.

pub mod address;
pub mod asset;
pub mod case;
pub mod error;
pub mod evidence;
pub mod hash;
pub mod ids;
pub mod keys;
pub mod notification;
pub mod role;
pub mod time;

pub use address::WalletAddress;
pub use asset::{Area, AreaUnit, LandAsset, VerificationStatus};
pub use case::{CaseStatus, TransferCase};
pub use error::TypesError;
pub use evidence::{EvidenceItem, EvidenceKind, InspectionOutcome, Recommendation};
pub use hash::ContentHash;
pub use ids::{AssetId, CaseId, SurveyId};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use notification::{Notification, Severity};
pub use role::Role;
pub use time::{Clock, SystemClock, Timestamp};
