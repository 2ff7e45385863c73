//! Cryptographic primitives for the Terra engine.
//!
//! - **Ed25519** for signing and signature verification
//! - **Blake2b** for evidence fingerprints and transfer digests
//! - Address derivation with `terra_` prefix and base32 encoding
//! - The request [`IdentityVerifier`]

pub mod address;
pub mod hash;
pub mod identity;
pub mod keys;
pub mod sign;

pub use address::{decode_address, derive_address, public_key_of, validate_address};
pub use hash::{blake2b_256, blake2b_256_multi, content_hash, transfer_digest};
pub use identity::{Canonicalization, Credentials, IdentityVerifier};
pub use keys::{generate_keypair, keypair_from_hex_seed, keypair_from_seed, public_from_private};
pub use sign::{sign_message, verify_signature};
