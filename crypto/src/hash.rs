//! Blake2b hashing for evidence fingerprints and transfer digests.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use terra_types::ContentHash;

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    blake2b_256_multi(&[data])
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Fingerprint a document for the evidence store.
pub fn content_hash(bytes: &[u8]) -> ContentHash {
    ContentHash::new(blake2b_256(bytes))
}

/// Digest identifying a completed transfer for ledger anchoring.
///
/// Fields are length-prefixed so adjacent values cannot run into each other.
pub fn transfer_digest(fields: &[&[u8]]) -> ContentHash {
    let mut hasher = Blake2b256::new();
    hasher.update(b"terra-transfer-v1");
    for field in fields {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field);
    }
    let mut output = [0u8; 32];
    output.copy_from_slice(&hasher.finalize());
    ContentHash::new(output)
}
