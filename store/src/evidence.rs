//! Evidence Reference Store contract.

use async_trait::async_trait;
use terra_types::ContentHash;

use crate::StoreError;

/// Content-addressed document store. The engine treats it as opaque: it
/// hands over bytes, keeps the returned fingerprint, and later checks that
/// the fingerprint still resolves.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Store a blob and return its content fingerprint. Storing the same
    /// bytes twice returns the same fingerprint.
    async fn put(&self, bytes: &[u8], name: &str) -> Result<ContentHash, StoreError>;

    /// Fetch a blob. Missing blobs are [`StoreError::NotFound`].
    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, StoreError>;

    async fn exists(&self, hash: &ContentHash) -> Result<bool, StoreError>;
}
