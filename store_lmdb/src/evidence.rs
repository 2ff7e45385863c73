//! Content-addressed evidence blobs in LMDB.

use async_trait::async_trait;

use terra_crypto::content_hash;
use terra_store::{EvidenceStore, StoreError};
use terra_types::ContentHash;

use crate::{LmdbEnvironment, LmdbError};

/// Stores evidence documents keyed by their Blake2b fingerprint. The first
/// name a blob was stored under is kept alongside it for operators.
pub struct LmdbEvidenceStore {
    env: LmdbEnvironment,
}

impl LmdbEvidenceStore {
    pub(crate) fn new(env: LmdbEnvironment) -> Self {
        Self { env }
    }

    /// Name the blob was first stored under.
    pub fn name_of(&self, hash: &ContentHash) -> Result<Option<String>, StoreError> {
        let rtxn = self.env.env.read_txn().map_err(LmdbError::from)?;
        let name = self
            .env
            .blob_names_db
            .get(&rtxn, hash.as_bytes())
            .map_err(LmdbError::from)?
            .map(|b| String::from_utf8_lossy(b).into_owned());
        Ok(name)
    }

    fn store(&self, bytes: &[u8], name: &str) -> Result<ContentHash, LmdbError> {
        let hash = content_hash(bytes);
        let mut wtxn = self.env.env.write_txn()?;
        if self.env.blobs_db.get(&wtxn, hash.as_bytes())?.is_none() {
            self.env.blobs_db.put(&mut wtxn, hash.as_bytes(), bytes)?;
            self.env
                .blob_names_db
                .put(&mut wtxn, hash.as_bytes(), name.as_bytes())?;
            tracing::debug!(hash = %hash, name, size = bytes.len(), "stored evidence blob");
        }
        wtxn.commit()?;
        Ok(hash)
    }
}

#[async_trait]
impl EvidenceStore for LmdbEvidenceStore {
    async fn put(&self, bytes: &[u8], name: &str) -> Result<ContentHash, StoreError> {
        Ok(self.store(bytes, name)?)
    }

    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, StoreError> {
        let rtxn = self.env.env.read_txn().map_err(LmdbError::from)?;
        match self
            .env
            .blobs_db
            .get(&rtxn, hash.as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(bytes.to_vec()),
            None => Err(StoreError::NotFound(format!("evidence {hash}"))),
        }
    }

    async fn exists(&self, hash: &ContentHash) -> Result<bool, StoreError> {
        let rtxn = self.env.env.read_txn().map_err(LmdbError::from)?;
        let found = self
            .env
            .blobs_db
            .get(&rtxn, hash.as_bytes())
            .map_err(LmdbError::from)?
            .is_some();
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let env = LmdbEnvironment::open(dir.path(), 10 * 1024 * 1024).expect("failed to open env");
        (dir, env)
    }

    #[tokio::test]
    async fn put_then_get_returns_same_bytes() {
        let (_dir, env) = temp_env();
        let store = env.evidence_store();
        let hash = store.put(b"deed of conveyance", "deed.pdf").await.unwrap();
        assert_eq!(hash, content_hash(b"deed of conveyance"));
        assert_eq!(store.get(&hash).await.unwrap(), b"deed of conveyance");
        assert!(store.exists(&hash).await.unwrap());
    }

    #[tokio::test]
    async fn same_bytes_keep_first_name() {
        let (_dir, env) = temp_env();
        let store = env.evidence_store();
        let first = store.put(b"plan", "plan-v1.pdf").await.unwrap();
        let second = store.put(b"plan", "plan-copy.pdf").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.name_of(&first).unwrap().as_deref(), Some("plan-v1.pdf"));
    }

    #[tokio::test]
    async fn unknown_hash_is_not_found() {
        let (_dir, env) = temp_env();
        let store = env.evidence_store();
        let missing = content_hash(b"never stored");
        assert!(!store.exists(&missing).await.unwrap());
        assert!(matches!(
            store.get(&missing).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
