//! Nullable evidence store with controllable outages and latency.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use terra_crypto::content_hash;
use terra_store::{EvidenceStore, StoreError};
use terra_types::ContentHash;

#[derive(Default)]
pub struct NullEvidenceStore {
    blobs: Mutex<HashMap<ContentHash, (String, Vec<u8>)>>,
    unavailable: Mutex<bool>,
    latency: Mutex<Option<Duration>>,
}

impl NullEvidenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail as if the store were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap() = latency;
    }

    /// Seed a blob directly, returning its hash.
    pub fn preload(&self, bytes: &[u8], name: &str) -> ContentHash {
        let hash = content_hash(bytes);
        self.blobs
            .lock()
            .unwrap()
            .insert(hash, (name.to_string(), bytes.to_vec()));
        hash
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn enter(&self) -> Result<(), StoreError> {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if *self.unavailable.lock().unwrap() {
            return Err(StoreError::Unavailable("evidence store is down".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl EvidenceStore for NullEvidenceStore {
    async fn put(&self, bytes: &[u8], name: &str) -> Result<ContentHash, StoreError> {
        self.enter().await?;
        let hash = content_hash(bytes);
        self.blobs
            .lock()
            .unwrap()
            .entry(hash)
            .or_insert_with(|| (name.to_string(), bytes.to_vec()));
        Ok(hash)
    }

    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, StoreError> {
        self.enter().await?;
        self.blobs
            .lock()
            .unwrap()
            .get(hash)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| StoreError::NotFound(format!("evidence {hash}")))
    }

    async fn exists(&self, hash: &ContentHash) -> Result<bool, StoreError> {
        self.enter().await?;
        Ok(self.blobs.lock().unwrap().contains_key(hash))
    }
}
