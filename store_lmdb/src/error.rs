use thiserror::Error;

#[derive(Debug, Error)]
pub enum LmdbError {
    #[error("LMDB error: {0}")]
    Heed(#[from] heed::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("schema version {found} is newer than supported version {supported}")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("corrupt value under {0}")]
    Corrupt(String),
}

impl From<LmdbError> for terra_store::StoreError {
    fn from(e: LmdbError) -> Self {
        match e {
            LmdbError::Serialization(e) => terra_store::StoreError::Serialization(e.to_string()),
            LmdbError::Corrupt(key) => terra_store::StoreError::Corruption(key),
            other => terra_store::StoreError::Backend(other.to_string()),
        }
    }
}
