//! LMDB environment setup.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use crate::evidence::LmdbEvidenceStore;
use crate::records::LmdbRecordStore;
use crate::LmdbError;

/// The schema version that the current code writes.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const SCHEMA_KEY: &[u8] = b"schema_version";

/// Named databases inside the environment.
pub(crate) const DATABASES: &[&str] = &[
    "assets",
    "cases",
    "survey_index",
    "meta",
    "evidence_blobs",
    "evidence_names",
];

/// Wraps the LMDB environment and all database handles.
#[derive(Clone)]
pub struct LmdbEnvironment {
    pub(crate) env: Env,
    pub(crate) assets_db: Database<Bytes, Bytes>,
    pub(crate) cases_db: Database<Bytes, Bytes>,
    pub(crate) survey_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
    pub(crate) blobs_db: Database<Bytes, Bytes>,
    pub(crate) blob_names_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path.
    ///
    /// Creates the directory if needed, creates every named database, and
    /// stamps (or checks) the schema version.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per process per path; the
        // node never opens the same directory twice concurrently.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(DATABASES.len() as u32 + 2)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let assets_db = env.create_database(&mut wtxn, Some("assets"))?;
        let cases_db = env.create_database(&mut wtxn, Some("cases"))?;
        let survey_db = env.create_database(&mut wtxn, Some("survey_index"))?;
        let meta_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some("meta"))?;
        let blobs_db = env.create_database(&mut wtxn, Some("evidence_blobs"))?;
        let blob_names_db = env.create_database(&mut wtxn, Some("evidence_names"))?;

        let stored = meta_db
            .get(&wtxn, SCHEMA_KEY)?
            .map(|b| {
                b.try_into()
                    .map(u32::from_be_bytes)
                    .map_err(|_| LmdbError::Corrupt("meta:schema_version".into()))
            })
            .transpose()?;
        match stored {
            Some(v) if v > CURRENT_SCHEMA_VERSION => {
                return Err(LmdbError::SchemaTooNew {
                    found: v,
                    supported: CURRENT_SCHEMA_VERSION,
                });
            }
            Some(v) => tracing::debug!(version = v, "database schema is up to date"),
            None => {
                meta_db.put(&mut wtxn, SCHEMA_KEY, &CURRENT_SCHEMA_VERSION.to_be_bytes())?;
                tracing::info!(version = CURRENT_SCHEMA_VERSION, path = %path.display(), "initialised new database");
            }
        }
        wtxn.commit()?;

        Ok(Self {
            env,
            assets_db,
            cases_db,
            survey_db,
            meta_db,
            blobs_db,
            blob_names_db,
        })
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn record_store(&self) -> LmdbRecordStore {
        LmdbRecordStore::new(self.clone())
    }

    pub fn evidence_store(&self) -> LmdbEvidenceStore {
        LmdbEvidenceStore::new(self.clone())
    }

    /// Atomically increment a counter in the meta database, returning the new value.
    pub(crate) fn next_counter(&self, key: &str) -> Result<u64, LmdbError> {
        let mut wtxn = self.env.write_txn()?;
        let current = match self.meta_db.get(&wtxn, key.as_bytes())? {
            Some(bytes) => bytes
                .try_into()
                .map(u64::from_be_bytes)
                .map_err(|_| LmdbError::Corrupt(format!("meta:{key}")))?,
            None => 0,
        };
        let next = current + 1;
        self.meta_db
            .put(&mut wtxn, key.as_bytes(), &next.to_be_bytes())?;
        wtxn.commit()?;
        Ok(next)
    }
}
