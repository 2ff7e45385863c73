//! LMDB implementation of RecordStore.
//!
//! Assets and cases are bincode values keyed by their big-endian id, so
//! iteration returns them in creation order. The survey index maps the
//! survey identifier's UTF-8 bytes to the big-endian id of its latest asset.

use heed::types::Bytes;
use heed::{Database, RoTxn};
use serde::de::DeserializeOwned;

use terra_store::{next_version, RecordStore, RecordWrite, StoreError, WriteSet};
use terra_types::{AssetId, CaseId, LandAsset, SurveyId, TransferCase};

use crate::{LmdbEnvironment, LmdbError};

const NEXT_ASSET_KEY: &str = "next_asset_id";
const NEXT_CASE_KEY: &str = "next_case_id";

pub struct LmdbRecordStore {
    env: LmdbEnvironment,
}

impl LmdbRecordStore {
    pub(crate) fn new(env: LmdbEnvironment) -> Self {
        Self { env }
    }

    fn read<T: DeserializeOwned>(
        db: &Database<Bytes, Bytes>,
        txn: &RoTxn,
        key: &[u8],
    ) -> Result<Option<T>, LmdbError> {
        db.get(txn, key)?
            .map(|bytes| bincode::deserialize(bytes).map_err(LmdbError::from))
            .transpose()
    }

    fn read_all<T: DeserializeOwned>(&self, db: &Database<Bytes, Bytes>) -> Result<Vec<T>, LmdbError> {
        let rtxn = self.env.env.read_txn()?;
        let mut out = Vec::new();
        for entry in db.iter(&rtxn)? {
            let (_key, value) = entry?;
            out.push(bincode::deserialize(value)?);
        }
        Ok(out)
    }

    fn survey_entry(&self, txn: &RoTxn, survey: &SurveyId) -> Result<Option<AssetId>, LmdbError> {
        match self.env.survey_db.get(txn, survey.as_str().as_bytes())? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes
                    .try_into()
                    .map_err(|_| LmdbError::Corrupt(format!("survey:{survey}")))?;
                Ok(Some(AssetId(u64::from_be_bytes(raw))))
            }
            None => Ok(None),
        }
    }

    fn apply(&self, writes: WriteSet) -> Result<(), StoreError> {
        let env = &self.env;
        let mut wtxn = env.env.write_txn().map_err(LmdbError::from)?;

        // Check every expectation before touching anything.
        for write in writes.writes() {
            match write {
                RecordWrite::Asset { record, .. } => {
                    let found: Option<LandAsset> =
                        Self::read(&env.assets_db, &wtxn, &record.id.to_be_bytes())?;
                    write.check_version(found.map(|a| a.version))?;
                }
                RecordWrite::Case { record, .. } => {
                    let found: Option<TransferCase> =
                        Self::read(&env.cases_db, &wtxn, &record.id.to_be_bytes())?;
                    write.check_version(found.map(|c| c.version))?;
                }
                RecordWrite::SurveyIndex { survey, .. } => {
                    write.check_survey(self.survey_entry(&wtxn, survey)?)?;
                }
            }
        }

        for write in writes.into_writes() {
            match write {
                RecordWrite::Asset {
                    expected_version,
                    mut record,
                } => {
                    record.version = next_version(expected_version);
                    let bytes = bincode::serialize(&record).map_err(LmdbError::from)?;
                    env.assets_db
                        .put(&mut wtxn, &record.id.to_be_bytes(), &bytes)
                        .map_err(LmdbError::from)?;
                }
                RecordWrite::Case {
                    expected_version,
                    mut record,
                } => {
                    record.version = next_version(expected_version);
                    let bytes = bincode::serialize(&record).map_err(LmdbError::from)?;
                    env.cases_db
                        .put(&mut wtxn, &record.id.to_be_bytes(), &bytes)
                        .map_err(LmdbError::from)?;
                }
                RecordWrite::SurveyIndex { survey, asset, .. } => {
                    env.survey_db
                        .put(&mut wtxn, survey.as_str().as_bytes(), &asset.to_be_bytes())
                        .map_err(LmdbError::from)?;
                }
            }
        }

        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

impl RecordStore for LmdbRecordStore {
    fn get_asset(&self, id: AssetId) -> Result<Option<LandAsset>, StoreError> {
        let rtxn = self.env.env.read_txn().map_err(LmdbError::from)?;
        Ok(Self::read(&self.env.assets_db, &rtxn, &id.to_be_bytes())?)
    }

    fn get_case(&self, id: CaseId) -> Result<Option<TransferCase>, StoreError> {
        let rtxn = self.env.env.read_txn().map_err(LmdbError::from)?;
        Ok(Self::read(&self.env.cases_db, &rtxn, &id.to_be_bytes())?)
    }

    fn asset_for_survey(&self, survey: &SurveyId) -> Result<Option<AssetId>, StoreError> {
        let rtxn = self.env.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.survey_entry(&rtxn, survey)?)
    }

    fn allocate_asset_id(&self) -> Result<AssetId, StoreError> {
        Ok(AssetId(self.env.next_counter(NEXT_ASSET_KEY)?))
    }

    fn allocate_case_id(&self) -> Result<CaseId, StoreError> {
        Ok(CaseId(self.env.next_counter(NEXT_CASE_KEY)?))
    }

    fn assets(&self) -> Result<Vec<LandAsset>, StoreError> {
        Ok(self.read_all(&self.env.assets_db)?)
    }

    fn cases(&self) -> Result<Vec<TransferCase>, StoreError> {
        Ok(self.read_all(&self.env.cases_db)?)
    }

    fn commit(&self, writes: WriteSet) -> Result<(), StoreError> {
        if writes.is_empty() {
            return Ok(());
        }
        self.apply(writes)
    }
}
