//! All-or-nothing conditional write sets.
//!
//! A [`WriteSet`] groups the record writes of one logical transition. Each
//! write names the version it was computed from; a backend must check every
//! expectation and apply every write inside one atomic unit, or apply none.

use terra_types::{AssetId, LandAsset, SurveyId, TransferCase};

use crate::StoreError;

#[derive(Clone, Debug)]
pub enum RecordWrite {
    /// Write an asset. `expected_version == None` means the record must not exist yet.
    Asset {
        expected_version: Option<u64>,
        record: LandAsset,
    },
    /// Write a case. `expected_version == None` means the record must not exist yet.
    Case {
        expected_version: Option<u64>,
        record: TransferCase,
    },
    /// Point a survey id at its latest asset record.
    SurveyIndex {
        survey: SurveyId,
        expected: Option<AssetId>,
        asset: AssetId,
    },
}

impl RecordWrite {
    /// Human-readable key, used in conflict errors and logs.
    pub fn key(&self) -> String {
        match self {
            Self::Asset { record, .. } => record.id.to_string(),
            Self::Case { record, .. } => record.id.to_string(),
            Self::SurveyIndex { survey, .. } => format!("survey:{survey}"),
        }
    }

    /// Check a versioned write against the version currently stored.
    pub fn check_version(&self, found: Option<u64>) -> Result<(), StoreError> {
        let expected = match self {
            Self::Asset {
                expected_version, ..
            }
            | Self::Case {
                expected_version, ..
            } => *expected_version,
            Self::SurveyIndex { .. } => return Ok(()),
        };
        if expected == found {
            Ok(())
        } else {
            Err(StoreError::Conflict {
                key: self.key(),
                expected,
                found,
            })
        }
    }

    /// Check a survey index write against the asset currently indexed.
    pub fn check_survey(&self, found: Option<AssetId>) -> Result<(), StoreError> {
        match self {
            Self::SurveyIndex { expected, .. } if *expected != found => {
                Err(StoreError::Conflict {
                    key: self.key(),
                    expected: expected.map(|a| a.0),
                    found: found.map(|a| a.0),
                })
            }
            _ => Ok(()),
        }
    }
}

/// The version a record is stored with after a successful write.
pub fn next_version(expected: Option<u64>) -> u64 {
    expected.map_or(1, |v| v + 1)
}

/// An ordered batch of conditional writes.
#[derive(Clone, Debug, Default)]
pub struct WriteSet {
    writes: Vec<RecordWrite>,
}

impl WriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new asset; fails on commit if the id is taken.
    pub fn insert_asset(mut self, record: LandAsset) -> Self {
        self.writes.push(RecordWrite::Asset {
            expected_version: None,
            record,
        });
        self
    }

    /// Replace an asset that was read at `record.version`.
    pub fn update_asset(mut self, record: LandAsset) -> Self {
        self.writes.push(RecordWrite::Asset {
            expected_version: Some(record.version),
            record,
        });
        self
    }

    pub fn insert_case(mut self, record: TransferCase) -> Self {
        self.writes.push(RecordWrite::Case {
            expected_version: None,
            record,
        });
        self
    }

    /// Replace a case that was read at `record.version`.
    pub fn update_case(mut self, record: TransferCase) -> Self {
        self.writes.push(RecordWrite::Case {
            expected_version: Some(record.version),
            record,
        });
        self
    }

    pub fn point_survey(mut self, survey: SurveyId, expected: Option<AssetId>, asset: AssetId) -> Self {
        self.writes.push(RecordWrite::SurveyIndex {
            survey,
            expected,
            asset,
        });
        self
    }

    pub fn writes(&self) -> &[RecordWrite] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<RecordWrite> {
        self.writes
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}
