//! LMDB database integrity checks.
//!
//! Run on startup to detect corruption early, before the node accepts
//! requests. Every stored asset and case is decoded and its record
//! invariants are re-checked.

use std::path::Path;

use heed::types::Bytes;
use heed::{Database, RoTxn};

use terra_types::{LandAsset, TransferCase};

use crate::environment::DATABASES;
use crate::{LmdbEnvironment, LmdbError};

/// Summary of an integrity check run.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub databases_checked: u32,
    pub total_entries: u64,
    pub assets: u64,
    pub cases: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    /// Returns `true` if no errors were detected.
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check every database and record. Read failures land in the report
/// instead of aborting the run.
pub fn check_integrity(env: &LmdbEnvironment) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();
    let rtxn = env.env.read_txn()?;

    for &name in DATABASES {
        match env.env.open_database::<Bytes, Bytes>(&rtxn, Some(name)) {
            Ok(Some(db)) => {
                report.databases_checked += 1;
                match db.len(&rtxn) {
                    Ok(count) => report.total_entries += count,
                    Err(e) => report
                        .errors
                        .push(format!("failed to read database '{name}': {e}")),
                }
            }
            Ok(None) => report.errors.push(format!("database '{name}' is missing")),
            Err(e) => report
                .errors
                .push(format!("failed to open database '{name}': {e}")),
        }
    }

    report.assets = scan(&env.assets_db, &rtxn, &mut report.errors, |asset: LandAsset| {
        (!asset.invariants_hold()).then(|| format!("{} violates asset invariants", asset.id))
    });
    report.cases = scan(&env.cases_db, &rtxn, &mut report.errors, |case: TransferCase| {
        (case.status == terra_types::CaseStatus::Completed && case.completed_at.is_none())
            .then(|| format!("{} is completed without a completion time", case.id))
    });

    if !report.is_healthy() {
        tracing::warn!(errors = report.errors.len(), "integrity check found problems");
    }
    Ok(report)
}

fn scan<T, F>(db: &Database<Bytes, Bytes>, rtxn: &RoTxn, errors: &mut Vec<String>, check: F) -> u64
where
    T: serde::de::DeserializeOwned,
    F: Fn(T) -> Option<String>,
{
    let iter = match db.iter(rtxn) {
        Ok(iter) => iter,
        Err(e) => {
            errors.push(format!("failed to iterate records: {e}"));
            return 0;
        }
    };
    let mut count = 0;
    for entry in iter {
        match entry {
            Ok((key, value)) => match bincode::deserialize::<T>(value) {
                Ok(record) => {
                    count += 1;
                    if let Some(problem) = check(record) {
                        errors.push(problem);
                    }
                }
                Err(e) => errors.push(format!("undecodable record {key:?}: {e}")),
            },
            Err(e) => errors.push(format!("cursor error: {e}")),
        }
    }
    count
}

/// Check if the LMDB data directory looks valid before opening.
///
/// Returns `Ok(())` for a fresh (nonexistent) directory. Returns an error
/// if the directory exists but `data.mdb` is missing.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    let data_file = path.join("data.mdb");
    if !data_file.exists() {
        return Err(format!(
            "LMDB directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}
