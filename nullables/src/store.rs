//! Nullable record store: thread-safe in-memory storage for testing.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Barrier, Mutex};

use terra_store::{next_version, RecordStore, RecordWrite, StoreError, WriteSet};
use terra_types::{AssetId, CaseId, LandAsset, SurveyId, TransferCase};

#[derive(Default)]
struct State {
    assets: BTreeMap<AssetId, LandAsset>,
    cases: BTreeMap<CaseId, TransferCase>,
    surveys: HashMap<SurveyId, AssetId>,
    next_asset: u64,
    next_case: u64,
    commits: u64,
}

/// An in-memory [`RecordStore`] with the same all-or-nothing commit
/// semantics as the LMDB backend. Thread-safe for use with tokio's
/// multi-threaded runtime.
#[derive(Default)]
pub struct NullStore {
    state: Mutex<State>,
    fail_asset_writes: Mutex<bool>,
    read_barrier: Mutex<Option<(Arc<Barrier>, usize)>>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every commit that writes an asset fail with a backend error.
    pub fn set_fail_asset_writes(&self, fail: bool) {
        *self.fail_asset_writes.lock().unwrap() = fail;
    }

    /// Hold the next `readers` asset reads until all of them have arrived.
    /// Forces concurrent transitions to read the same version.
    pub fn arm_read_barrier(&self, readers: usize) {
        *self.read_barrier.lock().unwrap() = Some((Arc::new(Barrier::new(readers)), readers));
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> u64 {
        self.state.lock().unwrap().commits
    }

    /// Overwrite an asset without any checks, as a crash could leave it.
    pub fn force_asset(&self, asset: LandAsset) {
        self.state.lock().unwrap().assets.insert(asset.id, asset);
    }

    fn wait_at_barrier(&self) {
        let barrier = {
            let mut slot = self.read_barrier.lock().unwrap();
            match slot.take() {
                Some((barrier, remaining)) => {
                    if remaining > 1 {
                        *slot = Some((barrier.clone(), remaining - 1));
                    }
                    Some(barrier)
                }
                None => None,
            }
        };
        if let Some(barrier) = barrier {
            barrier.wait();
        }
    }
}

impl RecordStore for NullStore {
    fn get_asset(&self, id: AssetId) -> Result<Option<LandAsset>, StoreError> {
        self.wait_at_barrier();
        Ok(self.state.lock().unwrap().assets.get(&id).cloned())
    }

    fn get_case(&self, id: CaseId) -> Result<Option<TransferCase>, StoreError> {
        Ok(self.state.lock().unwrap().cases.get(&id).cloned())
    }

    fn asset_for_survey(&self, survey: &SurveyId) -> Result<Option<AssetId>, StoreError> {
        Ok(self.state.lock().unwrap().surveys.get(survey).copied())
    }

    fn allocate_asset_id(&self) -> Result<AssetId, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.next_asset += 1;
        Ok(AssetId(state.next_asset))
    }

    fn allocate_case_id(&self) -> Result<CaseId, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.next_case += 1;
        Ok(CaseId(state.next_case))
    }

    fn assets(&self) -> Result<Vec<LandAsset>, StoreError> {
        Ok(self.state.lock().unwrap().assets.values().cloned().collect())
    }

    fn cases(&self) -> Result<Vec<TransferCase>, StoreError> {
        Ok(self.state.lock().unwrap().cases.values().cloned().collect())
    }

    fn commit(&self, writes: WriteSet) -> Result<(), StoreError> {
        let touches_asset = writes
            .writes()
            .iter()
            .any(|w| matches!(w, RecordWrite::Asset { .. }));
        if touches_asset && *self.fail_asset_writes.lock().unwrap() {
            return Err(StoreError::Backend("injected asset write failure".into()));
        }

        let mut state = self.state.lock().unwrap();
        for write in writes.writes() {
            match write {
                RecordWrite::Asset { record, .. } => {
                    write.check_version(state.assets.get(&record.id).map(|a| a.version))?
                }
                RecordWrite::Case { record, .. } => {
                    write.check_version(state.cases.get(&record.id).map(|c| c.version))?
                }
                RecordWrite::SurveyIndex { survey, .. } => {
                    write.check_survey(state.surveys.get(survey).copied())?
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
                    state.assets.insert(record.id, record);
                }
                RecordWrite::Case {
                    expected_version,
                    mut record,
                } => {
                    record.version = next_version(expected_version);
                    state.cases.insert(record.id, record);
                }
                RecordWrite::SurveyIndex { survey, asset, .. } => {
                    state.surveys.insert(survey, asset);
                }
            }
        }
        state.commits += 1;
        Ok(())
    }
}
