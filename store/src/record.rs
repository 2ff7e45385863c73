//! Versioned asset and case record storage.

use terra_types::{AssetId, CaseId, CaseStatus, LandAsset, SurveyId, TransferCase};

use crate::{StoreError, WriteSet};

/// Durable store of asset and case records.
///
/// Reads always reflect the latest committed state; implementations must not
/// serve cached copies. All mutation goes through [`RecordStore::commit`].
pub trait RecordStore: Send + Sync {
    fn get_asset(&self, id: AssetId) -> Result<Option<LandAsset>, StoreError>;

    fn get_case(&self, id: CaseId) -> Result<Option<TransferCase>, StoreError>;

    /// The latest asset record created for a survey identifier.
    fn asset_for_survey(&self, survey: &SurveyId) -> Result<Option<AssetId>, StoreError>;

    /// Reserve the next asset id. Ids are never reused, even if the
    /// reserving transition later fails.
    fn allocate_asset_id(&self) -> Result<AssetId, StoreError>;

    /// Reserve the next case id. Same guarantees as [`RecordStore::allocate_asset_id`].
    fn allocate_case_id(&self) -> Result<CaseId, StoreError>;

    fn assets(&self) -> Result<Vec<LandAsset>, StoreError>;

    fn cases(&self) -> Result<Vec<TransferCase>, StoreError>;

    fn cases_with_status(&self, status: CaseStatus) -> Result<Vec<TransferCase>, StoreError> {
        Ok(self
            .cases()?
            .into_iter()
            .filter(|c| c.status == status)
            .collect())
    }

    /// Apply every write in `writes` atomically, or none of them.
    ///
    /// Returns [`StoreError::Conflict`] if any version or survey-index
    /// expectation does not match the stored state. Written records are
    /// stored with their version advanced by one.
    fn commit(&self, writes: WriteSet) -> Result<(), StoreError>;
}
