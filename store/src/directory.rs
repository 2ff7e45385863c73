//! Account directory contract.

use async_trait::async_trait;
use terra_types::{Role, WalletAddress};

use crate::StoreError;

/// Read-only, eventually consistent role lookup. Role changes take effect
/// on the next lookup; callers never cache results.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// `None` if the account is not registered.
    async fn role_of(&self, account: &WalletAddress) -> Result<Option<Role>, StoreError>;
}
