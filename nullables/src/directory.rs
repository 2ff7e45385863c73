//! Nullable account directory.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use terra_store::{AccountDirectory, StoreError};
use terra_types::{Role, WalletAddress};

/// Role table editable at runtime; changes are visible on the next lookup.
#[derive(Default)]
pub struct NullDirectory {
    roles: RwLock<HashMap<WalletAddress, Role>>,
    unavailable: RwLock<bool>,
    latency: RwLock<Option<Duration>>,
}

impl NullDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_role(&self, account: &WalletAddress, role: Role) {
        self.roles.write().unwrap().insert(account.clone(), role);
    }

    pub fn remove(&self, account: &WalletAddress) {
        self.roles.write().unwrap().remove(account);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().unwrap() = unavailable;
    }

    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write().unwrap() = latency;
    }
}

#[async_trait]
impl AccountDirectory for NullDirectory {
    async fn role_of(&self, account: &WalletAddress) -> Result<Option<Role>, StoreError> {
        let latency = *self.latency.read().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if *self.unavailable.read().unwrap() {
            return Err(StoreError::Unavailable("account directory is down".into()));
        }
        Ok(self.roles.read().unwrap().get(account).copied())
    }
}
