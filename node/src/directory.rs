//! Account directory seeded from the `[[accounts]]` config section.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use terra_store::{AccountDirectory, StoreError};
use terra_types::{Role, WalletAddress};

use crate::config::AccountEntry;

/// In-process role table. Edits apply to the next lookup.
#[derive(Debug, Default)]
pub struct ConfigDirectory {
    roles: RwLock<HashMap<WalletAddress, Role>>,
}

impl ConfigDirectory {
    /// Later entries for the same address win.
    pub fn from_entries(entries: &[AccountEntry]) -> Self {
        let roles = entries
            .iter()
            .map(|entry| (entry.address.clone(), entry.role))
            .collect();
        Self {
            roles: RwLock::new(roles),
        }
    }

    pub async fn set_role(&self, account: WalletAddress, role: Role) {
        tracing::info!(%account, %role, "account role set");
        self.roles.write().await.insert(account, role);
    }

    pub async fn remove(&self, account: &WalletAddress) -> Option<Role> {
        self.roles.write().await.remove(account)
    }

    pub async fn len(&self) -> usize {
        self.roles.read().await.len()
    }
}

#[async_trait]
impl AccountDirectory for ConfigDirectory {
    async fn role_of(&self, account: &WalletAddress) -> Result<Option<Role>, StoreError> {
        Ok(self.roles.read().await.get(account).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(address: &str, role: Role) -> AccountEntry {
        AccountEntry {
            address: WalletAddress::new(address),
            role,
        }
    }

    #[tokio::test]
    async fn later_entries_override_earlier_ones() {
        let directory = ConfigDirectory::from_entries(&[
            entry("terra_alice", Role::Owner),
            entry("terra_alice", Role::Inspector),
            entry("terra_bob", Role::Admin),
        ]);
        assert_eq!(directory.len().await, 2);
        let alice = WalletAddress::new("terra_alice");
        assert_eq!(directory.role_of(&alice).await.unwrap(), Some(Role::Inspector));
    }

    #[tokio::test]
    async fn edits_apply_on_next_lookup() {
        let directory = ConfigDirectory::default();
        let carol = WalletAddress::new("terra_carol");
        assert_eq!(directory.role_of(&carol).await.unwrap(), None);
        directory.set_role(carol.clone(), Role::Admin).await;
        assert_eq!(directory.role_of(&carol).await.unwrap(), Some(Role::Admin));
        assert_eq!(directory.remove(&carol).await, Some(Role::Admin));
        assert_eq!(directory.role_of(&carol).await.unwrap(), None);
    }
}
