//! Notification entries embedded in asset and case records.

use serde::{Deserialize, Serialize};

use crate::{Timestamp, WalletAddress};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
}

/// One append-only audit/notification entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub sent_at: Timestamp,
    pub recipients: Vec<WalletAddress>,
    pub severity: Severity,
}

impl Notification {
    /// Build an entry, dropping duplicate recipients while keeping order.
    pub fn new(
        message: impl Into<String>,
        sent_at: Timestamp,
        recipients: impl IntoIterator<Item = WalletAddress>,
        severity: Severity,
    ) -> Self {
        let mut unique: Vec<WalletAddress> = Vec::new();
        for r in recipients {
            if !unique.contains(&r) {
                unique.push(r);
            }
        }
        Self {
            message: message.into(),
            sent_at,
            recipients: unique,
            severity,
        }
    }

    pub fn is_addressed_to(&self, account: &WalletAddress) -> bool {
        self.recipients.contains(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipients_are_deduplicated() {
        let a = WalletAddress::new("terra_a");
        let b = WalletAddress::new("terra_b");
        let n = Notification::new(
            "hello",
            Timestamp::new(1),
            [a.clone(), b.clone(), a.clone()],
            Severity::Info,
        );
        assert_eq!(n.recipients, vec![a.clone(), b]);
        assert!(n.is_addressed_to(&a));
    }
}
