//! Account address type with `terra_` prefix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// A Terra account address, always prefixed with `terra_` and stored lowercase.
///
/// Derived from the account's Ed25519 public key via base32 encoding plus a
/// Blake2b checksum (see `terra_crypto::derive_address`). Addresses compare
/// case-insensitively because construction normalises to lowercase.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress(String);

impl WalletAddress {
    /// The standard prefix for all Terra account addresses.
    pub const PREFIX: &'static str = "terra_";

    /// Create a new address from a raw string.
    ///
    /// # Panics
    /// Panics if the string does not start with `terra_` (case-insensitive).
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into().to_ascii_lowercase();
        assert!(s.starts_with(Self::PREFIX), "address must start with terra_");
        Self(s)
    }

    /// Parse an address, normalising case. Only the prefix and body are
    /// checked here; checksum validation lives in `terra_crypto`.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let s = raw.trim().to_ascii_lowercase();
        if !s.starts_with(Self::PREFIX) || s.len() == Self::PREFIX.len() {
            return Err(TypesError::InvalidAddress(raw.to_string()));
        }
        if !s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(TypesError::InvalidAddress(raw.to_string()));
        }
        Ok(Self(s))
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against an arbitrary string.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WalletAddress {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<WalletAddress> for String {
    fn from(addr: WalletAddress) -> Self {
        addr.0
    }
}
