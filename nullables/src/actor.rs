//! Deterministic signing identities for tests.

use terra_crypto::{derive_address, keypair_from_seed, sign_message, Credentials};
use terra_types::{KeyPair, WalletAddress};

/// A keypair plus its address, able to sign requests.
pub struct TestActor {
    keypair: KeyPair,
    address: WalletAddress,
}

impl TestActor {
    /// The same seed always yields the same account.
    pub fn new(seed: u8) -> Self {
        let keypair = keypair_from_seed(&[seed; 32]);
        let address = derive_address(&keypair.public);
        Self { keypair, address }
    }

    pub fn address(&self) -> &WalletAddress {
        &self.address
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    /// Credentials proving this actor sent `message`.
    pub fn sign(&self, message: &str) -> Credentials {
        Credentials {
            account: self.address.clone(),
            message: message.to_string(),
            signature: sign_message(message.as_bytes(), &self.keypair.private),
        }
    }

    /// Credentials claiming this actor's account but signed by `impostor`.
    pub fn forged_by(&self, impostor: &TestActor, message: &str) -> Credentials {
        Credentials {
            account: self.address.clone(),
            message: message.to_string(),
            signature: sign_message(message.as_bytes(), &impostor.keypair.private),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terra_crypto::IdentityVerifier;

    #[test]
    fn signed_credentials_verify() {
        let actor = TestActor::new(1);
        assert!(IdentityVerifier::new().verify_credentials(&actor.sign("hello")));
    }

    #[test]
    fn forged_credentials_fail() {
        let owner = TestActor::new(1);
        let mallory = TestActor::new(2);
        assert!(!IdentityVerifier::new().verify_credentials(&owner.forged_by(&mallory, "hello")));
    }
}
