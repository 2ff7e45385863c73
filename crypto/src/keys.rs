//! Ed25519 key generation for account identities.

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use terra_types::{KeyPair, PrivateKey, PublicKey};

/// Generate a new Ed25519 key pair from the OS random source.
pub fn generate_keypair() -> KeyPair {
    let signing_key = SigningKey::generate(&mut OsRng);
    keypair_from_signing_key(&signing_key)
}

/// Derive a key pair from a 32-byte seed (deterministic).
///
/// The daemon's `keygen --seed` and `sign --seed` commands use this.
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    keypair_from_signing_key(&SigningKey::from_bytes(seed))
}

/// Parse a 64-character hex seed into a key pair.
pub fn keypair_from_hex_seed(hex_seed: &str) -> Option<KeyPair> {
    let bytes = hex::decode(hex_seed.trim().trim_start_matches("0x")).ok()?;
    let seed: [u8; 32] = bytes.try_into().ok()?;
    Some(keypair_from_seed(&seed))
}

/// Derive the public key from a private key.
pub fn public_from_private(private: &PrivateKey) -> PublicKey {
    PublicKey(SigningKey::from_bytes(&private.0).verifying_key().to_bytes())
}

fn keypair_from_signing_key(signing_key: &SigningKey) -> KeyPair {
    KeyPair {
        public: PublicKey(signing_key.verifying_key().to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}
