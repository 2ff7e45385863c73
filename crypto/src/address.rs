//! Account addresses.
//!
//! An address is `terra_` followed by the lowercase RFC 4648 base32 form
//! (unpadded) of a 37-byte payload: the 32-byte Ed25519 public key and a
//! 5-byte check value. The check value is the head of
//! Blake2b-256(`terra-address` || key). 37 bytes need 60 symbols, and the
//! four unused trailing bits must be zero so every key has exactly one
//! address body.
//!
//! Parsing ignores letter case, since the identity check only compares keys.

use terra_types::{PublicKey, WalletAddress};

use crate::blake2b_256;

const ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";
const CHECK_DOMAIN: &[u8] = b"terra-address";

const KEY_LEN: usize = 32;
const CHECK_LEN: usize = 5;
const PAYLOAD_LEN: usize = KEY_LEN + CHECK_LEN;
const PAYLOAD_BITS: usize = PAYLOAD_LEN * 8;
const BODY_LEN: usize = PAYLOAD_BITS.div_ceil(5);

type Payload = [u8; PAYLOAD_LEN];

fn check_value(key: &[u8; KEY_LEN]) -> [u8; CHECK_LEN] {
    let mut input = Vec::with_capacity(CHECK_DOMAIN.len() + KEY_LEN);
    input.extend_from_slice(CHECK_DOMAIN);
    input.extend_from_slice(key);
    let digest = blake2b_256(&input);
    let mut check = [0u8; CHECK_LEN];
    check.copy_from_slice(&digest[..CHECK_LEN]);
    check
}

fn payload_for(key: &[u8; KEY_LEN]) -> Payload {
    let mut payload = [0u8; PAYLOAD_LEN];
    payload[..KEY_LEN].copy_from_slice(key);
    payload[KEY_LEN..].copy_from_slice(&check_value(key));
    payload
}

/// Five bits starting at bit `offset` (most significant first), zero past the end.
fn symbol_at(payload: &Payload, offset: usize) -> u8 {
    (offset..offset + 5).fold(0u8, |acc, bit| {
        let byte = payload.get(bit / 8).copied().unwrap_or(0);
        (acc << 1) | ((byte >> (7 - bit % 8)) & 1)
    })
}

fn symbol_value(c: u8) -> Option<u8> {
    match c {
        b'a'..=b'z' => Some(c - b'a'),
        b'2'..=b'7' => Some(c - b'2' + 26),
        _ => None,
    }
}

fn encode_body(payload: &Payload) -> String {
    (0..BODY_LEN)
        .map(|i| ALPHABET[symbol_at(payload, i * 5) as usize] as char)
        .collect()
}

fn decode_body(body: &str) -> Option<Payload> {
    if body.len() != BODY_LEN {
        return None;
    }
    let mut payload = [0u8; PAYLOAD_LEN];
    for (i, c) in body.bytes().enumerate() {
        let value = symbol_value(c)?;
        for k in 0..5 {
            let bit = (value >> (4 - k)) & 1;
            let pos = i * 5 + k;
            if pos < PAYLOAD_BITS {
                payload[pos / 8] |= bit << (7 - pos % 8);
            } else if bit != 0 {
                return None;
            }
        }
    }
    Some(payload)
}

/// The address an Ed25519 public key signs for.
pub fn derive_address(public_key: &PublicKey) -> WalletAddress {
    let body = encode_body(&payload_for(public_key.as_bytes()));
    WalletAddress::new(format!("{}{body}", WalletAddress::PREFIX))
}

/// Recover the public key bytes behind `address`, in any letter case.
///
/// `None` for a foreign prefix, a malformed body or a failed check value.
pub fn decode_address(address: &str) -> Option<[u8; 32]> {
    let lowered = address.trim().to_ascii_lowercase();
    let payload = decode_body(lowered.strip_prefix(WalletAddress::PREFIX)?)?;

    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&payload[..KEY_LEN]);
    (payload[KEY_LEN..] == check_value(&key)).then_some(key)
}

pub fn validate_address(address: &str) -> bool {
    decode_address(address).is_some()
}

/// Decode the public key an address commits to.
pub fn public_key_of(address: &WalletAddress) -> Option<PublicKey> {
    decode_address(address.as_str()).map(PublicKey)
}
