//! Identity verification for incoming requests.
//!
//! A request is authentic when its signature verifies against the public key
//! committed to by the claimed account address. Client wallets do not all
//! encode the signed text identically, so verification retries a fixed,
//! ordered list of canonical forms of the message. The first form that
//! verifies wins and later forms are never tried.
//!
//! The verifier only answers "is this account really the caller". Role
//! lookup is a separate step owned by the workflow orchestrator.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use terra_types::{Signature, WalletAddress};

use crate::address::decode_address;
use crate::sign::verify_signature;

/// Claimed identity plus proof, as supplied by a caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub account: WalletAddress,
    pub message: String,
    pub signature: Signature,
}

/// One canonical form of a signed message. Forms build on each other in
/// [`Canonicalization::ORDER`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Canonicalization {
    /// The bytes exactly as received.
    AsReceived,
    /// `\r\n` and lone `\r` rewritten to `\n`.
    LineEndings,
    /// Line endings normalised, then leading/trailing whitespace removed.
    Trimmed,
    /// Trimmed, each line trimmed, runs of spaces/tabs collapsed to one space.
    CollapsedWhitespace,
}

impl Canonicalization {
    pub const ORDER: [Canonicalization; 4] = [
        Self::AsReceived,
        Self::LineEndings,
        Self::Trimmed,
        Self::CollapsedWhitespace,
    ];

    pub fn apply<'a>(&self, message: &'a str) -> Cow<'a, str> {
        match self {
            Self::AsReceived => Cow::Borrowed(message),
            Self::LineEndings => normalize_line_endings(message),
            Self::Trimmed => match normalize_line_endings(message) {
                Cow::Borrowed(s) => Cow::Borrowed(s.trim()),
                Cow::Owned(s) => Cow::Owned(s.trim().to_string()),
            },
            Self::CollapsedWhitespace => {
                let normalized = normalize_line_endings(message);
                let collapsed: Vec<String> = normalized
                    .trim()
                    .split('\n')
                    .map(|line| {
                        line.split(|c: char| c == ' ' || c == '\t')
                            .filter(|w| !w.is_empty())
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .collect();
                Cow::Owned(collapsed.join("\n"))
            }
        }
    }
}

fn normalize_line_endings(message: &str) -> Cow<'_, str> {
    if message.contains('\r') {
        Cow::Owned(message.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(message)
    }
}

/// Stateless signature-based identity check.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityVerifier;

impl IdentityVerifier {
    pub fn new() -> Self {
        Self
    }

    /// `true` if `signature` over some canonical form of `message` was made by
    /// the key behind `claimed_account`. The address is matched case-insensitively.
    pub fn verify(&self, message: &str, signature: &Signature, claimed_account: &str) -> bool {
        self.verify_detailed(message, signature, claimed_account)
            .is_some()
    }

    /// Like [`IdentityVerifier::verify`], reporting which canonical form matched.
    pub fn verify_detailed(
        &self,
        message: &str,
        signature: &Signature,
        claimed_account: &str,
    ) -> Option<Canonicalization> {
        let public_key = terra_types::PublicKey(decode_address(claimed_account)?);

        let mut tried: Vec<Cow<'_, str>> = Vec::with_capacity(Canonicalization::ORDER.len());
        for form in Canonicalization::ORDER {
            let candidate = form.apply(message);
            if tried.iter().any(|t| *t == candidate) {
                continue;
            }
            if verify_signature(candidate.as_bytes(), signature, &public_key) {
                if form != Canonicalization::AsReceived {
                    tracing::debug!(
                        account = claimed_account,
                        canonicalization = ?form,
                        "signature matched after canonicalization"
                    );
                }
                return Some(form);
            }
            tried.push(candidate);
        }
        None
    }

    /// Verify a full set of credentials.
    pub fn verify_credentials(&self, credentials: &Credentials) -> bool {
        self.verify(
            &credentials.message,
            &credentials.signature,
            credentials.account.as_str(),
        )
    }
}
