//! Stake credentials and pool key hashes.
//!
//! A stake credential is the 28-byte hash that certificates point at,
//! tagged with whether it hashes a key or a script. Pool operations use a
//! bare cold-key hash in the same width; Rosetta clients send it either as
//! 56 hex characters or as a `pool1...` Bech32 string.

use bech32::{Bech32, Hrp};
use serde::{Deserialize, Serialize};

use super::AddressError;
use crate::config::KEY_HASH_BYTES;
use crate::crypto::keys::VerificationKey;

/// Whether a credential hash commits to a key or a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialKind {
    /// blake2b-224 of an Ed25519 verification key. CBOR tag 0.
    KeyHash,
    /// blake2b-224 of a script. CBOR tag 1.
    ScriptHash,
}

impl CredentialKind {
    /// The CDDL discriminant used in certificate encodings.
    pub fn tag(&self) -> u8 {
        match self {
            Self::KeyHash => 0,
            Self::ScriptHash => 1,
        }
    }

    /// Inverse of [`tag`](Self::tag).
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::KeyHash),
            1 => Some(Self::ScriptHash),
            _ => None,
        }
    }
}

/// A stake credential: kind plus 28-byte hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StakeCredential {
    /// Key hash or script hash.
    pub kind: CredentialKind,
    /// The blake2b-224 digest.
    pub hash: [u8; 28],
}

impl StakeCredential {
    /// Build the key-hash credential for a staking public key.
    pub fn from_staking_key(key: &VerificationKey) -> Self {
        Self {
            kind: CredentialKind::KeyHash,
            hash: key.key_hash(),
        }
    }

    /// Wrap an existing 28-byte hash.
    pub fn from_hash(kind: CredentialKind, hash: [u8; 28]) -> Self {
        Self { kind, hash }
    }

    /// Parse a credential from its CDDL parts.
    pub fn from_parts(tag: u8, hash: &[u8]) -> Result<Self, AddressError> {
        let kind = CredentialKind::from_tag(tag).ok_or(AddressError::UnknownHeader { header: tag })?;
        if hash.len() != KEY_HASH_BYTES {
            return Err(AddressError::InvalidLength { got: hash.len() });
        }
        let mut arr = [0u8; 28];
        arr.copy_from_slice(hash);
        Ok(Self { kind, hash: arr })
    }
}

/// Parse a pool key hash from either of its wire forms.
///
/// Accepts 56 hex characters or a Bech32 string with the `pool` prefix.
/// Returns the raw 28 bytes that go into certificates.
pub fn parse_pool_key_hash(value: &str) -> Result<[u8; 28], AddressError> {
    let invalid = || AddressError::InvalidPoolKeyHash {
        value: value.to_string(),
    };

    let bytes = if value.len() == 2 * KEY_HASH_BYTES && value.chars().all(|c| c.is_ascii_hexdigit())
    {
        hex::decode(value).map_err(|_| invalid())?
    } else {
        let (hrp, data) = bech32::decode(value).map_err(|_| invalid())?;
        if hrp.to_string() != "pool" {
            return Err(invalid());
        }
        data
    };

    if bytes.len() != KEY_HASH_BYTES {
        return Err(invalid());
    }
    let mut arr = [0u8; 28];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

/// Render a pool key hash in its Bech32 form.
pub fn pool_key_hash_to_bech32(hash: &[u8; 28]) -> String {
    let hrp = Hrp::parse("pool").expect("static HRP is valid");
    bech32::encode::<Bech32>(hrp, hash).expect("encoding a 28-byte payload never fails")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
