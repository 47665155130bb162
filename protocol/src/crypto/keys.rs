//! # Key Types
//!
//! Ed25519 verification keys and signatures as the construction engine
//! sees them.
//!
//! The gateway never holds private keys in production — signing happens on
//! the client side (wallet, exchange HSM, hardware device), and what comes
//! back over the wire is hex-encoded public keys and signatures. So the
//! center of gravity here is [`VerificationKey`]: parse it, hash it into a
//! credential, verify a signature with it.
//!
//! [`SignerKeypair`] exists for the other side of that boundary: tests,
//! tooling, and demo flows that need to *produce* valid signatures. It is
//! deliberately minimal.
//!
//! ## Why Ed25519?
//!
//! Not our choice to make — Cardano signs with Ed25519, full stop. It is a
//! good mandate to inherit: deterministic signatures (no k-value footguns
//! like ECDSA), 128-bit security in 32+32 bytes, and fast verification,
//! which matters when combine checks every witness on every request.

use ed25519_dalek::{
    Signature as DalekSignature, Signer, SigningKey, VerifyingKey, SECRET_KEY_LENGTH,
};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::hash::blake2b_224;
use crate::config::{ED25519_PUBLIC_KEY_BYTES, ED25519_SIGNATURE_BYTES};

/// Errors that can occur during key operations.
///
/// These are intentionally vague about *why* something failed — leaking
/// details about key material through error messages is a classic footgun.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid public key bytes: wrong length or not a valid Ed25519 point")]
    InvalidPublicKey,

    #[error("invalid signature bytes: wrong length or not valid hex")]
    InvalidSignature,

    #[error("invalid secret key bytes: wrong length")]
    InvalidSecretKey,
}

// ---------------------------------------------------------------------------
// VerificationKey
// ---------------------------------------------------------------------------

/// An Ed25519 public key, the on-chain face of every signer.
///
/// Wallets send these hex-encoded; certificates and addresses carry their
/// blake2b-224 hash. The raw bytes are validated to be an actual curve
/// point at parse time, so a constructed `VerificationKey` is always
/// usable for verification.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKey {
    bytes: [u8; 32],
}

impl VerificationKey {
    /// Parse a verification key from raw bytes.
    ///
    /// Rejects anything that is not 32 bytes or not a valid Ed25519 point.
    /// We don't just accept any 32 bytes — some values aren't valid points
    /// on the curve, and using them could lead to weird behavior.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        if slice.len() != ED25519_PUBLIC_KEY_BYTES {
            return Err(KeyError::InvalidPublicKey);
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    /// Parse a verification key from a hex string.
    ///
    /// Accepts the bare 64-character form. Extended keys (key ‖ chain code,
    /// 128 characters) are accepted too; the chain code half is dropped,
    /// since the credential hash and signature check only involve the key.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidPublicKey)?;
        match bytes.len() {
            n if n == ED25519_PUBLIC_KEY_BYTES => Self::try_from_slice(&bytes),
            n if n == 2 * ED25519_PUBLIC_KEY_BYTES => {
                Self::try_from_slice(&bytes[..ED25519_PUBLIC_KEY_BYTES])
            }
            _ => Err(KeyError::InvalidPublicKey),
        }
    }

    /// The raw 32 key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Hex-encode the key for the wire.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// The blake2b-224 hash of this key — the credential form that appears
    /// in addresses, certificates, and pool owner sets.
    pub fn key_hash(&self) -> [u8; 28] {
        blake2b_224(&self.bytes)
    }

    /// Verify an Ed25519 signature over `message`.
    ///
    /// Returns a boolean rather than a `Result` because the vast majority
    /// of callers just want a yes/no answer and don't care about the
    /// specific failure mode.
    pub fn verify(&self, message: &[u8], signature: &EdSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let dalek_sig = DalekSignature::from_bytes(&signature.bytes);
        verifying_key.verify_strict(message, &dalek_sig).is_ok()
    }
}

impl fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VerificationKey({})", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// EdSignature
// ---------------------------------------------------------------------------

/// An Ed25519 signature over a transaction hash.
///
/// 64 bytes. Deterministic for a given (key, message) pair — that's the
/// beauty of Ed25519. No nonce management, no k-value disasters, no
/// sleepless nights wondering if your RNG was seeded properly at signing
/// time.
///
/// Signatures travel the wire as hex strings inside the Rosetta DTOs, so
/// this type has no serde impls of its own.
#[derive(Clone, PartialEq, Eq)]
pub struct EdSignature {
    bytes: [u8; 64],
}

impl EdSignature {
    /// Wrap raw 64 signature bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    /// Parse a signature from a 128-character hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str).map_err(|_| KeyError::InvalidSignature)?;
        if bytes.len() != ED25519_SIGNATURE_BYTES {
            return Err(KeyError::InvalidSignature);
        }
        let mut arr = [0u8; 64];
        arr.copy_from_slice(&bytes);
        Ok(Self { bytes: arr })
    }

    /// The raw 64 signature bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }

    /// Hex-encode the signature for the wire.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Debug for EdSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdSignature({})", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// SignerKeypair
// ---------------------------------------------------------------------------

/// An Ed25519 signing keypair for the client side of the protocol.
///
/// The gateway itself never signs. This type exists so integration tests
/// and tooling can play the wallet's role: generate a key, receive a
/// signing payload, return a valid signature.
///
/// ## Serialization
///
/// `SignerKeypair` intentionally does NOT implement `Serialize` /
/// `Deserialize`. Serializing private keys should be a deliberate,
/// conscious act, not something that happens because someone shoved a
/// keypair into a JSON response.
pub struct SignerKeypair {
    signing_key: SigningKey,
}

impl SignerKeypair {
    /// Generate a fresh keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self { signing_key }
    }

    /// Construct a keypair deterministically from a 32-byte seed.
    ///
    /// **Warning**: if you call this with a weak seed, you get a weak key.
    /// Use a proper CSPRNG or KDF to produce the seed bytes.
    pub fn from_seed(seed: &[u8; SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// The verification key associated with this keypair.
    pub fn verification_key(&self) -> VerificationKey {
        VerificationKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Sign a message (for the construction flow: the 32-byte body hash).
    pub fn sign(&self, message: &[u8]) -> EdSignature {
        let sig = self.signing_key.sign(message);
        EdSignature {
            bytes: sig.to_bytes(),
        }
    }
}

impl fmt::Debug for SignerKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material in debug output. Not even "partially."
        write!(f, "SignerKeypair(pub={})", self.verification_key().to_hex())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
