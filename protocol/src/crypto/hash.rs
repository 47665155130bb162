//! # Hashing Utilities
//!
//! Cardano is a blake2b chain, so MERIDIAN is a blake2b crate. Two output
//! widths cover every use the ledger has, and we refuse to support more
//! without a very good reason:
//!
//! - **blake2b-256** — transaction body hashes and auxiliary data hashes.
//!   This 32-byte digest is the value hardware wallets sign and explorers
//!   index; reproduce it byte-for-byte or nothing interoperates.
//!
//! - **blake2b-224** — credential hashes. Payment keys, stake keys and pool
//!   cold keys all appear on-chain as 28-byte digests of their Ed25519
//!   public key.
//!
//! Both functions are pure, allocation-free, and fixed-output. There is no
//! streaming interface on purpose: everything the engine hashes already
//! lives in a contiguous buffer.

use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;

/// Compute the blake2b-256 hash of the input data.
///
/// This is the transaction hash function: the digest of the canonical CBOR
/// body bytes is the transaction identifier the rest of the world sees.
///
/// # Example
///
/// ```
/// use meridian_protocol::crypto::blake2b_256;
///
/// let digest = blake2b_256(b"meridian");
/// assert_eq!(digest.len(), 32);
/// ```
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2bVar::new(32).expect("32 is a valid blake2b output size");
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher
        .finalize_variable(&mut out)
        .expect("output buffer length matches requested digest size");
    out
}

/// Compute the blake2b-224 hash of the input data.
///
/// This is the credential hash function. Hashing a 32-byte Ed25519 public
/// key with it yields the 28-byte key hash that addresses, certificates and
/// witness checks are built from.
///
/// # Example
///
/// ```
/// use meridian_protocol::crypto::blake2b_224;
///
/// let key_hash = blake2b_224(&[0u8; 32]);
/// assert_eq!(key_hash.len(), 28);
/// ```
pub fn blake2b_224(data: &[u8]) -> [u8; 28] {
    let mut hasher = Blake2bVar::new(28).expect("28 is a valid blake2b output size");
    hasher.update(data);
    let mut out = [0u8; 28];
    hasher
        .finalize_variable(&mut out)
        .expect("output buffer length matches requested digest size");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_256_empty_input_known_vector() {
        // The canonical blake2b-256 digest of the empty string.
        let digest = blake2b_256(b"");
        assert_eq!(
            hex::encode(digest),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
    }

    #[test]
    fn blake2b_256_deterministic() {
        assert_eq!(blake2b_256(b"meridian"), blake2b_256(b"meridian"));
    }

    #[test]
    fn blake2b_256_different_inputs_differ() {
        assert_ne!(blake2b_256(b"meridian"), blake2b_256(b"Meridian"));
    }

    #[test]
    fn blake2b_224_deterministic_and_sized() {
        let a = blake2b_224(b"stake key");
        let b = blake2b_224(b"stake key");
        assert_eq!(a, b);
        assert_eq!(a.len(), 28);
    }

    #[test]
    fn widths_are_independent() {
        // The 224-bit digest is not a truncation of the 256-bit digest;
        // blake2b mixes the output length into the parameter block.
        let wide = blake2b_256(b"same input");
        let narrow = blake2b_224(b"same input");
        assert_ne!(&wide[..28], &narrow[..]);
    }
}
