//! # Cryptographic Primitives for MERIDIAN
//!
//! Everything security-related in the construction engine flows through
//! here, and it is deliberately boring:
//!
//! - **Ed25519** for signatures — what Cardano signs with, fast and
//!   deterministic, and nobody has broken it.
//! - **blake2b-256** for transaction and metadata hashes — the ledger's
//!   content hash, and the digest every explorer must reproduce.
//! - **blake2b-224** for key hashes — payment, stake, and pool credentials
//!   are all 28-byte digests of Ed25519 public keys.
//!
//! ## A note on "rolling your own crypto"
//!
//! We don't. Everything here is a thin, type-safe wrapper around audited
//! implementations. If you're tempted to optimize these functions, please
//! reconsider. Then reconsider again. Then go read about timing attacks
//! and come back when you've lost the urge.

pub mod hash;
pub mod keys;

// Re-export the things people actually need so they don't have to memorize
// our module hierarchy.
pub use hash::{blake2b_224, blake2b_256};
pub use keys::{EdSignature, KeyError, SignerKeypair, VerificationKey};
