//! # Address Module
//!
//! Cardano address handling for the construction engine. Every account
//! reference that enters or leaves the gateway is a string in one of three
//! shapes, and this module is the single place that tells them apart:
//!
//! 1. **Shelley addresses** — Bech32 with `addr`/`addr_test` (payment) or
//!    `stake`/`stake_test` (reward) prefixes. A one-byte header encodes the
//!    address type and the network; the rest is credential hashes.
//! 2. **Byron addresses** — legacy Base58-encoded CBOR. We never *derive*
//!    these, but inputs can still live on them, so we detect, decode, and
//!    witness them.
//! 3. **Pool key hashes** — 56 hex characters (or Bech32 with the `pool`
//!    prefix) standing in for a cold key. Not an address at all, but
//!    Rosetta pool operations put them in the `account.address` slot, so
//!    the address layer has to own them.
//!
//! ## Design Decisions
//!
//! - Address strings are parsed once at the phase boundary and carried as
//!   typed values afterwards; nothing downstream re-guesses an era.
//! - Reward addresses are *derived*, never trusted: staking operations
//!   supply a staking public key, and the reward address that must sign is
//!   computed from its blake2b-224 hash and the request's network.
//! - Bech32 (not Bech32m) — that is what CIP-19 specifies for addresses.

pub mod byron;
pub mod credential;
pub mod shelley;

use thiserror::Error;

pub use byron::ByronAddress;
pub use credential::{parse_pool_key_hash, CredentialKind, StakeCredential};
pub use shelley::{
    address_from_bytes, address_to_bytes, classify, payment_hrp, reward_account_bytes,
    reward_address_from_account_bytes, reward_address_from_key, reward_address_from_key_hash,
    stake_hrp, AddressEra, ShelleyAddress,
};

/// Errors that can occur while parsing or deriving addresses.
#[derive(Debug, Error)]
pub enum AddressError {
    /// The string is neither valid Bech32, valid Base58 CBOR, nor a key hash.
    #[error("'{address}' is not a parseable address")]
    Unparseable { address: String },

    /// A Bech32 string carried a prefix we do not serve.
    #[error("'{address}' has unexpected bech32 prefix '{hrp}'")]
    UnexpectedHrp { address: String, hrp: String },

    /// A reward address was required but something else was supplied.
    #[error("'{address}' is not a reward address")]
    NotRewardAddress { address: String },

    /// The decoded payload has an impossible length for its header.
    #[error("address payload has invalid length {got}")]
    InvalidLength { got: usize },

    /// The header byte does not correspond to any known address type.
    #[error("address header {header:#04x} is not a known address type")]
    UnknownHeader { header: u8 },

    /// Byron-specific decoding failed.
    #[error("'{address}' is not a valid Byron-era address")]
    NotByron { address: String },

    /// A pool key hash was expected: 56 hex characters or a `pool1...` string.
    #[error("'{value}' is not a valid pool key hash")]
    InvalidPoolKeyHash { value: String },

    /// A staking public key was malformed.
    #[error("invalid staking key: {reason}")]
    InvalidStakingKey { reason: String },
}
