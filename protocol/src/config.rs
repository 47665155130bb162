//! # Protocol Configuration & Constants
//!
//! Every magic number in MERIDIAN lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! Most of these values are fixed by the Cardano ledger rules or by the
//! Rosetta specification — they are not tuning knobs. Changing one does not
//! give you a different flavor of the gateway, it gives you transactions
//! that every node on the planet rejects.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Networks
// ---------------------------------------------------------------------------

/// Network magic for mainnet — the real deal. Mistakes here cost real money.
pub const MAINNET_NETWORK_MAGIC: u64 = 764824073;

/// Network magic for the preprod testnet.
pub const PREPROD_NETWORK_MAGIC: u64 = 1;

/// Network magic for the preview testnet.
pub const PREVIEW_NETWORK_MAGIC: u64 = 2;

/// The Cardano network a request is addressed to.
///
/// The network decides two things the engine actually cares about: the
/// network nibble baked into every Shelley address header, and the
/// human-readable prefix used when rendering addresses back to strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Production network.
    Mainnet,
    /// Long-lived testnet tracking mainnet eras.
    Preprod,
    /// Bleeding-edge testnet, reset when hard forks need rehearsing.
    Preview,
}

impl Network {
    /// Looks up a network by its Rosetta `network_identifier.network` value.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "mainnet" => Some(Self::Mainnet),
            "preprod" => Some(Self::Preprod),
            "preview" => Some(Self::Preview),
            _ => None,
        }
    }

    /// The protocol magic used in network handshakes.
    pub fn magic(&self) -> u64 {
        match self {
            Self::Mainnet => MAINNET_NETWORK_MAGIC,
            Self::Preprod => PREPROD_NETWORK_MAGIC,
            Self::Preview => PREVIEW_NETWORK_MAGIC,
        }
    }

    /// The network nibble carried in the low half of every Shelley address
    /// header byte: 1 for mainnet, 0 for every testnet.
    pub fn id_nibble(&self) -> u8 {
        match self {
            Self::Mainnet => 1,
            Self::Preprod | Self::Preview => 0,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Preprod => write!(f, "preprod"),
            Self::Preview => write!(f, "preview"),
        }
    }
}

// ---------------------------------------------------------------------------
// Currency Model
// ---------------------------------------------------------------------------

/// The ticker symbol for the native currency.
pub const ADA: &str = "ADA";

/// ADA carries six decimal places; the smallest unit is the lovelace.
pub const ADA_DECIMALS: u32 = 6;

/// Native (non-ADA) assets are always expressed in whole units.
pub const MULTI_ASSET_DECIMALS: u32 = 0;

/// A policy id is a 28-byte script hash — 56 hex characters, always.
pub const POLICY_ID_HEX_LENGTH: usize = 56;

/// Asset names are 0..=32 bytes, i.e. at most 64 hex characters.
pub const ASSET_NAME_MAX_HEX_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Cryptographic Sizes
// ---------------------------------------------------------------------------

/// Transaction hashes are blake2b-256 digests.
pub const TX_HASH_BYTES: usize = 32;

/// Key hashes (payment, stake, pool) are blake2b-224 digests.
pub const KEY_HASH_BYTES: usize = 28;

/// Ed25519 public keys. 32 bytes, no exceptions.
pub const ED25519_PUBLIC_KEY_BYTES: usize = 32;

/// Ed25519 signatures. Always 64 bytes. If yours isn't, something has gone
/// terribly wrong.
pub const ED25519_SIGNATURE_BYTES: usize = 64;

/// BIP32 chain codes attached to Byron-era extended keys.
pub const CHAIN_CODE_BYTES: usize = 32;

/// A Shelley reward account is a header byte plus a 28-byte credential hash.
pub const REWARD_ACCOUNT_BYTES: usize = 29;

// ---------------------------------------------------------------------------
// Transaction Body Layout
// ---------------------------------------------------------------------------
//
// The transaction body is a CBOR map with integer keys in a fixed order.
// The key values are dictated by the ledger CDDL; the *order* is dictated by
// canonical encoding. Both are load-bearing: shuffle either and the body
// hash changes.

/// Body map key for the input set.
pub const BODY_KEY_INPUTS: u32 = 0;

/// Body map key for the output list.
pub const BODY_KEY_OUTPUTS: u32 = 1;

/// Body map key for the fee.
pub const BODY_KEY_FEE: u32 = 2;

/// Body map key for the time-to-live slot.
pub const BODY_KEY_TTL: u32 = 3;

/// Body map key for the certificate list.
pub const BODY_KEY_CERTIFICATES: u32 = 4;

/// Body map key for the withdrawal map.
pub const BODY_KEY_WITHDRAWALS: u32 = 5;

/// Body map key for the auxiliary data hash.
pub const BODY_KEY_AUX_DATA_HASH: u32 = 7;

/// Witness set map key for vkey witnesses.
pub const WITNESS_KEY_VKEY: u32 = 0;

/// Witness set map key for Byron bootstrap witnesses.
pub const WITNESS_KEY_BOOTSTRAP: u32 = 2;

/// CBOR tag for rational numbers — used for the pool margin unit interval.
pub const RATIONAL_TAG: u64 = 30;

// ---------------------------------------------------------------------------
// Vote Registration (CIP-15)
// ---------------------------------------------------------------------------

/// Auxiliary metadata label under which Catalyst registration data lives.
pub const CATALYST_LABEL_DATA: u32 = 61284;

/// Auxiliary metadata label under which the registration signature lives.
pub const CATALYST_LABEL_SIG: u32 = 61285;

/// Data map index of the voting key.
pub const CATALYST_IDX_VOTING_KEY: u32 = 1;

/// Data map index of the staking public key.
pub const CATALYST_IDX_STAKE_KEY: u32 = 2;

/// Data map index of the reward address bytes.
pub const CATALYST_IDX_REWARD_ADDRESS: u32 = 3;

/// Data map index of the voting nonce.
pub const CATALYST_IDX_VOTING_NONCE: u32 = 4;

/// Signature map index of the registration signature.
pub const CATALYST_IDX_VOTING_SIGNATURE: u32 = 1;

// ---------------------------------------------------------------------------
// Construction Defaults
// ---------------------------------------------------------------------------

/// Relative TTL applied when the caller does not supply one: the built
/// transaction stays valid for this many slots past the current tip.
pub const DEFAULT_RELATIVE_TTL: u64 = 1000;

/// Stake key registration deposit, in lovelace, when protocol parameters
/// are unavailable. Matches the value mainnet has carried since Shelley.
pub const DEFAULT_KEY_DEPOSIT: u64 = 2_000_000;

/// Stake pool registration deposit, in lovelace, when protocol parameters
/// are unavailable.
pub const DEFAULT_POOL_DEPOSIT: u64 = 500_000_000;

// ---------------------------------------------------------------------------
// Node Submit API
// ---------------------------------------------------------------------------

/// Path of the cardano-submit-api endpoint the gateway forwards to.
pub const SUBMIT_API_PATH: &str = "/api/submit/tx";

/// HTTP status the submit API returns on acceptance.
pub const SUBMIT_SUCCESS_STATUS: u16 = 202;

/// Length of a hex-encoded transaction hash.
pub const TX_HASH_HEX_LENGTH: usize = 64;

// ---------------------------------------------------------------------------
// Protocol Parameters
// ---------------------------------------------------------------------------

/// The slice of the on-chain protocol parameters the construction engine
/// consumes. Sourced from an external collaborator (indexer or config file);
/// the engine itself never fetches anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolParameters {
    /// Linear fee coefficient (`min_fee_a`): lovelace per byte.
    pub min_fee_coefficient: u64,
    /// Linear fee constant (`min_fee_b`): lovelace.
    pub min_fee_constant: u64,
    /// Deposit charged per stake key registration, in lovelace.
    pub key_deposit: u64,
    /// Deposit charged per pool registration, in lovelace.
    pub pool_deposit: u64,
}

impl Default for ProtocolParameters {
    /// Mainnet values as of the Babbage era. Useful for offline operation
    /// and tests; production deployments source live values.
    fn default() -> Self {
        Self {
            min_fee_coefficient: 44,
            min_fee_constant: 155_381,
            key_deposit: DEFAULT_KEY_DEPOSIT,
            pool_deposit: DEFAULT_POOL_DEPOSIT,
        }
    }
}

/// Just the deposit half of the protocol parameters — the part the fee
/// residual calculation needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositParameters {
    /// Lovelace locked per stake key registration.
    pub key_deposit: u64,
    /// Lovelace locked per pool registration.
    pub pool_deposit: u64,
}

impl Default for DepositParameters {
    fn default() -> Self {
        Self {
            key_deposit: DEFAULT_KEY_DEPOSIT,
            pool_deposit: DEFAULT_POOL_DEPOSIT,
        }
    }
}

impl From<&ProtocolParameters> for DepositParameters {
    fn from(pp: &ProtocolParameters) -> Self {
        Self {
            key_deposit: pp.key_deposit,
            pool_deposit: pp.pool_deposit,
        }
    }
}
