//! Core type definitions for Rosetta operations.
//!
//! These types are the engine's half of the Rosetta wire vocabulary: the
//! flat operation list that clients send, and the currency/amount model
//! every other module consumes. They are plain data — all interpretation
//! lives in the codec.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{ADA, ADA_DECIMALS, MULTI_ASSET_DECIMALS, POLICY_ID_HEX_LENGTH};

// ---------------------------------------------------------------------------
// OperationKind
// ---------------------------------------------------------------------------

/// Discriminant for what a Rosetta operation does to the ledger.
///
/// This is a closed set. The codec matches on it exhaustively, so teaching
/// the engine a new operation kind is a compile-time event, not a silently
/// ignored default branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Spend a UTXO. Amount is negative; `coin_change` names the coin.
    #[serde(rename = "input")]
    Input,
    /// Create a UTXO. Amount is positive; may carry a token bundle.
    #[serde(rename = "output")]
    Output,
    /// Register a stake key (pays the key deposit).
    #[serde(rename = "stakeKeyRegistration")]
    StakeKeyRegistration,
    /// Delegate a registered stake key to a pool.
    #[serde(rename = "stakeDelegation")]
    StakeDelegation,
    /// Withdraw rewards from a reward account. Amount is negative.
    #[serde(rename = "withdrawal")]
    Withdrawal,
    /// Deregister a stake key (recovers the key deposit).
    #[serde(rename = "stakeKeyDeregistration")]
    StakeKeyDeregistration,
    /// Register a stake pool from structured parameters.
    #[serde(rename = "poolRegistration")]
    PoolRegistration,
    /// Register a stake pool from a pre-built certificate blob.
    #[serde(rename = "poolRegistrationWithCert")]
    PoolRegistrationWithCert,
    /// Retire a stake pool at a given epoch.
    #[serde(rename = "poolRetirement")]
    PoolRetirement,
    /// Register a Catalyst voting key via auxiliary metadata.
    #[serde(rename = "voteRegistration")]
    VoteRegistration,
}

impl OperationKind {
    /// The wire string for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::StakeKeyRegistration => "stakeKeyRegistration",
            Self::StakeDelegation => "stakeDelegation",
            Self::Withdrawal => "withdrawal",
            Self::StakeKeyDeregistration => "stakeKeyDeregistration",
            Self::PoolRegistration => "poolRegistration",
            Self::PoolRegistrationWithCert => "poolRegistrationWithCert",
            Self::PoolRetirement => "poolRetirement",
            Self::VoteRegistration => "voteRegistration",
        }
    }

    /// Inverse of [`as_str`](Self::as_str). Unknown strings get `None`,
    /// which the codec turns into `UnsupportedOperationType`.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "input" => Some(Self::Input),
            "output" => Some(Self::Output),
            "stakeKeyRegistration" => Some(Self::StakeKeyRegistration),
            "stakeDelegation" => Some(Self::StakeDelegation),
            "withdrawal" => Some(Self::Withdrawal),
            "stakeKeyDeregistration" => Some(Self::StakeKeyDeregistration),
            "poolRegistration" => Some(Self::PoolRegistration),
            "poolRegistrationWithCert" => Some(Self::PoolRegistrationWithCert),
            "poolRetirement" => Some(Self::PoolRetirement),
            "voteRegistration" => Some(Self::VoteRegistration),
            _ => None,
        }
    }

    /// All kinds, in the order the parser emits them.
    pub fn all() -> &'static [OperationKind] {
        &[
            Self::Input,
            Self::Output,
            Self::StakeKeyRegistration,
            Self::StakeDelegation,
            Self::Withdrawal,
            Self::StakeKeyDeregistration,
            Self::PoolRegistration,
            Self::PoolRegistrationWithCert,
            Self::PoolRetirement,
            Self::VoteRegistration,
        ]
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Currency & Amount
// ---------------------------------------------------------------------------

/// Extra currency fields for native assets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyMetadata {
    /// The minting policy script hash, 56 hex characters.
    #[serde(rename = "policyId")]
    pub policy_id: String,
}

/// A currency: ADA or a native asset under a minting policy.
///
/// For native assets the `symbol` carries the hex-encoded asset name and
/// the policy id rides in `metadata` — mirroring how the ledger itself
/// addresses an asset by `(policy, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    /// "ADA", or the hex asset name for native assets.
    pub symbol: String,
    /// 6 for ADA, 0 for native assets.
    pub decimals: u32,
    /// Present exactly when this is a native asset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<CurrencyMetadata>,
}

impl Currency {
    /// The native currency.
    pub fn ada() -> Self {
        Self {
            symbol: ADA.to_string(),
            decimals: ADA_DECIMALS,
            metadata: None,
        }
    }

    /// A native asset addressed by policy id and hex asset name.
    pub fn native_asset(policy_id: &str, asset_name_hex: &str) -> Self {
        Self {
            symbol: asset_name_hex.to_string(),
            decimals: MULTI_ASSET_DECIMALS,
            metadata: Some(CurrencyMetadata {
                policy_id: policy_id.to_string(),
            }),
        }
    }

    /// `true` if this is the native currency.
    pub fn is_ada(&self) -> bool {
        self.symbol == ADA && self.metadata.is_none()
    }

    /// The flat unit string `policy_id ‖ asset_name` for native assets.
    pub fn unit(&self) -> String {
        match &self.metadata {
            Some(meta) => format!("{}{}", meta.policy_id, self.symbol),
            None => self.symbol.clone(),
        }
    }

    /// Decompose a unit string back into `(policy_id, asset_name)`.
    ///
    /// The policy id is fixed-width (56 hex characters), so this is a pure
    /// string slice and is the exact inverse of [`unit`](Self::unit).
    pub fn decompose_unit(unit: &str) -> Option<(&str, &str)> {
        if unit.len() < POLICY_ID_HEX_LENGTH {
            return None;
        }
        Some(unit.split_at(POLICY_ID_HEX_LENGTH))
    }
}

/// A signed quantity of some currency.
///
/// The value travels as a string (Rosetta convention: JSON numbers are not
/// trusted with 64-bit lovelace amounts), parsed into an `i128` at the
/// codec boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    /// Signed integer as a decimal string, e.g. `"-9000000"`.
    pub value: String,
    /// The denomination.
    pub currency: Currency,
}

impl Amount {
    /// An ADA amount in lovelace.
    pub fn ada(value: i128) -> Self {
        Self {
            value: value.to_string(),
            currency: Currency::ada(),
        }
    }

    /// A native asset amount.
    pub fn asset(value: i128, policy_id: &str, asset_name_hex: &str) -> Self {
        Self {
            value: value.to_string(),
            currency: Currency::native_asset(policy_id, asset_name_hex),
        }
    }

    /// Parse the value string. `None` if it is not a valid signed integer.
    pub fn value_i128(&self) -> Option<i128> {
        self.value.trim_start_matches('+').parse::<i128>().ok()
    }
}

// ---------------------------------------------------------------------------
// Accounts & Coins
// ---------------------------------------------------------------------------

/// A nested sub-account qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubAccountIdentifier {
    pub address: String,
}

/// Extra account fields — currently just the Byron chain code, which rides
/// along so bootstrap witnesses can be rebuilt at combine time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentifierMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_code: Option<String>,
}

/// An account reference: an address string plus optional qualifiers.
///
/// Immutable value, shared by read across phases. The address may be a
/// Shelley payment address, a reward address, a Byron address, or (for
/// pool operations) a bare pool key hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentifier {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_account: Option<SubAccountIdentifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AccountIdentifierMetadata>,
}

impl AccountIdentifier {
    /// An account with no qualifiers.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            sub_account: None,
            metadata: None,
        }
    }
}

/// Identifies a UTXO as `"<tx_hash_hex>:<output_index>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinIdentifier {
    pub identifier: String,
}

impl CoinIdentifier {
    /// Compose from parts.
    pub fn new(tx_hash_hex: &str, index: u64) -> Self {
        Self {
            identifier: format!("{tx_hash_hex}:{index}"),
        }
    }

    /// Split back into `(tx_hash_hex, index)`.
    pub fn split(&self) -> Option<(&str, u64)> {
        let (hash, index) = self.identifier.split_once(':')?;
        Some((hash, index.parse().ok()?))
    }
}

/// Whether a coin is consumed or produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoinAction {
    #[serde(rename = "coin_spent")]
    Spent,
    #[serde(rename = "coin_created")]
    Created,
}

/// A coin transition attached to an input or output operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinChange {
    pub coin_identifier: CoinIdentifier,
    pub coin_action: CoinAction,
}

// ---------------------------------------------------------------------------
// Keys & Signatures
// ---------------------------------------------------------------------------

/// Supported signature curve. Cardano is Ed25519-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveType {
    #[serde(rename = "edwards25519")]
    Edwards25519,
}

/// A public key on the wire: hex bytes plus curve tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    pub hex_bytes: String,
    pub curve_type: CurveType,
}

impl PublicKey {
    /// An Edwards25519 key from hex bytes.
    pub fn new(hex_bytes: impl Into<String>) -> Self {
        Self {
            hex_bytes: hex_bytes.into(),
            curve_type: CurveType::Edwards25519,
        }
    }
}

/// Signature scheme tag for payloads and signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureType {
    #[serde(rename = "ed25519")]
    Ed25519,
}

/// The exact bytes one signer must sign, keyed by account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningPayload {
    pub account_identifier: AccountIdentifier,
    /// The 32-byte transaction body hash, hex-encoded.
    pub hex_bytes: String,
    pub signature_type: SignatureType,
}

/// A signature produced externally and handed to combine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub signing_payload: SigningPayload,
    pub public_key: PublicKey,
    pub signature_type: SignatureType,
    /// 64 signature bytes, hex-encoded.
    pub hex_bytes: String,
}

// ---------------------------------------------------------------------------
// Operation metadata
// ---------------------------------------------------------------------------

/// One policy's worth of assets attached to an output operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBundleItem {
    #[serde(rename = "policyId")]
    pub policy_id: String,
    /// One amount per asset name under this policy.
    pub tokens: Vec<Amount>,
}

/// Pool margin as an exact rational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMargin {
    pub numerator: String,
    pub denominator: String,
}

/// Off-chain pool metadata pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolMetadata {
    pub url: String,
    /// 32-byte content hash, hex-encoded.
    pub hash: String,
}

/// A pool relay in any of the three ledger shapes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relay {
    /// `single_host_addr`, `single_host_name`, or `multi_host_name`.
    #[serde(rename = "type")]
    pub relay_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipv6: Option<String>,
    #[serde(rename = "dnsName", skip_serializing_if = "Option::is_none")]
    pub dns_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
}

/// Structured pool registration parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolRegistrationParams {
    #[serde(rename = "vrfKeyHash")]
    pub vrf_key_hash: String,
    #[serde(rename = "rewardAddress")]
    pub reward_address: String,
    pub pledge: String,
    pub cost: String,
    #[serde(rename = "poolOwners")]
    pub pool_owners: Vec<String>,
    pub relays: Vec<Relay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<PoolMargin>,
    #[serde(rename = "poolMetadata", skip_serializing_if = "Option::is_none")]
    pub pool_metadata: Option<PoolMetadata>,
}

/// Catalyst vote registration payload (CIP-15).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRegistrationMetadata {
    #[serde(rename = "votingKey")]
    pub voting_key: PublicKey,
    #[serde(rename = "stakeKey")]
    pub stake_key: PublicKey,
    #[serde(rename = "rewardAddress")]
    pub reward_address: String,
    #[serde(rename = "votingNonce")]
    pub voting_nonce: u64,
    #[serde(rename = "votingSignature")]
    pub voting_signature: String,
}

/// The kind-specific payload of an operation.
///
/// Which fields are meaningful depends on the operation kind; the codec
/// rejects operations whose kind demands a field that is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationMetadata {
    /// Staking public key, for stake certificates and withdrawals.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staking_credential: Option<PublicKey>,
    /// Target pool for stake delegations (hex key hash).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_key_hash: Option<String>,
    /// Retirement epoch for pool retirements.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epoch: Option<u64>,
    /// Native assets carried by an output.
    #[serde(rename = "tokenBundle", skip_serializing_if = "Option::is_none")]
    pub token_bundle: Option<Vec<TokenBundleItem>>,
    /// Structured pool registration parameters.
    #[serde(
        rename = "poolRegistrationParams",
        skip_serializing_if = "Option::is_none"
    )]
    pub pool_registration_params: Option<PoolRegistrationParams>,
    /// Pre-built pool registration certificate, hex CBOR.
    #[serde(rename = "poolRegistrationCert", skip_serializing_if = "Option::is_none")]
    pub pool_registration_cert: Option<String>,
    /// Catalyst vote registration payload.
    #[serde(
        rename = "voteRegistrationMetadata",
        skip_serializing_if = "Option::is_none"
    )]
    pub vote_registration_metadata: Option<VoteRegistrationMetadata>,
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// Position of an operation within a transaction's operation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationIdentifier {
    pub index: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_index: Option<u64>,
}

impl OperationIdentifier {
    pub fn new(index: u64) -> Self {
        Self {
            index,
            network_index: None,
        }
    }
}

/// One semantic step of a transaction, Rosetta-style.
///
/// Ordering within the list is significant only for input/output index
/// assignment: the Nth input operation becomes the Nth transaction input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub operation_identifier: OperationIdentifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_operations: Option<Vec<OperationIdentifier>>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountIdentifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coin_change: Option<CoinChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<OperationMetadata>,
}

impl Operation {
    /// A bare operation of the given kind at the given index.
    pub fn new(index: u64, kind: OperationKind) -> Self {
        Self {
            operation_identifier: OperationIdentifier::new(index),
            related_operations: None,
            kind: kind.as_str().to_string(),
            status: Some(String::new()),
            account: None,
            amount: None,
            coin_change: None,
            metadata: None,
        }
    }

    /// The operation's resolved kind, if it is one we support.
    pub fn kind(&self) -> Option<OperationKind> {
        OperationKind::from_str_opt(&self.kind)
    }

    /// The operation index from the identifier.
    pub fn index(&self) -> u64 {
        self.operation_identifier.index
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_kind_wire_strings_roundtrip() {
        for kind in OperationKind::all() {
            assert_eq!(OperationKind::from_str_opt(kind.as_str()), Some(*kind));
        }
        assert_eq!(OperationKind::from_str_opt("dRepVoteDelegation"), None);
    }

    #[test]
    fn operation_kind_serde_uses_wire_strings() {
        let json = serde_json::to_string(&OperationKind::StakeKeyRegistration).unwrap();
        assert_eq!(json, "\"stakeKeyRegistration\"");
        let back: OperationKind = serde_json::from_str("\"poolRetirement\"").unwrap();
        assert_eq!(back, OperationKind::PoolRetirement);
    }

    #[test]
    fn ada_amount_parses_signed_values() {
        assert_eq!(Amount::ada(-9_000_000).value_i128(), Some(-9_000_000));
        assert_eq!(Amount::ada(5).value_i128(), Some(5));
        let bad = Amount {
            value: "12.5".into(),
            currency: Currency::ada(),
        };
        assert_eq!(bad.value_i128(), None);
    }

    #[test]
    fn unit_composition_and_decomposition_are_inverse() {
        let policy = "b0d07d45fe9514f80213f4020e5a61241458be626841cde717cb38a7";
        let name = "6e7574636f696e";
        let currency = Currency::native_asset(policy, name);
        let unit = currency.unit();
        assert_eq!(unit.len(), policy.len() + name.len());

        let (p, n) = Currency::decompose_unit(&unit).unwrap();
        assert_eq!(p, policy);
        assert_eq!(n, name);
    }

    #[test]
    fn empty_asset_name_decomposes_cleanly() {
        let policy = "b0d07d45fe9514f80213f4020e5a61241458be626841cde717cb38a7";
        let currency = Currency::native_asset(policy, "");
        let unit = currency.unit();
        let (p, n) = Currency::decompose_unit(&unit).unwrap();
        assert_eq!(p, policy);
        assert_eq!(n, "");
    }

    #[test]
    fn decompose_rejects_short_units() {
        assert!(Currency::decompose_unit("deadbeef").is_none());
    }

    #[test]
    fn coin_identifier_roundtrip() {
        let coin = CoinIdentifier::new(&"ab".repeat(32), 3);
        let (hash, index) = coin.split().unwrap();
        assert_eq!(hash, "ab".repeat(32));
        assert_eq!(index, 3);
    }

    #[test]
    fn coin_identifier_rejects_malformed() {
        let coin = CoinIdentifier {
            identifier: "no-colon-here".into(),
        };
        assert!(coin.split().is_none());
    }

    #[test]
    fn operation_json_roundtrip() {
        let mut op = Operation::new(0, OperationKind::Input);
        op.account = Some(AccountIdentifier::new("addr1xyz"));
        op.amount = Some(Amount::ada(-5_000_000));
        op.coin_change = Some(CoinChange {
            coin_identifier: CoinIdentifier::new(&"00".repeat(32), 0),
            coin_action: CoinAction::Spent,
        });

        let json = serde_json::to_string(&op).unwrap();
        let back: Operation = serde_json::from_str(&json).unwrap();
        assert_eq!(op, back);
        assert_eq!(back.kind(), Some(OperationKind::Input));
    }

    #[test]
    fn operation_type_field_serializes_as_type() {
        let op = Operation::new(1, OperationKind::Output);
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("\"type\":\"output\""));
    }

    #[test]
    fn amount_currency_json_shape() {
        let amount = Amount::asset(
            1,
            "b0d07d45fe9514f80213f4020e5a61241458be626841cde717cb38a7",
            "6e7574636f696e",
        );
        let json = serde_json::to_string(&amount).unwrap();
        assert!(json.contains("\"policyId\""));
        assert!(json.contains("\"decimals\":0"));
    }
}
