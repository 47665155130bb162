//! Typed ledger constructs.
//!
//! These are the structures the operation codec produces and the assembler
//! serializes: inputs, outputs with multi-asset values, certificates, and
//! withdrawals. They hold raw bytes (hashes, address bytes) rather than
//! strings — by the time a value lands here, every string from the wire has
//! already been parsed and validated.

use std::collections::BTreeMap;

use crate::address::StakeCredential;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// A reference to the UTXO being spent: `(tx_hash, output_index)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInput {
    pub tx_hash: [u8; 32],
    pub index: u64,
}

// ---------------------------------------------------------------------------
// Multi-asset values
// ---------------------------------------------------------------------------

/// Native assets grouped per policy, canonically ordered by construction.
///
/// Both levels are `BTreeMap`s keyed by raw bytes, so iteration order is
/// the lexicographic byte order the canonical CBOR encoding requires —
/// regardless of the order assets arrived in the token bundle. There is no
/// way to build an out-of-order `MultiAsset`; that is the point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiAsset {
    groups: BTreeMap<Vec<u8>, BTreeMap<Vec<u8>, u64>>,
}

impl MultiAsset {
    /// An empty asset bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `quantity` of `(policy_id, asset_name)`. Quantities for the
    /// same asset accumulate.
    pub fn add(&mut self, policy_id: [u8; 28], asset_name: Vec<u8>, quantity: u64) {
        *self
            .groups
            .entry(policy_id.to_vec())
            .or_default()
            .entry(asset_name)
            .or_insert(0) += quantity;
    }

    /// `true` when no assets are present.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of policy groups.
    pub fn policy_count(&self) -> usize {
        self.groups.len()
    }

    /// Iterate policies in canonical (byte-lexicographic) order.
    pub fn iter(&self) -> impl Iterator<Item = (&Vec<u8>, &BTreeMap<Vec<u8>, u64>)> {
        self.groups.iter()
    }
}

// ---------------------------------------------------------------------------
// Outputs
// ---------------------------------------------------------------------------

/// A transaction output: address bytes, an ADA amount, and any native
/// assets riding along.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutput {
    /// Raw address bytes as they appear on-chain.
    pub address: Vec<u8>,
    /// Lovelace.
    pub coin: u64,
    /// Native assets; empty for ADA-only outputs.
    pub assets: MultiAsset,
}

// ---------------------------------------------------------------------------
// Withdrawals
// ---------------------------------------------------------------------------

/// A reward-account withdrawal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
    /// Header byte plus 28-byte credential: the withdrawal map key.
    pub reward_account: [u8; 29],
    /// Lovelace withdrawn.
    pub amount: u64,
}

// ---------------------------------------------------------------------------
// Certificates
// ---------------------------------------------------------------------------

/// A pool relay in one of its three ledger shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelaySpec {
    /// `[0, port?, ipv4?, ipv6?]`
    SingleHostAddr {
        port: Option<u16>,
        ipv4: Option<[u8; 4]>,
        ipv6: Option<[u8; 16]>,
    },
    /// `[1, port?, dns_name]` — an A/AAAA DNS record.
    SingleHostName { port: Option<u16>, dns_name: String },
    /// `[2, dns_name]` — an SRV DNS record.
    MultiHostName { dns_name: String },
}

/// Off-chain pool metadata pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolMetadataSpec {
    pub url: String,
    pub hash: [u8; 32],
}

/// Everything a pool registration certificate carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolParams {
    /// Cold key hash of the pool operator.
    pub operator: [u8; 28],
    /// VRF verification key hash.
    pub vrf_key_hash: [u8; 32],
    /// Pledge in lovelace.
    pub pledge: u64,
    /// Fixed cost per epoch in lovelace.
    pub cost: u64,
    /// Margin numerator (the margin is `numerator / denominator`).
    pub margin_numerator: u64,
    /// Margin denominator.
    pub margin_denominator: u64,
    /// Reward account bytes (header + credential).
    pub reward_account: [u8; 29],
    /// Stake key hashes of the pool owners.
    pub owners: Vec<[u8; 28]>,
    /// Relay list, possibly empty.
    pub relays: Vec<RelaySpec>,
    /// Off-chain metadata pointer, if published.
    pub metadata: Option<PoolMetadataSpec>,
}

/// A ledger certificate. One Rosetta staking/pool operation maps to
/// exactly one of these, in operation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Certificate {
    /// `[0, credential]`
    StakeRegistration(StakeCredential),
    /// `[1, credential]`
    StakeDeregistration(StakeCredential),
    /// `[2, credential, pool_key_hash]`
    StakeDelegation {
        credential: StakeCredential,
        pool_key_hash: [u8; 28],
    },
    /// `[3, operator, vrf, pledge, cost, margin, reward_account, owners,
    /// relays, metadata]`
    PoolRegistration(PoolParams),
    /// `[4, pool_key_hash, epoch]`
    PoolRetirement { pool_key_hash: [u8; 28], epoch: u64 },
}

// ---------------------------------------------------------------------------
// Transaction body
// ---------------------------------------------------------------------------

/// The complete, typed transaction body the assembler serializes.
///
/// Construct ordering here *is* the on-chain ordering: inputs, outputs and
/// certificates are encoded exactly in the order they appear in these
/// vectors. Withdrawals are re-sorted by reward account bytes at encode
/// time, because the ledger demands canonical map key order no matter what
/// order operations arrived in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionBody {
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    /// Fee in lovelace.
    pub fee: u64,
    /// Absolute expiry slot. Encoded even when zero.
    pub ttl: u64,
    pub certificates: Vec<Certificate>,
    pub withdrawals: Vec<Withdrawal>,
    /// blake2b-256 of the serialized auxiliary data, when present.
    pub aux_data_hash: Option<[u8; 32]>,
}

impl TransactionBody {
    /// A body with no constructs — the starting point for builders.
    pub fn empty() -> Self {
        Self {
            inputs: Vec::new(),
            outputs: Vec::new(),
            fee: 0,
            ttl: 0,
            certificates: Vec::new(),
            withdrawals: Vec::new(),
            aux_data_hash: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Witnesses
// ---------------------------------------------------------------------------

/// A Shelley vkey witness: public key plus signature over the body hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VkeyWitness {
    pub vkey: [u8; 32],
    pub signature: [u8; 64],
}

/// A Byron bootstrap witness. Carries the chain code and the address
/// attributes so old addresses can be reconstructed for verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapWitness {
    pub vkey: [u8; 32],
    pub signature: [u8; 64],
    pub chain_code: [u8; 32],
    /// Re-encoded Byron address attributes, verbatim.
    pub attributes: Vec<u8>,
}

/// The witness set attached to a signed transaction.
///
/// Witness order inside each list mirrors the required-signer ordering
/// used for payload generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WitnessSet {
    pub vkey_witnesses: Vec<VkeyWitness>,
    pub bootstrap_witnesses: Vec<BootstrapWitness>,
}

impl WitnessSet {
    /// `true` when no witnesses of either shape are present.
    pub fn is_empty(&self) -> bool {
        self.vkey_witnesses.is_empty() && self.bootstrap_witnesses.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_asset_orders_policies_by_bytes() {
        let mut assets = MultiAsset::new();
        assets.add([0xbb; 28], b"zzz".to_vec(), 1);
        assets.add([0xaa; 28], b"aaa".to_vec(), 2);

        let policies: Vec<_> = assets.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(policies, vec![vec![0xaa; 28], vec![0xbb; 28]]);
    }

    #[test]
    fn multi_asset_orders_names_by_bytes_within_policy() {
        let mut assets = MultiAsset::new();
        assets.add([1; 28], vec![0x62], 1); // 'b'
        assets.add([1; 28], vec![0x61], 2); // 'a'
        assets.add([1; 28], vec![], 3); // empty name sorts first

        let (_, names) = assets.iter().next().unwrap();
        let ordered: Vec<_> = names.keys().cloned().collect();
        assert_eq!(ordered, vec![vec![], vec![0x61], vec![0x62]]);
    }

    #[test]
    fn multi_asset_accumulates_duplicate_assets() {
        let mut assets = MultiAsset::new();
        assets.add([2; 28], b"coin".to_vec(), 5);
        assets.add([2; 28], b"coin".to_vec(), 7);

        let (_, names) = assets.iter().next().unwrap();
        assert_eq!(names[&b"coin".to_vec()], 12);
    }

    #[test]
    fn insertion_order_is_irrelevant() {
        let mut forward = MultiAsset::new();
        forward.add([3; 28], b"x".to_vec(), 1);
        forward.add([4; 28], b"y".to_vec(), 1);

        let mut backward = MultiAsset::new();
        backward.add([4; 28], b"y".to_vec(), 1);
        backward.add([3; 28], b"x".to_vec(), 1);

        assert_eq!(forward, backward);
    }

    #[test]
    fn empty_body_has_no_constructs() {
        let body = TransactionBody::empty();
        assert!(body.inputs.is_empty());
        assert!(body.withdrawals.is_empty());
        assert!(body.aux_data_hash.is_none());
    }

    #[test]
    fn witness_set_emptiness() {
        let mut set = WitnessSet::default();
        assert!(set.is_empty());
        set.vkey_witnesses.push(VkeyWitness {
            vkey: [0; 32],
            signature: [0; 64],
        });
        assert!(!set.is_empty());
    }
}
