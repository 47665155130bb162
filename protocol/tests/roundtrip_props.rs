//! Property tests for the invariants that hold for *all* inputs, not just
//! the fixtures: canonical integer widths, unit composition, and the
//! order-independence of multi-asset encoding.

use proptest::prelude::*;

use meridian_protocol::operations::types::Currency;
use meridian_protocol::transaction::assembler::{assemble, cbor_uint_width};
use meridian_protocol::transaction::types::{
    MultiAsset, TransactionBody, TransactionInput, TransactionOutput,
};

proptest! {
    /// The width table the fee estimator uses must agree with what the
    /// encoder actually emits, for every u64.
    #[test]
    fn uint_width_matches_real_encoding(value: u64) {
        let mut e = minicbor::Encoder::new(Vec::new());
        e.u64(value).unwrap();
        prop_assert_eq!(e.into_writer().len(), cbor_uint_width(value));
    }

    /// `unit()` and `decompose_unit()` are exact inverses for every valid
    /// policy id and asset name.
    #[test]
    fn currency_unit_roundtrip(
        policy in "[0-9a-f]{56}",
        name in "[0-9a-f]{0,64}",
    ) {
        let currency = Currency::native_asset(&policy, &name);
        let unit = currency.unit();
        let (p, n) = Currency::decompose_unit(&unit).unwrap();
        prop_assert_eq!(p, policy);
        prop_assert_eq!(n, name);
    }

    /// Assembling the same asset set produces identical bytes regardless
    /// of the order assets were inserted in.
    #[test]
    fn multi_asset_assembly_is_order_independent(
        entries in proptest::collection::vec(
            (any::<[u8; 28]>(), proptest::collection::vec(any::<u8>(), 0..8), 1u64..1_000_000),
            1..12,
        ),
        seed in any::<u64>(),
    ) {
        let build = |order: &[usize]| {
            let mut assets = MultiAsset::new();
            for &i in order {
                let (policy, name, quantity) = &entries[i];
                assets.add(*policy, name.clone(), *quantity);
            }
            let body = TransactionBody {
                inputs: vec![TransactionInput { tx_hash: [0; 32], index: 0 }],
                outputs: vec![TransactionOutput {
                    address: vec![0x61; 29],
                    coin: 2_000_000,
                    assets,
                }],
                fee: 170_000,
                ttl: 1000,
                certificates: Vec::new(),
                withdrawals: Vec::new(),
                aux_data_hash: None,
            };
            assemble(&body).unwrap()
        };

        let forward: Vec<usize> = (0..entries.len()).collect();
        // A deterministic shuffle driven by the seed.
        let mut shuffled = forward.clone();
        let mut state = seed;
        for i in (1..shuffled.len()).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let j = (state % (i as u64 + 1)) as usize;
            shuffled.swap(i, j);
        }

        let (bytes_a, hash_a) = build(&forward);
        let (bytes_b, hash_b) = build(&shuffled);
        prop_assert_eq!(bytes_a, bytes_b);
        prop_assert_eq!(hash_a, hash_b);
    }

    /// Changing the fee always changes the hash (non-identity, not
    /// collision resistance — that part we get from blake2b).
    #[test]
    fn fee_perturbation_changes_hash(fee in 0u64..1_000_000_000, bump in 1u64..1_000) {
        let body = TransactionBody {
            inputs: vec![TransactionInput { tx_hash: [7; 32], index: 0 }],
            outputs: Vec::new(),
            fee,
            ttl: 100,
            certificates: Vec::new(),
            withdrawals: Vec::new(),
            aux_data_hash: None,
        };
        let mut bumped = body.clone();
        bumped.fee = fee + bump;

        let (_, h1) = assemble(&body).unwrap();
        let (_, h2) = assemble(&bumped).unwrap();
        prop_assert_ne!(h1, h2);
    }
}
