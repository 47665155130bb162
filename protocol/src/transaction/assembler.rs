//! Canonical transaction assembly.
//!
//! This module is the single place in the crate that turns typed ledger
//! constructs into bytes. Everything about the encoding is fixed: the body
//! map keys appear in ascending order, every length is definite, every
//! integer is minimal-width, withdrawal map keys are byte-sorted, and
//! multi-asset maps come pre-sorted out of [`MultiAsset`]. Two conformant
//! implementations given the same constructs must produce identical bytes,
//! because the blake2b-256 of those bytes *is* the transaction identity.
//!
//! Nothing here consults the outside world. `assemble` is a pure function
//! from `(constructs, fee, ttl)` to `(bytes, hash)`.

use minicbor::data::Tag;
use minicbor::Encoder;

use crate::config::{
    BODY_KEY_AUX_DATA_HASH, BODY_KEY_CERTIFICATES, BODY_KEY_FEE, BODY_KEY_INPUTS,
    BODY_KEY_OUTPUTS, BODY_KEY_TTL, BODY_KEY_WITHDRAWALS, RATIONAL_TAG, WITNESS_KEY_BOOTSTRAP,
    WITNESS_KEY_VKEY,
};
use crate::crypto::hash::blake2b_256;
use crate::error::ConstructionError;
use crate::transaction::types::{
    Certificate, RelaySpec, TransactionBody, TransactionOutput, WitnessSet,
};

type Enc = Encoder<Vec<u8>>;

fn enc_err<E: std::fmt::Display>(e: E) -> ConstructionError {
    ConstructionError::serialization(e)
}

/// Serialize a transaction body to its canonical CBOR bytes and compute
/// the transaction hash.
///
/// The hash is blake2b-256 over exactly the returned bytes — the value
/// signing payloads carry and explorers index.
pub fn assemble(body: &TransactionBody) -> Result<(Vec<u8>, [u8; 32]), ConstructionError> {
    let bytes = encode_body(body)?;
    let hash = blake2b_256(&bytes);
    Ok((bytes, hash))
}

/// Encode the body map with its fixed key order.
pub fn encode_body(body: &TransactionBody) -> Result<Vec<u8>, ConstructionError> {
    let mut entries = 4u64; // inputs, outputs, fee, ttl
    if !body.certificates.is_empty() {
        entries += 1;
    }
    if !body.withdrawals.is_empty() {
        entries += 1;
    }
    if body.aux_data_hash.is_some() {
        entries += 1;
    }

    let mut e = Encoder::new(Vec::new());
    e.map(entries).map_err(enc_err)?;

    // 0: inputs, in operation order.
    e.u32(BODY_KEY_INPUTS).map_err(enc_err)?;
    e.array(body.inputs.len() as u64).map_err(enc_err)?;
    for input in &body.inputs {
        e.array(2).map_err(enc_err)?;
        e.bytes(&input.tx_hash).map_err(enc_err)?;
        e.u64(input.index).map_err(enc_err)?;
    }

    // 1: outputs, in operation order.
    e.u32(BODY_KEY_OUTPUTS).map_err(enc_err)?;
    e.array(body.outputs.len() as u64).map_err(enc_err)?;
    for output in &body.outputs {
        encode_output(&mut e, output)?;
    }

    // 2: fee.
    e.u32(BODY_KEY_FEE).map_err(enc_err)?;
    e.u64(body.fee).map_err(enc_err)?;

    // 3: ttl. Encoded unconditionally: a zero ttl still participates in
    // the hash, and dropping the key would change the bytes other
    // implementations produce.
    e.u32(BODY_KEY_TTL).map_err(enc_err)?;
    e.u64(body.ttl).map_err(enc_err)?;

    // 4: certificates, in operation order.
    if !body.certificates.is_empty() {
        e.u32(BODY_KEY_CERTIFICATES).map_err(enc_err)?;
        e.array(body.certificates.len() as u64).map_err(enc_err)?;
        for cert in &body.certificates {
            encode_certificate(&mut e, cert)?;
        }
    }

    // 5: withdrawals, keyed and sorted by reward account bytes.
    if !body.withdrawals.is_empty() {
        let mut sorted: Vec<_> = body.withdrawals.iter().collect();
        sorted.sort_by(|a, b| a.reward_account.cmp(&b.reward_account));

        e.u32(BODY_KEY_WITHDRAWALS).map_err(enc_err)?;
        e.map(sorted.len() as u64).map_err(enc_err)?;
        for withdrawal in sorted {
            e.bytes(&withdrawal.reward_account).map_err(enc_err)?;
            e.u64(withdrawal.amount).map_err(enc_err)?;
        }
    }

    // 7: auxiliary data hash.
    if let Some(aux_hash) = &body.aux_data_hash {
        e.u32(BODY_KEY_AUX_DATA_HASH).map_err(enc_err)?;
        e.bytes(aux_hash).map_err(enc_err)?;
    }

    Ok(e.into_writer())
}

/// Encode one output: `[address, coin]` or `[address, [coin, multiasset]]`.
fn encode_output(e: &mut Enc, output: &TransactionOutput) -> Result<(), ConstructionError> {
    e.array(2).map_err(enc_err)?;
    e.bytes(&output.address).map_err(enc_err)?;

    if output.assets.is_empty() {
        e.u64(output.coin).map_err(enc_err)?;
        return Ok(());
    }

    e.array(2).map_err(enc_err)?;
    e.u64(output.coin).map_err(enc_err)?;
    e.map(output.assets.policy_count() as u64).map_err(enc_err)?;
    for (policy, names) in output.assets.iter() {
        e.bytes(policy).map_err(enc_err)?;
        e.map(names.len() as u64).map_err(enc_err)?;
        for (name, quantity) in names {
            e.bytes(name).map_err(enc_err)?;
            e.u64(*quantity).map_err(enc_err)?;
        }
    }
    Ok(())
}

/// Encode one certificate in its CDDL array shape.
fn encode_certificate(e: &mut Enc, cert: &Certificate) -> Result<(), ConstructionError> {
    match cert {
        Certificate::StakeRegistration(credential) => {
            e.array(2).map_err(enc_err)?;
            e.u8(0).map_err(enc_err)?;
            encode_credential(e, credential.kind.tag(), &credential.hash)?;
        }
        Certificate::StakeDeregistration(credential) => {
            e.array(2).map_err(enc_err)?;
            e.u8(1).map_err(enc_err)?;
            encode_credential(e, credential.kind.tag(), &credential.hash)?;
        }
        Certificate::StakeDelegation {
            credential,
            pool_key_hash,
        } => {
            e.array(3).map_err(enc_err)?;
            e.u8(2).map_err(enc_err)?;
            encode_credential(e, credential.kind.tag(), &credential.hash)?;
            e.bytes(pool_key_hash).map_err(enc_err)?;
        }
        Certificate::PoolRegistration(params) => {
            e.array(10).map_err(enc_err)?;
            e.u8(3).map_err(enc_err)?;
            e.bytes(&params.operator).map_err(enc_err)?;
            e.bytes(&params.vrf_key_hash).map_err(enc_err)?;
            e.u64(params.pledge).map_err(enc_err)?;
            e.u64(params.cost).map_err(enc_err)?;
            e.tag(Tag::new(RATIONAL_TAG)).map_err(enc_err)?;
            e.array(2).map_err(enc_err)?;
            e.u64(params.margin_numerator).map_err(enc_err)?;
            e.u64(params.margin_denominator).map_err(enc_err)?;
            e.bytes(&params.reward_account).map_err(enc_err)?;
            e.array(params.owners.len() as u64).map_err(enc_err)?;
            for owner in &params.owners {
                e.bytes(owner).map_err(enc_err)?;
            }
            e.array(params.relays.len() as u64).map_err(enc_err)?;
            for relay in &params.relays {
                encode_relay(e, relay)?;
            }
            match &params.metadata {
                Some(meta) => {
                    e.array(2).map_err(enc_err)?;
                    e.str(&meta.url).map_err(enc_err)?;
                    e.bytes(&meta.hash).map_err(enc_err)?;
                }
                None => {
                    e.null().map_err(enc_err)?;
                }
            }
        }
        Certificate::PoolRetirement {
            pool_key_hash,
            epoch,
        } => {
            e.array(3).map_err(enc_err)?;
            e.u8(4).map_err(enc_err)?;
            e.bytes(pool_key_hash).map_err(enc_err)?;
            e.u64(*epoch).map_err(enc_err)?;
        }
    }
    Ok(())
}

/// Encode a stake credential: `[tag, hash]`.
fn encode_credential(e: &mut Enc, tag: u8, hash: &[u8; 28]) -> Result<(), ConstructionError> {
    e.array(2).map_err(enc_err)?;
    e.u8(tag).map_err(enc_err)?;
    e.bytes(hash).map_err(enc_err)?;
    Ok(())
}

/// Encode a pool relay in its CDDL array shape.
fn encode_relay(e: &mut Enc, relay: &RelaySpec) -> Result<(), ConstructionError> {
    match relay {
        RelaySpec::SingleHostAddr { port, ipv4, ipv6 } => {
            e.array(4).map_err(enc_err)?;
            e.u8(0).map_err(enc_err)?;
            encode_opt_port(e, port)?;
            match ipv4 {
                Some(ip) => e.bytes(ip).map_err(enc_err)?,
                None => e.null().map_err(enc_err)?,
            };
            match ipv6 {
                Some(ip) => e.bytes(ip).map_err(enc_err)?,
                None => e.null().map_err(enc_err)?,
            };
        }
        RelaySpec::SingleHostName { port, dns_name } => {
            e.array(3).map_err(enc_err)?;
            e.u8(1).map_err(enc_err)?;
            encode_opt_port(e, port)?;
            e.str(dns_name).map_err(enc_err)?;
        }
        RelaySpec::MultiHostName { dns_name } => {
            e.array(2).map_err(enc_err)?;
            e.u8(2).map_err(enc_err)?;
            e.str(dns_name).map_err(enc_err)?;
        }
    }
    Ok(())
}

fn encode_opt_port(e: &mut Enc, port: &Option<u16>) -> Result<(), ConstructionError> {
    match port {
        Some(p) => {
            e.u16(*p).map_err(enc_err)?;
        }
        None => {
            e.null().map_err(enc_err)?;
        }
    }
    Ok(())
}

/// Encode the witness set map. Keys appear only for non-empty witness
/// classes, in ascending key order.
pub fn encode_witness_set(witnesses: &WitnessSet) -> Result<Vec<u8>, ConstructionError> {
    let mut entries = 0u64;
    if !witnesses.vkey_witnesses.is_empty() {
        entries += 1;
    }
    if !witnesses.bootstrap_witnesses.is_empty() {
        entries += 1;
    }

    let mut e = Encoder::new(Vec::new());
    e.map(entries).map_err(enc_err)?;

    if !witnesses.vkey_witnesses.is_empty() {
        e.u32(WITNESS_KEY_VKEY).map_err(enc_err)?;
        e.array(witnesses.vkey_witnesses.len() as u64)
            .map_err(enc_err)?;
        for witness in &witnesses.vkey_witnesses {
            e.array(2).map_err(enc_err)?;
            e.bytes(&witness.vkey).map_err(enc_err)?;
            e.bytes(&witness.signature).map_err(enc_err)?;
        }
    }

    if !witnesses.bootstrap_witnesses.is_empty() {
        e.u32(WITNESS_KEY_BOOTSTRAP).map_err(enc_err)?;
        e.array(witnesses.bootstrap_witnesses.len() as u64)
            .map_err(enc_err)?;
        for witness in &witnesses.bootstrap_witnesses {
            e.array(4).map_err(enc_err)?;
            e.bytes(&witness.vkey).map_err(enc_err)?;
            e.bytes(&witness.signature).map_err(enc_err)?;
            e.bytes(&witness.chain_code).map_err(enc_err)?;
            e.bytes(&witness.attributes).map_err(enc_err)?;
        }
    }

    Ok(e.into_writer())
}

/// Assemble the full witnessed transaction:
/// `[body, witness_set, true, auxiliary_data / null]`.
///
/// The body and auxiliary data are spliced in verbatim from their
/// pre-encoded bytes — combination must never re-encode the body, or a
/// body we did not produce could silently change under its signatures.
pub fn encode_transaction(
    body_bytes: &[u8],
    witnesses: &WitnessSet,
    aux_data: Option<&[u8]>,
) -> Result<Vec<u8>, ConstructionError> {
    let witness_bytes = encode_witness_set(witnesses)?;

    let mut e = Encoder::new(Vec::new());
    e.array(4).map_err(enc_err)?;
    e.writer_mut().extend_from_slice(body_bytes);
    e.writer_mut().extend_from_slice(&witness_bytes);
    e.bool(true).map_err(enc_err)?;
    match aux_data {
        Some(bytes) => {
            e.writer_mut().extend_from_slice(bytes);
        }
        None => {
            e.null().map_err(enc_err)?;
        }
    }
    Ok(e.into_writer())
}

/// The encoded width of a CBOR unsigned integer — used by the fee
/// estimator to correct a size that was computed at a placeholder ttl.
pub fn cbor_uint_width(value: u64) -> usize {
    match value {
        0..=23 => 1,
        24..=0xff => 2,
        0x100..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::types::{MultiAsset, TransactionInput, Withdrawal};

    fn simple_body() -> TransactionBody {
        let mut address = vec![0x61]; // enterprise, mainnet
        address.extend_from_slice(&[0x11; 28]);
        TransactionBody {
            inputs: vec![TransactionInput {
                tx_hash: [0u8; 32],
                index: 0,
            }],
            outputs: vec![TransactionOutput {
                address,
                coin: 4_775_000,
                assets: MultiAsset::new(),
            }],
            fee: 225_000,
            ttl: 1000,
            certificates: Vec::new(),
            withdrawals: Vec::new(),
            aux_data_hash: None,
        }
    }

    #[test]
    fn simple_payment_body_pins_exact_bytes() {
        let (bytes, _) = assemble(&simple_body()).unwrap();

        // Hand-assembled canonical encoding, piece by piece.
        let mut expected = String::new();
        expected.push_str("a4"); // map(4)
        expected.push_str("00"); // key 0: inputs
        expected.push_str("8182"); // [[
        expected.push_str("5820"); // bytes(32)
        expected.push_str(&"00".repeat(32)); // tx hash
        expected.push_str("00"); // index 0
        expected.push_str("01"); // key 1: outputs
        expected.push_str("8182"); // [[
        expected.push_str("581d"); // bytes(29)
        expected.push_str("61"); // enterprise/mainnet header
        expected.push_str(&"11".repeat(28)); // payment credential
        expected.push_str("1a0048dc58"); // coin 4_775_000
        expected.push_str("02"); // key 2: fee
        expected.push_str("1a00036ee8"); // fee 225_000
        expected.push_str("03"); // key 3: ttl
        expected.push_str("1903e8"); // ttl 1000

        assert_eq!(hex::encode(&bytes), expected);
    }

    #[test]
    fn assembly_is_deterministic() {
        let (bytes1, hash1) = assemble(&simple_body()).unwrap();
        let (bytes2, hash2) = assemble(&simple_body()).unwrap();
        assert_eq!(bytes1, bytes2);
        assert_eq!(hash1, hash2);
    }

    #[test]
    fn any_single_field_change_changes_the_hash() {
        let (_, base) = assemble(&simple_body()).unwrap();

        let mut fee_changed = simple_body();
        fee_changed.fee += 1;
        assert_ne!(assemble(&fee_changed).unwrap().1, base);

        let mut ttl_changed = simple_body();
        ttl_changed.ttl += 1;
        assert_ne!(assemble(&ttl_changed).unwrap().1, base);

        let mut index_changed = simple_body();
        index_changed.inputs[0].index = 1;
        assert_ne!(assemble(&index_changed).unwrap().1, base);
    }

    #[test]
    fn zero_ttl_is_still_encoded() {
        let mut body = simple_body();
        body.ttl = 0;
        let (bytes, _) = assemble(&body).unwrap();
        // Key 3 followed by value 0 must appear after the fee entry.
        let hex = hex::encode(&bytes);
        assert!(hex.ends_with("0300"), "ttl key/value missing: {hex}");
    }

    #[test]
    fn multi_asset_output_groups_and_sorts() {
        let mut body = simple_body();
        let mut assets = MultiAsset::new();
        // Insert out of order; encoding must come out sorted.
        assets.add([0xbb; 28], b"b".to_vec(), 2);
        assets.add([0xaa; 28], b"b".to_vec(), 3);
        assets.add([0xaa; 28], b"a".to_vec(), 4);
        body.outputs[0].assets = assets;

        let (bytes, _) = assemble(&body).unwrap();
        let hex = hex::encode(&bytes);

        let policy_aa = "aa".repeat(28);
        let policy_bb = "bb".repeat(28);
        let pos_aa = hex.find(&policy_aa).unwrap();
        let pos_bb = hex.find(&policy_bb).unwrap();
        assert!(pos_aa < pos_bb, "policies not byte-sorted");

        // Within policy 0xaa..: name "a" (0x61) precedes name "b" (0x62).
        let tail = &hex[pos_aa..pos_bb];
        assert!(tail.find("416104").unwrap() < tail.find("416203").unwrap());
    }

    #[test]
    fn multi_asset_encoding_is_input_order_independent() {
        let build = |reversed: bool| {
            let mut body = simple_body();
            let mut assets = MultiAsset::new();
            let pairs: Vec<([u8; 28], &[u8], u64)> = vec![
                ([0x01; 28], b"x", 1),
                ([0x02; 28], b"y", 2),
            ];
            let iter: Box<dyn Iterator<Item = _>> = if reversed {
                Box::new(pairs.into_iter().rev())
            } else {
                Box::new(pairs.into_iter())
            };
            for (policy, name, qty) in iter {
                assets.add(policy, name.to_vec(), qty);
            }
            body.outputs[0].assets = assets;
            assemble(&body).unwrap().1
        };
        assert_eq!(build(false), build(true));
    }

    #[test]
    fn withdrawals_are_sorted_by_account_bytes() {
        let mut body = simple_body();
        let mut high = [0xe1u8; 29];
        high[1] = 0xff;
        let mut low = [0xe1u8; 29];
        low[1] = 0x00;
        body.withdrawals = vec![
            Withdrawal {
                reward_account: high,
                amount: 1,
            },
            Withdrawal {
                reward_account: low,
                amount: 2,
            },
        ];

        let (bytes, _) = assemble(&body).unwrap();
        let hex = hex::encode(&bytes);
        let pos_low = hex.find(&hex::encode(low)).unwrap();
        let pos_high = hex.find(&hex::encode(high)).unwrap();
        assert!(pos_low < pos_high);
    }

    #[test]
    fn certificates_lengthen_the_map() {
        let mut body = simple_body();
        body.certificates
            .push(Certificate::PoolRetirement {
                pool_key_hash: [9; 28],
                epoch: 250,
            });
        let (bytes, _) = assemble(&body).unwrap();
        assert_eq!(bytes[0], 0xa5, "five-entry body map expected");
    }

    #[test]
    fn adding_constructs_never_shrinks_the_encoding() {
        let (small, _) = assemble(&simple_body()).unwrap();

        let mut bigger = simple_body();
        bigger.inputs.push(TransactionInput {
            tx_hash: [1; 32],
            index: 7,
        });
        let (with_input, _) = assemble(&bigger).unwrap();
        assert!(with_input.len() > small.len());

        bigger
            .certificates
            .push(Certificate::PoolRetirement {
                pool_key_hash: [2; 28],
                epoch: 1,
            });
        let (with_cert, _) = assemble(&bigger).unwrap();
        assert!(with_cert.len() > with_input.len());
    }

    #[test]
    fn witness_set_key_order_and_shape() {
        use crate::transaction::types::{BootstrapWitness, VkeyWitness};
        let set = WitnessSet {
            vkey_witnesses: vec![VkeyWitness {
                vkey: [3; 32],
                signature: [4; 64],
            }],
            bootstrap_witnesses: vec![BootstrapWitness {
                vkey: [5; 32],
                signature: [6; 64],
                chain_code: [7; 32],
                attributes: vec![0xa0],
            }],
        };
        let bytes = encode_witness_set(&set).unwrap();
        assert_eq!(bytes[0], 0xa2); // two witness classes
        assert_eq!(bytes[1], 0x00); // vkey key first
        let hex = hex::encode(&bytes);
        assert!(hex.find(&"03".repeat(32)).unwrap() < hex.find(&"05".repeat(32)).unwrap());
    }

    #[test]
    fn empty_witness_set_is_an_empty_map() {
        let bytes = encode_witness_set(&WitnessSet::default()).unwrap();
        assert_eq!(bytes, vec![0xa0]);
    }

    #[test]
    fn full_transaction_splices_body_verbatim() {
        let (body_bytes, _) = assemble(&simple_body()).unwrap();
        let tx = encode_transaction(&body_bytes, &WitnessSet::default(), None).unwrap();
        assert_eq!(tx[0], 0x84); // four-element array
        // The body bytes appear unmodified right after the array header.
        assert_eq!(&tx[1..1 + body_bytes.len()], body_bytes.as_slice());
        // Followed by empty witness map, `true`, `null`.
        assert_eq!(&tx[1 + body_bytes.len()..], &[0xa0, 0xf5, 0xf6]);
    }

    #[test]
    fn cbor_uint_widths() {
        assert_eq!(cbor_uint_width(0), 1);
        assert_eq!(cbor_uint_width(23), 1);
        assert_eq!(cbor_uint_width(24), 2);
        assert_eq!(cbor_uint_width(255), 2);
        assert_eq!(cbor_uint_width(256), 3);
        assert_eq!(cbor_uint_width(65535), 3);
        assert_eq!(cbor_uint_width(65536), 5);
        assert_eq!(cbor_uint_width(u64::from(u32::MAX)), 5);
        assert_eq!(cbor_uint_width(u64::from(u32::MAX) + 1), 9);
    }
}
