//! Decoding transaction bytes back into typed constructs.
//!
//! The strict inverse of the assembler. Decoding is where untrusted bytes
//! enter the engine, so every structural surprise — indefinite lengths,
//! unknown map keys, wrong widths — is a hard
//! [`MalformedTransactionBytes`](crate::error::ConstructionError) rather
//! than a best-effort guess. A body we cannot re-assemble byte-identically
//! is a body we refuse to interpret.

use minicbor::data::{Tag, Type};
use minicbor::Decoder;

use crate::config::{
    BODY_KEY_AUX_DATA_HASH, BODY_KEY_CERTIFICATES, BODY_KEY_FEE, BODY_KEY_INPUTS,
    BODY_KEY_OUTPUTS, BODY_KEY_TTL, BODY_KEY_WITHDRAWALS, RATIONAL_TAG, REWARD_ACCOUNT_BYTES,
    WITNESS_KEY_BOOTSTRAP, WITNESS_KEY_VKEY,
};
use crate::address::StakeCredential;
use crate::error::ConstructionError;
use crate::transaction::types::{
    BootstrapWitness, Certificate, MultiAsset, PoolMetadataSpec, PoolParams, RelaySpec,
    TransactionBody, TransactionInput, TransactionOutput, VkeyWitness, Withdrawal, WitnessSet,
};

fn bad<E: std::fmt::Display>(e: E) -> ConstructionError {
    ConstructionError::malformed(e)
}

fn fixed<const N: usize>(bytes: &[u8], what: &str) -> Result<[u8; N], ConstructionError> {
    <[u8; N]>::try_from(bytes)
        .map_err(|_| ConstructionError::malformed(format!("{what}: expected {N} bytes, got {}", bytes.len())))
}

/// A fully witnessed transaction split into its parts, with the body kept
/// as the exact byte slice it arrived in.
#[derive(Debug, Clone)]
pub struct DecodedTransaction {
    /// The body bytes, verbatim — hash these, do not re-encode them.
    pub body_bytes: Vec<u8>,
    pub witnesses: WitnessSet,
    /// Raw auxiliary data bytes, when present.
    pub aux_data: Option<Vec<u8>>,
}

// ---------------------------------------------------------------------------
// Body
// ---------------------------------------------------------------------------

/// Decode a transaction body map into typed constructs.
pub fn decode_body(bytes: &[u8]) -> Result<TransactionBody, ConstructionError> {
    let mut d = Decoder::new(bytes);
    let entries = d
        .map()
        .map_err(bad)?
        .ok_or_else(|| ConstructionError::malformed("indefinite-length body map"))?;

    let mut body = TransactionBody::empty();
    for _ in 0..entries {
        let key = d.u32().map_err(bad)?;
        match key {
            BODY_KEY_INPUTS => {
                let count = expect_array(&mut d)?;
                for _ in 0..count {
                    expect_array_of(&mut d, 2)?;
                    let hash = fixed::<32>(d.bytes().map_err(bad)?, "input tx hash")?;
                    let index = d.u64().map_err(bad)?;
                    body.inputs.push(TransactionInput {
                        tx_hash: hash,
                        index,
                    });
                }
            }
            BODY_KEY_OUTPUTS => {
                let count = expect_array(&mut d)?;
                for _ in 0..count {
                    body.outputs.push(decode_output(&mut d)?);
                }
            }
            BODY_KEY_FEE => {
                body.fee = d.u64().map_err(bad)?;
            }
            BODY_KEY_TTL => {
                body.ttl = d.u64().map_err(bad)?;
            }
            BODY_KEY_CERTIFICATES => {
                let count = expect_array(&mut d)?;
                for _ in 0..count {
                    body.certificates.push(decode_certificate(&mut d)?);
                }
            }
            BODY_KEY_WITHDRAWALS => {
                let count = d
                    .map()
                    .map_err(bad)?
                    .ok_or_else(|| ConstructionError::malformed("indefinite withdrawal map"))?;
                for _ in 0..count {
                    let account =
                        fixed::<REWARD_ACCOUNT_BYTES>(d.bytes().map_err(bad)?, "reward account")?;
                    let amount = d.u64().map_err(bad)?;
                    body.withdrawals.push(Withdrawal {
                        reward_account: account,
                        amount,
                    });
                }
            }
            BODY_KEY_AUX_DATA_HASH => {
                body.aux_data_hash =
                    Some(fixed::<32>(d.bytes().map_err(bad)?, "aux data hash")?);
            }
            other => {
                return Err(ConstructionError::malformed(format!(
                    "unsupported body map key {other}"
                )));
            }
        }
    }
    Ok(body)
}

fn decode_output(d: &mut Decoder<'_>) -> Result<TransactionOutput, ConstructionError> {
    expect_array_of(d, 2)?;
    let address = d.bytes().map_err(bad)?.to_vec();

    // The value is either a bare coin or [coin, multiasset].
    if d.datatype().map_err(bad)? == Type::Array {
        expect_array_of(d, 2)?;
        let coin = d.u64().map_err(bad)?;
        let mut assets = MultiAsset::new();
        let policies = d
            .map()
            .map_err(bad)?
            .ok_or_else(|| ConstructionError::malformed("indefinite multiasset map"))?;
        for _ in 0..policies {
            let policy = fixed::<28>(d.bytes().map_err(bad)?, "policy id")?;
            let names = d
                .map()
                .map_err(bad)?
                .ok_or_else(|| ConstructionError::malformed("indefinite asset map"))?;
            for _ in 0..names {
                let name = d.bytes().map_err(bad)?.to_vec();
                let quantity = d.u64().map_err(bad)?;
                assets.add(policy, name, quantity);
            }
        }
        Ok(TransactionOutput {
            address,
            coin,
            assets,
        })
    } else {
        let coin = d.u64().map_err(bad)?;
        Ok(TransactionOutput {
            address,
            coin,
            assets: MultiAsset::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Certificates
// ---------------------------------------------------------------------------

/// Decode one certificate from its CDDL array shape.
pub fn decode_certificate(d: &mut Decoder<'_>) -> Result<Certificate, ConstructionError> {
    expect_array(d)?;
    let discriminant = d.u8().map_err(bad)?;
    match discriminant {
        0 => Ok(Certificate::StakeRegistration(decode_credential(d)?)),
        1 => Ok(Certificate::StakeDeregistration(decode_credential(d)?)),
        2 => {
            let credential = decode_credential(d)?;
            let pool = fixed::<28>(d.bytes().map_err(bad)?, "pool key hash")?;
            Ok(Certificate::StakeDelegation {
                credential,
                pool_key_hash: pool,
            })
        }
        3 => {
            let operator = fixed::<28>(d.bytes().map_err(bad)?, "pool operator")?;
            let vrf = fixed::<32>(d.bytes().map_err(bad)?, "vrf key hash")?;
            let pledge = d.u64().map_err(bad)?;
            let cost = d.u64().map_err(bad)?;
            let tag = d.tag().map_err(bad)?;
            if tag != Tag::new(RATIONAL_TAG) {
                return Err(ConstructionError::malformed("pool margin missing tag 30"));
            }
            expect_array_of(d, 2)?;
            let numerator = d.u64().map_err(bad)?;
            let denominator = d.u64().map_err(bad)?;
            let reward_account =
                fixed::<REWARD_ACCOUNT_BYTES>(d.bytes().map_err(bad)?, "reward account")?;

            let owner_count = expect_array(d)?;
            let mut owners = Vec::with_capacity(owner_count as usize);
            for _ in 0..owner_count {
                owners.push(fixed::<28>(d.bytes().map_err(bad)?, "pool owner")?);
            }

            let relay_count = expect_array(d)?;
            let mut relays = Vec::with_capacity(relay_count as usize);
            for _ in 0..relay_count {
                relays.push(decode_relay(d)?);
            }

            let metadata = if d.datatype().map_err(bad)? == Type::Null {
                d.null().map_err(bad)?;
                None
            } else {
                expect_array_of(d, 2)?;
                let url = d.str().map_err(bad)?.to_string();
                let hash = fixed::<32>(d.bytes().map_err(bad)?, "pool metadata hash")?;
                Some(PoolMetadataSpec { url, hash })
            };

            Ok(Certificate::PoolRegistration(PoolParams {
                operator,
                vrf_key_hash: vrf,
                pledge,
                cost,
                margin_numerator: numerator,
                margin_denominator: denominator,
                reward_account,
                owners,
                relays,
                metadata,
            }))
        }
        4 => {
            let pool = fixed::<28>(d.bytes().map_err(bad)?, "pool key hash")?;
            let epoch = d.u64().map_err(bad)?;
            Ok(Certificate::PoolRetirement {
                pool_key_hash: pool,
                epoch,
            })
        }
        other => Err(ConstructionError::malformed(format!(
            "unsupported certificate discriminant {other}"
        ))),
    }
}

/// Decode a standalone certificate blob (`poolRegistrationWithCert`).
pub fn decode_certificate_bytes(bytes: &[u8]) -> Result<Certificate, ConstructionError> {
    let mut d = Decoder::new(bytes);
    let cert = decode_certificate(&mut d)?;
    if d.position() != bytes.len() {
        return Err(ConstructionError::malformed(
            "trailing bytes after certificate",
        ));
    }
    Ok(cert)
}

fn decode_credential(d: &mut Decoder<'_>) -> Result<StakeCredential, ConstructionError> {
    expect_array_of(d, 2)?;
    let tag = d.u8().map_err(bad)?;
    let hash = d.bytes().map_err(bad)?;
    StakeCredential::from_parts(tag, hash).map_err(ConstructionError::from)
}

fn decode_relay(d: &mut Decoder<'_>) -> Result<RelaySpec, ConstructionError> {
    expect_array(d)?;
    let discriminant = d.u8().map_err(bad)?;
    match discriminant {
        0 => {
            let port = decode_opt_port(d)?;
            let ipv4 = match decode_opt_bytes(d)? {
                Some(b) => Some(fixed::<4>(&b, "ipv4")?),
                None => None,
            };
            let ipv6 = match decode_opt_bytes(d)? {
                Some(b) => Some(fixed::<16>(&b, "ipv6")?),
                None => None,
            };
            Ok(RelaySpec::SingleHostAddr { port, ipv4, ipv6 })
        }
        1 => {
            let port = decode_opt_port(d)?;
            let dns_name = d.str().map_err(bad)?.to_string();
            Ok(RelaySpec::SingleHostName { port, dns_name })
        }
        2 => {
            let dns_name = d.str().map_err(bad)?.to_string();
            Ok(RelaySpec::MultiHostName { dns_name })
        }
        other => Err(ConstructionError::malformed(format!(
            "unsupported relay discriminant {other}"
        ))),
    }
}

fn decode_opt_port(d: &mut Decoder<'_>) -> Result<Option<u16>, ConstructionError> {
    if d.datatype().map_err(bad)? == Type::Null {
        d.null().map_err(bad)?;
        Ok(None)
    } else {
        Ok(Some(d.u16().map_err(bad)?))
    }
}

fn decode_opt_bytes(d: &mut Decoder<'_>) -> Result<Option<Vec<u8>>, ConstructionError> {
    if d.datatype().map_err(bad)? == Type::Null {
        d.null().map_err(bad)?;
        Ok(None)
    } else {
        Ok(Some(d.bytes().map_err(bad)?.to_vec()))
    }
}

// ---------------------------------------------------------------------------
// Full transaction
// ---------------------------------------------------------------------------

/// Split a witnessed transaction into body bytes, witnesses, and auxiliary
/// data. Accepts both the post-Alonzo four-element form (with the validity
/// flag) and the Shelley three-element form.
pub fn decode_transaction(bytes: &[u8]) -> Result<DecodedTransaction, ConstructionError> {
    let mut d = Decoder::new(bytes);
    let len = d
        .array()
        .map_err(bad)?
        .ok_or_else(|| ConstructionError::malformed("indefinite transaction array"))?;
    if len != 3 && len != 4 {
        return Err(ConstructionError::malformed(format!(
            "transaction array has {len} elements, expected 3 or 4"
        )));
    }

    // Body: capture the exact byte slice.
    let body_start = d.position();
    d.skip().map_err(bad)?;
    let body_bytes = bytes[body_start..d.position()].to_vec();

    let witnesses = decode_witness_set(&mut d)?;

    if len == 4 {
        // Validity flag; the construction flow always emits `true`.
        d.bool().map_err(bad)?;
    }

    let aux_data = if d.datatype().map_err(bad)? == Type::Null {
        d.null().map_err(bad)?;
        None
    } else {
        let aux_start = d.position();
        d.skip().map_err(bad)?;
        Some(bytes[aux_start..d.position()].to_vec())
    };

    Ok(DecodedTransaction {
        body_bytes,
        witnesses,
        aux_data,
    })
}

fn decode_witness_set(d: &mut Decoder<'_>) -> Result<WitnessSet, ConstructionError> {
    let entries = d
        .map()
        .map_err(bad)?
        .ok_or_else(|| ConstructionError::malformed("indefinite witness set map"))?;

    let mut set = WitnessSet::default();
    for _ in 0..entries {
        let key = d.u32().map_err(bad)?;
        match key {
            WITNESS_KEY_VKEY => {
                let count = expect_array(d)?;
                for _ in 0..count {
                    expect_array_of(d, 2)?;
                    let vkey = fixed::<32>(d.bytes().map_err(bad)?, "witness vkey")?;
                    let signature = fixed::<64>(d.bytes().map_err(bad)?, "witness signature")?;
                    set.vkey_witnesses.push(VkeyWitness { vkey, signature });
                }
            }
            WITNESS_KEY_BOOTSTRAP => {
                let count = expect_array(d)?;
                for _ in 0..count {
                    expect_array_of(d, 4)?;
                    let vkey = fixed::<32>(d.bytes().map_err(bad)?, "bootstrap vkey")?;
                    let signature =
                        fixed::<64>(d.bytes().map_err(bad)?, "bootstrap signature")?;
                    let chain_code = fixed::<32>(d.bytes().map_err(bad)?, "chain code")?;
                    let attributes = d.bytes().map_err(bad)?.to_vec();
                    set.bootstrap_witnesses.push(BootstrapWitness {
                        vkey,
                        signature,
                        chain_code,
                        attributes,
                    });
                }
            }
            other => {
                return Err(ConstructionError::malformed(format!(
                    "unsupported witness set key {other}"
                )));
            }
        }
    }
    Ok(set)
}

// ---------------------------------------------------------------------------
// Decoder helpers
// ---------------------------------------------------------------------------

fn expect_array(d: &mut Decoder<'_>) -> Result<u64, ConstructionError> {
    d.array()
        .map_err(bad)?
        .ok_or_else(|| ConstructionError::malformed("indefinite-length array"))
}

fn expect_array_of(d: &mut Decoder<'_>, expected: u64) -> Result<(), ConstructionError> {
    let len = expect_array(d)?;
    if len != expected {
        return Err(ConstructionError::malformed(format!(
            "array has {len} elements, expected {expected}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::CredentialKind;
    use crate::transaction::assembler::{
        assemble, encode_body, encode_transaction,
    };

    fn rich_body() -> TransactionBody {
        let mut assets = MultiAsset::new();
        assets.add([0x0a; 28], b"tok".to_vec(), 41);

        let mut address = vec![0x61];
        address.extend_from_slice(&[0x22; 28]);

        TransactionBody {
            inputs: vec![
                TransactionInput {
                    tx_hash: [0xcd; 32],
                    index: 1,
                },
                TransactionInput {
                    tx_hash: [0x01; 32],
                    index: 0,
                },
            ],
            outputs: vec![TransactionOutput {
                address,
                coin: 2_000_000,
                assets,
            }],
            fee: 180_000,
            ttl: 43_200_000,
            certificates: vec![
                Certificate::StakeRegistration(StakeCredential::from_hash(
                    CredentialKind::KeyHash,
                    [0x33; 28],
                )),
                Certificate::StakeDelegation {
                    credential: StakeCredential::from_hash(CredentialKind::KeyHash, [0x33; 28]),
                    pool_key_hash: [0x44; 28],
                },
                Certificate::PoolRegistration(PoolParams {
                    operator: [0x55; 28],
                    vrf_key_hash: [0x66; 32],
                    pledge: 500_000_000,
                    cost: 340_000_000,
                    margin_numerator: 1,
                    margin_denominator: 10,
                    reward_account: {
                        let mut acct = [0xe1; 29];
                        acct[1..].copy_from_slice(&[0x77; 28]);
                        acct
                    },
                    owners: vec![[0x88; 28], [0x99; 28]],
                    relays: vec![
                        RelaySpec::SingleHostAddr {
                            port: Some(3001),
                            ipv4: Some([10, 0, 0, 1]),
                            ipv6: None,
                        },
                        RelaySpec::SingleHostName {
                            port: None,
                            dns_name: "relay.pool.example".into(),
                        },
                        RelaySpec::MultiHostName {
                            dns_name: "relays.pool.example".into(),
                        },
                    ],
                    metadata: Some(PoolMetadataSpec {
                        url: "https://pool.example/meta.json".into(),
                        hash: [0xab; 32],
                    }),
                }),
                Certificate::PoolRetirement {
                    pool_key_hash: [0x55; 28],
                    epoch: 400,
                },
            ],
            withdrawals: vec![Withdrawal {
                reward_account: {
                    let mut acct = [0xe1; 29];
                    acct[1..].copy_from_slice(&[0xaa; 28]);
                    acct
                },
                amount: 7_000_000,
            }],
            aux_data_hash: Some([0xee; 32]),
        }
    }

    #[test]
    fn body_roundtrips_through_decode() {
        let body = rich_body();
        let bytes = encode_body(&body).unwrap();
        let decoded = decode_body(&bytes).unwrap();
        assert_eq!(decoded, body);
    }

    #[test]
    fn reencoding_a_decoded_body_is_byte_identical() {
        let bytes = encode_body(&rich_body()).unwrap();
        let decoded = decode_body(&bytes).unwrap();
        let reencoded = encode_body(&decoded).unwrap();
        assert_eq!(bytes, reencoded);
    }

    #[test]
    fn transaction_roundtrips_with_witnesses() {
        let (body_bytes, _) = assemble(&rich_body()).unwrap();
        let witnesses = WitnessSet {
            vkey_witnesses: vec![VkeyWitness {
                vkey: [1; 32],
                signature: [2; 64],
            }],
            bootstrap_witnesses: vec![BootstrapWitness {
                vkey: [3; 32],
                signature: [4; 64],
                chain_code: [5; 32],
                attributes: vec![0xa0],
            }],
        };
        let tx = encode_transaction(&body_bytes, &witnesses, None).unwrap();

        let decoded = decode_transaction(&tx).unwrap();
        assert_eq!(decoded.body_bytes, body_bytes);
        assert_eq!(decoded.witnesses, witnesses);
        assert!(decoded.aux_data.is_none());
    }

    #[test]
    fn aux_data_slice_is_preserved_verbatim() {
        let (body_bytes, _) = assemble(&rich_body()).unwrap();
        // Any valid CBOR item works as auxiliary data for the splice test.
        let aux = minicbor::to_vec(vec![1u8, 2, 3]).unwrap();
        let tx = encode_transaction(&body_bytes, &WitnessSet::default(), Some(&aux)).unwrap();

        let decoded = decode_transaction(&tx).unwrap();
        assert_eq!(decoded.aux_data.as_deref(), Some(aux.as_slice()));
    }

    #[test]
    fn standalone_certificate_roundtrip() {
        let cert = Certificate::StakeDelegation {
            credential: StakeCredential::from_hash(CredentialKind::ScriptHash, [9; 28]),
            pool_key_hash: [8; 28],
        };
        // Encode via a body to reuse the assembler's certificate encoder.
        let mut body = TransactionBody::empty();
        body.certificates.push(cert.clone());
        let bytes = encode_body(&body).unwrap();
        let decoded = decode_body(&bytes).unwrap();
        assert_eq!(decoded.certificates, vec![cert]);
    }

    #[test]
    fn rejects_truncated_bytes() {
        let bytes = encode_body(&rich_body()).unwrap();
        assert!(decode_body(&bytes[..bytes.len() - 3]).is_err());
    }

    #[test]
    fn rejects_unknown_body_key() {
        // map(1) { 9: 0 }
        let bytes = [0xa1, 0x09, 0x00];
        assert!(matches!(
            decode_body(&bytes),
            Err(ConstructionError::MalformedTransactionBytes { .. })
        ));
    }

    #[test]
    fn rejects_wrong_hash_width() {
        // map(1) { 0: [[bytes(2), 0]] }
        let bytes = [0xa1, 0x00, 0x81, 0x82, 0x42, 0xde, 0xad, 0x00];
        assert!(decode_body(&bytes).is_err());
    }

    #[test]
    fn rejects_non_transaction_arrays() {
        let bytes = minicbor::to_vec(vec![1u8, 2]).unwrap();
        assert!(decode_transaction(&bytes).is_err());
    }
}
