//! Combining an unsigned transaction with external signatures.
//!
//! Combine is the last gate before bytes leave for the node, so it trusts
//! nothing: the body must still hash to the value the payloads were issued
//! for, the signature set must cover the required-signer set exactly, and
//! every signature must actually verify against its claimed key. Only then
//! is the witness set assembled — in required-signer order — and spliced
//! around the untouched body bytes.
//!
//! Combine never mutates the body. A body it cannot take verbatim is a
//! body it rejects.

use std::collections::HashMap;

use tracing::debug;

use crate::address::byron::ByronAddress;
use crate::config::CHAIN_CODE_BYTES;
use crate::crypto::keys::{EdSignature, VerificationKey};
use crate::error::ConstructionError;
use crate::operations::types::Signature;
use crate::transaction::assembler::encode_transaction;
use crate::transaction::envelope::UnsignedTransaction;
use crate::transaction::fees::{classify_signer, SignerKind};
use crate::transaction::types::{BootstrapWitness, VkeyWitness, WitnessSet};

/// Merge an unsigned transaction with its signatures into a fully
/// witnessed transaction.
///
/// Returns the raw `[body, witness_set, true, aux]` bytes. The caller
/// (the service layer) wraps them in a signed envelope together with the
/// originating operations.
pub fn combine(
    unsigned: &UnsignedTransaction,
    signatures: &[Signature],
) -> Result<Vec<u8>, ConstructionError> {
    // 1. The body must be exactly what payloads were issued for.
    if !unsigned.body_is_intact() {
        return Err(ConstructionError::BodyMutationDetected);
    }

    // 2. Exactly one signature per required signer — no gaps, no extras.
    let mut by_address: HashMap<&str, &Signature> = HashMap::new();
    for signature in signatures {
        let address = signature.signing_payload.account_identifier.address.as_str();
        if by_address.insert(address, signature).is_some() {
            return Err(ConstructionError::SignatureCountMismatch {
                expected: unsigned.signers.len(),
                got: signatures.len(),
                missing: vec![format!("duplicate signature for {address}")],
            });
        }
    }

    let missing: Vec<String> = unsigned
        .signers
        .iter()
        .filter(|signer| !by_address.contains_key(signer.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() || by_address.len() != unsigned.signers.len() {
        return Err(ConstructionError::SignatureCountMismatch {
            expected: unsigned.signers.len(),
            got: signatures.len(),
            missing,
        });
    }

    // 3. Verify and shape each witness, in required-signer order.
    let mut witnesses = WitnessSet::default();
    for signer in &unsigned.signers {
        let signature = by_address[signer.as_str()];
        let (vkey, sig) = verify_signature(signer, signature, &unsigned.hash)?;

        match classify_signer(signer)? {
            SignerKind::Shelley | SignerKind::PoolColdKey => {
                witnesses.vkey_witnesses.push(VkeyWitness {
                    vkey: *vkey.as_bytes(),
                    signature: *sig.as_bytes(),
                });
            }
            SignerKind::Byron => {
                witnesses
                    .bootstrap_witnesses
                    .push(bootstrap_witness(signer, signature, &vkey, &sig)?);
            }
        }
    }

    debug!(
        vkey = witnesses.vkey_witnesses.len(),
        bootstrap = witnesses.bootstrap_witnesses.len(),
        "witness set assembled"
    );

    // 4. Splice. The body bytes go in untouched.
    encode_transaction(
        &unsigned.body,
        &witnesses,
        unsigned.aux_metadata.as_deref(),
    )
}

/// Check one signature against its claimed key and the body hash.
fn verify_signature(
    signer: &str,
    signature: &Signature,
    tx_hash: &[u8; 32],
) -> Result<(VerificationKey, EdSignature), ConstructionError> {
    let invalid = || ConstructionError::InvalidSignature {
        address: signer.to_string(),
    };

    let vkey = VerificationKey::from_hex(&signature.public_key.hex_bytes).map_err(|_| invalid())?;
    let sig = EdSignature::from_hex(&signature.hex_bytes).map_err(|_| invalid())?;
    if !vkey.verify(tx_hash, &sig) {
        return Err(invalid());
    }
    Ok((vkey, sig))
}

/// Build a Byron bootstrap witness: the chain code travels in the account
/// metadata of the signing payload, the attributes come from the address
/// itself.
fn bootstrap_witness(
    signer: &str,
    signature: &Signature,
    vkey: &VerificationKey,
    sig: &EdSignature,
) -> Result<BootstrapWitness, ConstructionError> {
    let chain_code_hex = signature
        .signing_payload
        .account_identifier
        .metadata
        .as_ref()
        .and_then(|m| m.chain_code.as_deref())
        .ok_or_else(|| ConstructionError::InvalidSignature {
            address: signer.to_string(),
        })?;
    let chain_code = hex::decode(chain_code_hex)
        .ok()
        .filter(|b| b.len() == CHAIN_CODE_BYTES)
        .and_then(|b| <[u8; 32]>::try_from(b).ok())
        .ok_or_else(|| ConstructionError::InvalidSignature {
            address: signer.to_string(),
        })?;

    let attributes = ByronAddress::from_base58(signer)?.attributes()?;

    Ok(BootstrapWitness {
        vkey: *vkey.as_bytes(),
        signature: *sig.as_bytes(),
        chain_code,
        attributes,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::SignerKeypair;
    use crate::operations::types::{
        AccountIdentifier, PublicKey, SignatureType, SigningPayload,
    };
    use crate::transaction::assembler::assemble;
    use crate::transaction::decode::decode_transaction;
    use crate::transaction::types::{
        MultiAsset, TransactionBody, TransactionInput, TransactionOutput,
    };

    struct TestSigner {
        keypair: SignerKeypair,
        address: String,
    }

    fn signer(seed: u8) -> TestSigner {
        let keypair = SignerKeypair::from_seed(&[seed; 32]);
        let mut bytes = vec![0x61];
        bytes.extend_from_slice(&keypair.verification_key().key_hash());
        TestSigner {
            address: crate::address::address_from_bytes(&bytes).unwrap(),
            keypair,
        }
    }

    fn unsigned_for(signers: &[&TestSigner]) -> UnsignedTransaction {
        let mut body = TransactionBody::empty();
        for (i, _) in signers.iter().enumerate() {
            body.inputs.push(TransactionInput {
                tx_hash: [i as u8; 32],
                index: 0,
            });
        }
        body.outputs.push(TransactionOutput {
            address: vec![0x61; 29],
            coin: 1_000_000,
            assets: MultiAsset::new(),
        });
        body.fee = 170_000;
        body.ttl = 500;
        let (bytes, hash) = assemble(&body).unwrap();
        UnsignedTransaction {
            hash,
            body: bytes,
            signers: signers.iter().map(|s| s.address.clone()).collect(),
            aux_metadata: None,
            operations: vec![],
        }
    }

    fn sign_with(unsigned: &UnsignedTransaction, s: &TestSigner) -> Signature {
        let sig = s.keypair.sign(&unsigned.hash);
        Signature {
            signing_payload: SigningPayload {
                account_identifier: AccountIdentifier::new(s.address.clone()),
                hex_bytes: hex::encode(unsigned.hash),
                signature_type: SignatureType::Ed25519,
            },
            public_key: PublicKey::new(s.keypair.verification_key().to_hex()),
            signature_type: SignatureType::Ed25519,
            hex_bytes: sig.to_hex(),
        }
    }

    #[test]
    fn combine_produces_a_decodable_witnessed_transaction() {
        let a = signer(1);
        let b = signer(2);
        let unsigned = unsigned_for(&[&a, &b]);
        let signatures = vec![sign_with(&unsigned, &a), sign_with(&unsigned, &b)];

        let tx = combine(&unsigned, &signatures).unwrap();
        let decoded = decode_transaction(&tx).unwrap();
        assert_eq!(decoded.body_bytes, unsigned.body);
        assert_eq!(decoded.witnesses.vkey_witnesses.len(), 2);
        // Witness order mirrors required-signer order.
        assert_eq!(
            decoded.witnesses.vkey_witnesses[0].vkey,
            *a.keypair.verification_key().as_bytes()
        );
        assert_eq!(
            decoded.witnesses.vkey_witnesses[1].vkey,
            *b.keypair.verification_key().as_bytes()
        );
    }

    #[test]
    fn missing_signature_is_a_count_mismatch() {
        let a = signer(1);
        let b = signer(2);
        let unsigned = unsigned_for(&[&a, &b]);
        let signatures = vec![sign_with(&unsigned, &a)];

        match combine(&unsigned, &signatures) {
            Err(ConstructionError::SignatureCountMismatch {
                expected,
                got,
                missing,
            }) => {
                assert_eq!(expected, 2);
                assert_eq!(got, 1);
                assert_eq!(missing, vec![b.address.clone()]);
            }
            other => panic!("expected SignatureCountMismatch, got {other:?}"),
        }
    }

    #[test]
    fn extra_signature_is_a_count_mismatch() {
        let a = signer(1);
        let stranger = signer(3);
        let unsigned = unsigned_for(&[&a]);
        let signatures = vec![sign_with(&unsigned, &a), sign_with(&unsigned, &stranger)];
        assert!(matches!(
            combine(&unsigned, &signatures),
            Err(ConstructionError::SignatureCountMismatch { .. })
        ));
    }

    #[test]
    fn wrong_key_signature_names_the_account() {
        let a = signer(1);
        let b = signer(2);
        let unsigned = unsigned_for(&[&a]);
        // b signs, but claims to be a.
        let mut forged = sign_with(&unsigned, &b);
        forged.signing_payload.account_identifier = AccountIdentifier::new(a.address.clone());

        match combine(&unsigned, &[forged]) {
            Err(ConstructionError::InvalidSignature { address }) => {
                assert_eq!(address, a.address);
            }
            other => panic!("expected InvalidSignature, got {other:?}"),
        }
    }

    #[test]
    fn signature_over_wrong_bytes_fails() {
        let a = signer(1);
        let unsigned = unsigned_for(&[&a]);
        let mut signature = sign_with(&unsigned, &a);
        // Re-sign different bytes.
        signature.hex_bytes = a.keypair.sign(&[0u8; 32]).to_hex();
        assert!(matches!(
            combine(&unsigned, &[signature]),
            Err(ConstructionError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn mutated_body_is_rejected_before_any_verification() {
        let a = signer(1);
        let mut unsigned = unsigned_for(&[&a]);
        let signatures = vec![sign_with(&unsigned, &a)];
        // Flip a byte in the fee field.
        let last = unsigned.body.len() - 1;
        unsigned.body[last] ^= 0x01;

        assert!(matches!(
            combine(&unsigned, &signatures),
            Err(ConstructionError::BodyMutationDetected)
        ));
    }

    #[test]
    fn duplicate_signatures_for_one_signer_are_rejected() {
        let a = signer(1);
        let unsigned = unsigned_for(&[&a]);
        let signatures = vec![sign_with(&unsigned, &a), sign_with(&unsigned, &a)];
        assert!(matches!(
            combine(&unsigned, &signatures),
            Err(ConstructionError::SignatureCountMismatch { .. })
        ));
    }

    #[test]
    fn combine_is_deterministic() {
        let a = signer(1);
        let unsigned = unsigned_for(&[&a]);
        let signatures = vec![sign_with(&unsigned, &a)];
        let tx1 = combine(&unsigned, &signatures).unwrap();
        let tx2 = combine(&unsigned, &signatures).unwrap();
        assert_eq!(tx1, tx2);
    }
}
