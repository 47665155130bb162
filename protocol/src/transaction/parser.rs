//! Parsing transactions back into operations and signers.
//!
//! Parse is the protocol's trust-but-verify step: after Payloads (and
//! again after Combine) a careful client throws the bytes back at the
//! gateway and checks that what will be signed or submitted still means
//! what was asked for.
//!
//! Two checks make that meaningful:
//!
//! 1. **Integrity** — the decoded constructs are re-assembled through the
//!    canonical encoder and the hash compared against the input bytes.
//!    A body we cannot reproduce byte-for-byte (re-ordered maps, sneaky
//!    indefinite lengths) is reported as tampering, never silently
//!    accepted.
//! 2. **Signers** — for signed transactions, the witness set's public
//!    keys are hashed and matched back to the addresses appearing in the
//!    transaction. Those are the parties that actually signed, whatever
//!    the envelope claims.

use crate::address::{address_to_bytes, reward_address_from_key_hash, ShelleyAddress};
use crate::config::Network;
use crate::crypto::hash::{blake2b_224, blake2b_256};
use crate::error::ConstructionError;
use crate::operations::parse::ledger_to_operations;
use crate::operations::types::{AccountIdentifier, Operation};
use crate::transaction::assembler::encode_body;
use crate::transaction::decode::{decode_body, decode_transaction};
use crate::transaction::envelope::{SignedEnvelope, UnsignedTransaction};
use crate::transaction::types::WitnessSet;

/// The result of parsing: reconstructed operations, and — for signed
/// transactions — the accounts whose keys witnessed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTransaction {
    pub operations: Vec<Operation>,
    pub account_identifier_signers: Vec<AccountIdentifier>,
}

/// Parse envelope bytes (unsigned or signed) back into semantic form.
pub fn parse(
    bytes: &[u8],
    signed: bool,
    network: Network,
) -> Result<ParsedTransaction, ConstructionError> {
    if signed {
        parse_signed(bytes, network)
    } else {
        parse_unsigned(bytes, network)
    }
}

fn parse_unsigned(
    bytes: &[u8],
    network: Network,
) -> Result<ParsedTransaction, ConstructionError> {
    let envelope = UnsignedTransaction::from_bytes(bytes)?;
    let body = verify_body_integrity(&envelope.body)?;
    let operations = ledger_to_operations(
        &body,
        envelope.aux_metadata.as_deref(),
        &envelope.operations,
        network,
    )?;
    Ok(ParsedTransaction {
        operations,
        account_identifier_signers: Vec::new(),
    })
}

fn parse_signed(bytes: &[u8], network: Network) -> Result<ParsedTransaction, ConstructionError> {
    // Accept the gateway's envelope or a bare transaction from other
    // tooling; the latter simply has no embedded operations to enrich
    // from.
    let (tx_bytes, source_operations) = match SignedEnvelope::from_bytes(bytes) {
        Ok(envelope) => (envelope.transaction, envelope.operations),
        Err(_) => (bytes.to_vec(), Vec::new()),
    };

    let decoded = decode_transaction(&tx_bytes)?;
    let body = verify_body_integrity(&decoded.body_bytes)?;
    let operations = ledger_to_operations(
        &body,
        decoded.aux_data.as_deref(),
        &source_operations,
        network,
    )?;

    let signers = recover_signers(&decoded.witnesses, &operations, network);
    Ok(ParsedTransaction {
        operations,
        account_identifier_signers: signers,
    })
}

/// Decode a body and prove the canonical encoder reproduces it exactly.
fn verify_body_integrity(
    body_bytes: &[u8],
) -> Result<crate::transaction::types::TransactionBody, ConstructionError> {
    let body = decode_body(body_bytes)?;
    let reassembled = encode_body(&body)?;
    let embedded_hash = blake2b_256(body_bytes);
    let reassembled_hash = blake2b_256(&reassembled);
    if embedded_hash != reassembled_hash {
        return Err(ConstructionError::ParseIntegrityError {
            embedded: hex::encode(embedded_hash),
            reassembled: hex::encode(reassembled_hash),
        });
    }
    Ok(body)
}

/// Map witness public keys back to account identifiers.
///
/// A vkey witness only proves "a key hashing to H signed". To name the
/// signer, each key hash is matched against the credentials of the
/// addresses the operations mention; an unmatched hash falls back to its
/// reward-address rendering so it is still reported rather than dropped.
fn recover_signers(
    witnesses: &WitnessSet,
    operations: &[Operation],
    network: Network,
) -> Vec<AccountIdentifier> {
    let candidates: Vec<(String, [u8; 28])> = operations
        .iter()
        .filter_map(|op| op.account.as_ref())
        .filter_map(|account| {
            let bytes = address_to_bytes(&account.address).ok()?;
            let shelley = ShelleyAddress::from_raw_bytes(&bytes).ok()?;
            let mut credential = [0u8; 28];
            credential.copy_from_slice(shelley.first_credential());
            Some((account.address.clone(), credential))
        })
        .collect();

    let mut signers: Vec<AccountIdentifier> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for witness in &witnesses.vkey_witnesses {
        let key_hash = blake2b_224(&witness.vkey);
        let address = candidates
            .iter()
            .find(|(_, credential)| *credential == key_hash)
            .map(|(address, _)| address.clone())
            .unwrap_or_else(|| reward_address_from_key_hash(&key_hash, network));
        if seen.insert(address.clone()) {
            signers.push(AccountIdentifier::new(address));
        }
    }

    // Bootstrap witnesses cannot be matched by credential hash (the Byron
    // address root is a nested hash), so the Byron addresses named by the
    // operations stand in as the signing accounts.
    if !witnesses.bootstrap_witnesses.is_empty() {
        for op in operations {
            if let Some(account) = &op.account {
                if crate::address::byron::is_byron_address(&account.address)
                    && seen.insert(account.address.clone())
                {
                    signers.push(AccountIdentifier::new(account.address.clone()));
                }
            }
        }
    }

    signers
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
