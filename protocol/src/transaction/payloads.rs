//! Signing payload generation.
//!
//! After assembly there is exactly one thing left to sign: the 32-byte
//! body hash. Payload generation is therefore a fan-out — one payload per
//! required signer, all carrying the same hex bytes — whose only subtlety
//! is ordering. Payloads come out in the required-signer order the codec
//! established (first appearance in the operation list), because combine
//! rebuilds the witness set in that same order and some script shapes
//! check witness position.
//!
//! Byron signers need one extra courtesy: their account metadata (the
//! BIP32 chain code) propagates from the originating operation into the
//! payload, so the wallet gets back everything combine will later need to
//! build the bootstrap witness.

use crate::operations::types::{
    AccountIdentifier, Operation, SignatureType, SigningPayload,
};

/// One payload per required signer, in required-signer order.
///
/// The signer list is already unique (the codec deduplicates on first
/// appearance), so this is a straight map, not a set operation. Account
/// metadata for a signer is copied from the first operation that names
/// the same address.
pub fn signing_payloads(
    tx_hash: &[u8; 32],
    signers: &[String],
    operations: &[Operation],
) -> Vec<SigningPayload> {
    let hex_bytes = hex::encode(tx_hash);
    signers
        .iter()
        .map(|address| SigningPayload {
            account_identifier: account_for(address, operations),
            hex_bytes: hex_bytes.clone(),
            signature_type: SignatureType::Ed25519,
        })
        .collect()
}

/// The account identifier a payload should carry: the operation's own
/// account when one names this address (metadata included), a bare
/// address otherwise (derived signers like reward addresses).
fn account_for(address: &str, operations: &[Operation]) -> AccountIdentifier {
    operations
        .iter()
        .filter_map(|op| op.account.as_ref())
        .find(|account| account.address == address)
        .cloned()
        .unwrap_or_else(|| AccountIdentifier::new(address))
}
