//! Fee and size estimation with dummy signatures.
//!
//! Fees on Cardano are linear in the serialized transaction size, so the
//! only honest way to quote a fee before signing is to build the whole
//! transaction with placeholder witnesses of the exact width real ones
//! will have. Which placeholder depends on who signs:
//!
//! | credential kind      | witness shape  | extra bytes              |
//! |----------------------|----------------|--------------------------|
//! | Shelley payment/stake| vkey witness   | —                        |
//! | pool cold key        | vkey witness   | —                        |
//! | Byron bootstrap      | bootstrap      | chain code + attributes  |
//!
//! Everything here is pure: same draft in, same size out, no clock, no
//! randomness. The Metadata phase later corrects the size for the width
//! difference between the placeholder ttl and the real one rather than
//! re-estimating from scratch.

use crate::address::{byron, classify, credential, AddressEra};
use crate::config::{ProtocolParameters, DEFAULT_RELATIVE_TTL};
use crate::error::ConstructionError;
use crate::transaction::assembler::{assemble, cbor_uint_width, encode_transaction};
use crate::transaction::types::{
    BootstrapWitness, TransactionBody, VkeyWitness, WitnessSet,
};

/// The witness shape a signer's address calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerKind {
    /// Shelley payment or reward address: one vkey witness.
    Shelley,
    /// Byron bootstrap address: bootstrap witness with chain code and
    /// address attributes.
    Byron,
    /// Bare pool cold key hash: one vkey witness.
    PoolColdKey,
}

/// Classify a required-signer string into its witness shape.
///
/// Pool operations put a bare key hash where an address would normally go,
/// so "56 hex characters or `pool1...`" is a first-class case here, not an
/// error.
pub fn classify_signer(address: &str) -> Result<SignerKind, ConstructionError> {
    if credential::parse_pool_key_hash(address).is_ok() {
        return Ok(SignerKind::PoolColdKey);
    }
    match classify(address)? {
        AddressEra::Shelley => Ok(SignerKind::Shelley),
        AddressEra::Byron => Ok(SignerKind::Byron),
    }
}

/// Build the placeholder witness set for a list of required signers.
///
/// One witness per signer, all-zero key and signature bytes, with widths
/// matching what the real signer will eventually produce. Byron witnesses
/// embed the address's real attribute bytes, because those count toward
/// the serialized size too.
pub fn dummy_witness_set(signers: &[String]) -> Result<WitnessSet, ConstructionError> {
    let mut set = WitnessSet::default();
    for signer in signers {
        match classify_signer(signer)? {
            SignerKind::Shelley | SignerKind::PoolColdKey => {
                set.vkey_witnesses.push(VkeyWitness {
                    vkey: [0u8; 32],
                    signature: [0u8; 64],
                });
            }
            SignerKind::Byron => {
                let attributes = byron::ByronAddress::from_base58(signer)
                    .map_err(ConstructionError::from)?
                    .attributes()
                    .map_err(ConstructionError::from)?;
                set.bootstrap_witnesses.push(BootstrapWitness {
                    vkey: [0u8; 32],
                    signature: [0u8; 64],
                    chain_code: [0u8; 32],
                    attributes,
                });
            }
        }
    }
    Ok(set)
}

/// Serialized size, in bytes, of the transaction with dummy witnesses.
///
/// This is the size the linear fee formula is applied to. Idempotent by
/// construction; monotone in every construct the body carries.
pub fn estimate_size(
    body: &TransactionBody,
    signers: &[String],
    aux_data: Option<&[u8]>,
) -> Result<usize, ConstructionError> {
    let (body_bytes, _) = assemble(body)?;
    let witnesses = dummy_witness_set(signers)?;
    let tx = encode_transaction(&body_bytes, &witnesses, aux_data)?;
    Ok(tx.len())
}

/// The protocol's linear fee formula:
/// `fee = min_fee_constant + min_fee_coefficient × size`.
pub fn min_fee(size: usize, params: &ProtocolParameters) -> u64 {
    params.min_fee_constant + params.min_fee_coefficient * size as u64
}

/// Correct a size computed at one ttl for the CBOR width of another.
///
/// Preprocess sizes the transaction at a placeholder ttl of zero; Metadata
/// learns the real slot and nudges the size by the integer-width delta
/// instead of rebuilding the transaction.
pub fn adjust_size_for_ttl(size: usize, previous_ttl: u64, updated_ttl: u64) -> usize {
    size + cbor_uint_width(updated_ttl) - cbor_uint_width(previous_ttl)
}

/// Absolute expiry slot from the chain tip and a relative window.
pub fn calculate_ttl(current_slot: u64, relative_ttl: u64) -> u64 {
    current_slot + relative_ttl
}

/// The caller's relative ttl, or the protocol default when absent.
pub fn relative_ttl_or_default(relative_ttl: Option<u64>) -> u64 {
    relative_ttl.unwrap_or(DEFAULT_RELATIVE_TTL)
}

/// A convenience bundle: size plus suggested fee for a draft.
pub fn estimate(
    body: &TransactionBody,
    signers: &[String],
    aux_data: Option<&[u8]>,
    params: &ProtocolParameters,
) -> Result<(usize, u64), ConstructionError> {
    let size = estimate_size(body, signers, aux_data)?;
    Ok((size, min_fee(size, params)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
