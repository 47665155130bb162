//! Client-carried transaction envelopes.
//!
//! The gateway is stateless: nothing survives a request on the server
//! side, so everything the later phases need must travel with the client.
//! Two envelope shapes do that job:
//!
//! - **Unsigned** (Payloads → Combine): body bytes, body hash, the
//!   required-signer list, optional auxiliary metadata, and the original
//!   operations (so Parse can reconstruct input amounts and staking keys,
//!   which the body alone does not carry).
//! - **Signed** (Combine → Hash/Submit/Parse): the full witnessed
//!   transaction plus the same operations.
//!
//! Hash and Submit unwrap the signed envelope before touching the node —
//! a transaction built by other tooling (cardano-cli) arrives bare, and
//! [`extract_transaction_if_needed`] accepts both.

use minicbor::data::Type;
use minicbor::{Decoder, Encoder};

use crate::crypto::hash::blake2b_256;
use crate::error::ConstructionError;
use crate::operations::types::Operation;

fn enc_err<E: std::fmt::Display>(e: E) -> ConstructionError {
    ConstructionError::serialization(e)
}

fn bad<E: std::fmt::Display>(e: E) -> ConstructionError {
    ConstructionError::malformed(e)
}

// ---------------------------------------------------------------------------
// Unsigned envelope
// ---------------------------------------------------------------------------

/// The unsigned transaction as the client carries it between phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransaction {
    /// blake2b-256 of `body` — the bytes every signer signs.
    pub hash: [u8; 32],
    /// Canonical body bytes.
    pub body: Vec<u8>,
    /// Required signers, in payload order.
    pub signers: Vec<String>,
    /// Serialized auxiliary data (vote registrations), when present.
    pub aux_metadata: Option<Vec<u8>>,
    /// The operations this transaction was built from.
    pub operations: Vec<Operation>,
}

impl UnsignedTransaction {
    /// Serialize to the envelope bytes the client receives, hex-encoded
    /// at the API boundary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ConstructionError> {
        let operations_json =
            serde_json::to_vec(&self.operations).map_err(enc_err)?;

        let mut e = Encoder::new(Vec::new());
        e.array(5).map_err(enc_err)?;
        e.bytes(&self.body).map_err(enc_err)?;
        e.bytes(&self.hash).map_err(enc_err)?;
        e.array(self.signers.len() as u64).map_err(enc_err)?;
        for signer in &self.signers {
            e.str(signer).map_err(enc_err)?;
        }
        match &self.aux_metadata {
            Some(bytes) => {
                e.bytes(bytes).map_err(enc_err)?;
            }
            None => {
                e.null().map_err(enc_err)?;
            }
        }
        e.bytes(&operations_json).map_err(enc_err)?;
        Ok(e.into_writer())
    }

    /// Decode an envelope. The embedded hash is *not* trusted: combine
    /// re-hashes the body and compares.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConstructionError> {
        let mut d = Decoder::new(bytes);
        let len = d.array().map_err(bad)?;
        if len != Some(5) {
            return Err(bad("unsigned envelope is not a five-element array"));
        }
        let body = d.bytes().map_err(bad)?.to_vec();
        let hash_bytes = d.bytes().map_err(bad)?;
        let hash = <[u8; 32]>::try_from(hash_bytes)
            .map_err(|_| bad("envelope hash is not 32 bytes"))?;

        let signer_count = d
            .array()
            .map_err(bad)?
            .ok_or_else(|| bad("indefinite signer list"))?;
        let mut signers = Vec::with_capacity(signer_count as usize);
        for _ in 0..signer_count {
            signers.push(d.str().map_err(bad)?.to_string());
        }

        let aux_metadata = if d.datatype().map_err(bad)? == Type::Null {
            d.null().map_err(bad)?;
            None
        } else {
            Some(d.bytes().map_err(bad)?.to_vec())
        };

        let operations_json = d.bytes().map_err(bad)?;
        let operations: Vec<Operation> =
            serde_json::from_slice(operations_json).map_err(bad)?;

        Ok(Self {
            hash,
            body,
            signers,
            aux_metadata,
            operations,
        })
    }

    /// `true` if the body bytes still hash to the envelope hash.
    pub fn body_is_intact(&self) -> bool {
        blake2b_256(&self.body) == self.hash
    }
}

// ---------------------------------------------------------------------------
// Signed envelope
// ---------------------------------------------------------------------------

/// A witnessed transaction with the originating operations attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    /// The full `[body, witness_set, valid, aux]` transaction bytes.
    pub transaction: Vec<u8>,
    /// The operations this transaction was built from.
    pub operations: Vec<Operation>,
}

impl SignedEnvelope {
    /// Serialize to envelope bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ConstructionError> {
        let operations_json = serde_json::to_vec(&self.operations).map_err(enc_err)?;
        let mut e = Encoder::new(Vec::new());
        e.array(2).map_err(enc_err)?;
        e.bytes(&self.transaction).map_err(enc_err)?;
        e.bytes(&operations_json).map_err(enc_err)?;
        Ok(e.into_writer())
    }

    /// Decode envelope bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConstructionError> {
        let mut d = Decoder::new(bytes);
        let len = d.array().map_err(bad)?;
        if len != Some(2) {
            return Err(bad("signed envelope is not a two-element array"));
        }
        let transaction = d.bytes().map_err(bad)?.to_vec();
        let operations_json = d.bytes().map_err(bad)?;
        let operations: Vec<Operation> =
            serde_json::from_slice(operations_json).map_err(bad)?;
        Ok(Self {
            transaction,
            operations,
        })
    }
}

/// Accept either a signed envelope or a bare witnessed transaction, and
/// return the bare transaction bytes.
///
/// Transactions built through this gateway carry the envelope; ones built
/// with other tooling do not. The two are cheap to tell apart: an
/// envelope's first array element is a byte string, a transaction's is
/// the body map.
pub fn extract_transaction_if_needed(bytes: &[u8]) -> Result<Vec<u8>, ConstructionError> {
    let mut d = Decoder::new(bytes);
    d.array().map_err(bad)?;
    match d.datatype().map_err(bad)? {
        Type::Bytes => Ok(SignedEnvelope::from_bytes(bytes)?.transaction),
        Type::Map => Ok(bytes.to_vec()),
        other => Err(bad(format!(
            "first transaction element is {other:?}, expected bytes or map"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::types::{Amount, OperationKind};
    use crate::transaction::assembler::{assemble, encode_transaction};
    use crate::transaction::types::{TransactionBody, WitnessSet};

    fn sample_operations() -> Vec<Operation> {
        let mut op = Operation::new(0, OperationKind::Input);
        op.amount = Some(Amount::ada(-1_000_000));
        vec![op]
    }

    fn sample_unsigned() -> UnsignedTransaction {
        let body = vec![0xa4, 0x00, 0x80, 0x01, 0x80, 0x02, 0x00, 0x03, 0x00];
        UnsignedTransaction {
            hash: blake2b_256(&body),
            body,
            signers: vec!["addr1alpha".into(), "stake1beta".into()],
            aux_metadata: Some(vec![0x82, 0xa0, 0x80]),
            operations: sample_operations(),
        }
    }

    #[test]
    fn unsigned_envelope_roundtrip() {
        let unsigned = sample_unsigned();
        let bytes = unsigned.to_bytes().unwrap();
        let back = UnsignedTransaction::from_bytes(&bytes).unwrap();
        assert_eq!(back, unsigned);
        assert!(back.body_is_intact());
    }

    #[test]
    fn tampered_body_is_detectable() {
        let mut unsigned = sample_unsigned();
        unsigned.body[3] ^= 0x01;
        assert!(!unsigned.body_is_intact());
    }

    #[test]
    fn unsigned_envelope_without_aux() {
        let mut unsigned = sample_unsigned();
        unsigned.aux_metadata = None;
        let bytes = unsigned.to_bytes().unwrap();
        let back = UnsignedTransaction::from_bytes(&bytes).unwrap();
        assert!(back.aux_metadata.is_none());
    }

    #[test]
    fn signed_envelope_roundtrip() {
        let envelope = SignedEnvelope {
            transaction: vec![0x84, 0xa0, 0xa0, 0xf5, 0xf6],
            operations: sample_operations(),
        };
        let bytes = envelope.to_bytes().unwrap();
        assert_eq!(SignedEnvelope::from_bytes(&bytes).unwrap(), envelope);
    }

    #[test]
    fn extract_unwraps_envelopes_and_passes_bare_transactions() {
        let (body_bytes, _) = assemble(&TransactionBody::empty()).unwrap();
        let bare = encode_transaction(&body_bytes, &WitnessSet::default(), None).unwrap();

        let envelope = SignedEnvelope {
            transaction: bare.clone(),
            operations: vec![],
        };
        let wrapped = envelope.to_bytes().unwrap();

        assert_eq!(extract_transaction_if_needed(&wrapped).unwrap(), bare);
        assert_eq!(extract_transaction_if_needed(&bare).unwrap(), bare);
    }

    #[test]
    fn rejects_malformed_envelopes() {
        assert!(UnsignedTransaction::from_bytes(&[0x81, 0x00]).is_err());
        assert!(SignedEnvelope::from_bytes(&[0xa0]).is_err());
        assert!(extract_transaction_if_needed(&[0x01]).is_err());
    }
}
