//! Error taxonomy for the construction engine.
//!
//! One enum, one variant per way a phase can refuse a request. Every
//! variant carries enough context (address, operation index, expected vs.
//! actual) for the caller to fix their input without reading our source.
//!
//! Propagation policy: errors surface at the phase boundary where they are
//! detected, and nothing is corrected or defaulted on the caller's behalf.
//! A negative fee residual is an error, not a zero fee. The only retryable
//! variant is [`ConstructionError::UpstreamUnavailable`]; everything else is
//! terminal for the request.

use thiserror::Error;

use crate::address::AddressError;

/// Errors produced by the construction engine.
#[derive(Debug, Error)]
pub enum ConstructionError {
    /// An address string could not be parsed, or belongs to the wrong network.
    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    /// The operation `type` string is not one of the supported kinds.
    #[error("unsupported operation type '{kind}' at operation index {index}")]
    UnsupportedOperationType { kind: String, index: u64 },

    /// Outputs plus deposits exceed inputs plus withdrawals plus refunds.
    /// The residual that would have been the fee is negative.
    #[error("insufficient funds: outputs exceed inputs by {shortfall} lovelace")]
    InsufficientFunds { shortfall: u64 },

    /// Two withdrawal operations target the same reward address.
    #[error("duplicate withdrawal for reward address {address}")]
    DuplicateWithdrawal { address: String },

    /// More than one vote registration operation in a single transaction.
    #[error("transaction carries more than one vote registration operation")]
    DuplicateVoteRegistration,

    /// The signature set handed to combine does not cover the required
    /// signer set exactly.
    #[error(
        "signature count mismatch: {expected} signer(s) required, {got} signature(s) supplied, missing {missing:?}"
    )]
    SignatureCountMismatch {
        expected: usize,
        got: usize,
        missing: Vec<String>,
    },

    /// A supplied signature does not verify against its public key and the
    /// transaction hash.
    #[error("invalid signature for account {address}")]
    InvalidSignature { address: String },

    /// The body bytes in the unsigned envelope no longer hash to the value
    /// the payloads were issued for. Someone edited the body between phases.
    #[error("transaction body was mutated after signing payloads were issued")]
    BodyMutationDetected,

    /// Re-assembling the decoded constructs produced a different body hash
    /// than the bytes we were given.
    #[error("parse integrity failure: input hash {embedded}, re-assembled hash {reassembled}")]
    ParseIntegrityError {
        embedded: String,
        reassembled: String,
    },

    /// An external collaborator (protocol parameters, chain tip, submit API)
    /// did not answer in time. The only retryable error in this crate.
    #[error("upstream unavailable: {reason}")]
    UpstreamUnavailable { reason: String },

    /// The input is not decodable as the expected CBOR structure.
    #[error("malformed transaction bytes: {reason}")]
    MalformedTransactionBytes { reason: String },

    /// An operation amount is absent, unparseable, or has the wrong sign.
    #[error("invalid amount at operation index {index}: {reason}")]
    InvalidAmount { index: u64, reason: String },

    /// A staking operation is missing its staking credential.
    #[error("missing staking credential at operation index {index}")]
    MissingStakingCredential { index: u64 },

    /// A stake delegation is missing the target pool key hash.
    #[error("missing pool key hash at operation index {index}")]
    MissingPoolKeyHash { index: u64 },

    /// A pool registration is missing its parameter block.
    #[error("missing pool registration parameters at operation index {index}")]
    MissingPoolParameters { index: u64 },

    /// A pool retirement is missing the retirement epoch.
    #[error("missing retirement epoch at operation index {index}")]
    MissingRetirementEpoch { index: u64 },

    /// A vote registration is missing its metadata block, or the metadata is
    /// incomplete.
    #[error("invalid vote registration at operation index {index}: {reason}")]
    InvalidVoteRegistration { index: u64, reason: String },

    /// An input operation is missing its coin identifier.
    #[error("missing coin identifier at operation index {index}")]
    MissingCoinIdentifier { index: u64 },

    /// CBOR serialization failed. Encoding to memory cannot run out of
    /// space, so seeing this means a bug, not bad input.
    #[error("cbor serialization failed: {reason}")]
    Serialization { reason: String },
}

impl ConstructionError {
    /// `true` if the caller may retry the identical request and reasonably
    /// hope for a different outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamUnavailable { .. })
    }

    /// Shorthand for decode failures with a displayable cause.
    pub fn malformed(reason: impl ToString) -> Self {
        Self::MalformedTransactionBytes {
            reason: reason.to_string(),
        }
    }

    /// Shorthand for encode failures with a displayable cause.
    pub fn serialization(reason: impl ToString) -> Self {
        Self::Serialization {
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_upstream_errors_are_retryable() {
        assert!(ConstructionError::UpstreamUnavailable {
            reason: "timeout".into()
        }
        .is_retryable());
        assert!(!ConstructionError::BodyMutationDetected.is_retryable());
        assert!(!ConstructionError::InsufficientFunds { shortfall: 1 }.is_retryable());
    }

    #[test]
    fn count_mismatch_lists_missing_signers() {
        let err = ConstructionError::SignatureCountMismatch {
            expected: 2,
            got: 1,
            missing: vec!["addr1xyz".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 signer(s) required"));
        assert!(msg.contains("addr1xyz"));
    }

    #[test]
    fn invalid_amount_names_the_operation() {
        let err = ConstructionError::InvalidAmount {
            index: 3,
            reason: "not a number".into(),
        };
        assert!(err.to_string().contains("index 3"));
    }
}
