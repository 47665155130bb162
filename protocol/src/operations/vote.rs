//! Catalyst vote registration metadata (CIP-15).
//!
//! A `voteRegistration` operation does not touch the ledger's UTXO or
//! certificate machinery at all — it rides along as auxiliary metadata
//! under two reserved labels:
//!
//! ```text
//! 61284: { 1: voting_key, 2: stake_key, 3: reward_address, 4: nonce }
//! 61285: { 1: registration_signature }
//! ```
//!
//! The serialized auxiliary data is `[metadata_map, []]` (the Shelley-MA
//! shape: metadata plus an empty auxiliary-script list). Its blake2b-256
//! digest goes into the body under key 7, which is how the body commits to
//! the registration without embedding it.

use minicbor::{Decoder, Encoder};

use crate::address::{address_from_bytes, address_to_bytes};
use crate::config::{
    CATALYST_IDX_REWARD_ADDRESS, CATALYST_IDX_STAKE_KEY, CATALYST_IDX_VOTING_KEY,
    CATALYST_IDX_VOTING_NONCE, CATALYST_IDX_VOTING_SIGNATURE, CATALYST_LABEL_DATA,
    CATALYST_LABEL_SIG, ED25519_PUBLIC_KEY_BYTES, ED25519_SIGNATURE_BYTES,
};
use crate::crypto::hash::blake2b_256;
use crate::error::ConstructionError;
use crate::operations::types::{PublicKey, VoteRegistrationMetadata};

fn enc_err<E: std::fmt::Display>(e: E) -> ConstructionError {
    ConstructionError::serialization(e)
}

fn bad<E: std::fmt::Display>(e: E) -> ConstructionError {
    ConstructionError::malformed(e)
}

/// Serialize a vote registration into auxiliary data bytes and their hash.
///
/// The hash is what lands in the transaction body; the bytes themselves
/// are carried in the envelope so combine can attach them to the signed
/// transaction.
pub fn build_vote_registration_aux(
    meta: &VoteRegistrationMetadata,
    index: u64,
) -> Result<(Vec<u8>, [u8; 32]), ConstructionError> {
    let invalid = |reason: &str| ConstructionError::InvalidVoteRegistration {
        index,
        reason: reason.to_string(),
    };

    let voting_key = decode_key_hex(&meta.voting_key, "voting key")
        .map_err(|reason| invalid(&reason))?;
    let stake_key =
        decode_key_hex(&meta.stake_key, "stake key").map_err(|reason| invalid(&reason))?;
    let reward_address = address_to_bytes(&meta.reward_address)
        .map_err(|_| invalid("reward address is not parseable"))?;
    let signature = hex::decode(&meta.voting_signature)
        .ok()
        .filter(|b| b.len() == ED25519_SIGNATURE_BYTES)
        .ok_or_else(|| invalid("voting signature must be 64 hex-encoded bytes"))?;

    let mut e = Encoder::new(Vec::new());
    e.array(2).map_err(enc_err)?;
    e.map(2).map_err(enc_err)?;

    e.u32(CATALYST_LABEL_DATA).map_err(enc_err)?;
    e.map(4).map_err(enc_err)?;
    e.u32(CATALYST_IDX_VOTING_KEY).map_err(enc_err)?;
    e.bytes(&voting_key).map_err(enc_err)?;
    e.u32(CATALYST_IDX_STAKE_KEY).map_err(enc_err)?;
    e.bytes(&stake_key).map_err(enc_err)?;
    e.u32(CATALYST_IDX_REWARD_ADDRESS).map_err(enc_err)?;
    e.bytes(&reward_address).map_err(enc_err)?;
    e.u32(CATALYST_IDX_VOTING_NONCE).map_err(enc_err)?;
    e.u64(meta.voting_nonce).map_err(enc_err)?;

    e.u32(CATALYST_LABEL_SIG).map_err(enc_err)?;
    e.map(1).map_err(enc_err)?;
    e.u32(CATALYST_IDX_VOTING_SIGNATURE).map_err(enc_err)?;
    e.bytes(&signature).map_err(enc_err)?;

    e.array(0).map_err(enc_err)?; // no auxiliary scripts

    let bytes = e.into_writer();
    let hash = blake2b_256(&bytes);
    Ok((bytes, hash))
}

/// Parse auxiliary data bytes back into vote registration metadata.
pub fn parse_vote_registration_aux(
    bytes: &[u8],
) -> Result<VoteRegistrationMetadata, ConstructionError> {
    let mut d = Decoder::new(bytes);
    let outer = d.array().map_err(bad)?;
    if outer != Some(2) {
        return Err(bad("auxiliary data is not a two-element array"));
    }

    let labels = d
        .map()
        .map_err(bad)?
        .ok_or_else(|| bad("indefinite metadata map"))?;

    let mut voting_key = None;
    let mut stake_key = None;
    let mut reward_address = None;
    let mut voting_nonce = None;
    let mut voting_signature = None;

    for _ in 0..labels {
        let label = d.u32().map_err(bad)?;
        match label {
            CATALYST_LABEL_DATA => {
                let fields = d
                    .map()
                    .map_err(bad)?
                    .ok_or_else(|| bad("indefinite data map"))?;
                for _ in 0..fields {
                    let idx = d.u32().map_err(bad)?;
                    match idx {
                        CATALYST_IDX_VOTING_KEY => {
                            voting_key = Some(d.bytes().map_err(bad)?.to_vec());
                        }
                        CATALYST_IDX_STAKE_KEY => {
                            stake_key = Some(d.bytes().map_err(bad)?.to_vec());
                        }
                        CATALYST_IDX_REWARD_ADDRESS => {
                            reward_address = Some(d.bytes().map_err(bad)?.to_vec());
                        }
                        CATALYST_IDX_VOTING_NONCE => {
                            voting_nonce = Some(d.u64().map_err(bad)?);
                        }
                        _ => {
                            d.skip().map_err(bad)?;
                        }
                    }
                }
            }
            CATALYST_LABEL_SIG => {
                let fields = d
                    .map()
                    .map_err(bad)?
                    .ok_or_else(|| bad("indefinite signature map"))?;
                for _ in 0..fields {
                    let idx = d.u32().map_err(bad)?;
                    if idx == CATALYST_IDX_VOTING_SIGNATURE {
                        voting_signature = Some(d.bytes().map_err(bad)?.to_vec());
                    } else {
                        d.skip().map_err(bad)?;
                    }
                }
            }
            _ => {
                d.skip().map_err(bad)?;
            }
        }
    }

    let voting_key = voting_key.ok_or_else(|| bad("vote registration missing voting key"))?;
    let stake_key = stake_key.ok_or_else(|| bad("vote registration missing stake key"))?;
    let reward_address =
        reward_address.ok_or_else(|| bad("vote registration missing reward address"))?;
    let voting_nonce = voting_nonce.ok_or_else(|| bad("vote registration missing nonce"))?;
    let voting_signature =
        voting_signature.ok_or_else(|| bad("vote registration missing signature"))?;

    Ok(VoteRegistrationMetadata {
        voting_key: PublicKey::new(hex::encode(voting_key)),
        stake_key: PublicKey::new(hex::encode(stake_key)),
        reward_address: address_from_bytes(&reward_address)?,
        voting_nonce,
        voting_signature: hex::encode(voting_signature),
    })
}

fn decode_key_hex(key: &PublicKey, what: &str) -> Result<Vec<u8>, String> {
    hex::decode(&key.hex_bytes)
        .ok()
        .filter(|b| b.len() == ED25519_PUBLIC_KEY_BYTES)
        .ok_or_else(|| format!("{what} must be 32 hex-encoded bytes"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::reward_address_from_key;
    use crate::config::Network;
    use crate::crypto::keys::SignerKeypair;

    fn sample_meta() -> VoteRegistrationMetadata {
        let stake = SignerKeypair::from_seed(&[21u8; 32]).verification_key();
        VoteRegistrationMetadata {
            voting_key: PublicKey::new("aa".repeat(32)),
            stake_key: PublicKey::new(stake.to_hex()),
            reward_address: reward_address_from_key(&stake, Network::Mainnet),
            voting_nonce: 1234,
            voting_signature: "bb".repeat(64),
        }
    }

    #[test]
    fn build_parse_roundtrip() {
        let meta = sample_meta();
        let (bytes, _) = build_vote_registration_aux(&meta, 0).unwrap();
        let parsed = parse_vote_registration_aux(&bytes).unwrap();
        assert_eq!(parsed, meta);
    }

    #[test]
    fn aux_hash_is_deterministic() {
        let meta = sample_meta();
        let (_, h1) = build_vote_registration_aux(&meta, 0).unwrap();
        let (_, h2) = build_vote_registration_aux(&meta, 0).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn nonce_changes_the_hash() {
        let meta = sample_meta();
        let mut other = sample_meta();
        other.voting_nonce += 1;
        let (_, h1) = build_vote_registration_aux(&meta, 0).unwrap();
        let (_, h2) = build_vote_registration_aux(&other, 0).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn labels_appear_in_the_encoding() {
        let (bytes, _) = build_vote_registration_aux(&sample_meta(), 0).unwrap();
        let hex = hex::encode(&bytes);
        // 61284 = 0xef64, 61285 = 0xef65; both as 16-bit uints.
        assert!(hex.contains("19ef64"));
        assert!(hex.contains("19ef65"));
    }

    #[test]
    fn rejects_short_keys_and_signatures() {
        let mut meta = sample_meta();
        meta.voting_key = PublicKey::new("deadbeef");
        assert!(matches!(
            build_vote_registration_aux(&meta, 3),
            Err(ConstructionError::InvalidVoteRegistration { index: 3, .. })
        ));

        let mut meta = sample_meta();
        meta.voting_signature = "00".into();
        assert!(build_vote_registration_aux(&meta, 0).is_err());
    }

    #[test]
    fn rejects_bad_reward_address() {
        let mut meta = sample_meta();
        meta.reward_address = "not-an-address".into();
        assert!(build_vote_registration_aux(&meta, 0).is_err());
    }

    #[test]
    fn parse_rejects_missing_signature_label() {
        // [ {61284: {4: 1}}, [] ] — structurally fine, but incomplete.
        let mut e = Encoder::new(Vec::new());
        e.array(2).unwrap();
        e.map(1).unwrap();
        e.u32(CATALYST_LABEL_DATA).unwrap();
        e.map(1).unwrap();
        e.u32(CATALYST_IDX_VOTING_NONCE).unwrap();
        e.u64(1).unwrap();
        e.array(0).unwrap();
        assert!(parse_vote_registration_aux(&e.into_writer()).is_err());
    }
}
