//! Forward operation codec: Rosetta operations → typed ledger constructs.
//!
//! This is where the flat, ordered operation list becomes inputs, outputs,
//! certificates, withdrawals and auxiliary metadata. The rules that matter:
//!
//! - Inputs and outputs keep their operation order; that order is encoded
//!   and therefore hashed.
//! - Each staking/pool operation maps to exactly one certificate, in
//!   operation order.
//! - Withdrawals are keyed by reward address; a duplicate is an error, not
//!   a merge.
//! - The fee is never an explicit operation. It is the ADA residual:
//!   `|inputs| + withdrawals + refunds − outputs − deposits`. A negative
//!   residual means the client's numbers don't add up, and the answer is
//!   `InsufficientFunds`, not a zero fee.
//! - The required-signer set accumulates in first-appearance order. That
//!   order is load-bearing: payloads, witnesses, and combine all reproduce
//!   it.
//!
//! Dispatch over the operation kind is exhaustive. Adding a new kind to
//! [`OperationKind`] will not compile until this module says what it does.

use std::collections::HashSet;

use tracing::debug;

use crate::address::{
    address_to_bytes, credential, reward_account_bytes, reward_address_from_account_bytes,
    reward_address_from_key, reward_address_from_key_hash, AddressError, StakeCredential,
};
use crate::config::{DepositParameters, Network, POLICY_ID_HEX_LENGTH};
use crate::crypto::keys::VerificationKey;
use crate::error::ConstructionError;
use crate::operations::types::{
    Amount, Operation, OperationKind, PoolRegistrationParams, PublicKey, TokenBundleItem,
};
use crate::operations::vote::build_vote_registration_aux;
use crate::transaction::decode::decode_certificate_bytes;
use crate::transaction::types::{
    Certificate, MultiAsset, PoolMetadataSpec, PoolParams, RelaySpec, TransactionBody,
    TransactionInput, TransactionOutput, Withdrawal,
};

// ---------------------------------------------------------------------------
// LedgerDraft
// ---------------------------------------------------------------------------

/// Everything the forward codec extracts from an operation list.
///
/// The draft is the engine's internal currency: fees are estimated over
/// it, bodies are assembled from it, and payloads are generated for its
/// signer set.
#[derive(Debug, Clone, Default)]
pub struct LedgerDraft {
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub certificates: Vec<Certificate>,
    pub withdrawals: Vec<Withdrawal>,
    /// Serialized CIP-15 auxiliary data, when a vote registration is present.
    pub aux_metadata: Option<Vec<u8>>,
    /// blake2b-256 of `aux_metadata`.
    pub aux_data_hash: Option<[u8; 32]>,
    /// Unique required signers, in first-appearance order.
    pub required_signers: Vec<String>,
    /// The ADA residual that becomes the fee.
    pub fee: u64,
}

impl LedgerDraft {
    /// Materialize a transaction body at a given fee and ttl.
    pub fn to_body(&self, fee: u64, ttl: u64) -> TransactionBody {
        TransactionBody {
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            fee,
            ttl,
            certificates: self.certificates.clone(),
            withdrawals: self.withdrawals.clone(),
            aux_data_hash: self.aux_data_hash,
        }
    }
}

// ---------------------------------------------------------------------------
// Accumulator
// ---------------------------------------------------------------------------

/// Mutable state threaded through the per-operation handlers.
#[derive(Default)]
struct Accumulator {
    draft: LedgerDraft,
    seen_signers: HashSet<String>,
    seen_withdrawal_accounts: HashSet<String>,
    input_sum: i128,
    output_sum: i128,
    withdrawal_sum: i128,
    key_registrations: u64,
    key_deregistrations: u64,
    pool_registrations: u64,
}

impl Accumulator {
    fn add_signer(&mut self, address: String) {
        if self.seen_signers.insert(address.clone()) {
            self.draft.required_signers.push(address);
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Convert an operation list into a ledger draft.
///
/// Fails fast on the first invalid operation; nothing is silently dropped
/// or defaulted.
pub fn operations_to_ledger(
    operations: &[Operation],
    network: Network,
    deposits: &DepositParameters,
) -> Result<LedgerDraft, ConstructionError> {
    let mut acc = Accumulator::default();

    for op in operations {
        let index = op.index();
        let kind = op.kind().ok_or_else(|| {
            ConstructionError::UnsupportedOperationType {
                kind: op.kind.clone(),
                index,
            }
        })?;

        match kind {
            OperationKind::Input => parse_input(&mut acc, op)?,
            OperationKind::Output => parse_output(&mut acc, op)?,
            OperationKind::StakeKeyRegistration => parse_stake_key_registration(&mut acc, op)?,
            OperationKind::StakeDelegation => parse_stake_delegation(&mut acc, op, network)?,
            OperationKind::Withdrawal => parse_withdrawal(&mut acc, op, network)?,
            OperationKind::StakeKeyDeregistration => {
                parse_stake_key_deregistration(&mut acc, op, network)?
            }
            OperationKind::PoolRegistration => parse_pool_registration(&mut acc, op)?,
            OperationKind::PoolRegistrationWithCert => {
                parse_pool_registration_with_cert(&mut acc, op, network)?
            }
            OperationKind::PoolRetirement => parse_pool_retirement(&mut acc, op)?,
            OperationKind::VoteRegistration => parse_vote_registration(&mut acc, op)?,
        }
    }

    let refunds = i128::from(acc.key_deregistrations) * i128::from(deposits.key_deposit);
    let key_deposits = i128::from(acc.key_registrations) * i128::from(deposits.key_deposit);
    let pool_deposits = i128::from(acc.pool_registrations) * i128::from(deposits.pool_deposit);

    // Inputs and withdrawals arrive negative; flip them into the credit
    // column. Refunds credit, deposits debit.
    let residual = -acc.input_sum - acc.withdrawal_sum + refunds
        - acc.output_sum
        - key_deposits
        - pool_deposits;

    if residual < 0 {
        return Err(ConstructionError::InsufficientFunds {
            shortfall: residual.unsigned_abs() as u64,
        });
    }
    acc.draft.fee = residual as u64;

    debug!(
        inputs = acc.draft.inputs.len(),
        outputs = acc.draft.outputs.len(),
        certificates = acc.draft.certificates.len(),
        fee = acc.draft.fee,
        "operations converted to ledger draft"
    );
    Ok(acc.draft)
}

// ---------------------------------------------------------------------------
// Per-kind handlers
// ---------------------------------------------------------------------------

fn parse_input(acc: &mut Accumulator, op: &Operation) -> Result<(), ConstructionError> {
    let index = op.index();
    let address = required_address(op)?;
    let value = required_amount(op, Sign::Negative)?;

    let coin = op
        .coin_change
        .as_ref()
        .ok_or(ConstructionError::MissingCoinIdentifier { index })?;
    let (hash_hex, coin_index) = coin.coin_identifier.split().ok_or_else(|| {
        ConstructionError::InvalidAmount {
            index,
            reason: format!(
                "coin identifier '{}' is not <tx_hash>:<index>",
                coin.coin_identifier.identifier
            ),
        }
    })?;
    let hash_bytes = hex::decode(hash_hex)
        .ok()
        .and_then(|b| <[u8; 32]>::try_from(b).ok())
        .ok_or_else(|| ConstructionError::InvalidAmount {
            index,
            reason: "coin identifier hash is not 32 hex-encoded bytes".into(),
        })?;

    // The address must parse (any era) even though the body omits it; a
    // bad address here would only surface at witness time otherwise.
    address_to_bytes(&address).map_err(ConstructionError::from)?;

    acc.draft.inputs.push(TransactionInput {
        tx_hash: hash_bytes,
        index: coin_index,
    });
    acc.input_sum += value;
    acc.add_signer(address);
    Ok(())
}

fn parse_output(acc: &mut Accumulator, op: &Operation) -> Result<(), ConstructionError> {
    let index = op.index();
    let address = required_address(op)?;
    let value = required_amount(op, Sign::Positive)?;

    let mut assets = MultiAsset::new();
    if let Some(bundle) = op.metadata.as_ref().and_then(|m| m.token_bundle.as_ref()) {
        add_token_bundle(&mut assets, bundle, index)?;
    }

    acc.draft.outputs.push(TransactionOutput {
        address: address_to_bytes(&address)?,
        coin: u64::try_from(value).map_err(|_| ConstructionError::InvalidAmount {
            index,
            reason: "output value exceeds the maximum lovelace amount".into(),
        })?,
        assets,
    });
    acc.output_sum += value;
    Ok(())
}

fn add_token_bundle(
    assets: &mut MultiAsset,
    bundle: &[TokenBundleItem],
    index: u64,
) -> Result<(), ConstructionError> {
    for item in bundle {
        let policy = hex::decode(&item.policy_id)
            .ok()
            .filter(|_| item.policy_id.len() == POLICY_ID_HEX_LENGTH)
            .and_then(|b| <[u8; 28]>::try_from(b).ok())
            .ok_or_else(|| ConstructionError::InvalidAmount {
                index,
                reason: format!("'{}' is not a valid policy id", item.policy_id),
            })?;
        for token in &item.tokens {
            let quantity = token
                .value_i128()
                .and_then(|v| u64::try_from(v).ok())
                .ok_or_else(|| ConstructionError::InvalidAmount {
                    index,
                    reason: format!(
                        "asset quantity '{}' is not a non-negative integer",
                        token.value
                    ),
                })?;
            let name = hex::decode(&token.currency.symbol).map_err(|_| {
                ConstructionError::InvalidAmount {
                    index,
                    reason: format!(
                        "asset name '{}' is not hex-encoded",
                        token.currency.symbol
                    ),
                }
            })?;
            assets.add(policy, name, quantity);
        }
    }
    Ok(())
}

fn parse_stake_key_registration(
    acc: &mut Accumulator,
    op: &Operation,
) -> Result<(), ConstructionError> {
    let credential = staking_credential(op)?;
    acc.draft
        .certificates
        .push(Certificate::StakeRegistration(credential));
    acc.key_registrations += 1;
    Ok(())
}

fn parse_stake_delegation(
    acc: &mut Accumulator,
    op: &Operation,
    network: Network,
) -> Result<(), ConstructionError> {
    let index = op.index();
    let key = staking_key(op)?;
    let pool_hex = op
        .metadata
        .as_ref()
        .and_then(|m| m.pool_key_hash.as_deref())
        .ok_or(ConstructionError::MissingPoolKeyHash { index })?;
    let pool_key_hash = credential::parse_pool_key_hash(pool_hex)?;

    acc.draft.certificates.push(Certificate::StakeDelegation {
        credential: StakeCredential::from_staking_key(&key),
        pool_key_hash,
    });
    acc.add_signer(reward_address_from_key(&key, network));
    Ok(())
}

fn parse_stake_key_deregistration(
    acc: &mut Accumulator,
    op: &Operation,
    network: Network,
) -> Result<(), ConstructionError> {
    let key = staking_key(op)?;
    acc.draft
        .certificates
        .push(Certificate::StakeDeregistration(
            StakeCredential::from_staking_key(&key),
        ));
    acc.add_signer(reward_address_from_key(&key, network));
    acc.key_deregistrations += 1;
    Ok(())
}

fn parse_withdrawal(
    acc: &mut Accumulator,
    op: &Operation,
    network: Network,
) -> Result<(), ConstructionError> {
    let index = op.index();
    let value = required_amount(op, Sign::Negative)?;

    // Prefer the staking credential; fall back to a reward address in the
    // account field.
    let reward_address = if let Some(key) = optional_staking_key(op)? {
        reward_address_from_key(&key, network)
    } else if let Some(account) = &op.account {
        account.address.clone()
    } else {
        return Err(ConstructionError::MissingStakingCredential { index });
    };

    if !acc
        .seen_withdrawal_accounts
        .insert(reward_address.clone())
    {
        return Err(ConstructionError::DuplicateWithdrawal {
            address: reward_address,
        });
    }

    acc.draft.withdrawals.push(Withdrawal {
        reward_account: reward_account_bytes(&reward_address)?,
        amount: value.unsigned_abs() as u64,
    });
    acc.withdrawal_sum += value;
    acc.add_signer(reward_address);
    Ok(())
}

fn parse_pool_registration(acc: &mut Accumulator, op: &Operation) -> Result<(), ConstructionError> {
    let index = op.index();
    let operator_str = required_address(op)?;
    let operator = credential::parse_pool_key_hash(&operator_str)?;
    let params = op
        .metadata
        .as_ref()
        .and_then(|m| m.pool_registration_params.as_ref())
        .ok_or(ConstructionError::MissingPoolParameters { index })?;

    let pool_params = build_pool_params(operator, params, index)?;

    // Everyone with skin in the game signs: each owner, the reward
    // account, and the cold key.
    for owner in &params.pool_owners {
        acc.add_signer(owner.clone());
    }
    acc.add_signer(params.reward_address.clone());
    acc.add_signer(operator_str);

    acc.draft
        .certificates
        .push(Certificate::PoolRegistration(pool_params));
    acc.pool_registrations += 1;
    Ok(())
}

fn build_pool_params(
    operator: [u8; 28],
    params: &PoolRegistrationParams,
    index: u64,
) -> Result<PoolParams, ConstructionError> {
    let invalid = |reason: String| ConstructionError::InvalidAmount { index, reason };

    let vrf_key_hash = hex::decode(&params.vrf_key_hash)
        .ok()
        .and_then(|b| <[u8; 32]>::try_from(b).ok())
        .ok_or_else(|| invalid("vrf key hash must be 32 hex-encoded bytes".into()))?;
    let pledge = params
        .pledge
        .parse::<u64>()
        .map_err(|_| invalid(format!("pledge '{}' is not a valid amount", params.pledge)))?;
    let cost = params
        .cost
        .parse::<u64>()
        .map_err(|_| invalid(format!("cost '{}' is not a valid amount", params.cost)))?;
    let (margin_numerator, margin_denominator) = match &params.margin {
        Some(margin) => (
            margin
                .numerator
                .parse::<u64>()
                .map_err(|_| invalid("margin numerator is not an integer".into()))?,
            margin
                .denominator
                .parse::<u64>()
                .map_err(|_| invalid("margin denominator is not an integer".into()))?,
        ),
        None => return Err(invalid("pool margin is required".into())),
    };

    let reward_account = reward_account_bytes(&params.reward_address)?;

    let mut owners = Vec::with_capacity(params.pool_owners.len());
    for owner in &params.pool_owners {
        owners.push(owner_key_hash(owner)?);
    }

    let mut relays = Vec::with_capacity(params.relays.len());
    for relay in &params.relays {
        relays.push(build_relay(relay, index)?);
    }

    let metadata = match &params.pool_metadata {
        Some(meta) => Some(PoolMetadataSpec {
            url: meta.url.clone(),
            hash: hex::decode(&meta.hash)
                .ok()
                .and_then(|b| <[u8; 32]>::try_from(b).ok())
                .ok_or_else(|| invalid("pool metadata hash must be 32 hex-encoded bytes".into()))?,
        }),
        None => None,
    };

    Ok(PoolParams {
        operator,
        vrf_key_hash,
        pledge,
        cost,
        margin_numerator,
        margin_denominator,
        reward_account,
        owners,
        relays,
        metadata,
    })
}

/// A pool owner is identified by the stake credential of their reward
/// address; a bare key hash is accepted as well.
fn owner_key_hash(owner: &str) -> Result<[u8; 28], ConstructionError> {
    if let Ok(hash) = credential::parse_pool_key_hash(owner) {
        return Ok(hash);
    }
    let account = reward_account_bytes(owner)?;
    let mut hash = [0u8; 28];
    hash.copy_from_slice(&account[1..]);
    Ok(hash)
}

fn build_relay(
    relay: &crate::operations::types::Relay,
    index: u64,
) -> Result<RelaySpec, ConstructionError> {
    let invalid = |reason: String| ConstructionError::InvalidAmount { index, reason };

    let port = match &relay.port {
        Some(p) => Some(
            p.parse::<u16>()
                .map_err(|_| invalid(format!("relay port '{p}' is not a valid port")))?,
        ),
        None => None,
    };

    match relay.relay_type.as_str() {
        "single_host_addr" => {
            let ipv4 = match &relay.ipv4 {
                Some(ip) => Some(parse_ipv4(ip).ok_or_else(|| {
                    invalid(format!("'{ip}' is not a valid dotted-quad ipv4 address"))
                })?),
                None => None,
            };
            let ipv6 = match &relay.ipv6 {
                Some(ip) => Some(
                    parse_ipv6(ip)
                        .ok_or_else(|| invalid(format!("'{ip}' is not a valid ipv6 address")))?,
                ),
                None => None,
            };
            Ok(RelaySpec::SingleHostAddr { port, ipv4, ipv6 })
        }
        "single_host_name" => Ok(RelaySpec::SingleHostName {
            port,
            dns_name: relay
                .dns_name
                .clone()
                .ok_or_else(|| invalid("single_host_name relay requires dnsName".into()))?,
        }),
        "multi_host_name" => Ok(RelaySpec::MultiHostName {
            dns_name: relay
                .dns_name
                .clone()
                .ok_or_else(|| invalid("multi_host_name relay requires dnsName".into()))?,
        }),
        other => Err(invalid(format!("'{other}' is not a valid relay type"))),
    }
}

fn parse_ipv4(s: &str) -> Option<[u8; 4]> {
    s.parse::<std::net::Ipv4Addr>().ok().map(|ip| ip.octets())
}

fn parse_ipv6(s: &str) -> Option<[u8; 16]> {
    s.parse::<std::net::Ipv6Addr>().ok().map(|ip| ip.octets())
}

fn parse_pool_registration_with_cert(
    acc: &mut Accumulator,
    op: &Operation,
    network: Network,
) -> Result<(), ConstructionError> {
    let index = op.index();
    let cert_hex = op
        .metadata
        .as_ref()
        .and_then(|m| m.pool_registration_cert.as_deref())
        .ok_or(ConstructionError::MissingPoolParameters { index })?;
    let cert_bytes = hex::decode(cert_hex).map_err(|_| {
        ConstructionError::malformed("pool registration certificate is not hex-encoded")
    })?;
    let certificate = decode_certificate_bytes(&cert_bytes)?;

    let Certificate::PoolRegistration(params) = &certificate else {
        return Err(ConstructionError::malformed(
            "certificate is not a pool registration",
        ));
    };

    // Recover the signer set from the certificate itself.
    for owner in &params.owners {
        acc.add_signer(reward_address_from_key_hash(owner, network));
    }
    acc.add_signer(reward_address_from_account_bytes(&params.reward_account)?);
    let operator = op
        .account
        .as_ref()
        .map(|a| a.address.clone())
        .unwrap_or_else(|| hex::encode(params.operator));
    acc.add_signer(operator);

    acc.draft.certificates.push(certificate);
    acc.pool_registrations += 1;
    Ok(())
}

fn parse_pool_retirement(acc: &mut Accumulator, op: &Operation) -> Result<(), ConstructionError> {
    let index = op.index();
    let operator_str = required_address(op)?;
    let pool_key_hash = credential::parse_pool_key_hash(&operator_str)?;
    let epoch = op
        .metadata
        .as_ref()
        .and_then(|m| m.epoch)
        .ok_or(ConstructionError::MissingRetirementEpoch { index })?;

    acc.draft.certificates.push(Certificate::PoolRetirement {
        pool_key_hash,
        epoch,
    });
    acc.add_signer(operator_str);
    Ok(())
}

fn parse_vote_registration(acc: &mut Accumulator, op: &Operation) -> Result<(), ConstructionError> {
    let index = op.index();
    if acc.draft.aux_metadata.is_some() {
        return Err(ConstructionError::DuplicateVoteRegistration);
    }
    let meta = op
        .metadata
        .as_ref()
        .and_then(|m| m.vote_registration_metadata.as_ref())
        .ok_or_else(|| ConstructionError::InvalidVoteRegistration {
            index,
            reason: "voteRegistrationMetadata is required".into(),
        })?;

    let (bytes, hash) = build_vote_registration_aux(meta, index)?;
    acc.draft.aux_metadata = Some(bytes);
    acc.draft.aux_data_hash = Some(hash);
    Ok(())
}

// ---------------------------------------------------------------------------
// Field extraction helpers
// ---------------------------------------------------------------------------

enum Sign {
    Positive,
    Negative,
}

fn required_address(op: &Operation) -> Result<String, ConstructionError> {
    op.account
        .as_ref()
        .map(|a| a.address.clone())
        .filter(|a| !a.is_empty())
        .ok_or_else(|| {
            ConstructionError::from(AddressError::Unparseable {
                address: format!("<missing account at operation index {}>", op.index()),
            })
        })
}

fn required_amount(op: &Operation, sign: Sign) -> Result<i128, ConstructionError> {
    let index = op.index();
    let amount = op
        .amount
        .as_ref()
        .ok_or_else(|| ConstructionError::InvalidAmount {
            index,
            reason: "amount is required".into(),
        })?;
    let value = amount
        .value_i128()
        .ok_or_else(|| ConstructionError::InvalidAmount {
            index,
            reason: format!("'{}' is not a valid integer amount", amount.value),
        })?;
    match sign {
        Sign::Positive if value <= 0 => Err(ConstructionError::InvalidAmount {
            index,
            reason: format!("expected a positive amount, got {value}"),
        }),
        Sign::Negative if value >= 0 => Err(ConstructionError::InvalidAmount {
            index,
            reason: format!("expected a negative amount, got {value}"),
        }),
        _ => Ok(value),
    }
}

fn staking_key(op: &Operation) -> Result<VerificationKey, ConstructionError> {
    optional_staking_key(op)?.ok_or(ConstructionError::MissingStakingCredential {
        index: op.index(),
    })
}

fn optional_staking_key(op: &Operation) -> Result<Option<VerificationKey>, ConstructionError> {
    let Some(key) = op.metadata.as_ref().and_then(|m| m.staking_credential.as_ref()) else {
        return Ok(None);
    };
    parse_public_key(key).map(Some)
}

fn parse_public_key(key: &PublicKey) -> Result<VerificationKey, ConstructionError> {
    VerificationKey::from_hex(&key.hex_bytes).map_err(|e| {
        ConstructionError::from(AddressError::InvalidStakingKey {
            reason: e.to_string(),
        })
    })
}

fn staking_credential(op: &Operation) -> Result<StakeCredential, ConstructionError> {
    Ok(StakeCredential::from_staking_key(&staking_key(op)?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
