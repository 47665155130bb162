//! Reverse operation codec: typed ledger constructs → Rosetta operations.
//!
//! The inverse of [`codec`](crate::operations::codec), used by the Parse
//! phase to prove that nothing was lost or mangled between phases. The
//! canonical emission order is fixed — inputs, outputs, certificates,
//! withdrawals, vote metadata — with indexes reassigned sequentially, so
//! the forward and reverse directions agree up to index reassignment.
//!
//! The transaction body does not carry input values, input addresses, or
//! staking public keys (only their hashes), so the envelope's embedded
//! operation list supplies them. A construct with no embedded counterpart
//! still parses; it just comes back with the fields the body alone can
//! prove.

use std::collections::HashMap;

use crate::address::{address_from_bytes, reward_address_from_account_bytes,
    reward_address_from_key_hash,
};
use crate::config::Network;
use crate::crypto::keys::VerificationKey;
use crate::error::ConstructionError;
use crate::operations::types::{
    AccountIdentifier, Amount, CoinAction, CoinChange, CoinIdentifier, Operation,
    OperationIdentifier, OperationKind, OperationMetadata, PoolMargin, PoolMetadata,
    PoolRegistrationParams, PublicKey, Relay, TokenBundleItem,
};
use crate::operations::vote::parse_vote_registration_aux;
use crate::transaction::types::{Certificate, RelaySpec, TransactionBody};

/// Reconstruct the operation list a body was built from.
///
/// `source_operations` is the envelope's embedded list; it enriches the
/// reconstruction but is never trusted for anything the body contradicts.
pub fn ledger_to_operations(
    body: &TransactionBody,
    aux_metadata: Option<&[u8]>,
    source_operations: &[Operation],
    network: Network,
) -> Result<Vec<Operation>, ConstructionError> {
    let sources = SourceIndex::build(source_operations);
    let mut operations = Vec::new();

    // Inputs, in body order.
    for input in &body.inputs {
        let coin_id = CoinIdentifier::new(&hex::encode(input.tx_hash), input.index);
        let operation = match sources.inputs.get(&coin_id.identifier) {
            Some(source) => {
                let mut op = (*source).clone();
                op.operation_identifier = OperationIdentifier::new(0);
                op
            }
            None => {
                let mut op = Operation::new(0, OperationKind::Input);
                op.coin_change = Some(CoinChange {
                    coin_identifier: coin_id,
                    coin_action: CoinAction::Spent,
                });
                op
            }
        };
        operations.push(operation);
    }

    // Outputs, in body order.
    for output in &body.outputs {
        let mut op = Operation::new(0, OperationKind::Output);
        op.account = Some(AccountIdentifier::new(address_from_bytes(&output.address)?));
        op.amount = Some(Amount::ada(i128::from(output.coin)));
        if !output.assets.is_empty() {
            let mut bundle = Vec::new();
            for (policy, names) in output.assets.iter() {
                let policy_hex = hex::encode(policy);
                let tokens = names
                    .iter()
                    .map(|(name, quantity)| {
                        Amount::asset(i128::from(*quantity), &policy_hex, &hex::encode(name))
                    })
                    .collect();
                bundle.push(TokenBundleItem {
                    policy_id: policy_hex,
                    tokens,
                });
            }
            op.metadata = Some(OperationMetadata {
                token_bundle: Some(bundle),
                ..Default::default()
            });
        }
        operations.push(op);
    }

    // Certificates, in body order.
    for certificate in &body.certificates {
        operations.push(certificate_to_operation(certificate, &sources, network)?);
    }

    // Withdrawals, in body order.
    for withdrawal in &body.withdrawals {
        let mut op = Operation::new(0, OperationKind::Withdrawal);
        op.account = Some(AccountIdentifier::new(reward_address_from_account_bytes(
            &withdrawal.reward_account,
        )?));
        op.amount = Some(Amount::ada(-i128::from(withdrawal.amount)));
        let mut hash = [0u8; 28];
        hash.copy_from_slice(&withdrawal.reward_account[1..]);
        if let Some(key) = sources.staking_keys.get(&hash) {
            op.metadata = Some(OperationMetadata {
                staking_credential: Some(key.clone()),
                ..Default::default()
            });
        }
        operations.push(op);
    }

    // Vote registration, from auxiliary metadata.
    if let Some(aux) = aux_metadata {
        let meta = parse_vote_registration_aux(aux)?;
        let mut op = Operation::new(0, OperationKind::VoteRegistration);
        op.metadata = Some(OperationMetadata {
            vote_registration_metadata: Some(meta),
            ..Default::default()
        });
        operations.push(op);
    }

    // Canonical index reassignment.
    for (index, operation) in operations.iter_mut().enumerate() {
        operation.operation_identifier = OperationIdentifier::new(index as u64);
    }
    Ok(operations)
}

fn certificate_to_operation(
    certificate: &Certificate,
    sources: &SourceIndex<'_>,
    network: Network,
) -> Result<Operation, ConstructionError> {
    match certificate {
        Certificate::StakeRegistration(credential) => {
            let mut op = Operation::new(0, OperationKind::StakeKeyRegistration);
            op.account = Some(AccountIdentifier::new(reward_address_from_key_hash(
                &credential.hash,
                network,
            )));
            op.metadata = sources.staking_metadata(&credential.hash);
            Ok(op)
        }
        Certificate::StakeDeregistration(credential) => {
            let mut op = Operation::new(0, OperationKind::StakeKeyDeregistration);
            op.account = Some(AccountIdentifier::new(reward_address_from_key_hash(
                &credential.hash,
                network,
            )));
            op.metadata = sources.staking_metadata(&credential.hash);
            Ok(op)
        }
        Certificate::StakeDelegation {
            credential,
            pool_key_hash,
        } => {
            let mut op = Operation::new(0, OperationKind::StakeDelegation);
            op.account = Some(AccountIdentifier::new(reward_address_from_key_hash(
                &credential.hash,
                network,
            )));
            let mut metadata = sources
                .staking_metadata(&credential.hash)
                .unwrap_or_default();
            metadata.pool_key_hash = Some(hex::encode(pool_key_hash));
            op.metadata = Some(metadata);
            Ok(op)
        }
        Certificate::PoolRegistration(params) => {
            let mut op = Operation::new(0, OperationKind::PoolRegistration);
            op.account = Some(AccountIdentifier::new(hex::encode(params.operator)));
            op.metadata = Some(OperationMetadata {
                pool_registration_params: Some(PoolRegistrationParams {
                    vrf_key_hash: hex::encode(params.vrf_key_hash),
                    reward_address: reward_address_from_account_bytes(&params.reward_account)?,
                    pledge: params.pledge.to_string(),
                    cost: params.cost.to_string(),
                    pool_owners: params
                        .owners
                        .iter()
                        .map(|owner| reward_address_from_key_hash(owner, network))
                        .collect(),
                    relays: params.relays.iter().map(relay_to_dto).collect(),
                    margin: Some(PoolMargin {
                        numerator: params.margin_numerator.to_string(),
                        denominator: params.margin_denominator.to_string(),
                    }),
                    pool_metadata: params.metadata.as_ref().map(|meta| PoolMetadata {
                        url: meta.url.clone(),
                        hash: hex::encode(meta.hash),
                    }),
                }),
                ..Default::default()
            });
            Ok(op)
        }
        Certificate::PoolRetirement {
            pool_key_hash,
            epoch,
        } => {
            let mut op = Operation::new(0, OperationKind::PoolRetirement);
            op.account = Some(AccountIdentifier::new(hex::encode(pool_key_hash)));
            op.metadata = Some(OperationMetadata {
                epoch: Some(*epoch),
                ..Default::default()
            });
            Ok(op)
        }
    }
}

fn relay_to_dto(relay: &RelaySpec) -> Relay {
    match relay {
        RelaySpec::SingleHostAddr { port, ipv4, ipv6 } => Relay {
            relay_type: "single_host_addr".into(),
            ipv4: ipv4.map(|ip| std::net::Ipv4Addr::from(ip).to_string()),
            ipv6: ipv6.map(|ip| std::net::Ipv6Addr::from(ip).to_string()),
            dns_name: None,
            port: port.map(|p| p.to_string()),
        },
        RelaySpec::SingleHostName { port, dns_name } => Relay {
            relay_type: "single_host_name".into(),
            ipv4: None,
            ipv6: None,
            dns_name: Some(dns_name.clone()),
            port: port.map(|p| p.to_string()),
        },
        RelaySpec::MultiHostName { dns_name } => Relay {
            relay_type: "multi_host_name".into(),
            ipv4: None,
            ipv6: None,
            dns_name: Some(dns_name.clone()),
            port: None,
        },
    }
}

// ---------------------------------------------------------------------------
// Source operation index
// ---------------------------------------------------------------------------

/// Lookup tables over the envelope's embedded operations.
struct SourceIndex<'a> {
    /// Input operations keyed by coin identifier.
    inputs: HashMap<String, &'a Operation>,
    /// Staking public keys keyed by their blake2b-224 hash.
    staking_keys: HashMap<[u8; 28], PublicKey>,
}

impl<'a> SourceIndex<'a> {
    fn build(operations: &'a [Operation]) -> Self {
        let mut inputs = HashMap::new();
        let mut staking_keys = HashMap::new();

        for op in operations {
            if op.kind() == Some(OperationKind::Input) {
                if let Some(coin) = &op.coin_change {
                    inputs.insert(coin.coin_identifier.identifier.clone(), op);
                }
            }
            if let Some(key) = op.metadata.as_ref().and_then(|m| m.staking_credential.as_ref())
            {
                if let Ok(parsed) = VerificationKey::from_hex(&key.hex_bytes) {
                    staking_keys.insert(parsed.key_hash(), key.clone());
                }
            }
        }
        Self {
            inputs,
            staking_keys,
        }
    }

    /// Operation metadata carrying the staking key for a credential hash,
    /// when the embedded operations reveal it.
    fn staking_metadata(&self, hash: &[u8; 28]) -> Option<OperationMetadata> {
        self.staking_keys.get(hash).map(|key| OperationMetadata {
            staking_credential: Some(key.clone()),
            ..Default::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DepositParameters;
    use crate::crypto::keys::SignerKeypair;
    use crate::operations::codec::operations_to_ledger;

    fn payment_address(seed: u8) -> String {
        let key = SignerKeypair::from_seed(&[seed; 32]).verification_key();
        let mut bytes = vec![0x61];
        bytes.extend_from_slice(&key.key_hash());
        crate::address::address_from_bytes(&bytes).unwrap()
    }

    fn input_op(index: u64, address: &str, value: i128) -> Operation {
        let mut op = Operation::new(index, OperationKind::Input);
        op.account = Some(AccountIdentifier::new(address));
        op.amount = Some(Amount::ada(value));
        op.coin_change = Some(CoinChange {
            coin_identifier: CoinIdentifier::new(&"9f".repeat(32), index),
            coin_action: CoinAction::Spent,
        });
        op
    }

    fn output_op(index: u64, address: &str, value: i128) -> Operation {
        let mut op = Operation::new(index, OperationKind::Output);
        op.account = Some(AccountIdentifier::new(address));
        op.amount = Some(Amount::ada(value));
        op
    }

    fn roundtrip(ops: Vec<Operation>) -> Vec<Operation> {
        let draft =
            operations_to_ledger(&ops, Network::Mainnet, &DepositParameters::default()).unwrap();
        let body = draft.to_body(draft.fee, 1000);
        ledger_to_operations(&body, draft.aux_metadata.as_deref(), &ops, Network::Mainnet)
            .unwrap()
    }

    #[test]
    fn simple_payment_roundtrips() {
        let ops = vec![
            input_op(0, &payment_address(1), -5_000_000),
            output_op(1, &payment_address(2), 4_775_000),
        ];
        let parsed = roundtrip(ops.clone());
        assert_eq!(parsed, ops);
    }

    #[test]
    fn indexes_are_reassigned_canonically() {
        // Source list with output before input; the body orders inputs
        // first, so indexes must come back renumbered.
        let ops = vec![
            output_op(0, &payment_address(2), 4_000_000),
            input_op(1, &payment_address(1), -5_000_000),
        ];
        let parsed = roundtrip(ops);
        assert_eq!(parsed[0].kind(), Some(OperationKind::Input));
        assert_eq!(parsed[0].index(), 0);
        assert_eq!(parsed[1].kind(), Some(OperationKind::Output));
        assert_eq!(parsed[1].index(), 1);
    }

    #[test]
    fn delegation_roundtrips_with_staking_key() {
        let stake = SignerKeypair::from_seed(&[9u8; 32]).verification_key();
        let mut deleg = Operation::new(1, OperationKind::StakeDelegation);
        deleg.metadata = Some(OperationMetadata {
            staking_credential: Some(PublicKey::new(stake.to_hex())),
            pool_key_hash: Some("cd".repeat(28)),
            ..Default::default()
        });
        let ops = vec![
            input_op(0, &payment_address(1), -2_000_000),
            deleg,
            output_op(2, &payment_address(2), 1_800_000),
        ];
        let parsed = roundtrip(ops);

        let delegation = &parsed[2];
        assert_eq!(delegation.kind(), Some(OperationKind::StakeDelegation));
        let meta = delegation.metadata.as_ref().unwrap();
        assert_eq!(
            meta.staking_credential.as_ref().unwrap().hex_bytes,
            stake.to_hex()
        );
        assert_eq!(meta.pool_key_hash.as_deref(), Some(&*"cd".repeat(28)));
        assert!(delegation
            .account
            .as_ref()
            .unwrap()
            .address
            .starts_with("stake1"));
    }

    #[test]
    fn withdrawal_roundtrips_with_negative_amount() {
        let stake = SignerKeypair::from_seed(&[9u8; 32]).verification_key();
        let mut withdrawal = Operation::new(1, OperationKind::Withdrawal);
        withdrawal.metadata = Some(OperationMetadata {
            staking_credential: Some(PublicKey::new(stake.to_hex())),
            ..Default::default()
        });
        withdrawal.amount = Some(Amount::ada(-600_000));
        let ops = vec![
            input_op(0, &payment_address(1), -1_000_000),
            withdrawal,
            output_op(2, &payment_address(2), 1_400_000),
        ];
        let parsed = roundtrip(ops);

        let parsed_withdrawal = &parsed[2];
        assert_eq!(parsed_withdrawal.kind(), Some(OperationKind::Withdrawal));
        assert_eq!(
            parsed_withdrawal.amount.as_ref().unwrap().value,
            "-600000"
        );
        assert_eq!(
            parsed_withdrawal
                .metadata
                .as_ref()
                .unwrap()
                .staking_credential
                .as_ref()
                .unwrap()
                .hex_bytes,
            stake.to_hex()
        );
    }

    #[test]
    fn multi_asset_output_comes_back_canonically_sorted() {
        let policy_a = "aa".repeat(28);
        let policy_b = "bb".repeat(28);
        let mut output = output_op(1, &payment_address(2), 2_000_000);
        // Deliberately out of order.
        output.metadata = Some(OperationMetadata {
            token_bundle: Some(vec![
                TokenBundleItem {
                    policy_id: policy_b.clone(),
                    tokens: vec![Amount::asset(1, &policy_b, "7a")],
                },
                TokenBundleItem {
                    policy_id: policy_a.clone(),
                    tokens: vec![Amount::asset(2, &policy_a, "61")],
                },
            ]),
            ..Default::default()
        });
        let ops = vec![input_op(0, &payment_address(1), -3_000_000), output];
        let parsed = roundtrip(ops);

        let bundle = parsed[1]
            .metadata
            .as_ref()
            .unwrap()
            .token_bundle
            .as_ref()
            .unwrap();
        assert_eq!(bundle[0].policy_id, policy_a);
        assert_eq!(bundle[1].policy_id, policy_b);
    }

    #[test]
    fn pool_retirement_roundtrips() {
        let mut retirement = Operation::new(1, OperationKind::PoolRetirement);
        retirement.account = Some(AccountIdentifier::new("ab".repeat(28)));
        retirement.metadata = Some(OperationMetadata {
            epoch: Some(470),
            ..Default::default()
        });
        let ops = vec![
            input_op(0, &payment_address(1), -2_000_000),
            retirement,
            output_op(2, &payment_address(2), 1_800_000),
        ];
        let parsed = roundtrip(ops);

        let parsed_retirement = &parsed[2];
        assert_eq!(
            parsed_retirement.kind(),
            Some(OperationKind::PoolRetirement)
        );
        assert_eq!(
            parsed_retirement.account.as_ref().unwrap().address,
            "ab".repeat(28)
        );
        assert_eq!(
            parsed_retirement.metadata.as_ref().unwrap().epoch,
            Some(470)
        );
    }

    #[test]
    fn unknown_inputs_fall_back_to_coin_reference() {
        use crate::transaction::types::{TransactionBody, TransactionInput};
        let mut body = TransactionBody::empty();
        body.inputs.push(TransactionInput {
            tx_hash: [0x77; 32],
            index: 2,
        });
        let parsed = ledger_to_operations(&body, None, &[], Network::Mainnet).unwrap();
        assert_eq!(parsed.len(), 1);
        assert!(parsed[0].account.is_none());
        assert_eq!(
            parsed[0]
                .coin_change
                .as_ref()
                .unwrap()
                .coin_identifier
                .identifier,
            format!("{}:2", "77".repeat(32))
        );
    }
}
