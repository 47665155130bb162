//! # Operations Module
//!
//! The Rosetta operation model and its two-way codec. Clients describe a
//! transaction as a flat, ordered list of [`Operation`]s — debits,
//! credits, stake certificates, pool registrations, withdrawals, vote
//! registrations — and this module translates that list into typed ledger
//! constructs and back.
//!
//! ## Architecture
//!
//! ```text
//! types.rs — Operation, Amount, Currency, and the rest of the wire DTOs
//! codec.rs — forward direction: operations → LedgerDraft (+ fee residual)
//! parse.rs — reverse direction: decoded body → operations
//! vote.rs  — CIP-15 vote registration auxiliary metadata
//! ```
//!
//! ## Design Decisions
//!
//! - [`OperationKind`] is a closed enum matched exhaustively in the codec.
//!   A new operation kind is a compile error until every site handles it —
//!   never a silently ignored default branch.
//! - The two directions are exact inverses up to canonical ordering: the
//!   reverse direction emits inputs → outputs → certificates →
//!   withdrawals → vote metadata with indexes reassigned from zero, which
//!   is precisely the order the forward direction consumes.
//! - The fee is derived, never supplied: it is the ADA residual after
//!   deposits and refunds, and a negative residual is an error.

pub mod codec;
pub mod parse;
pub mod types;
pub mod vote;

pub use codec::{operations_to_ledger, LedgerDraft};
pub use parse::ledger_to_operations;
pub use types::{
    AccountIdentifier, Amount, CoinChange, Currency, Operation, OperationKind, PublicKey,
    Signature, SignatureType, SigningPayload,
};
pub use vote::{build_vote_registration_aux, parse_vote_registration_aux};
