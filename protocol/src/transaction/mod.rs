//! # Transaction Module
//!
//! Canonical assembly, fee estimation, signing payloads, combination, and
//! round-trip parsing for Cardano transactions. Everything downstream of
//! the operation codec lives here.
//!
//! ## Architecture
//!
//! ```text
//! types.rs     — Typed ledger constructs (inputs, outputs, certificates, …)
//! assembler.rs — Canonical CBOR encoding + blake2b-256 transaction hash
//! decode.rs    — Strict inverse of the assembler
//! fees.rs      — Dummy-signature size estimation and the linear fee formula
//! payloads.rs  — One signing payload per required signer
//! envelope.rs  — Client-carried state between phases (the server holds none)
//! combine.rs   — Witness assembly over an untouched body
//! parser.rs    — Parse + integrity verification (re-assemble and compare)
//! ```
//!
//! ## Phase Flow
//!
//! ```text
//! Preprocess -> Metadata -> Payloads -> [external signing] -> Combine -> Hash -> Submit
//!                                                  \-> Parse (after Payloads or Combine)
//! ```
//!
//! Every function in this module is a pure, synchronous computation over
//! immutable inputs. The two phases that need the outside world
//! (Preprocess and Metadata consult protocol parameters and the chain
//! tip) get those values handed in by the service layer; nothing here
//! does I/O, retries, or holds state across calls.
//!
//! ## Design Decisions
//!
//! - Canonical encoding is enforced by construction: fixed body-map key
//!   order, definite lengths, minimal integers, byte-sorted asset and
//!   withdrawal maps. Determinism is the load-bearing property — the
//!   body hash is the transaction identity everyone else must reproduce.
//! - Combine splices the body bytes verbatim and re-hashes them first; a
//!   body that no longer matches its hash is rejected, not repaired.
//! - Fees are estimated against a transaction fully dressed with dummy
//!   witnesses of protocol-exact widths, because the fee formula is
//!   linear in the real serialized size.

pub mod assembler;
pub mod combine;
pub mod decode;
pub mod envelope;
pub mod fees;
pub mod parser;
pub mod payloads;
pub mod types;

pub use assembler::{assemble, encode_transaction};
pub use combine::combine;
pub use decode::{decode_body, decode_transaction};
pub use envelope::{extract_transaction_if_needed, SignedEnvelope, UnsignedTransaction};
pub use fees::{calculate_ttl, estimate, min_fee};
pub use parser::{parse, ParsedTransaction};
pub use payloads::signing_payloads;
pub use types::{Certificate, TransactionBody, TransactionInput, TransactionOutput, WitnessSet};
