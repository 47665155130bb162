// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # MERIDIAN Protocol — Construction Engine
//!
//! The core library behind MERIDIAN, our Rosetta Construction gateway for
//! Cardano. Wallets, exchanges, and hardware signers speak the
//! blockchain-neutral Rosetta dialect; this crate does the translation
//! into Cardano's canonical CBOR — and back — without ever holding state,
//! keys, or opinions between requests.
//!
//! The hard problem is not any single step, it is determinism: a
//! transaction body must serialize to the exact same bytes here, in every
//! other conformant implementation, and in the firmware of a hardware
//! wallet, because the blake2b-256 of those bytes is the transaction's
//! identity. Every design decision bends to that.
//!
//! ## Architecture
//!
//! The crate mirrors the actual concerns of the construction flow:
//!
//! - **crypto** — Ed25519 verification and blake2b hashing. Don't roll your own.
//! - **address** — Shelley/Byron address parsing, reward address derivation.
//! - **operations** — The Rosetta operation model and its two-way codec.
//! - **transaction** — Canonical assembly, fees, payloads, combine, parse.
//! - **config** — Protocol constants and network parameters.
//! - **error** — One taxonomy, context-rich, nothing silently defaulted.
//!
//! ## Design Philosophy
//!
//! 1. Byte-exactness over convenience. If a shortcut risks the hash, no.
//! 2. The server carries nothing across phases — the client does.
//! 3. Every public API is documented. Internal shame is documented too.
//! 4. If it touches money, it has tests. Plural.

pub mod address;
pub mod config;
pub mod crypto;
pub mod error;
pub mod operations;
pub mod transaction;
