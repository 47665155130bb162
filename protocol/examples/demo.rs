//! Interactive CLI demo of the full construction lifecycle.
//!
//! Walks through wallet key generation, operation building, fee
//! estimation with dummy witnesses, payload generation, external signing,
//! combination, and round-trip parse verification. The output uses ANSI
//! escape codes for colored, storytelling-style terminal rendering.
//!
//! Run with:
//!   cargo run --example demo --release

use std::time::Instant;

use meridian_protocol::config::{DepositParameters, Network, ProtocolParameters};
use meridian_protocol::crypto::hash::blake2b_256;
use meridian_protocol::crypto::keys::SignerKeypair;
use meridian_protocol::operations::codec::operations_to_ledger;
use meridian_protocol::operations::types::{
    AccountIdentifier, Amount, CoinAction, CoinChange, CoinIdentifier, Operation, OperationKind,
    PublicKey, Signature, SignatureType,
};
use meridian_protocol::transaction::envelope::{SignedEnvelope, UnsignedTransaction};
use meridian_protocol::transaction::fees::{estimate_size, min_fee};
use meridian_protocol::transaction::{
    assemble, combine, decode_transaction, parse, signing_payloads,
};

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const BLUE: &str = "\x1b[34m";
const MAGENTA: &str = "\x1b[35m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

const BG_BLUE: &str = "\x1b[44m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn banner() {
    println!();
    println!(
        "{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}    MERIDIAN  --  Rosetta Construction Lifecycle Demo               {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}    Version 0.1.0  |  Ed25519 + blake2b + canonical CBOR            {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}                                                                    {RESET}"
    );
    println!();
}

fn section(num: u32, title: &str) {
    println!();
    println!(
        "{BOLD}{CYAN}===[{YELLOW} Phase {num} {CYAN}]=============================================================={RESET}"
    );
    println!("{BOLD}{WHITE}  {title}{RESET}");
    println!(
        "{CYAN}------------------------------------------------------------------------{RESET}"
    );
}

fn subsection(text: &str) {
    println!("{DIM}{CYAN}  >> {text}{RESET}");
}

fn success(text: &str) {
    println!("{GREEN}  [OK] {text}{RESET}");
}

fn info(label: &str, value: &str) {
    println!("{WHITE}  {BOLD}{label}:{RESET} {YELLOW}{value}{RESET}");
}

fn timing(label: &str, elapsed: std::time::Duration) {
    let ms = elapsed.as_secs_f64() * 1000.0;
    println!("{DIM}{MAGENTA}  [{label}: {ms:.2} ms]{RESET}");
}

fn address_display(name: &str, addr: &str, color: &str) {
    let prefix = &addr[..9.min(addr.len())];
    let suffix = &addr[addr.len().saturating_sub(8)..];
    println!(
        "  {color}{BOLD}{name}{RESET}  {DIM}{prefix}...{suffix}{RESET}  {DIM}({} chars){RESET}",
        addr.len()
    );
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() {
    let demo_start = Instant::now();

    banner();

    // -----------------------------------------------------------------------
    // Phase 1: Wallet-side key material
    // -----------------------------------------------------------------------

    section(1, "Wallet Key Generation");
    subsection("Generating Ed25519 keypairs and deriving enterprise addresses...");

    let t = Instant::now();
    let sender = SignerKeypair::generate();
    let receiver = SignerKeypair::generate();
    timing("keygen x2", t.elapsed());

    let to_address = |kp: &SignerKeypair| {
        let mut bytes = vec![0x61]; // enterprise, mainnet
        bytes.extend_from_slice(&kp.verification_key().key_hash());
        meridian_protocol::address::address_from_bytes(&bytes).expect("derived address is valid")
    };
    let sender_addr = to_address(&sender);
    let receiver_addr = to_address(&receiver);

    println!();
    address_display("Sender   ", &sender_addr, BLUE);
    address_display("Receiver ", &receiver_addr, GREEN);
    println!();
    success("Addresses derived: blake2b-224 key hashes behind Bech32");

    // -----------------------------------------------------------------------
    // Phase 2: Operations + preprocess
    // -----------------------------------------------------------------------

    section(2, "Operations -> Ledger Draft (Preprocess)");
    subsection("Describing a 5 ADA payment as Rosetta operations...");

    let mut input = Operation::new(0, OperationKind::Input);
    input.account = Some(AccountIdentifier::new(sender_addr.clone()));
    input.amount = Some(Amount::ada(-5_000_000));
    input.coin_change = Some(CoinChange {
        coin_identifier: CoinIdentifier::new(&"4e".repeat(32), 0),
        coin_action: CoinAction::Spent,
    });
    let mut output = Operation::new(1, OperationKind::Output);
    output.account = Some(AccountIdentifier::new(receiver_addr.clone()));
    output.amount = Some(Amount::ada(4_775_000));
    let operations = vec![input, output];

    let t = Instant::now();
    let draft = operations_to_ledger(
        &operations,
        Network::Mainnet,
        &DepositParameters::default(),
    )
    .expect("draft");
    timing("operation codec", t.elapsed());

    info("Implicit fee (residual)", &format!("{} lovelace", draft.fee));
    info(
        "Required signers",
        &draft.required_signers.len().to_string(),
    );

    let params = ProtocolParameters::default();
    let size = estimate_size(&draft.to_body(draft.fee, 0), &draft.required_signers, None)
        .expect("size estimation");
    info("Dummy-witness size", &format!("{size} bytes"));
    info(
        "Suggested fee (linear)",
        &format!("{} lovelace", min_fee(size, &params)),
    );
    success("Draft built; nothing has touched the network");

    // -----------------------------------------------------------------------
    // Phase 3: Payloads
    // -----------------------------------------------------------------------

    section(3, "Canonical Assembly + Signing Payloads");
    subsection("Serializing the body and hashing it with blake2b-256...");

    let ttl = 90_000_000u64;
    let t = Instant::now();
    let body = draft.to_body(draft.fee, ttl);
    let (body_bytes, hash) = assemble(&body).expect("assembly");
    timing("assemble + hash", t.elapsed());

    info("Body size", &format!("{} bytes", body_bytes.len()));
    info("Body hash", &hex::encode(hash)[..32]);

    let unsigned = UnsignedTransaction {
        hash,
        body: body_bytes,
        signers: draft.required_signers.clone(),
        aux_metadata: None,
        operations: operations.clone(),
    };
    let payloads = signing_payloads(&hash, &draft.required_signers, &operations);
    info("Signing payloads", &payloads.len().to_string());
    success("The client now carries all state; the server keeps nothing");

    // -----------------------------------------------------------------------
    // Phase 4: External signing + combine
    // -----------------------------------------------------------------------

    section(4, "External Signing + Combine");
    subsection("The wallet signs the 32-byte hash and returns the signature...");

    let t = Instant::now();
    let signature = Signature {
        signing_payload: payloads[0].clone(),
        public_key: PublicKey::new(sender.verification_key().to_hex()),
        signature_type: SignatureType::Ed25519,
        hex_bytes: sender.sign(&hash).to_hex(),
    };
    timing("ed25519 sign", t.elapsed());

    let t = Instant::now();
    let tx = combine(&unsigned, &[signature]).expect("combine");
    timing("verify + witness assembly", t.elapsed());

    info("Signed size", &format!("{} bytes", tx.len()));
    success("Witness set assembled in required-signer order, body untouched");

    // -----------------------------------------------------------------------
    // Phase 5: Hash + parse verification
    // -----------------------------------------------------------------------

    section(5, "Hash + Round-Trip Parse");
    subsection("Re-deriving the transaction identifier and parsing back...");

    let decoded = decode_transaction(&tx).expect("decode");
    assert_eq!(blake2b_256(&decoded.body_bytes), hash);
    info("Transaction id", &hex::encode(hash)[..32]);

    let wire = SignedEnvelope {
        transaction: tx,
        operations: operations.clone(),
    }
    .to_bytes()
    .expect("envelope");

    let t = Instant::now();
    let parsed = parse(&wire, true, Network::Mainnet).expect("parse");
    timing("parse + integrity check", t.elapsed());

    assert_eq!(parsed.operations, operations);
    assert_eq!(parsed.account_identifier_signers.len(), 1);
    success("Parsed operations match the originals; signer recovered from witness");

    println!();
    println!(
        "  {BOLD}{GREEN}Total demo time: {:.2}s{RESET}",
        demo_start.elapsed().as_secs_f64()
    );
    println!();
}
