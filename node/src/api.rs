//! # Rosetta Construction API
//!
//! Builds the axum router that exposes the gateway's HTTP interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                        | Description                                |
//! |--------|-----------------------------|--------------------------------------------|
//! | GET    | `/health`                   | Liveness probe                             |
//! | GET    | `/status`                   | Gateway status summary                     |
//! | POST   | `/construction/preprocess`  | Options for the metadata call              |
//! | POST   | `/construction/metadata`    | TTL, protocol parameters, suggested fee    |
//! | POST   | `/construction/payloads`    | Unsigned transaction + signing payloads    |
//! | POST   | `/construction/combine`     | Merge signatures into a signed transaction |
//! | POST   | `/construction/parse`       | Decode back into operations + signers      |
//! | POST   | `/construction/hash`        | Transaction hash of a signed transaction   |
//! | POST   | `/construction/submit`      | Forward signed bytes to the node           |
//!
//! Phase order is Preprocess → Metadata → Payloads → (external signing) →
//! Combine → Hash/Submit, with Parse callable after Payloads or Combine.
//! Every call is stateless and independently idempotent: the client
//! carries all cross-phase state in the hex envelopes.

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use meridian_protocol::config::{DepositParameters, Network, ProtocolParameters};
use meridian_protocol::crypto::hash::blake2b_256;
use meridian_protocol::error::ConstructionError;
use meridian_protocol::operations::codec::operations_to_ledger;
use meridian_protocol::operations::types::{
    AccountIdentifier, Amount, Operation, Signature, SigningPayload,
};
use meridian_protocol::transaction::envelope::{
    extract_transaction_if_needed, SignedEnvelope, UnsignedTransaction,
};
use meridian_protocol::transaction::fees::{
    adjust_size_for_ttl, calculate_ttl, estimate_size, min_fee, relative_ttl_or_default,
};
use meridian_protocol::transaction::{assemble, combine, decode_transaction, parse, signing_payloads};

use crate::metrics::SharedMetrics;
use crate::providers::{ChainTipSource, SubmitClient};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The gateway's reported version string.
    pub version: String,
    /// The single network this instance serves.
    pub network: Network,
    /// Offline mode: no chain tip, no submit.
    pub offline: bool,
    /// Protocol parameters (fee constants, deposits).
    pub params: ProtocolParameters,
    /// Current-slot source for TTL computation.
    pub tip: Arc<dyn ChainTipSource>,
    /// Client for the node submit API.
    pub submit: Arc<dyn SubmitClient>,
    /// Prometheus metrics handles.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Wire Types
// ---------------------------------------------------------------------------

/// Rosetta network identifier. We serve exactly one network per instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkIdentifier {
    pub blockchain: String,
    pub network: String,
}

/// Options the Preprocess phase hands forward to Metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessOptions {
    pub relative_ttl: u64,
    pub transaction_size: u64,
}

#[derive(Debug, Deserialize)]
pub struct PreprocessRequest {
    pub network_identifier: NetworkIdentifier,
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub metadata: Option<PreprocessMetadata>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PreprocessMetadata {
    #[serde(default)]
    pub relative_ttl: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PreprocessResponse {
    pub options: PreprocessOptions,
}

#[derive(Debug, Deserialize)]
pub struct MetadataRequest {
    pub network_identifier: NetworkIdentifier,
    pub options: PreprocessOptions,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConstructionMetadata {
    pub ttl: u64,
    pub protocol_parameters: ProtocolParameters,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetadataResponse {
    pub metadata: ConstructionMetadata,
    pub suggested_fee: Vec<Amount>,
}

#[derive(Debug, Deserialize)]
pub struct PayloadsRequest {
    pub network_identifier: NetworkIdentifier,
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub metadata: Option<PayloadsMetadata>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PayloadsMetadata {
    #[serde(default)]
    pub ttl: Option<u64>,
    #[serde(default)]
    pub protocol_parameters: Option<ProtocolParameters>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PayloadsResponse {
    /// Hex-encoded unsigned envelope.
    pub unsigned_transaction: String,
    pub payloads: Vec<SigningPayload>,
}

#[derive(Debug, Deserialize)]
pub struct CombineRequest {
    pub network_identifier: NetworkIdentifier,
    pub unsigned_transaction: String,
    pub signatures: Vec<Signature>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CombineResponse {
    /// Hex-encoded signed envelope.
    pub signed_transaction: String,
}

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub network_identifier: NetworkIdentifier,
    pub signed: bool,
    /// Hex-encoded envelope (unsigned or signed).
    pub transaction: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ParseResponse {
    pub operations: Vec<Operation>,
    pub account_identifier_signers: Vec<AccountIdentifier>,
}

#[derive(Debug, Deserialize)]
pub struct SignedTransactionRequest {
    pub network_identifier: NetworkIdentifier,
    pub signed_transaction: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionIdentifier {
    pub hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionIdentifierResponse {
    pub transaction_identifier: TransactionIdentifier,
}

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub network: String,
    pub offline: bool,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A Rosetta error object. Always delivered with HTTP 500, per the spec;
/// the `code` and `retriable` fields carry the real signal.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: u32,
    pub message: String,
    pub retriable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    fn new(code: u32, message: impl Into<String>, retriable: bool) -> Self {
        Self {
            code,
            message: message.into(),
            retriable,
            details: None,
        }
    }

    fn invalid_network(requested: &str, served: Network) -> Self {
        Self::new(
            4002,
            format!("network '{requested}' is not served by this instance (serving {served})"),
            false,
        )
    }

    fn offline_mode(operation: &str) -> Self {
        Self::new(
            4030,
            format!("{operation} is unavailable in offline mode"),
            false,
        )
    }
}

impl From<ConstructionError> for ApiError {
    fn from(e: ConstructionError) -> Self {
        let code = match &e {
            ConstructionError::InvalidAddress(_) => 4015,
            ConstructionError::UnsupportedOperationType { .. } => 4019,
            ConstructionError::InsufficientFunds { .. } => 4010,
            ConstructionError::MalformedTransactionBytes { .. } => 4011,
            ConstructionError::InvalidAmount { .. } => 4012,
            ConstructionError::MissingCoinIdentifier { .. } => 4013,
            ConstructionError::MissingPoolKeyHash { .. } => 4016,
            ConstructionError::MissingPoolParameters { .. } => 4017,
            ConstructionError::MissingStakingCredential { .. } => 4018,
            ConstructionError::SignatureCountMismatch { .. } => 4020,
            ConstructionError::InvalidSignature { .. } => 4021,
            ConstructionError::DuplicateWithdrawal { .. } => 4022,
            ConstructionError::BodyMutationDetected => 4023,
            ConstructionError::ParseIntegrityError { .. } => 4024,
            ConstructionError::MissingRetirementEpoch { .. } => 4025,
            ConstructionError::InvalidVoteRegistration { .. } => 4026,
            ConstructionError::DuplicateVoteRegistration => 4027,
            ConstructionError::UpstreamUnavailable { .. } => 5001,
            ConstructionError::Serialization { .. } => 5000,
        };
        Self::new(code, e.to_string(), e.is_retryable())
    }
}

impl From<crate::providers::ProviderError> for ApiError {
    fn from(e: crate::providers::ProviderError) -> Self {
        ApiError::from(ConstructionError::UpstreamUnavailable {
            reason: e.to_string(),
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
///
/// The returned router is ready to be served on the configured RPC port.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/construction/preprocess", post(preprocess_handler))
        .route("/construction/metadata", post(metadata_handler))
        .route("/construction/payloads", post(payloads_handler))
        .route("/construction/combine", post(combine_handler))
        .route("/construction/parse", post(parse_handler))
        .route("/construction/hash", post(hash_handler))
        .route("/construction/submit", post(submit_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the gateway is alive.
///
/// This is the liveness probe for orchestrators (k8s, systemd, etc.).
/// It intentionally does not check upstream health — that belongs in
/// `/status`.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — returns a gateway status summary.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        version: state.version.clone(),
        network: state.network.to_string(),
        offline: state.offline,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `POST /construction/preprocess` — compute the options Metadata needs.
///
/// Builds the draft at a placeholder ttl of zero and sizes it with dummy
/// witnesses; Metadata later corrects the size for the real ttl width.
async fn preprocess_handler(
    State(state): State<AppState>,
    Json(req): Json<PreprocessRequest>,
) -> Result<Json<PreprocessResponse>, ApiError> {
    let _timer = state.metrics.request_latency_seconds.start_timer();
    check_network(&state, &req.network_identifier)?;

    let relative_ttl =
        relative_ttl_or_default(req.metadata.as_ref().and_then(|m| m.relative_ttl));

    let draft = operations_to_ledger(&req.operations, state.network, &(&state.params).into())
        .map_err(|e| fail(&state, e))?;
    let body = draft.to_body(draft.fee, 0);
    let transaction_size =
        estimate_size(&body, &draft.required_signers, draft.aux_metadata.as_deref())
            .map_err(|e| fail(&state, e))?;

    Ok(Json(PreprocessResponse {
        options: PreprocessOptions {
            relative_ttl,
            transaction_size: transaction_size as u64,
        },
    }))
}

/// `POST /construction/metadata` — resolve the ttl and suggest a fee.
///
/// The only online phase besides Submit: it asks the chain tip for the
/// current slot. In offline mode the tip is fixed at slot zero, so the
/// ttl equals the relative ttl.
async fn metadata_handler(
    State(state): State<AppState>,
    Json(req): Json<MetadataRequest>,
) -> Result<Json<MetadataResponse>, ApiError> {
    let _timer = state.metrics.request_latency_seconds.start_timer();
    check_network(&state, &req.network_identifier)?;

    let current_slot = state.tip.current_slot().await.map_err(|e| {
        state.metrics.request_failures_total.inc();
        ApiError::from(e)
    })?;
    let ttl = calculate_ttl(current_slot, req.options.relative_ttl);

    // Preprocess sized the transaction at ttl 0; correct for the width
    // of the real slot number.
    let updated_size = adjust_size_for_ttl(req.options.transaction_size as usize, 0, ttl);
    let suggested_fee = min_fee(updated_size, &state.params);

    info!(ttl, updated_size, suggested_fee, "metadata resolved");

    Ok(Json(MetadataResponse {
        metadata: ConstructionMetadata {
            ttl,
            protocol_parameters: state.params.clone(),
        },
        suggested_fee: vec![Amount::ada(i128::from(suggested_fee))],
    }))
}

/// `POST /construction/payloads` — build the unsigned transaction and the
/// per-signer payloads.
async fn payloads_handler(
    State(state): State<AppState>,
    Json(req): Json<PayloadsRequest>,
) -> Result<Json<PayloadsResponse>, ApiError> {
    let _timer = state.metrics.request_latency_seconds.start_timer();
    check_network(&state, &req.network_identifier)?;

    let metadata = req.metadata.unwrap_or_default();
    let ttl = metadata.ttl.unwrap_or_else(|| relative_ttl_or_default(None));
    let deposits: DepositParameters = metadata
        .protocol_parameters
        .as_ref()
        .map(|p| p.into())
        .unwrap_or_else(|| (&state.params).into());

    let draft = operations_to_ledger(&req.operations, state.network, &deposits)
        .map_err(|e| fail(&state, e))?;
    let body = draft.to_body(draft.fee, ttl);
    let (body_bytes, hash) = assemble(&body).map_err(|e| fail(&state, e))?;

    let payloads = signing_payloads(&hash, &draft.required_signers, &req.operations);
    let unsigned = UnsignedTransaction {
        hash,
        body: body_bytes,
        signers: draft.required_signers.clone(),
        aux_metadata: draft.aux_metadata.clone(),
        operations: req.operations,
    };
    let envelope = unsigned.to_bytes().map_err(|e| fail(&state, e))?;

    state.metrics.transactions_built_total.inc();
    info!(
        signers = payloads.len(),
        fee = draft.fee,
        ttl,
        "unsigned transaction built"
    );

    Ok(Json(PayloadsResponse {
        unsigned_transaction: hex::encode(envelope),
        payloads,
    }))
}

/// `POST /construction/combine` — merge client signatures into a
/// submittable transaction.
async fn combine_handler(
    State(state): State<AppState>,
    Json(req): Json<CombineRequest>,
) -> Result<Json<CombineResponse>, ApiError> {
    let _timer = state.metrics.request_latency_seconds.start_timer();
    check_network(&state, &req.network_identifier)?;

    let envelope_bytes = decode_hex(&state, &req.unsigned_transaction)?;
    let unsigned =
        UnsignedTransaction::from_bytes(&envelope_bytes).map_err(|e| fail(&state, e))?;
    let transaction = combine(&unsigned, &req.signatures).map_err(|e| fail(&state, e))?;

    let signed = SignedEnvelope {
        transaction,
        operations: unsigned.operations,
    };
    let bytes = signed.to_bytes().map_err(|e| fail(&state, e))?;

    state.metrics.transactions_combined_total.inc();
    Ok(Json(CombineResponse {
        signed_transaction: hex::encode(bytes),
    }))
}

/// `POST /construction/parse` — decode a transaction back into operations
/// (and, when signed, the accounts that witnessed it).
async fn parse_handler(
    State(state): State<AppState>,
    Json(req): Json<ParseRequest>,
) -> Result<Json<ParseResponse>, ApiError> {
    let _timer = state.metrics.request_latency_seconds.start_timer();
    check_network(&state, &req.network_identifier)?;

    let bytes = decode_hex(&state, &req.transaction)?;
    let parsed = parse(&bytes, req.signed, state.network).map_err(|e| fail(&state, e))?;

    state.metrics.transactions_parsed_total.inc();
    Ok(Json(ParseResponse {
        operations: parsed.operations,
        account_identifier_signers: parsed.account_identifier_signers,
    }))
}

/// `POST /construction/hash` — the blake2b-256 body hash of a signed
/// transaction.
async fn hash_handler(
    State(state): State<AppState>,
    Json(req): Json<SignedTransactionRequest>,
) -> Result<Json<TransactionIdentifierResponse>, ApiError> {
    let _timer = state.metrics.request_latency_seconds.start_timer();
    check_network(&state, &req.network_identifier)?;

    let bytes = decode_hex(&state, &req.signed_transaction)?;
    let transaction = extract_transaction_if_needed(&bytes).map_err(|e| fail(&state, e))?;
    let decoded = decode_transaction(&transaction).map_err(|e| fail(&state, e))?;
    let hash = blake2b_256(&decoded.body_bytes);

    Ok(Json(TransactionIdentifierResponse {
        transaction_identifier: TransactionIdentifier {
            hash: hex::encode(hash),
        },
    }))
}

/// `POST /construction/submit` — forward the raw CBOR to the node.
async fn submit_handler(
    State(state): State<AppState>,
    Json(req): Json<SignedTransactionRequest>,
) -> Result<Json<TransactionIdentifierResponse>, ApiError> {
    let _timer = state.metrics.request_latency_seconds.start_timer();
    check_network(&state, &req.network_identifier)?;

    if state.offline {
        state.metrics.request_failures_total.inc();
        return Err(ApiError::offline_mode("submit"));
    }

    let bytes = decode_hex(&state, &req.signed_transaction)?;
    let transaction = extract_transaction_if_needed(&bytes).map_err(|e| fail(&state, e))?;
    let hash = state.submit.submit(&transaction).await.map_err(|e| {
        state.metrics.request_failures_total.inc();
        ApiError::from(e)
    })?;

    state.metrics.transactions_submitted_total.inc();
    info!(hash, "transaction submitted");

    Ok(Json(TransactionIdentifierResponse {
        transaction_identifier: TransactionIdentifier { hash },
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Reject requests for a blockchain or network this instance is not
/// serving. Every construction endpoint runs this first.
fn check_network(state: &AppState, id: &NetworkIdentifier) -> Result<(), ApiError> {
    if id.blockchain != "cardano" {
        return Err(ApiError::invalid_network(&id.blockchain, state.network));
    }
    match Network::from_name(&id.network) {
        Some(network) if network == state.network => Ok(()),
        _ => Err(ApiError::invalid_network(&id.network, state.network)),
    }
}

fn decode_hex(state: &AppState, hex_str: &str) -> Result<Vec<u8>, ApiError> {
    hex::decode(hex_str).map_err(|e| {
        fail(
            state,
            ConstructionError::malformed(format!("transaction is not hex-encoded: {e}")),
        )
    })
}

fn fail(state: &AppState, e: ConstructionError) -> ApiError {
    state.metrics.request_failures_total.inc();
    ApiError::from(e)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
