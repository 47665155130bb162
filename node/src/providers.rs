//! External collaborators: chain tip, and the node submit API.
//!
//! The construction engine itself is pure; the only things that ever
//! block are defined here. Every call is bounded by a timeout and
//! surfaced as a retryable upstream error — a slow indexer must never
//! hang a construction request indefinitely.
//!
//! HTTP is done over raw tokio TCP with a hand-rolled HTTP/1.1 exchange.
//! Two endpoints with fixed shapes don't justify an HTTP client
//! dependency; if this grows a third caller, reconsider.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use meridian_protocol::config::{SUBMIT_API_PATH, SUBMIT_SUCCESS_STATUS, TX_HASH_HEX_LENGTH};

/// How long we wait on any upstream before declaring it unavailable.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from external collaborators. All retryable from the client's
/// point of view — the request itself was fine.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream connection failed: {0}")]
    Connect(String),

    #[error("upstream returned an unusable response: {0}")]
    BadResponse(String),
}

// ---------------------------------------------------------------------------
// Chain tip
// ---------------------------------------------------------------------------

/// Source of the current absolute slot, used for TTL computation.
#[async_trait]
pub trait ChainTipSource: Send + Sync {
    async fn current_slot(&self) -> Result<u64, ProviderError>;
}

/// Fixed-slot source for offline deployments.
///
/// With slot zero, the computed TTL equals the relative TTL — the same
/// convention air-gapped signing setups expect.
pub struct FixedSlot(pub u64);

#[async_trait]
impl ChainTipSource for FixedSlot {
    async fn current_slot(&self) -> Result<u64, ProviderError> {
        Ok(self.0)
    }
}

/// Chain tip from an indexer's JSON endpoint (`{"slot": <n>}`).
pub struct HttpChainTip {
    pub url: String,
}

#[async_trait]
impl ChainTipSource for HttpChainTip {
    async fn current_slot(&self) -> Result<u64, ProviderError> {
        let body = tokio::time::timeout(UPSTREAM_TIMEOUT, http_get(&self.url))
            .await
            .map_err(|_| ProviderError::Timeout(UPSTREAM_TIMEOUT))??;
        let parsed: serde_json::Value = serde_json::from_str(body.trim())
            .map_err(|e| ProviderError::BadResponse(format!("tip body is not JSON: {e}")))?;
        parsed
            .get("slot")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| ProviderError::BadResponse("tip body has no integer 'slot'".into()))
    }
}

// ---------------------------------------------------------------------------
// Submit API
// ---------------------------------------------------------------------------

/// Forwards signed CBOR to the node's submit API.
#[async_trait]
pub trait SubmitClient: Send + Sync {
    /// Submit raw transaction bytes; returns the transaction hash the
    /// node acknowledged.
    async fn submit(&self, cbor: &[u8]) -> Result<String, ProviderError>;
}

/// The standard cardano-submit-api: POST the CBOR, get back the hash as
/// a JSON string with HTTP 202.
pub struct HttpSubmitClient {
    pub host: String,
    pub port: u16,
}

#[async_trait]
impl SubmitClient for HttpSubmitClient {
    async fn submit(&self, cbor: &[u8]) -> Result<String, ProviderError> {
        let response = tokio::time::timeout(
            UPSTREAM_TIMEOUT,
            http_post_cbor(&self.host, self.port, SUBMIT_API_PATH, cbor),
        )
        .await
        .map_err(|_| ProviderError::Timeout(UPSTREAM_TIMEOUT))??;

        if response.status != SUBMIT_SUCCESS_STATUS {
            return Err(ProviderError::BadResponse(format!(
                "submit API answered {}: {}",
                response.status,
                response.body.trim()
            )));
        }
        parse_submitted_hash(&response.body)
    }
}

/// The submit API returns the hash quoted (it is a JSON string). Strip
/// the quotes and insist on 64 hex characters.
pub fn parse_submitted_hash(body: &str) -> Result<String, ProviderError> {
    let hash = body.trim().trim_matches('"');
    if hash.len() == TX_HASH_HEX_LENGTH && hash.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(hash.to_string())
    } else {
        Err(ProviderError::BadResponse(format!(
            "submit API returned a malformed transaction hash: {body}"
        )))
    }
}

// ---------------------------------------------------------------------------
// Minimal HTTP/1.1 over tokio TCP
// ---------------------------------------------------------------------------

struct HttpResponse {
    status: u16,
    body: String,
}

async fn http_get(url: &str) -> Result<String, ProviderError> {
    let parsed: url::Url = url
        .parse()
        .map_err(|e| ProviderError::Connect(format!("invalid URL: {e}")))?;
    let host = parsed.host();
    let port = parsed.port().unwrap_or(80);

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        parsed.path(),
        host,
    );
    let response = exchange(host, port, request.into_bytes()).await?;
    if response.status / 100 != 2 {
        return Err(ProviderError::BadResponse(format!(
            "GET {url} answered {}",
            response.status
        )));
    }
    Ok(response.body)
}

async fn http_post_cbor(
    host: &str,
    port: u16,
    path: &str,
    body: &[u8],
) -> Result<HttpResponse, ProviderError> {
    let mut request = format!(
        "POST {path} HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\nContent-Type: application/cbor\r\nContent-Length: {}\r\n\r\n",
        body.len(),
    )
    .into_bytes();
    request.extend_from_slice(body);
    exchange(host, port, request).await
}

async fn exchange(host: &str, port: u16, request: Vec<u8>) -> Result<HttpResponse, ProviderError> {
    let addr = format!("{host}:{port}");
    let mut stream = TcpStream::connect(&addr)
        .await
        .map_err(|e| ProviderError::Connect(format!("{addr}: {e}")))?;

    stream
        .write_all(&request)
        .await
        .map_err(|e| ProviderError::Connect(e.to_string()))?;
    stream
        .shutdown()
        .await
        .map_err(|e| ProviderError::Connect(e.to_string()))?;

    let mut buf = Vec::new();
    stream
        .read_to_end(&mut buf)
        .await
        .map_err(|e| ProviderError::Connect(e.to_string()))?;
    let response = String::from_utf8_lossy(&buf);

    // Status line: "HTTP/1.1 202 Accepted".
    let status = response
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or_else(|| ProviderError::BadResponse("missing HTTP status line".into()))?;

    // Everything after the first blank line is the body.
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_default();

    Ok(HttpResponse { status, body })
}

/// Minimal URL parser — just enough to extract host/port/path.
/// Avoids pulling in the `url` crate for a single use.
mod url {
    pub struct Url {
        host: String,
        port: Option<u16>,
        path: String,
    }

    impl Url {
        pub fn host(&self) -> &str {
            &self.host
        }

        pub fn port(&self) -> Option<u16> {
            self.port
        }

        pub fn path(&self) -> &str {
            &self.path
        }
    }

    impl std::str::FromStr for Url {
        type Err = String;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            let rest = s
                .strip_prefix("http://")
                .or_else(|| s.strip_prefix("https://"))
                .unwrap_or(s);

            let (authority, path) = match rest.find('/') {
                Some(i) => (&rest[..i], &rest[i..]),
                None => (rest, "/"),
            };

            let (host, port) = match authority.rfind(':') {
                Some(i) => {
                    let p = authority[i + 1..]
                        .parse::<u16>()
                        .map_err(|e| format!("bad port: {e}"))?;
                    (authority[..i].to_string(), Some(p))
                }
                None => (authority.to_string(), None),
            };

            if host.is_empty() {
                return Err("missing host".into());
            }

            Ok(Url {
                host,
                port,
                path: path.to_string(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
