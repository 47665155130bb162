//! # Prometheus Metrics
//!
//! Operational metrics for the construction gateway, scraped at the
//! `/metrics` endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so
//! they do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the gateway.
///
/// Clone-friendly (wraps `Arc` internally via prometheus handles) so it
/// can be shared across request handlers.
#[derive(Clone)]
pub struct GatewayMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Unsigned transactions built (payloads phase completions).
    pub transactions_built_total: IntCounter,
    /// Transactions successfully combined with signatures.
    pub transactions_combined_total: IntCounter,
    /// Transactions forwarded to the node submit API and accepted.
    pub transactions_submitted_total: IntCounter,
    /// Parse requests served (both signed and unsigned).
    pub transactions_parsed_total: IntCounter,
    /// Requests rejected with a construction error.
    pub request_failures_total: IntCounter,
    /// Histogram of request handling latency in seconds.
    pub request_latency_seconds: Histogram,
}

impl GatewayMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("meridian".into()), None)
            .expect("failed to create prometheus registry");

        let transactions_built_total = IntCounter::new(
            "transactions_built_total",
            "Unsigned transactions built by the payloads phase",
        )
        .expect("metric creation");
        registry
            .register(Box::new(transactions_built_total.clone()))
            .expect("metric registration");

        let transactions_combined_total = IntCounter::new(
            "transactions_combined_total",
            "Transactions combined with client signatures",
        )
        .expect("metric creation");
        registry
            .register(Box::new(transactions_combined_total.clone()))
            .expect("metric registration");

        let transactions_submitted_total = IntCounter::new(
            "transactions_submitted_total",
            "Transactions accepted by the node submit API",
        )
        .expect("metric creation");
        registry
            .register(Box::new(transactions_submitted_total.clone()))
            .expect("metric registration");

        let transactions_parsed_total = IntCounter::new(
            "transactions_parsed_total",
            "Parse requests served",
        )
        .expect("metric creation");
        registry
            .register(Box::new(transactions_parsed_total.clone()))
            .expect("metric registration");

        let request_failures_total = IntCounter::new(
            "request_failures_total",
            "Construction requests rejected with an error",
        )
        .expect("metric creation");
        registry
            .register(Box::new(request_failures_total.clone()))
            .expect("metric registration");

        let request_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "request_latency_seconds",
                "End-to-end construction request latency in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(request_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            transactions_built_total,
            transactions_combined_total,
            transactions_submitted_total,
            transactions_parsed_total,
            request_failures_total,
            request_latency_seconds,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<GatewayMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_register_and_encode() {
        let metrics = GatewayMetrics::new();
        metrics.transactions_built_total.inc();
        metrics.transactions_combined_total.inc_by(3);

        let text = metrics.encode().unwrap();
        assert!(text.contains("meridian_transactions_built_total 1"));
        assert!(text.contains("meridian_transactions_combined_total 3"));
    }
}
