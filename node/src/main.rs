// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # MERIDIAN Gateway Node
//!
//! Entry point for the `meridian-node` binary. Parses CLI arguments,
//! initializes logging and metrics, wires up the external collaborators
//! (chain tip, node submit API), and serves the Rosetta Construction API.
//!
//! The binary supports two subcommands:
//!
//! - `run`     — start the construction gateway
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;
mod providers;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;

use meridian_protocol::config::{Network, ProtocolParameters};

use cli::{Commands, MeridianCli};
use logging::LogFormat;
use metrics::GatewayMetrics;
use providers::{ChainTipSource, FixedSlot, HttpChainTip, HttpSubmitClient};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = MeridianCli::parse();

    match cli.command {
        Commands::Run(args) => run_gateway(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the gateway: construction API server plus metrics endpoint.
async fn run_gateway(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "meridian_node=info,meridian_protocol=info,tower_http=debug",
        LogFormat::from_str_lossy(&args.log_format),
    );

    let network = Network::from_name(&args.network)
        .with_context(|| format!("unknown network '{}'", args.network))?;

    tracing::info!(
        %network,
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        offline = args.offline,
        "starting meridian-node"
    );

    // --- Protocol parameters ---
    let params = match &args.protocol_params {
        Some(path) => {
            let raw = std::fs::read_to_string(path).with_context(|| {
                format!("failed to read protocol parameters from {}", path.display())
            })?;
            serde_json::from_str::<ProtocolParameters>(&raw).with_context(|| {
                format!("failed to parse protocol parameters in {}", path.display())
            })?
        }
        None => {
            tracing::warn!("no protocol parameter file supplied, using built-in defaults");
            ProtocolParameters::default()
        }
    };

    // --- Chain tip source ---
    let tip: Arc<dyn ChainTipSource> = if args.offline {
        tracing::info!("offline mode: ttl computed from slot zero, submit disabled");
        Arc::new(FixedSlot(0))
    } else {
        match &args.tip_url {
            Some(url) => Arc::new(HttpChainTip { url: url.clone() }),
            None => bail!("--tip-url is required unless --offline is set"),
        }
    };

    // --- Submit client ---
    let submit = Arc::new(HttpSubmitClient {
        host: args.submit_host.clone(),
        port: args.submit_port,
    });

    // --- Metrics ---
    let gateway_metrics = Arc::new(GatewayMetrics::new());

    // --- Application state ---
    let app_state = api::AppState {
        version: env!("CARGO_PKG_VERSION").to_string(),
        network,
        offline: args.offline,
        params,
        tip,
        submit,
        metrics: Arc::clone(&gateway_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("construction API listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&gateway_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    tracing::info!("meridian-node stopped");
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("meridian-node {}", env!("CARGO_PKG_VERSION"));
    println!("rustc         {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
