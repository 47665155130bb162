//! # CLI Interface
//!
//! Defines the command-line argument structure for `meridian-node` using
//! `clap` derive. Two subcommands: `run` and `version`. There is no
//! `init` — the gateway is stateless and needs no data directory.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// MERIDIAN Rosetta Construction gateway for Cardano.
///
/// Translates Rosetta construction requests into canonical Cardano
/// transactions: build, estimate, sign-payload, combine, parse, submit.
/// Holds no state between requests; signing happens on the client side.
#[derive(Parser, Debug)]
#[command(
    name = "meridian-node",
    about = "MERIDIAN Rosetta Construction gateway for Cardano",
    version,
    propagate_version = true
)]
pub struct MeridianCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the gateway binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the construction gateway.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Network to serve: mainnet, preprod, or preview. Requests for any
    /// other network are rejected.
    #[arg(long, env = "MERIDIAN_NETWORK", default_value = "preprod")]
    pub network: String,

    /// Port for the Rosetta Construction API.
    #[arg(long, env = "MERIDIAN_RPC_PORT", default_value_t = 8080)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "MERIDIAN_METRICS_PORT", default_value_t = 8082)]
    pub metrics_port: u16,

    /// Run without any chain access. TTLs are computed from slot zero and
    /// submit is disabled; everything else works as usual.
    #[arg(long, env = "MERIDIAN_OFFLINE_MODE", default_value_t = false)]
    pub offline: bool,

    /// URL of an indexer endpoint answering `{"slot": <n>}` for the
    /// current chain tip. Required unless running offline.
    #[arg(long, env = "MERIDIAN_TIP_URL")]
    pub tip_url: Option<String>,

    /// Host of the cardano-submit-api to forward signed transactions to.
    #[arg(long, env = "MERIDIAN_SUBMIT_HOST", default_value = "127.0.0.1")]
    pub submit_host: String,

    /// Port of the cardano-submit-api.
    #[arg(long, env = "MERIDIAN_SUBMIT_PORT", default_value_t = 8090)]
    pub submit_port: u16,

    /// Path to a JSON file with protocol parameters (min fee constants,
    /// deposits). Falls back to mainnet Babbage defaults when omitted.
    #[arg(long, short = 'p', env = "MERIDIAN_PROTOCOL_PARAMS")]
    pub protocol_params: Option<PathBuf>,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "MERIDIAN_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        // Ensures the derive macros produce a valid CLI definition.
        MeridianCli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = MeridianCli::parse_from(["meridian-node", "run"]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.network, "preprod");
                assert_eq!(args.rpc_port, 8080);
                assert!(!args.offline);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }
}
