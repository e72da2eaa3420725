// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # CLI Interface
//!
//! Defines the command-line argument structure for `capvault-node` using
//! `clap` derive. Supports three subcommands: `run`, `init`, and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// CAPVAULT devnet node.
///
/// Stands up a token ledger, a constant-product exchange, and a
/// capacity-bounded settlement vault in one process, serves them over a
/// REST API, and exposes Prometheus metrics.
#[derive(Parser, Debug)]
#[command(
    name = "capvault-node",
    about = "CAPVAULT settlement vault devnet node",
    version,
    propagate_version = true
)]
pub struct CapvaultNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Create the data directory and write a default configuration.
    Init(InitArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the node configuration file (JSON).
    ///
    /// When omitted, the node looks for `config.json` in the data directory
    /// and falls back to the built-in devnet defaults.
    #[arg(long, short = 'c', env = "CAPVAULT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the node data directory.
    #[arg(long, short = 'd', env = "CAPVAULT_DATA_DIR", default_value = ".capvault")]
    pub data_dir: PathBuf,

    /// Port for the REST API.
    #[arg(long, env = "CAPVAULT_RPC_PORT", default_value_t = 9841)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "CAPVAULT_METRICS_PORT", default_value_t = 9842)]
    pub metrics_port: u16,

    /// Log output format.
    #[arg(
        long,
        env = "CAPVAULT_LOG_FORMAT",
        value_enum,
        ignore_case = true,
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path to the data directory to initialize.
    #[arg(long, short = 'd', env = "CAPVAULT_DATA_DIR", default_value = ".capvault")]
    pub data_dir: PathBuf,

    /// Overwrite an existing configuration file.
    #[arg(long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        CapvaultNodeCli::command().debug_assert();
    }

    #[test]
    fn run_defaults() {
        let cli = CapvaultNodeCli::try_parse_from(["capvault-node", "run"]).unwrap();
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.rpc_port, 9841);
                assert_eq!(args.metrics_port, 9842);
                assert_eq!(args.log_format, LogFormat::Pretty);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn unknown_log_format_rejected() {
        assert!(
            CapvaultNodeCli::try_parse_from(["capvault-node", "run", "--log-format", "yaml"])
                .is_err()
        );
        let cli =
            CapvaultNodeCli::try_parse_from(["capvault-node", "run", "--log-format", "JSON"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Run(RunArgs {
                log_format: LogFormat::Json,
                ..
            })
        ));
    }

    #[test]
    fn init_accepts_force() {
        let cli =
            CapvaultNodeCli::try_parse_from(["capvault-node", "init", "-d", "/tmp/x", "--force"])
                .unwrap();
        match cli.command {
            Commands::Init(args) => {
                assert!(args.force);
                assert_eq!(args.data_dir, PathBuf::from("/tmp/x"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
