// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # CAPVAULT Devnet Node
//!
//! Entry point for the `capvault-node` binary. Parses CLI arguments,
//! initializes logging and metrics, stands up the devnet, and serves the
//! REST API and the metrics endpoint.
//!
//! - `run`      start the node
//! - `init`     write a default configuration into the data directory
//! - `version`  print build version information

mod api;
mod cli;
mod config;
mod devnet;
mod logging;
mod metrics;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;

use capvault_protocol::vault::VaultEvent;

use cli::{Commands, CapvaultNodeCli};
use config::{NodeConfig, CONFIG_FILE_NAME};
use devnet::Devnet;
use logging::LogFormat;
use metrics::NodeMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CapvaultNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the node: devnet, API server, and metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(logging::RUN_DIRECTIVES, args.log_format)?;

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        data_dir = %args.data_dir.display(),
        "starting capvault-node"
    );

    // --- Configuration ---
    let node_config = load_config(args.config.as_deref(), &args.data_dir)?;

    // --- Devnet ---
    let devnet = Arc::new(Devnet::build(&node_config).context("failed to build devnet")?);

    // --- Metrics ---
    let node_metrics = Arc::new(NodeMetrics::new().context("failed to register metrics")?);
    node_metrics.observe_vault(&devnet.vault);

    // --- Event log ---
    let mut events = devnet.vault.subscribe();
    let event_loop = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event log lagged behind the vault");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (protocol {})",
            env!("CARGO_PKG_VERSION"),
            capvault_protocol::config::PROTOCOL_VERSION,
        ),
        network: node_config.network.clone(),
        devnet: Arc::clone(&devnet),
        metrics: Arc::clone(&node_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state);
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind API listener on {}", api_addr))?;
    tracing::info!("API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&node_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    event_loop.abort();
    tracing::info!(
        total_balance = %devnet.vault.total_vault_balance(),
        "capvault-node stopped"
    );
    Ok(())
}

/// Resolves the configuration: explicit path, then the data directory, then
/// the built-in defaults.
fn load_config(explicit: Option<&Path>, data_dir: &Path) -> Result<NodeConfig> {
    if let Some(path) = explicit {
        tracing::info!(path = %path.display(), "loading config");
        return NodeConfig::load(path);
    }

    let path = data_dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        tracing::info!(path = %path.display(), "loading config");
        return NodeConfig::load(&path);
    }

    tracing::warn!(
        path = %path.display(),
        "no config file found, using devnet defaults (run `capvault-node init` to write one)"
    );
    Ok(NodeConfig::default())
}

fn log_event(event: &VaultEvent) {
    match event {
        VaultEvent::Deposited {
            account,
            asset,
            amount_in,
            credited,
            ..
        } => {
            tracing::debug!(%account, %asset, %amount_in, %credited, "deposit committed");
        }
        VaultEvent::Withdrawn { account, amount, .. } => {
            tracing::debug!(%account, %amount, "withdrawal committed");
        }
        VaultEvent::PriceFeedRegistered { asset, feed, .. } => {
            tracing::debug!(%asset, %feed, "price feed registered");
        }
    }
}

/// Creates the data directory and writes the default configuration.
fn init_node(args: cli::InitArgs) -> Result<()> {
    logging::init_logging(logging::COMMAND_DIRECTIVES, LogFormat::Pretty)?;

    let data_dir = &args.data_dir;
    tracing::info!(data_dir = %data_dir.display(), "initializing node");

    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

    let config_path = data_dir.join(CONFIG_FILE_NAME);
    if config_path.exists() && !args.force {
        bail!(
            "{} already exists (pass --force to overwrite)",
            config_path.display()
        );
    }

    let node_config = NodeConfig::default();
    node_config.save(&config_path)?;

    println!("Node initialized successfully.");
    println!("  Data directory   : {}", data_dir.display());
    println!("  Config file      : {}", config_path.display());
    println!("  Network          : {}", node_config.network);
    println!("  Settlement asset : {}", node_config.vault.settlement_asset);
    println!("  Capacity limit   : {}", node_config.vault.capacity_limit);

    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("capvault-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol      {}", capvault_protocol::config::PROTOCOL_VERSION);
    println!("rustc         {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// If a handler cannot be installed, that branch never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
