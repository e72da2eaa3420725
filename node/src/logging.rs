// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Structured Logging
//!
//! One `tracing` subscriber for the whole process, writing to stderr. The
//! vault core logs every deposit stage at `debug`, commits at `info`, and
//! rollbacks at `warn`; the node's defaults surface commits and rollbacks
//! without the per-stage noise.

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directives used by `run` when `RUST_LOG` is unset.
pub const RUN_DIRECTIVES: &str =
    "capvault_node=info,capvault_protocol=info,capvault_contracts=info,tower_http=debug";

/// Directives used by one-shot commands such as `init`.
pub const COMMAND_DIRECTIVES: &str = "capvault_node=info";

/// Log output format, selectable with `--log-format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable, colored output.
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

/// `RUST_LOG` if it is set and parses, else `defaults`.
pub fn build_filter(defaults: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(defaults))
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(defaults: &str, format: LogFormat) -> Result<()> {
    let filter = build_filter(defaults);
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_line_number(true))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false),
            )
            .try_init(),
    };
    installed.map_err(|e| anyhow!("failed to install log subscriber: {}", e))?;

    tracing::debug!(?format, defaults, "logging ready");
    Ok(())
}
