// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Prometheus Metrics
//!
//! Exposes operational metrics for the vault node. Scraped by Prometheus
//! at the `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

use capvault_protocol::{Amount, Vault};

/// Holds all Prometheus metric handles for the node.
///
/// Clone-friendly (prometheus handles are `Arc`s internally) so it can be
/// shared across request handlers.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Committed deposits.
    pub deposits_total: IntCounter,
    /// Committed deposits that went through a conversion.
    pub conversions_total: IntCounter,
    /// Committed withdrawals.
    pub withdrawals_total: IntCounter,
    /// Rolled-back operations, labelled by operation and error kind.
    pub operations_rejected_total: IntCounterVec,
    /// Aggregate settlement balance owed.
    pub vault_total_balance: IntGauge,
    /// Headroom left under the capacity limit.
    pub vault_remaining_capacity: IntGauge,
    /// Histogram of deposit latency in seconds, including the conversion.
    pub deposit_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("capvault".into()), None)?;

        let deposits_total =
            IntCounter::new("deposits_total", "Total number of committed deposits")?;
        registry.register(Box::new(deposits_total.clone()))?;

        let conversions_total = IntCounter::new(
            "conversions_total",
            "Total number of committed deposits that were converted",
        )?;
        registry.register(Box::new(conversions_total.clone()))?;

        let withdrawals_total =
            IntCounter::new("withdrawals_total", "Total number of committed withdrawals")?;
        registry.register(Box::new(withdrawals_total.clone()))?;

        let operations_rejected_total = IntCounterVec::new(
            Opts::new(
                "operations_rejected_total",
                "Total number of vault operations rolled back",
            ),
            &["operation", "kind"],
        )?;
        registry.register(Box::new(operations_rejected_total.clone()))?;

        let vault_total_balance = IntGauge::new(
            "vault_total_balance",
            "Aggregate settlement balance owed to depositors",
        )?;
        registry.register(Box::new(vault_total_balance.clone()))?;

        let vault_remaining_capacity = IntGauge::new(
            "vault_remaining_capacity",
            "Settlement units that can still be credited",
        )?;
        registry.register(Box::new(vault_remaining_capacity.clone()))?;

        let deposit_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "deposit_latency_seconds",
                "End-to-end deposit latency in seconds",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
        )?;
        registry.register(Box::new(deposit_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            deposits_total,
            conversions_total,
            withdrawals_total,
            operations_rejected_total,
            vault_total_balance,
            vault_remaining_capacity,
            deposit_latency_seconds,
        })
    }

    /// Refreshes the balance gauges from the vault.
    pub fn observe_vault(&self, vault: &Vault) {
        self.vault_total_balance
            .set(clamp_gauge(vault.total_vault_balance()));
        self.vault_remaining_capacity
            .set(clamp_gauge(vault.remaining_capacity()));
    }

    /// Counts one rolled-back operation.
    pub fn record_rejection(&self, operation: &str, kind: &str) {
        self.operations_rejected_total
            .with_label_values(&[operation, kind])
            .inc();
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Gauges are `i64`; amounts beyond that saturate.
fn clamp_gauge(amount: Amount) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails.
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
