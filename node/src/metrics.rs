//! # Prometheus Metrics
//!
//! Operational metrics for the node, scraped at `/metrics` on the metrics
//! port. Everything lives in a dedicated [`prometheus::Registry`] prefixed
//! `timelock_`, so nothing collides with the default global registry.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// All metric handles for the node. Prometheus handles are cheap to clone.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Vaults created, either kind.
    pub vaults_created_total: IntCounter,
    /// Vaults withdrawn and retired.
    pub vaults_withdrawn_total: IntCounter,
    /// Rejected transactions, labelled by error name.
    pub operations_failed_total: IntCounterVec,
    /// Vaults currently live on the ledger.
    pub live_vaults: IntGauge,
    /// Time to verify and execute one transaction.
    pub operation_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("timelock".into()), None)?;

        let vaults_created_total =
            IntCounter::new("vaults_created_total", "Total number of vaults created")?;
        registry.register(Box::new(vaults_created_total.clone()))?;

        let vaults_withdrawn_total =
            IntCounter::new("vaults_withdrawn_total", "Total number of vaults withdrawn")?;
        registry.register(Box::new(vaults_withdrawn_total.clone()))?;

        let operations_failed_total = IntCounterVec::new(
            Opts::new(
                "operations_failed_total",
                "Total number of rejected vault transactions",
            ),
            &["error"],
        )?;
        registry.register(Box::new(operations_failed_total.clone()))?;

        let live_vaults = IntGauge::new("live_vaults", "Number of vaults currently live")?;
        registry.register(Box::new(live_vaults.clone()))?;

        let operation_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "operation_latency_seconds",
                "Vault transaction execution latency in seconds",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 1.0]),
        )?;
        registry.register(Box::new(operation_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            vaults_created_total,
            vaults_withdrawn_total,
            operations_failed_total,
            live_vaults,
            operation_latency_seconds,
        })
    }

    /// Encodes all registered metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics handle passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Renders `/metrics` in Prometheus text format.
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
            tracing::error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
