//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Registered chains per protocol
//! - Cross-chain sends and dispatch latency
//! - Verifications and verification cache efficiency
//! - Status queries

use crate::chain::Protocol;
use crate::coordination::TransactionStatus;
use crate::error::{InteropError, InteropResult};

use axum::{http::StatusCode, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, Encoder,
    GaugeVec, HistogramVec, TextEncoder,
};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    // Chain metrics
    pub static ref REGISTERED_CHAINS: GaugeVec = register_gauge_vec!(
        "interop_registered_chains",
        "Registered external chains per protocol",
        &["protocol"]
    ).unwrap();

    // Dispatch metrics
    pub static ref SENDS: CounterVec = register_counter_vec!(
        "interop_sends_total",
        "Cross-chain sends by protocol and outcome",
        &["protocol", "outcome"]
    ).unwrap();

    pub static ref DISPATCH_LATENCY: HistogramVec = register_histogram_vec!(
        "interop_dispatch_latency_seconds",
        "Time spent in the protocol adapter per send",
        &["protocol"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap();

    // Verification metrics
    pub static ref VERIFICATIONS: CounterVec = register_counter_vec!(
        "interop_verifications_total",
        "Verification results by protocol",
        &["protocol", "verified"]
    ).unwrap();

    pub static ref CACHE_LOOKUPS: CounterVec = register_counter_vec!(
        "interop_verification_cache_lookups_total",
        "Verification cache lookups (hit/miss)",
        &["result"]
    ).unwrap();

    pub static ref STATUS_QUERIES: CounterVec = register_counter_vec!(
        "interop_status_queries_total",
        "Status queries by protocol and reported status",
        &["protocol", "status"]
    ).unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> InteropResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| InteropError::Internal(format!("metrics bind {}: {}", addr, e)))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| InteropError::Internal(format!("metrics server: {}", e)))?;

        Ok(())
    }
}

async fn metrics_handler() -> Result<String, (StatusCode, String)> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

// Helper functions to record metrics

pub fn record_registered_chains(protocol: Protocol, count: usize) {
    REGISTERED_CHAINS
        .with_label_values(&[protocol.as_str()])
        .set(count as f64);
}

pub fn record_send_success(protocol: Protocol, latency_secs: f64) {
    SENDS.with_label_values(&[protocol.as_str(), "success"]).inc();
    DISPATCH_LATENCY
        .with_label_values(&[protocol.as_str()])
        .observe(latency_secs);
}

pub fn record_send_failure(protocol: Protocol) {
    SENDS.with_label_values(&[protocol.as_str(), "failure"]).inc();
}

pub fn record_verification(protocol: Protocol, verified: bool) {
    VERIFICATIONS
        .with_label_values(&[protocol.as_str(), if verified { "true" } else { "false" }])
        .inc();
}

pub fn record_cache_hit() {
    CACHE_LOOKUPS.with_label_values(&["hit"]).inc();
}

pub fn record_cache_miss() {
    CACHE_LOOKUPS.with_label_values(&["miss"]).inc();
}

pub fn record_status_query(protocol: Protocol, status: TransactionStatus) {
    STATUS_QUERIES
        .with_label_values(&[protocol.as_str(), status.as_str()])
        .inc();
}
