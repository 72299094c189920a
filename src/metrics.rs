//! Prometheus metrics for request negotiation
//!
//! Counters are observability only: nothing in the request path reads them,
//! so they never influence how a request resolves.

use crate::error::{GateError, Result};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metrics for the negotiation engine, registered in their own registry
#[derive(Clone)]
pub struct GateMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    store_probes_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
}

impl GateMetrics {
    /// Create metrics in a fresh registry
    pub fn new() -> Result<Self> {
        Self::with_registry(Registry::new())
    }

    /// Create metrics registered in the given registry
    pub fn with_registry(registry: Registry) -> Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new(
                "tilegate_requests_total",
                "Total number of requests by path kind and outcome",
            ),
            &["kind", "outcome"], // outcome: found, not_modified, soft_absent, hard_absent, ...
        )
        .map_err(metrics_error)?;
        registry
            .register(Box::new(requests_total.clone()))
            .map_err(metrics_error)?;

        let store_probes_total = IntCounterVec::new(
            Opts::new(
                "tilegate_store_probes_total",
                "Total number of object store probes by result",
            ),
            &["result"], // result: hit, miss, error
        )
        .map_err(metrics_error)?;
        registry
            .register(Box::new(store_probes_total.clone()))
            .map_err(metrics_error)?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "tilegate_request_duration_seconds",
                "Duration of request negotiation in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
            ]),
            &["kind"],
        )
        .map_err(metrics_error)?;
        registry
            .register(Box::new(request_duration_seconds.clone()))
            .map_err(metrics_error)?;

        Ok(Self {
            registry,
            requests_total,
            store_probes_total,
            request_duration_seconds,
        })
    }

    /// Record the terminal outcome of a request
    ///
    /// `kind` is "none" for requests rejected before classification.
    pub fn record_outcome(&self, kind: &str, outcome: &str, duration: Duration) {
        self.requests_total.with_label_values(&[kind, outcome]).inc();
        self.request_duration_seconds
            .with_label_values(&[kind])
            .observe(duration.as_secs_f64());
    }

    /// Record one store probe
    pub fn record_probe(&self, result: &str) {
        self.store_probes_total.with_label_values(&[result]).inc();
    }

    /// Number of requests recorded with the given labels
    pub fn outcome_count(&self, kind: &str, outcome: &str) -> u64 {
        self.requests_total.with_label_values(&[kind, outcome]).get()
    }

    /// Number of probes recorded with the given result
    pub fn probe_count(&self, result: &str) -> u64 {
        self.store_probes_total.with_label_values(&[result]).get()
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn encode(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| GateError::HttpError(e.to_string()))
    }
}

fn metrics_error(err: prometheus::Error) -> GateError {
    GateError::ConfigError(format!("metrics: {}", err))
}
