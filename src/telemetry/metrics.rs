//! Prometheus metrics for the call pipeline.

use std::time::Duration;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use crate::error::{Result, ServiceError};

/// Label names shared by the request metrics.
pub mod labels {
    pub const METHOD: &str = "method";
    pub const STATUS_CODE: &str = "status_code";
    pub const KEY: &str = "key";
}

/// Metrics collected by the middleware stages.
///
/// Every instance owns its own registry, so tests can build a fresh one and
/// read counters back without interference.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub requests_total: IntCounterVec,
    pub request_duration_seconds: HistogramVec,
    pub active_requests: IntGauge,
    pub rate_limit_exceeded_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("grpc_requests_total", "Total number of gRPC requests"),
            &[labels::METHOD, labels::STATUS_CODE],
        )
        .map_err(telemetry_error)?;
        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "grpc_request_duration_seconds",
                "Duration of gRPC requests in seconds",
            ),
            &[labels::METHOD, labels::STATUS_CODE],
        )
        .map_err(telemetry_error)?;
        let active_requests = IntGauge::new(
            "grpc_active_requests",
            "Number of gRPC requests currently in flight",
        )
        .map_err(telemetry_error)?;
        let rate_limit_exceeded_total = IntCounterVec::new(
            Opts::new(
                "rate_limit_exceeded_total",
                "Total number of rate limit exceeded events",
            ),
            &[labels::METHOD, labels::KEY],
        )
        .map_err(telemetry_error)?;

        registry
            .register(Box::new(requests_total.clone()))
            .map_err(telemetry_error)?;
        registry
            .register(Box::new(request_duration_seconds.clone()))
            .map_err(telemetry_error)?;
        registry
            .register(Box::new(active_requests.clone()))
            .map_err(telemetry_error)?;
        registry
            .register(Box::new(rate_limit_exceeded_total.clone()))
            .map_err(telemetry_error)?;

        Ok(Self {
            registry,
            requests_total,
            request_duration_seconds,
            active_requests,
            rate_limit_exceeded_total,
        })
    }

    /// Record a finished call.
    pub fn record_request(&self, method: &str, code: tonic::Code, duration: Duration) {
        let status_code = (code as i32).to_string();
        let labels = [method, status_code.as_str()];

        self.requests_total.with_label_values(&labels).inc();
        self.request_duration_seconds
            .with_label_values(&labels)
            .observe(duration.as_secs_f64());
    }

    /// Record a call rejected by the rate limiter.
    pub fn record_rate_limit_exceeded(&self, method: &str, key: &str) {
        self.rate_limit_exceeded_total
            .with_label_values(&[method, key])
            .inc();
    }

    pub fn rate_limit_exceeded(&self, method: &str, key: &str) -> u64 {
        self.rate_limit_exceeded_total
            .with_label_values(&[method, key])
            .get()
    }

    pub fn requests(&self, method: &str, code: tonic::Code) -> u64 {
        let status_code = (code as i32).to_string();
        self.requests_total
            .with_label_values(&[method, status_code.as_str()])
            .get()
    }

    /// Encode every registered metric in the Prometheus text format.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(telemetry_error)?;
        String::from_utf8(buffer).map_err(telemetry_error)
    }
}

fn telemetry_error(err: impl std::fmt::Display) -> ServiceError {
    ServiceError::Telemetry(err.to_string())
}
