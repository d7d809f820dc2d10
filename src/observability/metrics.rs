//! # Metrics
//!
//! Prometheus metrics for monitoring the provider.
//!
//! ## Metrics Exposed
//!
//! - `sops_secretsmanager_invocations_total` - Lifecycle events handled, by request type
//! - `sops_secretsmanager_invocation_failures_total` - Failed invocations, by error kind
//! - `sops_secretsmanager_invocation_duration_seconds` - Duration of lifecycle events
//! - `sops_secretsmanager_sops_decryption_total` - sops invocations
//! - `sops_secretsmanager_sops_decryption_errors_total` - sops failures, by reason
//! - `sops_secretsmanager_sops_decryption_duration_seconds` - Duration of sops invocations
//! - `sops_secretsmanager_provider_operations_total` - S3 and Secrets Manager calls
//! - `sops_secretsmanager_provider_operation_errors_total` - Failed S3 and Secrets Manager calls

use anyhow::Result;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static INVOCATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sops_secretsmanager_invocations_total",
            "Total number of lifecycle events handled",
        ),
        &["request_type"],
    )
    .expect("Failed to create INVOCATIONS_TOTAL metric - this should never happen")
});

static INVOCATION_FAILURES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sops_secretsmanager_invocation_failures_total",
            "Total number of failed lifecycle events",
        ),
        &["kind"],
    )
    .expect("Failed to create INVOCATION_FAILURES_TOTAL metric - this should never happen")
});

static INVOCATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "sops_secretsmanager_invocation_duration_seconds",
            "Duration of lifecycle event handling in seconds",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create INVOCATION_DURATION metric - this should never happen")
});

static SOPS_DECRYPTION_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "sops_secretsmanager_sops_decryption_total",
        "Total number of sops decryptions attempted",
    )
    .expect("Failed to create SOPS_DECRYPTION_TOTAL metric - this should never happen")
});

static SOPS_DECRYPTION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sops_secretsmanager_sops_decryption_errors_total",
            "Total number of failed sops decryptions",
        ),
        &["reason"],
    )
    .expect("Failed to create SOPS_DECRYPTION_ERRORS_TOTAL metric - this should never happen")
});

static SOPS_DECRYPTION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "sops_secretsmanager_sops_decryption_duration_seconds",
            "Duration of sops decryption in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
    )
    .expect("Failed to create SOPS_DECRYPTION_DURATION metric - this should never happen")
});

static PROVIDER_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sops_secretsmanager_provider_operations_total",
            "Total number of S3 and Secrets Manager operations",
        ),
        &["provider", "operation"],
    )
    .expect("Failed to create PROVIDER_OPERATIONS_TOTAL metric - this should never happen")
});

static PROVIDER_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sops_secretsmanager_provider_operation_errors_total",
            "Total number of failed S3 and Secrets Manager operations",
        ),
        &["provider"],
    )
    .expect("Failed to create PROVIDER_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

/// Register every metric with the process registry. Call once at start-up.
#[allow(
    clippy::missing_errors_doc,
    reason = "Fails only when called twice"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(INVOCATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(INVOCATION_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(INVOCATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(SOPS_DECRYPTION_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SOPS_DECRYPTION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(SOPS_DECRYPTION_DURATION.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_OPERATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_OPERATION_ERRORS_TOTAL.clone()))?;

    Ok(())
}

pub fn gather() -> Vec<prometheus::proto::MetricFamily> {
    REGISTRY.gather()
}

pub fn increment_invocations(request_type: &str) {
    INVOCATIONS_TOTAL.with_label_values(&[request_type]).inc();
}

pub fn increment_invocation_failures(kind: &str) {
    INVOCATION_FAILURES_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_invocation_duration(duration: f64) {
    INVOCATION_DURATION.observe(duration);
}

pub fn increment_sops_decryption_total() {
    SOPS_DECRYPTION_TOTAL.inc();
}

pub fn increment_sops_decryption_errors(reason: &str) {
    SOPS_DECRYPTION_ERRORS_TOTAL
        .with_label_values(&[reason])
        .inc();
}

pub fn observe_sops_decryption_duration(duration: f64) {
    SOPS_DECRYPTION_DURATION.observe(duration);
}

pub fn record_provider_operation(provider: &str, operation: &str) {
    PROVIDER_OPERATIONS_TOTAL
        .with_label_values(&[provider, operation])
        .inc();
}

pub fn increment_provider_operation_errors(provider: &str) {
    PROVIDER_OPERATION_ERRORS_TOTAL
        .with_label_values(&[provider])
        .inc();
}
