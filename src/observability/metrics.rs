//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `serving_cert_keystore_reconciliations_total` - Total number of reconciliations
//! - `serving_cert_keystore_reconciliation_errors_total` - Reconciliation errors by error kind
//! - `serving_cert_keystore_reconciliation_duration_seconds` - Duration of reconciliations
//! - `serving_cert_keystore_outcomes_total` - Reconciliation outcomes (created, removed, in-sync, ...)
//! - `serving_cert_keystore_keystores_created_total` - Keystores written into secrets
//! - `serving_cert_keystore_keystores_removed_total` - Keystores deleted from secrets
//! - `serving_cert_keystore_requeues_total` - Requeues by reason

use anyhow::Result;
use prometheus::{Histogram, IntCounter, IntCounterVec, Registry};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "serving_cert_keystore_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "serving_cert_keystore_reconciliation_errors_total",
            "Total number of reconciliation errors by error kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "serving_cert_keystore_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static OUTCOMES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "serving_cert_keystore_outcomes_total",
            "Total number of reconciliation outcomes by outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create OUTCOMES_TOTAL metric - this should never happen")
});

static KEYSTORES_CREATED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "serving_cert_keystore_keystores_created_total",
        "Total number of PKCS#12 keystores written into secrets",
    )
    .expect("Failed to create KEYSTORES_CREATED_TOTAL metric - this should never happen")
});

static KEYSTORES_REMOVED_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "serving_cert_keystore_keystores_removed_total",
        "Total number of PKCS#12 keystores removed from secrets",
    )
    .expect("Failed to create KEYSTORES_REMOVED_TOTAL metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "serving_cert_keystore_requeues_total",
            "Total number of requeues by reason",
        ),
        &["reason"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Fails only when called twice, which is a startup bug"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(OUTCOMES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(KEYSTORES_CREATED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(KEYSTORES_REMOVED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn record_outcome(outcome: &str) {
    OUTCOMES_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn increment_keystores_created() {
    KEYSTORES_CREATED_TOTAL.inc();
}

pub fn increment_keystores_removed() {
    KEYSTORES_REMOVED_TOTAL.inc();
}

pub fn increment_requeues_total(reason: &str) {
    REQUEUES_TOTAL.with_label_values(&[reason]).inc();
}
