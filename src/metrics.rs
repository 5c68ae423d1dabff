// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the RunOnceDurationOverride operator.
//!
//! All metrics carry the namespace prefix `runoncedurationoverride_operator_`.
//!
//! # Metrics Categories
//!
//! - **Reconciliation Metrics** - Track reconciliation operations and their outcomes
//! - **Resource Lifecycle Metrics** - Track managed children created, updated, and deleted
//! - **Pipeline Metrics** - Track handler failures by reason
//! - **Status Metrics** - Track status writes, skips, and conflicts
//! - **Certificate Metrics** - Track serving certificate rotations
//!
//! # Example
//!
//! ```rust,no_run
//! use rodoo::metrics::record_reconciliation_success;
//!
//! record_reconciliation_success("RunOnceDurationOverride", std::time::Duration::from_secs(1));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all metrics
const METRICS_NAMESPACE: &str = "runoncedurationoverride_operator";

const REGISTRATION_FAILED: &str = "metric definitions are static and register once";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn counter_vec(name: &str, help: &str, labels: &[&str]) -> CounterVec {
    let opts = Opts::new(format!("{METRICS_NAMESPACE}_{name}"), help);
    let counter = CounterVec::new(opts, labels).expect(REGISTRATION_FAILED);
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .expect(REGISTRATION_FAILED);
    counter
}

// ============================================================================
// Reconciliation Metrics
// ============================================================================

/// Total number of reconciliations by resource type and status
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `status`: Outcome (success, error, requeue, ignored)
pub static RECONCILIATION_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "reconciliations_total",
        "Total number of reconciliations by resource type and status",
        &["resource_type", "status"],
    )
});

/// Duration of reconciliations in seconds
///
/// Labels:
/// - `resource_type`: Kind of resource
pub static RECONCILIATION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_reconciliation_duration_seconds"),
        "Duration of reconciliations in seconds by resource type",
    )
    .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]);
    let histogram = HistogramVec::new(opts, &["resource_type"]).expect(REGISTRATION_FAILED);
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .expect(REGISTRATION_FAILED);
    histogram
});

/// Total number of requeue operations
///
/// Labels:
/// - `resource_type`: Kind of resource
/// - `reason`: Reason for requeue (`rotation`, `resync`, `error`, `handler`)
pub static REQUEUE_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "requeues_total",
        "Total number of requeue operations by resource type and reason",
        &["resource_type", "reason"],
    )
});

// ============================================================================
// Resource Lifecycle Metrics
// ============================================================================

/// Total number of managed children created
///
/// Labels:
/// - `resource_type`: Kind of the child (e.g., `ConfigMap`, `DaemonSet`)
pub static RESOURCES_CREATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "resources_created_total",
        "Total number of managed resources created by type",
        &["resource_type"],
    )
});

/// Total number of managed children updated to correct drift
pub static RESOURCES_UPDATED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "resources_updated_total",
        "Total number of managed resources updated by type",
        &["resource_type"],
    )
});

/// Total number of managed children deleted
pub static RESOURCES_DELETED_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "resources_deleted_total",
        "Total number of managed resources deleted by type",
        &["resource_type"],
    )
});

// ============================================================================
// Pipeline Metrics
// ============================================================================

/// Total number of handler failures
///
/// Labels:
/// - `handler`: Handler that failed
/// - `reason`: Condition reason the failure was reported as
pub static PIPELINE_ERRORS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "pipeline_errors_total",
        "Total number of handler pipeline failures by handler and reason",
        &["handler", "reason"],
    )
});

// ============================================================================
// Status Metrics
// ============================================================================

/// Total number of status writer outcomes
///
/// Labels:
/// - `result`: `written`, `skipped`, `conflict`, or `error`
pub static STATUS_UPDATES_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "status_updates_total",
        "Total number of status writer outcomes by result",
        &["result"],
    )
});

// ============================================================================
// Certificate Metrics
// ============================================================================

/// Total number of serving certificate generations
///
/// Labels:
/// - `reason`: Why the bundle was (re)generated
pub static CERT_ROTATIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    counter_vec(
        "cert_rotations_total",
        "Total number of serving certificate generations by reason",
        &["reason"],
    )
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record a successful reconciliation
pub fn record_reconciliation_success(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "success"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a failed reconciliation
pub fn record_reconciliation_error(resource_type: &str, duration: Duration) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "error"])
        .inc();
    RECONCILIATION_DURATION_SECONDS
        .with_label_values(&[resource_type])
        .observe(duration.as_secs_f64());
}

/// Record a reconciliation of a non-singleton instance
pub fn record_reconciliation_ignored(resource_type: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "ignored"])
        .inc();
}

/// Record a requeue
///
/// # Arguments
/// * `resource_type` - The kind of resource
/// * `reason` - Reason for requeue
pub fn record_reconciliation_requeue(resource_type: &str, reason: &str) {
    RECONCILIATION_TOTAL
        .with_label_values(&[resource_type, "requeue"])
        .inc();
    REQUEUE_TOTAL
        .with_label_values(&[resource_type, reason])
        .inc();
}

/// Record a managed child creation
pub fn record_resource_created(resource_type: &str) {
    RESOURCES_CREATED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

/// Record a managed child update
pub fn record_resource_updated(resource_type: &str) {
    RESOURCES_UPDATED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

/// Record a managed child deletion
pub fn record_resource_deleted(resource_type: &str) {
    RESOURCES_DELETED_TOTAL
        .with_label_values(&[resource_type])
        .inc();
}

/// Record a handler failure
pub fn record_pipeline_error(handler: &str, reason: &str) {
    PIPELINE_ERRORS_TOTAL
        .with_label_values(&[handler, reason])
        .inc();
}

/// Record a status writer outcome
pub fn record_status_update(result: &str) {
    STATUS_UPDATES_TOTAL.with_label_values(&[result]).inc();
}

/// Record a serving certificate generation
pub fn record_cert_rotation(reason: &str) {
    CERT_ROTATIONS_TOTAL.with_label_values(&[reason]).inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_reconciliation_success() {
        let resource_type = "TestResource";
        let duration = Duration::from_millis(500);

        record_reconciliation_success(resource_type, duration);

        let counter = RECONCILIATION_TOTAL.with_label_values(&[resource_type, "success"]);
        assert!(counter.get() > 0.0);

        let histogram = RECONCILIATION_DURATION_SECONDS.with_label_values(&[resource_type]);
        assert!(histogram.get_sample_count() > 0);
    }

    #[test]
    fn test_record_reconciliation_error() {
        let resource_type = "TestResourceError";
        let duration = Duration::from_millis(250);

        record_reconciliation_error(resource_type, duration);

        let counter = RECONCILIATION_TOTAL.with_label_values(&[resource_type, "error"]);
        assert!(counter.get() > 0.0);
    }

    #[test]
    fn test_record_requeue_counts_reason() {
        record_reconciliation_requeue("RequeueTest", "rotation");

        let counter = REQUEUE_TOTAL.with_label_values(&["RequeueTest", "rotation"]);
        assert!(counter.get() > 0.0);
    }

    #[test]
    fn test_record_pipeline_error_and_rotation() {
        record_pipeline_error("validation", "InvalidParameters");
        record_cert_rotation("SecretMissing");
        record_status_update("skipped");

        assert!(
            PIPELINE_ERRORS_TOTAL
                .with_label_values(&["validation", "InvalidParameters"])
                .get()
                > 0.0
        );
        assert!(CERT_ROTATIONS_TOTAL.with_label_values(&["SecretMissing"]).get() > 0.0);
        assert!(STATUS_UPDATES_TOTAL.with_label_values(&["skipped"]).get() > 0.0);
    }

    #[test]
    fn test_gather_metrics() {
        record_reconciliation_success("GatherTest", Duration::from_millis(100));
        record_resource_created("ConfigMap");

        let result = gather_metrics();
        assert!(result.is_ok(), "Gathering metrics should succeed");

        let metrics_text = result.unwrap();
        assert!(
            metrics_text.contains("runoncedurationoverride_operator"),
            "Metrics should contain namespace prefix"
        );
        assert!(metrics_text.contains("reconciliations_total"));
        assert!(metrics_text.contains("resources_created_total"));
    }
}
