// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the RunOnceDurationOverride operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// API group of the operator configuration CRD
pub const API_GROUP: &str = "operator.openshift.io";

/// API version of the operator configuration CRD
pub const API_VERSION: &str = "v1";

/// Fully qualified API version (group/version)
pub const API_GROUP_VERSION: &str = "operator.openshift.io/v1";

/// Kind name of the operator configuration resource
pub const KIND_RUN_ONCE_DURATION_OVERRIDE: &str = "RunOnceDurationOverride";

/// API group served by the operand (aggregated admission API)
pub const ADMISSION_API_GROUP: &str = "admission.runoncedurationoverride.openshift.io";

/// API version served by the operand
pub const ADMISSION_API_VERSION: &str = "v1";

/// Resource name served by the operand
pub const ADMISSION_RESOURCE: &str = "runoncedurationoverrides";

/// Name of the `MutatingWebhookConfiguration` (and its single webhook)
pub const MUTATING_WEBHOOK_CONFIGURATION_NAME: &str =
    "runoncedurationoverrides.admission.runoncedurationoverride.openshift.io";

/// Name of the aggregated `APIService` the operand serves
pub const API_SERVICE_NAME: &str = "v1.admission.runoncedurationoverride.openshift.io";

/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "runoncedurationoverride-operator";

// ============================================================================
// Operand Defaults
// ============================================================================

/// Default operand name (`<op>` in all managed object names)
pub const DEFAULT_OPERAND_NAME: &str = "runoncedurationoverride";

/// Default namespace the operator and its operand run in
pub const DEFAULT_OPERATOR_NAMESPACE: &str = "openshift-run-once-duration-override-operator";

/// The only configuration object name the operator honors
pub const DEFAULT_SINGLETON_NAME: &str = "cluster";

/// Environment variable carrying the operand image
pub const ENV_OPERAND_IMAGE: &str = "RELATED_IMAGE_OPERAND_IMAGE";

/// Environment variable carrying the operand version
pub const ENV_OPERAND_VERSION: &str = "OPERAND_VERSION";

/// Environment variable carrying the operator namespace
pub const ENV_OPERATOR_NAMESPACE: &str = "OPERATOR_NAMESPACE";

// ============================================================================
// Managed Object Data Keys
// ============================================================================

/// Data key of the configuration `ConfigMap`
pub const CONFIGURATION_KEY: &str = "configuration.yaml";

/// Data key of the serving private key in the TLS `Secret`
pub const TLS_KEY: &str = "tls.key";

/// Data key of the serving certificate in the TLS `Secret`
pub const TLS_CERT: &str = "tls.crt";

/// Data key of the CA bundle `ConfigMap`
pub const SERVICE_CA_KEY: &str = "service-ca.crt";

/// Secret type for TLS material
pub const SECRET_TYPE_TLS: &str = "kubernetes.io/tls";

/// `kind` of the serialized operand configuration
pub const CONFIGURATION_KIND: &str = "RunOnceDurationOverrideConfiguration";

/// `apiVersion` of the serialized operand configuration
pub const CONFIGURATION_API_VERSION: &str = "admission.runoncedurationoverride.openshift.io/v1";

// ============================================================================
// Operand Workload Constants
// ============================================================================

/// Name of the operand container
pub const OPERAND_CONTAINER_NAME: &str = "server";

/// Port the operand serves TLS on inside the pod
pub const OPERAND_SECURE_PORT: i32 = 9443;

/// Namespace holding the API server authentication configuration
pub const KUBE_SYSTEM_NAMESPACE: &str = "kube-system";

/// Pre-existing role granting read access to the API server authentication configuration
pub const EXTENSION_APISERVER_AUTH_READER_ROLE: &str = "extension-apiserver-authentication-reader";

/// Pre-existing cluster role granting token and subject access review
pub const AUTH_DELEGATOR_CLUSTER_ROLE: &str = "system:auth-delegator";

/// Security context constraint the operand pods use
pub const OPERAND_SCC: &str = "restricted-v2";

/// Port the `Service` exposes
pub const SERVICE_PORT: i32 = 443;

/// Mount path of the serving certificate
pub const SERVING_CERT_MOUNT_PATH: &str = "/var/serving-cert";

/// Mount path of the configuration
pub const CONFIGURATION_MOUNT_PATH: &str = "/etc/runoncedurationoverride/config";

/// Priority class of the operand pods
pub const OPERAND_PRIORITY_CLASS: &str = "system-cluster-critical";

/// Operand readiness probe path
pub const OPERAND_HEALTH_PATH: &str = "/healthz";

/// Readiness probe initial delay
pub const READINESS_INITIAL_DELAY_SECS: i32 = 5;

/// Readiness probe period
pub const READINESS_PERIOD_SECS: i32 = 10;

/// Webhook call timeout
pub const WEBHOOK_TIMEOUT_SECS: i32 = 5;

/// Minimum group priority of the aggregated API
pub const API_SERVICE_GROUP_PRIORITY_MINIMUM: i32 = 1000;

/// Version priority of the aggregated API
pub const API_SERVICE_VERSION_PRIORITY: i32 = 15;

// ============================================================================
// Certificate Constants
// ============================================================================

/// Organization stamped on generated certificates
pub const CERT_ORGANIZATION: &str = "Red Hat, Inc.";

/// Default validity of generated certificates in days
pub const DEFAULT_CERT_VALIDITY_DAYS: i64 = 365;

/// Default time before expiry at which certificates rotate, in hours
pub const DEFAULT_CERT_ROTATION_THRESHOLD_HOURS: i64 = 48;

// ============================================================================
// Controller Constants
// ============================================================================

/// Periodic resync of a healthy install (5 minutes)
pub const DEFAULT_RESYNC_SECS: u64 = 300;

/// Default number of reconcile workers
pub const DEFAULT_WORKERS: u16 = 1;

/// Base delay of the per-key failure backoff
pub const ERROR_REQUEUE_BASE_MILLIS: u64 = 500;

/// Cap of the per-key failure backoff (5 minutes)
pub const ERROR_REQUEUE_MAX_SECS: u64 = 300;

/// Objects whose last `resourceVersion` the secondary-event fan-in remembers
pub const FANIN_SEEN_CAPACITY: usize = 1024;

/// Attempts budget for conflict retries (apply adapter and status writer)
pub const CONFLICT_RETRY_ATTEMPTS: u32 = 5;

// ============================================================================
// Health Server Constants
// ============================================================================

/// Default listen address of the health and metrics server
pub const DEFAULT_HEALTH_ADDR: &str = "0.0.0.0:8080";

/// Health check path
pub const HEALTH_PATH: &str = "/healthz";

/// Metrics path
pub const METRICS_PATH: &str = "/metrics";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 2;
