// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition types and reasons reported on the configuration singleton.
//!
//! Reasons are programmatic identifiers in CamelCase that explain why a condition has
//! a particular status.
//!
//! # Condition Types
//!
//! The singleton carries two conditions:
//!
//! - **`Available`** - the operand has enough ready pods to admit pods.
//! - **`InstallReadinessFailure`** - an installation prerequisite (validation,
//!   configuration, certificates, deployment, webhook registration) is not satisfied.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   conditions:
//!     - type: Available
//!       status: "False"
//!       reason: AdmissionWebhookNotAvailable
//!       message: "daemonset runoncedurationoverride is not available (0/3 pods available)"
//!     - type: InstallReadinessFailure
//!       status: "True"
//!       reason: DeploymentNotReady
//!       message: "daemonset runoncedurationoverride is not available (0/3 pods available)"
//! ```

// ============================================================================
// Condition Types
// ============================================================================

/// The operand is serving admission requests.
pub const CONDITION_TYPE_AVAILABLE: &str = "Available";

/// An installation prerequisite is not satisfied.
pub const CONDITION_TYPE_INSTALL_READINESS_FAILURE: &str = "InstallReadinessFailure";

// ============================================================================
// Condition Status Values
// ============================================================================

/// Condition holds.
pub const CONDITION_STATUS_TRUE: &str = "True";

/// Condition does not hold.
pub const CONDITION_STATUS_FALSE: &str = "False";

/// Condition could not be determined.
pub const CONDITION_STATUS_UNKNOWN: &str = "Unknown";

// ============================================================================
// Success Reasons
// ============================================================================

/// Everything is as expected.
pub const REASON_AS_EXPECTED: &str = "AsExpected";

// ============================================================================
// Failure Reasons
// ============================================================================

/// `spec` failed validation.
///
/// **Usage**: `InstallReadinessFailure=True` when `activeDeadlineSeconds` is negative.
pub const REASON_INVALID_PARAMETERS: &str = "InvalidParameters";

/// The configuration `ConfigMap` could not be read or written.
pub const REASON_CONFIGURATION_CHECK_FAILED: &str = "ConfigurationCheckFailed";

/// Catch-all for failures without a dedicated reason.
pub const REASON_INTERNAL_ERROR: &str = "InternalError";

/// Certificate generation, or applying the serving-cert `Secret` or CA `ConfigMap`, failed.
pub const REASON_CANNOT_GENERATE_CERT: &str = "CannotGenerateCert";

/// Certificate material is missing or empty.
pub const REASON_CERT_NOT_AVAILABLE: &str = "CertNotAvailable";

/// A reference to a managed child could not be computed.
pub const REASON_CANNOT_SET_REFERENCE: &str = "CannotSetReference";

/// The operand `DaemonSet` is not yet available.
pub const REASON_DEPLOYMENT_NOT_READY: &str = "DeploymentNotReady";

/// The operand pods are not serving.
///
/// **Usage**: `Available=False`.
pub const REASON_ADMISSION_WEBHOOK_NOT_AVAILABLE: &str = "AdmissionWebhookNotAvailable";

#[cfg(test)]
#[path = "status_reasons_tests.rs"]
mod status_reasons_tests;
