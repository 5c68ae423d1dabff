// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error taxonomy of the handler pipeline.
//!
//! Every pipeline failure is one [`HandlerError`] variant, and every variant
//! maps to exactly one `(conditionType, status, reason)` triple. The pipeline
//! records that triple on the singleton before the status writer persists it.
//!
//! | Variant | Condition | Status | Reason |
//! |---|---|---|---|
//! | `InvalidParameters` | `InstallReadinessFailure` | True | `InvalidParameters` |
//! | `ConfigurationCheckFailed` | `InstallReadinessFailure` | True | `ConfigurationCheckFailed` |
//! | `InternalError` | `InstallReadinessFailure` | True | `InternalError` |
//! | `CannotGenerateCert` | `InstallReadinessFailure` | True | `CannotGenerateCert` |
//! | `CertNotAvailable` | `InstallReadinessFailure` | True | `CertNotAvailable` |
//! | `CannotSetReference` | `InstallReadinessFailure` | True | `CannotSetReference` |
//! | `DeploymentNotReady` | `InstallReadinessFailure` | True | `DeploymentNotReady` |
//! | `AdmissionWebhookNotAvailable` | `Available` | False | `AdmissionWebhookNotAvailable` |

use crate::status_reasons::{
    CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE, CONDITION_TYPE_AVAILABLE,
    CONDITION_TYPE_INSTALL_READINESS_FAILURE, REASON_ADMISSION_WEBHOOK_NOT_AVAILABLE,
    REASON_CANNOT_GENERATE_CERT, REASON_CANNOT_SET_REFERENCE, REASON_CERT_NOT_AVAILABLE,
    REASON_CONFIGURATION_CHECK_FAILED, REASON_DEPLOYMENT_NOT_READY, REASON_INTERNAL_ERROR,
    REASON_INVALID_PARAMETERS,
};
use thiserror::Error;

/// A classified handler failure. The payload is the condition message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// `spec` failed validation.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// The configuration `ConfigMap` could not be read or applied.
    #[error("configuration check failed: {0}")]
    ConfigurationCheckFailed(String),

    /// Any failure without a dedicated reason.
    #[error("internal error: {0}")]
    InternalError(String),

    /// Certificate generation, or applying the `Secret`/CA `ConfigMap`, failed.
    #[error("cannot generate certificate: {0}")]
    CannotGenerateCert(String),

    /// Certificate material is missing or empty.
    #[error("certificate not available: {0}")]
    CertNotAvailable(String),

    /// A child reference could not be computed.
    #[error("cannot set reference: {0}")]
    CannotSetReference(String),

    /// The operand `DaemonSet` is not available yet.
    #[error("deployment not ready: {0}")]
    DeploymentNotReady(String),

    /// The operand pods are not serving.
    #[error("admission webhook not available: {0}")]
    AdmissionWebhookNotAvailable(String),
}

/// The condition a [`HandlerError`] is reported as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConditionVerdict {
    pub condition_type: &'static str,
    pub status: &'static str,
    pub reason: &'static str,
}

impl HandlerError {
    /// CamelCase reason recorded on the condition.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidParameters(_) => REASON_INVALID_PARAMETERS,
            Self::ConfigurationCheckFailed(_) => REASON_CONFIGURATION_CHECK_FAILED,
            Self::InternalError(_) => REASON_INTERNAL_ERROR,
            Self::CannotGenerateCert(_) => REASON_CANNOT_GENERATE_CERT,
            Self::CertNotAvailable(_) => REASON_CERT_NOT_AVAILABLE,
            Self::CannotSetReference(_) => REASON_CANNOT_SET_REFERENCE,
            Self::DeploymentNotReady(_) => REASON_DEPLOYMENT_NOT_READY,
            Self::AdmissionWebhookNotAvailable(_) => REASON_ADMISSION_WEBHOOK_NOT_AVAILABLE,
        }
    }

    /// Human-readable message recorded on the condition.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidParameters(m)
            | Self::ConfigurationCheckFailed(m)
            | Self::InternalError(m)
            | Self::CannotGenerateCert(m)
            | Self::CertNotAvailable(m)
            | Self::CannotSetReference(m)
            | Self::DeploymentNotReady(m)
            | Self::AdmissionWebhookNotAvailable(m) => m,
        }
    }

    /// Map the failure onto its condition.
    #[must_use]
    pub fn condition(&self) -> ConditionVerdict {
        match self {
            Self::AdmissionWebhookNotAvailable(_) => ConditionVerdict {
                condition_type: CONDITION_TYPE_AVAILABLE,
                status: CONDITION_STATUS_FALSE,
                reason: self.reason(),
            },
            _ => ConditionVerdict {
                condition_type: CONDITION_TYPE_INSTALL_READINESS_FAILURE,
                status: CONDITION_STATUS_TRUE,
                reason: self.reason(),
            },
        }
    }
}

#[cfg(test)]
#[path = "handler_errors_tests.rs"]
mod handler_errors_tests;
