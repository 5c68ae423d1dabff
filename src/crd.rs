// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definition for the operator configuration singleton.
//!
//! The operator honors exactly one cluster-scoped [`RunOnceDurationOverride`]
//! (named `cluster` by default). Its spec carries the admission payload the
//! operand enforces plus the standard operator knobs; its status is written
//! only by the status writer and records conditions, content hashes, and
//! references to every managed child.
//!
//! # Example
//!
//! ```rust,no_run
//! use rodoo::crd::{
//!     RunOnceDurationOverrideConfig, RunOnceDurationOverrideConfigSpec,
//!     RunOnceDurationOverrideSpec,
//! };
//!
//! let spec = RunOnceDurationOverrideSpec {
//!     management_state: Some("Managed".to_string()),
//!     log_level: None,
//!     operator_log_level: None,
//!     run_once_duration_override: RunOnceDurationOverrideConfig {
//!         spec: RunOnceDurationOverrideConfigSpec {
//!             active_deadline_seconds: 3600,
//!         },
//!     },
//! };
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default operand log level (`--v=2`)
pub const LOG_LEVEL_NORMAL: &str = "Normal";

/// Operand log level `--v=4`
pub const LOG_LEVEL_DEBUG: &str = "Debug";

/// Operand log level `--v=6`
pub const LOG_LEVEL_TRACE: &str = "Trace";

/// Operand log level `--v=8`
pub const LOG_LEVEL_TRACE_ALL: &str = "TraceAll";

/// Condition represents an observation of a resource's current state.
///
/// Conditions are keyed by `type`; a condition list never carries two entries
/// with the same type.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition, e.g. `Available` or `InstallReadinessFailure`.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// Admission payload handed to the operand.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunOnceDurationOverrideConfigSpec {
    /// Value the webhook sets as `activeDeadlineSeconds` on admitted run-once pods.
    #[schemars(range(min = 0))]
    pub active_deadline_seconds: i64,
}

/// Wrapper matching the `runOnceDurationOverride.spec` layout of the resource.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunOnceDurationOverrideConfig {
    pub spec: RunOnceDurationOverrideConfigSpec,
}

/// Spec of the operator configuration singleton.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[kube(
    group = "operator.openshift.io",
    version = "v1",
    kind = "RunOnceDurationOverride",
    plural = "runoncedurationoverrides",
    shortname = "rodoo",
    derive = "PartialEq",
    doc = "RunOnceDurationOverride configures the admission webhook that sets activeDeadlineSeconds on run-once pods in opted-in namespaces. Only the instance named 'cluster' is honored."
)]
#[kube(status = "RunOnceDurationOverrideStatus")]
#[serde(rename_all = "camelCase")]
pub struct RunOnceDurationOverrideSpec {
    /// Standard operator management state (`Managed`, `Unmanaged`, `Removed`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_state: Option<String>,

    /// Operand log level (`Normal`, `Debug`, `Trace`, `TraceAll`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Operator log level. Carried for compatibility, not interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_log_level: Option<String>,

    /// Admission configuration delivered to the operand.
    pub run_once_duration_override: RunOnceDurationOverrideConfig,
}

impl RunOnceDurationOverrideSpec {
    /// The admission payload serialized into the configuration `ConfigMap`.
    #[must_use]
    pub fn config(&self) -> &RunOnceDurationOverrideConfigSpec {
        &self.run_once_duration_override.spec
    }

    /// Effective operand log level, `Normal` when unset.
    #[must_use]
    pub fn operand_log_level(&self) -> &str {
        self.log_level
            .as_deref()
            .filter(|level| !level.is_empty())
            .unwrap_or(LOG_LEVEL_NORMAL)
    }

    /// Verbosity flag (`--v`) passed to the operand for the effective log level.
    #[must_use]
    pub fn operand_verbosity(&self) -> u8 {
        match self.operand_log_level() {
            LOG_LEVEL_DEBUG => 4,
            LOG_LEVEL_TRACE => 6,
            LOG_LEVEL_TRACE_ALL => 8,
            _ => 2,
        }
    }
}

/// Typed reference to a managed child as last observed by the operator.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReference {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
    pub resource_version: String,
}

/// References to every managed child.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunOnceDurationOverrideResources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration_ref: Option<ResourceReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_ca_config_map_ref: Option<ResourceReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_cert_secret_ref: Option<ResourceReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_ref: Option<ResourceReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_ref: Option<ResourceReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_service_ref: Option<ResourceReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutating_webhook_configuration_ref: Option<ResourceReference>,
}

/// Content hashes used for drift detection. Empty means "never computed".
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunOnceDurationOverrideHash {
    #[serde(default)]
    pub configuration: String,
    #[serde(default)]
    pub serving_cert: String,
    #[serde(default)]
    pub observed_config: String,
}

/// Generation last applied to a managed workload.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStatus {
    pub group: String,
    pub resource: String,
    pub namespace: String,
    pub name: String,
    pub last_generation: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

/// Status of the operator configuration singleton.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunOnceDurationOverrideStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generations: Vec<GenerationStatus>,

    /// Operand version last installed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Operand image last installed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// RFC3339 instant at which the serving certificate becomes eligible for
    /// rotation. Absent is the zero time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certs_rotate_at: Option<String>,

    #[serde(default)]
    pub resources: RunOnceDurationOverrideResources,

    #[serde(default)]
    pub hash: RunOnceDurationOverrideHash,
}

impl RunOnceDurationOverride {
    /// Mutable status, created empty on first access.
    pub fn status_mut(&mut self) -> &mut RunOnceDurationOverrideStatus {
        self.status.get_or_insert_with(RunOnceDurationOverrideStatus::default)
    }
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
