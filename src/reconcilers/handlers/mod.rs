// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Handlers of the reconciliation pipeline, in execution order:
//!
//! 1. [`AvailabilityHandler`] (pre-pass) - provisional `Available` verdict
//! 2. [`ValidationHandler`] - rejects invalid spec values
//! 3. [`ConfigurationHandler`] - configuration `ConfigMap`
//! 4. [`CertGenerationHandler`] - serving certificate generation and rotation
//! 5. [`CertReadyHandler`] - validates the bundle and records its hash
//! 6. [`DaemonSetHandler`] - RBAC, `Service`, and the operand `DaemonSet`
//! 7. [`DeploymentReadyHandler`] - waits for the rollout
//! 8. [`WebhookConfigurationHandler`] - webhook and aggregated API registration
//! 9. [`AvailabilityHandler`] (post-pass) - final `Available` verdict

mod availability;
mod cert_generation;
mod cert_ready;
mod configuration;
mod daemonset;
mod deployment_ready;
mod validation;
mod webhook;

pub use availability::AvailabilityHandler;
pub use cert_generation::{rotation_reason, CertGenerationHandler, RotationReason};
pub use cert_ready::CertReadyHandler;
pub use configuration::ConfigurationHandler;
pub use daemonset::{apply_trigger, DaemonSetHandler, DaemonSetTrigger};
pub use deployment_ready::DeploymentReadyHandler;
pub use validation::ValidationHandler;
pub use webhook::WebhookConfigurationHandler;

use crate::crd::ResourceReference;
use crate::handler_errors::HandlerError;
use crate::reconcilers::apply::{reference_drifted, reference_of};
use kube::Resource;

/// Point `slot` at `live` when it is missing or its `resourceVersion` drifted.
///
/// Returns `true` when the reference changed.
pub(crate) fn refresh_reference<K: Resource<DynamicType = ()>>(
    slot: &mut Option<ResourceReference>,
    live: &K,
) -> Result<bool, HandlerError> {
    if !reference_drifted(slot.as_ref(), live) {
        return Ok(false);
    }
    let reference =
        reference_of(live).map_err(|e| HandlerError::CannotSetReference(e.to_string()))?;
    *slot = Some(reference);
    Ok(true)
}

