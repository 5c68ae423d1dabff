// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use super::refresh_reference;
use crate::client::ClusterClient;
use crate::crd::RunOnceDurationOverride;
use crate::handler_errors::HandlerError;
use crate::hashing::configuration_hash;
use crate::reconcilers::apply::{reference_drifted, Applier};
use crate::reconcilers::pipeline::{Handler, ReconcileContext, Step};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Keeps the configuration `ConfigMap` in line with the spec payload.
///
/// `status.hash.configuration` only advances after a successful apply.
pub struct ConfigurationHandler {
    client: Arc<dyn ClusterClient>,
    applier: Applier,
}

impl ConfigurationHandler {
    #[must_use]
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        let applier = Applier::new(client.clone());
        Self { client, applier }
    }
}

#[async_trait]
impl Handler for ConfigurationHandler {
    fn name(&self) -> &'static str {
        "configuration"
    }

    async fn handle(
        &self,
        ctx: &mut ReconcileContext,
        obj: &mut RunOnceDurationOverride,
    ) -> Result<Step, HandlerError> {
        let assets = ctx.assets();
        let namespace = ctx.operand.namespace();
        let name = assets.configuration_config_map_name();
        let config = obj.spec.config().clone();
        let hash = configuration_hash(&config);

        let current = self
            .client
            .get_config_map(namespace, &name)
            .await
            .map_err(|e| {
                HandlerError::ConfigurationCheckFailed(format!(
                    "failed to read ConfigMap {namespace}/{name}: {e}"
                ))
            })?;

        let status = obj.status_mut();
        if let Some(current) = &current {
            if status.hash.configuration == hash
                && !reference_drifted(status.resources.configuration_ref.as_ref(), current)
            {
                debug!("ConfigMap {}/{} is in sync", namespace, name);
                return Ok(Step::Continue);
            }
        }

        let desired = assets.configuration_config_map(&config).map_err(|e| {
            HandlerError::InternalError(format!("failed to serialize configuration: {e}"))
        })?;
        let applied = self
            .applier
            .ensure(&desired)
            .await
            .map_err(|e| HandlerError::ConfigurationCheckFailed(e.to_string()))?;

        if status.hash.configuration != hash {
            info!(
                "Configuration changed (activeDeadlineSeconds={})",
                config.active_deadline_seconds
            );
        }
        status.hash.configuration = hash;
        refresh_reference(&mut status.resources.configuration_ref, &applied.object)?;

        Ok(Step::Continue)
    }
}
