// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use super::refresh_reference;
use crate::assets::stamp_ca_bundle;
use crate::client::ClusterClient;
use crate::crd::RunOnceDurationOverride;
use crate::handler_errors::HandlerError;
use crate::reconcilers::apply::Applier;
use crate::reconcilers::pipeline::{Handler, ReconcileContext, Step};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Registers the admission webhook and the aggregated API with the current CA.
pub struct WebhookConfigurationHandler {
    client: Arc<dyn ClusterClient>,
    applier: Applier,
}

impl WebhookConfigurationHandler {
    #[must_use]
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        let applier = Applier::new(client.clone());
        Self { client, applier }
    }
}

#[async_trait]
impl Handler for WebhookConfigurationHandler {
    fn name(&self) -> &'static str {
        "webhook-configuration"
    }

    async fn handle(
        &self,
        ctx: &mut ReconcileContext,
        obj: &mut RunOnceDurationOverride,
    ) -> Result<Step, HandlerError> {
        let Some(bundle) = ctx.bundle.as_ref() else {
            return Err(HandlerError::CertNotAvailable(
                "no serving bundle to register the webhook with".to_string(),
            ));
        };
        let assets = ctx.assets();
        let name = assets.mutating_webhook_configuration_name();

        let current = self
            .client
            .get_mutating_webhook_configuration(name)
            .await
            .map_err(|e| {
                HandlerError::CertNotAvailable(format!(
                    "failed to read MutatingWebhookConfiguration {name}: {e}"
                ))
            })?;

        let webhook = match current {
            Some(current) => {
                debug!("MutatingWebhookConfiguration {} is registered", name);
                current
            }
            None => {
                let mut desired = assets.mutating_webhook_configuration();
                stamp_ca_bundle(&mut desired, &bundle.serving_cert_ca);
                info!("Registering MutatingWebhookConfiguration {}", name);
                self.applier
                    .ensure(&desired)
                    .await
                    .map_err(|e| HandlerError::CertNotAvailable(e.to_string()))?
                    .object
            }
        };

        let api_service = self
            .applier
            .ensure(&assets.api_service(&bundle.serving_cert_ca))
            .await
            .map_err(|e| HandlerError::CertNotAvailable(e.to_string()))?
            .object;

        let status = obj.status_mut();
        refresh_reference(
            &mut status.resources.mutating_webhook_configuration_ref,
            &webhook,
        )?;
        refresh_reference(&mut status.resources.api_service_ref, &api_service)?;

        Ok(Step::Continue)
    }
}
