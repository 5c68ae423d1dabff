// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use crate::cert::CertBundle;
use crate::client::ClusterClient;
use crate::crd::RunOnceDurationOverride;
use crate::handler_errors::HandlerError;
use crate::reconcilers::pipeline::{Handler, ReconcileContext, Step};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Makes sure a complete serving bundle is available and records its hash.
///
/// Trusts the bundle left in the context by certificate generation; loads it
/// from the cluster otherwise.
pub struct CertReadyHandler {
    client: Arc<dyn ClusterClient>,
}

impl CertReadyHandler {
    #[must_use]
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self { client }
    }

    async fn load(&self, ctx: &ReconcileContext) -> Result<CertBundle, HandlerError> {
        let assets = ctx.assets();
        let namespace = ctx.operand.namespace();
        let secret_name = assets.serving_cert_secret_name();
        let ca_name = assets.service_ca_config_map_name();

        let secret = self
            .client
            .get_secret(namespace, &secret_name)
            .await
            .map_err(|e| {
                HandlerError::CertNotAvailable(format!(
                    "failed to read Secret {namespace}/{secret_name}: {e}"
                ))
            })?;
        let ca = self
            .client
            .get_config_map(namespace, &ca_name)
            .await
            .map_err(|e| {
                HandlerError::CertNotAvailable(format!(
                    "failed to read ConfigMap {namespace}/{ca_name}: {e}"
                ))
            })?;

        Ok(CertBundle::from_objects(secret.as_ref(), ca.as_ref()))
    }
}

#[async_trait]
impl Handler for CertReadyHandler {
    fn name(&self) -> &'static str {
        "cert-ready"
    }

    async fn handle(
        &self,
        ctx: &mut ReconcileContext,
        obj: &mut RunOnceDurationOverride,
    ) -> Result<Step, HandlerError> {
        let bundle = match ctx.bundle.clone() {
            Some(bundle) => bundle,
            None => self.load(ctx).await?,
        };

        bundle
            .validate()
            .map_err(|e| HandlerError::CertNotAvailable(format!("serving bundle incomplete: {e}")))?;

        let hash = bundle.hash();
        debug!("Serving bundle hash {}", hash);
        obj.status_mut().hash.serving_cert = hash;
        ctx.bundle = Some(bundle);

        Ok(Step::Continue)
    }
}
