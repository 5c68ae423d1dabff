// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use super::refresh_reference;
use crate::cert::{self, format_rotate_at, parse_rotate_at, CertConfig};
use crate::client::ClusterClient;
use crate::constants::{SERVICE_CA_KEY, TLS_CERT, TLS_KEY};
use crate::crd::RunOnceDurationOverride;
use crate::handler_errors::HandlerError;
use crate::metrics;
use crate::reconcilers::apply::Applier;
use crate::reconcilers::pipeline::{Handler, ReconcileContext, Step};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Why a new serving bundle is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationReason {
    SecretMissing,
    CaMissing,
    SecretNotPopulated,
    NoRotationTime,
    RotationDue,
}

impl RotationReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SecretMissing => "SecretMissing",
            Self::CaMissing => "CaMissing",
            Self::SecretNotPopulated => "SecretNotPopulated",
            Self::NoRotationTime => "NoRotationTime",
            Self::RotationDue => "RotationDue",
        }
    }
}

impl fmt::Display for RotationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn has_data(secret: &Secret, key: &str) -> bool {
    secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .is_some_and(|bytes| !bytes.0.is_empty())
}

/// Decide whether the serving bundle must be (re)generated.
#[must_use]
pub fn rotation_reason(
    secret: Option<&Secret>,
    ca: Option<&ConfigMap>,
    rotate_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<RotationReason> {
    let Some(secret) = secret else {
        return Some(RotationReason::SecretMissing);
    };
    let ca_populated = ca
        .and_then(|cm| cm.data.as_ref())
        .and_then(|data| data.get(SERVICE_CA_KEY))
        .is_some_and(|pem| !pem.is_empty());
    if !ca_populated {
        return Some(RotationReason::CaMissing);
    }
    if !has_data(secret, TLS_KEY) || !has_data(secret, TLS_CERT) {
        return Some(RotationReason::SecretNotPopulated);
    }
    match rotate_at {
        None => Some(RotationReason::NoRotationTime),
        Some(at) if now >= at => Some(RotationReason::RotationDue),
        Some(_) => None,
    }
}

/// Generates the serving certificate and CA on first install and rotation.
pub struct CertGenerationHandler {
    client: Arc<dyn ClusterClient>,
    applier: Applier,
    config: CertConfig,
}

impl CertGenerationHandler {
    #[must_use]
    pub fn new(client: Arc<dyn ClusterClient>, config: CertConfig) -> Self {
        let applier = Applier::new(client.clone());
        Self {
            client,
            applier,
            config,
        }
    }
}

#[async_trait]
impl Handler for CertGenerationHandler {
    fn name(&self) -> &'static str {
        "cert-generation"
    }

    async fn handle(
        &self,
        ctx: &mut ReconcileContext,
        obj: &mut RunOnceDurationOverride,
    ) -> Result<Step, HandlerError> {
        let assets = ctx.assets();
        let namespace = ctx.operand.namespace();
        let secret_name = assets.serving_cert_secret_name();
        let ca_name = assets.service_ca_config_map_name();

        let secret = self
            .client
            .get_secret(namespace, &secret_name)
            .await
            .map_err(|e| {
                HandlerError::CannotGenerateCert(format!(
                    "failed to read Secret {namespace}/{secret_name}: {e}"
                ))
            })?;
        let ca = self
            .client
            .get_config_map(namespace, &ca_name)
            .await
            .map_err(|e| {
                HandlerError::CannotGenerateCert(format!(
                    "failed to read ConfigMap {namespace}/{ca_name}: {e}"
                ))
            })?;

        let status = obj.status_mut();
        let rotate_at = parse_rotate_at(status.certs_rotate_at.as_deref());

        let Some(reason) = rotation_reason(secret.as_ref(), ca.as_ref(), rotate_at, ctx.now)
        else {
            debug!("Serving certificate valid until rotation at {:?}", rotate_at);
            if let Some(secret) = &secret {
                refresh_reference(&mut status.resources.service_cert_secret_ref, secret)?;
            }
            if let Some(ca) = &ca {
                refresh_reference(&mut status.resources.service_ca_config_map_ref, ca)?;
            }
            return Ok(Step::Continue);
        };

        info!("Generating serving certificate ({})", reason);
        let generated = cert::generate(&ctx.operand.service_dns_names(), ctx.now, &self.config)
            .map_err(|e| HandlerError::CannotGenerateCert(e.to_string()))?;

        let secret = self
            .applier
            .ensure(&assets.serving_cert_secret(&generated.bundle))
            .await
            .map_err(|e| HandlerError::CannotGenerateCert(e.to_string()))?
            .object;
        let ca = self
            .applier
            .ensure(&assets.service_ca_config_map(&generated.bundle))
            .await
            .map_err(|e| HandlerError::CannotGenerateCert(e.to_string()))?
            .object;

        metrics::record_cert_rotation(reason.as_str());
        info!(
            "Serving certificate valid until {}, rotating at {}",
            generated.not_after, generated.rotate_at
        );

        status.certs_rotate_at = Some(format_rotate_at(generated.rotate_at));
        refresh_reference(&mut status.resources.service_cert_secret_ref, &secret)?;
        refresh_reference(&mut status.resources.service_ca_config_map_ref, &ca)?;
        ctx.bundle = Some(generated.bundle);

        Ok(Step::Continue)
    }
}

#[cfg(test)]
#[path = "cert_generation_tests.rs"]
mod cert_generation_tests;
