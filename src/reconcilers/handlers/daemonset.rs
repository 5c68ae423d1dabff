// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use super::refresh_reference;
use crate::assets::Assets;
use crate::client::ClusterClient;
use crate::crd::{RunOnceDurationOverride, RunOnceDurationOverrideStatus};
use crate::handler_errors::HandlerError;
use crate::hashing::observed_config_hash;
use crate::metrics;
use crate::reconcilers::apply::{Applier, ApplyError, ManagedObject};
use crate::reconcilers::daemonset::{generation_drifted, DaemonSetFacade};
use crate::reconcilers::pipeline::{Handler, ReconcileContext, Step};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::admissionregistration::v1::MutatingWebhookConfiguration;
use kube::api::ObjectMeta;
use kube::Resource;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Why the operand `DaemonSet` is re-applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonSetTrigger {
    Missing,
    ConfigurationHash,
    ServingCertHash,
    ObservedConfigHash,
    Image,
    GenerationDrift,
}

impl fmt::Display for DaemonSetTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Missing => "missing",
            Self::ConfigurationHash => "configuration hash changed",
            Self::ServingCertHash => "serving certificate hash changed",
            Self::ObservedConfigHash => "observed configuration hash changed",
            Self::Image => "image changed",
            Self::GenerationDrift => "generation drifted",
        })
    }
}

/// First reason the live `DaemonSet` must be re-applied, if any.
#[must_use]
pub fn apply_trigger(
    live: Option<&DaemonSet>,
    assets: &Assets<'_>,
    status: &RunOnceDurationOverrideStatus,
    observed_hash: &str,
    image: &str,
) -> Option<DaemonSetTrigger> {
    let Some(live) = live else {
        return Some(DaemonSetTrigger::Missing);
    };

    let annotation = |key: String| {
        live.metadata
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(&key))
            .map(String::as_str)
            .unwrap_or_default()
    };

    if annotation(assets.configuration_hash_annotation()) != status.hash.configuration {
        return Some(DaemonSetTrigger::ConfigurationHash);
    }
    if annotation(assets.serving_cert_hash_annotation()) != status.hash.serving_cert {
        return Some(DaemonSetTrigger::ServingCertHash);
    }
    if annotation(assets.observed_config_hash_annotation()) != observed_hash {
        return Some(DaemonSetTrigger::ObservedConfigHash);
    }

    let live_image = live
        .spec
        .as_ref()
        .and_then(|spec| spec.template.spec.as_ref())
        .and_then(|pod| pod.containers.first())
        .and_then(|container| container.image.as_deref());
    if live_image != Some(image) {
        return Some(DaemonSetTrigger::Image);
    }

    if generation_drifted(&status.generations, live) {
        return Some(DaemonSetTrigger::GenerationDrift);
    }

    None
}

fn stamp(meta: &mut ObjectMeta, annotations: &BTreeMap<String, String>) {
    meta.annotations
        .get_or_insert_with(BTreeMap::new)
        .extend(annotations.iter().map(|(k, v)| (k.clone(), v.clone())));
}

/// Installs RBAC, the `Service`, and the operand `DaemonSet`.
///
/// Re-applying the `DaemonSet` first removes the webhook registration so the
/// API server picks up the new CA once the rollout completes.
pub struct DaemonSetHandler {
    client: Arc<dyn ClusterClient>,
    applier: Applier,
    facade: DaemonSetFacade,
}

impl DaemonSetHandler {
    #[must_use]
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self {
            applier: Applier::new(client.clone()),
            facade: DaemonSetFacade::new(client.clone()),
            client,
        }
    }

    async fn ensure_all<K: ManagedObject>(&self, objects: Vec<K>) -> Result<(), ApplyError> {
        for object in &objects {
            self.applier.ensure(object).await?;
        }
        Ok(())
    }

    async fn ensure_rbac(&self, assets: &Assets<'_>) -> Result<(), ApplyError> {
        self.applier.ensure(&assets.service_account()).await?;
        self.ensure_all(assets.roles()).await?;
        self.ensure_all(assets.role_bindings()).await?;
        self.ensure_all(assets.cluster_roles()).await?;
        self.ensure_all(assets.cluster_role_bindings()).await
    }
}

#[async_trait]
impl Handler for DaemonSetHandler {
    fn name(&self) -> &'static str {
        "daemonset"
    }

    async fn handle(
        &self,
        ctx: &mut ReconcileContext,
        obj: &mut RunOnceDurationOverride,
    ) -> Result<Step, HandlerError> {
        let assets = ctx.assets();
        let namespace = ctx.operand.namespace();
        let name = assets.daemon_set_name();

        self.ensure_rbac(&assets)
            .await
            .map_err(|e| HandlerError::InternalError(format!("failed to ensure RBAC: {e}")))?;
        let service = self
            .applier
            .ensure(&assets.service())
            .await
            .map_err(|e| HandlerError::InternalError(e.to_string()))?
            .object;

        let live = self.facade.get(namespace, &name).await.map_err(|e| {
            HandlerError::InternalError(format!("failed to read DaemonSet {namespace}/{name}: {e}"))
        })?;

        let observed_hash = observed_config_hash(&obj.spec);
        let verbosity = obj.spec.operand_verbosity();
        let status = obj.status_mut();
        refresh_reference(&mut status.resources.service_ref, &service)?;

        let Some(trigger) = apply_trigger(
            live.as_ref(),
            &assets,
            status,
            &observed_hash,
            ctx.operand.image(),
        ) else {
            debug!("DaemonSet {}/{} is in sync", namespace, name);
            if let Some(live) = &live {
                refresh_reference(&mut status.resources.deployment_ref, live)?;
            }
            return Ok(Step::Continue);
        };

        info!("Applying DaemonSet {}/{}: {}", namespace, name, trigger);

        let webhook_name = assets.mutating_webhook_configuration_name();
        self.client
            .delete_mutating_webhook_configuration(webhook_name)
            .await
            .map_err(|e| {
                HandlerError::InternalError(format!(
                    "failed to delete MutatingWebhookConfiguration {webhook_name}: {e}"
                ))
            })?;
        if status.resources.mutating_webhook_configuration_ref.take().is_some() {
            metrics::record_resource_deleted(&MutatingWebhookConfiguration::kind(&()));
        }

        let mut annotations = BTreeMap::from([
            (
                assets.configuration_hash_annotation(),
                status.hash.configuration.clone(),
            ),
            (
                assets.serving_cert_hash_annotation(),
                status.hash.serving_cert.clone(),
            ),
            (assets.observed_config_hash_annotation(), observed_hash.clone()),
        ]);
        let parent_annotations = annotations.clone();
        annotations.insert(
            assets.owner_annotation(),
            ctx.operand.singleton_name().to_string(),
        );

        let applied = self
            .facade
            .ensure(
                assets.daemon_set(verbosity),
                move |meta| stamp(meta, &parent_annotations),
                move |meta| stamp(meta, &annotations),
                &mut status.generations,
            )
            .await
            .map_err(|e| HandlerError::InternalError(e.to_string()))?;

        status.hash.observed_config = observed_hash;
        refresh_reference(&mut status.resources.deployment_ref, &applied.object)?;

        Ok(Step::Continue)
    }
}

#[cfg(test)]
#[path = "daemonset_tests.rs"]
mod daemonset_tests;
