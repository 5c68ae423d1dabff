// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use crate::client::ClusterClient;
use crate::crd::RunOnceDurationOverride;
use crate::handler_errors::HandlerError;
use crate::reconcilers::daemonset::{DaemonSetFacade, DaemonSetProbe};
use crate::reconcilers::pipeline::{Handler, ReconcileContext, Step};
use crate::reconcilers::status::set_condition;
use crate::status_reasons::{
    CONDITION_STATUS_FALSE, CONDITION_TYPE_INSTALL_READINESS_FAILURE, REASON_AS_EXPECTED,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Halts the chain until the operand rollout completes.
pub struct DeploymentReadyHandler {
    facade: DaemonSetFacade,
}

impl DeploymentReadyHandler {
    #[must_use]
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self {
            facade: DaemonSetFacade::new(client),
        }
    }
}

#[async_trait]
impl Handler for DeploymentReadyHandler {
    fn name(&self) -> &'static str {
        "deployment-ready"
    }

    async fn handle(
        &self,
        ctx: &mut ReconcileContext,
        obj: &mut RunOnceDurationOverride,
    ) -> Result<Step, HandlerError> {
        let namespace = ctx.operand.namespace();
        let name = ctx.operand.name();

        let probe = self.facade.probe(namespace, name).await.map_err(|e| {
            HandlerError::InternalError(format!("failed to read DaemonSet {namespace}/{name}: {e}"))
        })?;

        match probe {
            DaemonSetProbe::Available(_) => {
                debug!("DaemonSet {}/{} is available", namespace, name);
                let status = obj.status_mut();
                set_condition(
                    &mut status.conditions,
                    CONDITION_TYPE_INSTALL_READINESS_FAILURE,
                    CONDITION_STATUS_FALSE,
                    REASON_AS_EXPECTED,
                    "",
                    ctx.now,
                );
                status.image = Some(ctx.operand.image().to_string());
                status.version = Some(ctx.operand.version().to_string());
                Ok(Step::Continue)
            }
            DaemonSetProbe::NotAvailable(ds) => {
                let (available, desired) = ds
                    .status
                    .as_ref()
                    .map(|s| (s.number_available.unwrap_or(0), s.desired_number_scheduled))
                    .unwrap_or_default();
                Err(HandlerError::DeploymentNotReady(format!(
                    "DaemonSet {namespace}/{name} has {available}/{desired} pods available"
                )))
            }
            DaemonSetProbe::NotFound => Err(HandlerError::DeploymentNotReady(format!(
                "DaemonSet {namespace}/{name} not found"
            ))),
        }
    }
}
