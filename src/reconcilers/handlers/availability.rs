// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use crate::client::ClusterClient;
use crate::crd::RunOnceDurationOverride;
use crate::handler_errors::HandlerError;
use crate::reconcilers::daemonset::{DaemonSetFacade, DaemonSetProbe};
use crate::reconcilers::pipeline::{Handler, ReconcileContext, Step};
use crate::reconcilers::status::set_condition;
use crate::status_reasons::{
    CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE, CONDITION_TYPE_AVAILABLE, REASON_AS_EXPECTED,
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Reports `Available` from the operand `DaemonSet`. Never fails the pipeline.
pub struct AvailabilityHandler {
    facade: DaemonSetFacade,
    name: &'static str,
}

impl AvailabilityHandler {
    /// First handler of the chain.
    #[must_use]
    pub fn pre(client: Arc<dyn ClusterClient>) -> Self {
        Self {
            facade: DaemonSetFacade::new(client),
            name: "availability-pre",
        }
    }

    /// Last handler of the chain.
    #[must_use]
    pub fn post(client: Arc<dyn ClusterClient>) -> Self {
        Self {
            facade: DaemonSetFacade::new(client),
            name: "availability-post",
        }
    }
}

#[async_trait]
impl Handler for AvailabilityHandler {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn handle(
        &self,
        ctx: &mut ReconcileContext,
        obj: &mut RunOnceDurationOverride,
    ) -> Result<Step, HandlerError> {
        let namespace = ctx.operand.namespace();
        let name = ctx.operand.name();

        let verdict = match self.facade.probe(namespace, name).await {
            Ok(DaemonSetProbe::Available(_)) => Ok(()),
            Ok(DaemonSetProbe::NotAvailable(ds)) => {
                let (available, desired) = ds
                    .status
                    .as_ref()
                    .map(|s| (s.number_available.unwrap_or(0), s.desired_number_scheduled))
                    .unwrap_or_default();
                Err(HandlerError::AdmissionWebhookNotAvailable(format!(
                    "DaemonSet {namespace}/{name} has {available}/{desired} pods available"
                )))
            }
            Ok(DaemonSetProbe::NotFound) => Err(HandlerError::AdmissionWebhookNotAvailable(
                format!("DaemonSet {namespace}/{name} not found"),
            )),
            Err(e) => Err(HandlerError::InternalError(format!(
                "failed to read DaemonSet {namespace}/{name}: {e}"
            ))),
        };

        // A failed read still only degrades `Available`, whatever the variant maps to.
        let (status, reason, message) = match &verdict {
            Ok(()) => (CONDITION_STATUS_TRUE, REASON_AS_EXPECTED, ""),
            Err(err) => (CONDITION_STATUS_FALSE, err.reason(), err.message()),
        };

        debug!("{}: Available={} ({})", self.name, status, reason);
        set_condition(
            &mut obj.status_mut().conditions,
            CONDITION_TYPE_AVAILABLE,
            status,
            reason,
            message,
            ctx.now,
        );

        Ok(Step::Continue)
    }
}

#[cfg(test)]
#[path = "availability_tests.rs"]
mod availability_tests;
