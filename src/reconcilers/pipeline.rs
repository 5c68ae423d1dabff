// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The ordered handler chain that reconciles the singleton.
//!
//! Each [`Handler`] works on an in-memory copy of the singleton and may apply
//! children in-cluster. A handler either lets the chain continue, asks for a
//! requeue (which halts the chain without error), or fails with a
//! [`HandlerError`]; the failure is recorded as a condition on the copy and
//! the chain stops. The caller persists the copy's status afterwards in every
//! case.

use crate::assets::Assets;
use crate::cert::{CertBundle, CertConfig};
use crate::client::ClusterClient;
use crate::crd::RunOnceDurationOverride;
use crate::handler_errors::HandlerError;
use crate::metrics;
use crate::operand::OperandContext;
use crate::reconcilers::handlers::{
    AvailabilityHandler, CertGenerationHandler, CertReadyHandler, ConfigurationHandler,
    DaemonSetHandler, DeploymentReadyHandler, ValidationHandler, WebhookConfigurationHandler,
};
use crate::reconcilers::status::set_condition;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// What the pipeline does after a handler succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// Halt and requeue; `None` uses the rate-limited backoff.
    Requeue(Option<Duration>),
}

/// Per-reconciliation scratchpad handed to every handler.
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    pub operand: Arc<OperandContext>,
    /// Owner reference to the singleton, stamped on every child.
    pub owner: Option<OwnerReference>,
    /// Serving bundle, set by certificate generation or loading.
    pub bundle: Option<CertBundle>,
    /// Clock reading used for every time decision in this reconciliation.
    pub now: DateTime<Utc>,
}

impl ReconcileContext {
    #[must_use]
    pub fn new(
        operand: Arc<OperandContext>,
        owner: Option<OwnerReference>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            operand,
            owner,
            bundle: None,
            now,
        }
    }

    #[must_use]
    pub fn assets(&self) -> Assets<'_> {
        Assets::new(&self.operand, self.owner.as_ref())
    }
}

/// One step of the reconciliation.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Short name used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn handle(
        &self,
        ctx: &mut ReconcileContext,
        obj: &mut RunOnceDurationOverride,
    ) -> Result<Step, HandlerError>;
}

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Completed,
    Requeue {
        handler: &'static str,
        after: Option<Duration>,
    },
    Failed {
        handler: &'static str,
        error: HandlerError,
    },
}

/// An ordered list of handlers.
pub struct Pipeline {
    handlers: Vec<Box<dyn Handler>>,
}

impl Pipeline {
    #[must_use]
    pub fn new(handlers: Vec<Box<dyn Handler>>) -> Self {
        Self { handlers }
    }

    /// The production handler order.
    #[must_use]
    pub fn standard(client: Arc<dyn ClusterClient>, cert_config: CertConfig) -> Self {
        Self::new(vec![
            Box::new(AvailabilityHandler::pre(client.clone())),
            Box::new(ValidationHandler),
            Box::new(ConfigurationHandler::new(client.clone())),
            Box::new(CertGenerationHandler::new(client.clone(), cert_config)),
            Box::new(CertReadyHandler::new(client.clone())),
            Box::new(DaemonSetHandler::new(client.clone())),
            Box::new(DeploymentReadyHandler::new(client.clone())),
            Box::new(WebhookConfigurationHandler::new(client.clone())),
            Box::new(AvailabilityHandler::post(client)),
        ])
    }

    /// Handler names in execution order.
    #[must_use]
    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Run the handlers in order over `obj`.
    pub async fn run(
        &self,
        ctx: &mut ReconcileContext,
        obj: &mut RunOnceDurationOverride,
    ) -> PipelineOutcome {
        for handler in &self.handlers {
            debug!("Running handler {}", handler.name());

            match handler.handle(ctx, obj).await {
                Ok(Step::Continue) => {}
                Ok(Step::Requeue(after)) => {
                    debug!("Handler {} requested requeue after {:?}", handler.name(), after);
                    return PipelineOutcome::Requeue {
                        handler: handler.name(),
                        after,
                    };
                }
                Err(error) => {
                    let verdict = error.condition();
                    warn!(
                        handler = handler.name(),
                        reason = verdict.reason,
                        "Handler failed: {}",
                        error
                    );
                    set_condition(
                        &mut obj.status_mut().conditions,
                        verdict.condition_type,
                        verdict.status,
                        verdict.reason,
                        error.message(),
                        ctx.now,
                    );
                    metrics::record_pipeline_error(handler.name(), verdict.reason);
                    return PipelineOutcome::Failed {
                        handler: handler.name(),
                        error,
                    };
                }
            }
        }

        PipelineOutcome::Completed
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod pipeline_tests;
