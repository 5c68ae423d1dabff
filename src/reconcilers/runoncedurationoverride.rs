// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Reconciliation of the `RunOnceDurationOverride` singleton.
//!
//! One call runs the handler pipeline over a copy of the singleton, then
//! persists the copy's status through the [`StatusWriter`] whether the
//! pipeline completed, requeued, or failed. Objects not named after the
//! singleton are ignored.

use crate::assets::build_owner_reference;
use crate::cert::parse_rotate_at;
use crate::constants::KIND_RUN_ONCE_DURATION_OVERRIDE;
use crate::crd::RunOnceDurationOverride;
use crate::handler_errors::HandlerError;
use crate::metrics;
use crate::operand::OperandContext;
use crate::reconcilers::pipeline::{Pipeline, PipelineOutcome, ReconcileContext};
use crate::reconcilers::status::{merge_reconciled, StatusError, StatusOutcome, StatusWriter};
use chrono::{DateTime, Utc};
use kube::ResourceExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors returned by [`Reconciler::reconcile`].
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("handler {handler} failed: {source}")]
    Handler {
        handler: &'static str,
        #[source]
        source: HandlerError,
    },

    #[error(transparent)]
    Status(#[from] StatusError),
}

/// What the work queue should do with the key next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Not the singleton; nothing was done.
    Ignored,
    /// The install is complete; check again after `requeue_after`.
    Synced { requeue_after: Duration },
    /// A handler asked to be called again after a fixed delay.
    RequeueAfter(Duration),
    /// A handler asked to be called again with the failure backoff.
    RequeueRateLimited,
}

/// Runs the pipeline for the singleton and persists its status.
pub struct Reconciler {
    operand: Arc<OperandContext>,
    pipeline: Pipeline,
    writer: StatusWriter,
    resync: Duration,
}

impl Reconciler {
    #[must_use]
    pub fn new(
        operand: Arc<OperandContext>,
        pipeline: Pipeline,
        writer: StatusWriter,
        resync: Duration,
    ) -> Self {
        Self {
            operand,
            pipeline,
            writer,
            resync,
        }
    }

    #[must_use]
    pub fn operand(&self) -> &OperandContext {
        &self.operand
    }

    /// Delay until the next check of a healthy install.
    ///
    /// The earlier of the resync period and the certificate rotation time,
    /// never negative.
    #[must_use]
    pub fn next_check(&self, certs_rotate_at: Option<&str>, now: DateTime<Utc>) -> Duration {
        match parse_rotate_at(certs_rotate_at) {
            Some(at) => (at - now).to_std().unwrap_or(Duration::ZERO).min(self.resync),
            None => self.resync,
        }
    }

    /// Reconcile `obj` as observed at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Handler`] when a handler failed (its
    /// condition has been persisted) and [`ReconcileError::Status`] when the
    /// status could not be written.
    pub async fn reconcile(
        &self,
        obj: &RunOnceDurationOverride,
        now: DateTime<Utc>,
    ) -> Result<Verdict, ReconcileError> {
        let name = obj.name_any();
        if name != self.operand.singleton_name() {
            debug!(
                "Ignoring {} {}, only {} is honored",
                KIND_RUN_ONCE_DURATION_OVERRIDE,
                name,
                self.operand.singleton_name()
            );
            metrics::record_reconciliation_ignored(KIND_RUN_ONCE_DURATION_OVERRIDE);
            return Ok(Verdict::Ignored);
        }

        let start = Instant::now();
        info!("Reconciling {} {}", KIND_RUN_ONCE_DURATION_OVERRIDE, name);

        let mut working = obj.clone();
        let mut ctx = ReconcileContext::new(self.operand.clone(), build_owner_reference(obj), now);
        let outcome = self.pipeline.run(&mut ctx, &mut working).await;

        if outcome == PipelineOutcome::Completed {
            working.status_mut().observed_generation = obj.metadata.generation;
        }
        let reconciled = working.status_mut().clone();

        let written = self
            .writer
            .update(&name, |status| merge_reconciled(status, &reconciled, now))
            .await;
        match written {
            Ok(StatusOutcome::Written(_)) => debug!("Persisted status of {}", name),
            Ok(StatusOutcome::Unchanged) => {}
            Ok(StatusOutcome::Gone) => {
                debug!("{} was deleted during reconciliation", name);
                metrics::record_reconciliation_ignored(KIND_RUN_ONCE_DURATION_OVERRIDE);
                return Ok(Verdict::Ignored);
            }
            Err(e) => {
                warn!("Failed to persist status of {}: {}", name, e);
                metrics::record_reconciliation_error(KIND_RUN_ONCE_DURATION_OVERRIDE, start.elapsed());
                return Err(e.into());
            }
        }

        match outcome {
            PipelineOutcome::Completed => {
                let requeue_after = self.next_check(reconciled.certs_rotate_at.as_deref(), now);
                info!(
                    "Reconciled {} {}, next check in {:?}",
                    KIND_RUN_ONCE_DURATION_OVERRIDE, name, requeue_after
                );
                metrics::record_reconciliation_success(KIND_RUN_ONCE_DURATION_OVERRIDE, start.elapsed());
                Ok(Verdict::Synced { requeue_after })
            }
            PipelineOutcome::Requeue { handler, after } => {
                metrics::record_reconciliation_requeue(KIND_RUN_ONCE_DURATION_OVERRIDE, handler);
                Ok(match after {
                    Some(delay) if !delay.is_zero() => Verdict::RequeueAfter(delay),
                    _ => Verdict::RequeueRateLimited,
                })
            }
            PipelineOutcome::Failed { handler, error } => {
                metrics::record_reconciliation_error(KIND_RUN_ONCE_DURATION_OVERRIDE, start.elapsed());
                Err(ReconcileError::Handler {
                    handler,
                    source: error,
                })
            }
        }
    }
}

#[cfg(test)]
#[path = "runoncedurationoverride_tests.rs"]
mod runoncedurationoverride_tests;
