// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use crate::crd::RunOnceDurationOverride;
use crate::handler_errors::HandlerError;
use crate::reconcilers::pipeline::{Handler, ReconcileContext, Step};
use async_trait::async_trait;

/// Rejects a spec the operand cannot enforce.
pub struct ValidationHandler;

#[async_trait]
impl Handler for ValidationHandler {
    fn name(&self) -> &'static str {
        "validation"
    }

    async fn handle(
        &self,
        _ctx: &mut ReconcileContext,
        obj: &mut RunOnceDurationOverride,
    ) -> Result<Step, HandlerError> {
        let active_deadline_seconds = obj.spec.config().active_deadline_seconds;
        if active_deadline_seconds < 0 {
            return Err(HandlerError::InvalidParameters(format!(
                "spec.runOnceDurationOverride.spec.activeDeadlineSeconds must be >= 0, got {active_deadline_seconds}"
            )));
        }

        Ok(Step::Continue)
    }
}
