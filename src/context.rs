// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context handed to the controller's reconcile and error callbacks.

use crate::reconcilers::retry::RequeueLimiter;
use crate::reconcilers::Reconciler;
use std::time::Duration;

/// Shared context passed to the controller.
///
/// Holds the singleton reconciler and the per-key failure counter that turns
/// repeated errors into a growing requeue delay.
pub struct Context {
    /// Runs the pipeline and persists status
    pub reconciler: Reconciler,

    /// Rate limiter for failed and explicitly rate-limited reconciliations
    pub limiter: RequeueLimiter,
}

impl Context {
    #[must_use]
    pub fn new(reconciler: Reconciler, limiter: RequeueLimiter) -> Self {
        Self {
            reconciler,
            limiter,
        }
    }

    /// Delay before the next attempt after a failure of `key`.
    #[must_use]
    pub fn failure_delay(&self, key: &str) -> Duration {
        self.limiter.next_delay(key)
    }

    /// Reset the failure backoff of `key` after a success.
    pub fn succeeded(&self, key: &str) {
        self.limiter.forget(key);
    }
}
