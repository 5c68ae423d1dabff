// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status conditions and the optimistic status writer.
//!
//! # Condition Format
//!
//! Conditions follow the standard Kubernetes format:
//! - `type`: The aspect being reported (`Available`, `InstallReadinessFailure`)
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp of the last change
//!
//! `lastTransitionTime` only moves when status, reason, or message change, so
//! an idempotent reconciliation yields a byte-identical status and the writer
//! skips the API call.
//!
//! # Status Writer
//!
//! [`StatusWriter::update`] reads the singleton from the informer cache,
//! applies a mutator to a copy of its status, and writes it back guarded by
//! `resourceVersion`. On conflict it retries; if the cache still serves the
//! `resourceVersion` that just conflicted it falls back to a quorum read.
//!
//! ```rust,ignore
//! use rodoo::reconcilers::status::{set_condition, StatusWriter};
//!
//! let outcome = writer
//!     .update("cluster", |status| {
//!         set_condition(&mut status.conditions, "Available", "True", "AsExpected", "", now);
//!     })
//!     .await?;
//! ```

use crate::client::{ClusterClient, SingletonLister};
use crate::constants::CONFLICT_RETRY_ATTEMPTS;
use crate::crd::{Condition, RunOnceDurationOverride, RunOnceDurationOverrideStatus};
use crate::metrics;
use crate::reconcilers::retry::{conflict_backoff, is_conflict};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Create a new condition stamped with `now`.
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
    now: DateTime<Utc>,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(now.to_rfc3339()),
    }
}

/// Find a condition by type.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Update or add a condition in place (no API call).
///
/// `lastTransitionTime` is preserved unless status, reason, or message change.
/// Returns `true` if the condition changed.
pub fn set_condition(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
    now: DateTime<Utc>,
) -> bool {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let unchanged = existing.status == status
            && existing.reason.as_deref() == Some(reason)
            && existing.message.as_deref() == Some(message);
        if unchanged && existing.last_transition_time.is_some() {
            return false;
        }

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(now.to_rfc3339());
        return true;
    }

    conditions.push(create_condition(
        condition_type,
        status,
        reason,
        message,
        now,
    ));
    true
}

/// Compare two condition lists ignoring order and `lastTransitionTime`.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    if current.len() != new.len() {
        return false;
    }

    new.iter().all(|new_cond| {
        find_condition(current, &new_cond.r#type).is_some_and(|curr_cond| {
            curr_cond.status == new_cond.status
                && curr_cond.reason == new_cond.reason
                && curr_cond.message == new_cond.message
        })
    })
}

/// Carry the result of a reconciliation onto a freshly observed status.
///
/// Every field the pipeline owns is copied; conditions go through
/// [`set_condition`] so the observed `lastTransitionTime`s survive when
/// nothing changed.
pub fn merge_reconciled(
    observed: &mut RunOnceDurationOverrideStatus,
    reconciled: &RunOnceDurationOverrideStatus,
    now: DateTime<Utc>,
) {
    for condition in &reconciled.conditions {
        set_condition(
            &mut observed.conditions,
            &condition.r#type,
            &condition.status,
            condition.reason.as_deref().unwrap_or_default(),
            condition.message.as_deref().unwrap_or_default(),
            now,
        );
    }

    observed.observed_generation = reconciled.observed_generation;
    observed.generations.clone_from(&reconciled.generations);
    observed.version.clone_from(&reconciled.version);
    observed.image.clone_from(&reconciled.image);
    observed.certs_rotate_at.clone_from(&reconciled.certs_rotate_at);
    observed.resources.clone_from(&reconciled.resources);
    observed.hash.clone_from(&reconciled.hash);
}

/// Errors returned by the status writer.
#[derive(Error, Debug)]
pub enum StatusError {
    #[error("failed to read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("failed to update status of {name}: {source}")]
    Update {
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("{name} has no resourceVersion")]
    MissingResourceVersion { name: String },
}

/// Outcome of [`StatusWriter::update`].
#[derive(Debug, Clone)]
pub enum StatusOutcome {
    /// The status was written; carries the server's copy.
    Written(Box<RunOnceDurationOverride>),
    /// The mutated status equals the observed one; nothing was written.
    Unchanged,
    /// The singleton no longer exists.
    Gone,
}

/// Optimistic, retry-on-conflict writer of the singleton's `.status`.
#[derive(Clone)]
pub struct StatusWriter {
    client: Arc<dyn ClusterClient>,
    lister: Arc<dyn SingletonLister>,
}

impl StatusWriter {
    #[must_use]
    pub fn new(client: Arc<dyn ClusterClient>, lister: Arc<dyn SingletonLister>) -> Self {
        Self { client, lister }
    }

    async fn observe(
        &self,
        name: &str,
        previous_resource_version: Option<&str>,
    ) -> Result<Option<RunOnceDurationOverride>, StatusError> {
        let cached = self.lister.get(name);

        let stale = match (&cached, previous_resource_version) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(obj), Some(previous)) => obj.metadata.resource_version.as_deref() == Some(previous),
        };
        if !stale {
            return Ok(cached);
        }

        debug!(
            "Cache for {} is stale (previous resourceVersion {:?}), reading from the API server",
            name, previous_resource_version
        );
        self.client
            .get_run_once_duration_override(name)
            .await
            .map_err(|source| StatusError::Read {
                name: name.to_string(),
                source,
            })
    }

    /// Apply `mutate` to the singleton's status and persist it.
    ///
    /// `mutate` runs once per attempt against the latest observed status.
    ///
    /// # Errors
    ///
    /// Returns [`StatusError`] on read failures, non-conflict write failures,
    /// or when conflicts persist past the retry budget.
    pub async fn update<F>(&self, name: &str, mut mutate: F) -> Result<StatusOutcome, StatusError>
    where
        F: FnMut(&mut RunOnceDurationOverrideStatus) + Send,
    {
        let mut backoff = conflict_backoff();
        let mut previous_resource_version: Option<String> = None;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let Some(observed) = self.observe(name, previous_resource_version.as_deref()).await?
            else {
                debug!("{} no longer exists, skipping status update", name);
                return Ok(StatusOutcome::Gone);
            };

            let resource_version = observed.metadata.resource_version.clone().ok_or_else(|| {
                StatusError::MissingResourceVersion {
                    name: name.to_string(),
                }
            })?;

            let current = observed.status.clone().unwrap_or_default();
            let mut desired = current.clone();
            mutate(&mut desired);

            if desired == current {
                debug!("{} status unchanged, skipping update", name);
                metrics::record_status_update("skipped");
                return Ok(StatusOutcome::Unchanged);
            }

            let mut replacement = observed;
            replacement.status = Some(desired);

            match self
                .client
                .update_run_once_duration_override_status(&replacement)
                .await
            {
                Ok(updated) => {
                    debug!(
                        "Updated {} status: {} condition(s)",
                        name,
                        replacement.status.as_ref().map_or(0, |s| s.conditions.len())
                    );
                    metrics::record_status_update("written");
                    return Ok(StatusOutcome::Written(Box::new(updated)));
                }
                Err(e) if is_conflict(&e) && attempt < CONFLICT_RETRY_ATTEMPTS => {
                    metrics::record_status_update("conflict");
                    let delay = backoff.next_backoff().unwrap_or(backoff.max_interval);
                    warn!(
                        "Conflict updating {} status at resourceVersion {} (attempt {}), retrying in {:?}",
                        name, resource_version, attempt, delay
                    );
                    previous_resource_version = Some(resource_version);
                    tokio::time::sleep(delay).await;
                }
                Err(source) => {
                    metrics::record_status_update("error");
                    return Err(StatusError::Update {
                        name: name.to_string(),
                        source,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
