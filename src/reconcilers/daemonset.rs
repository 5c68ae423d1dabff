// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Lifecycle facade for the operand `DaemonSet`.
//!
//! Wraps reads, the availability rule, and applies that track the generation
//! the API server assigned, so a change made behind the operator's back
//! (which bumps `metadata.generation`) is detected on the next cycle.

use crate::client::ClusterClient;
use crate::crd::GenerationStatus;
use crate::reconcilers::apply::{Applied, ApplyError, Applier};
use k8s_openapi::api::apps::v1::DaemonSet;
use kube::api::ObjectMeta;
use kube::ResourceExt;
use std::sync::Arc;
use tracing::debug;

const DAEMON_SET_GROUP: &str = "apps";
const DAEMON_SET_RESOURCE: &str = "daemonsets";

/// Result of probing the operand `DaemonSet`.
#[derive(Debug, Clone)]
pub enum DaemonSetProbe {
    Available(Box<DaemonSet>),
    NotAvailable(Box<DaemonSet>),
    NotFound,
}

/// True when the rollout is complete and every scheduled pod is available.
///
/// Requires `observedGeneration == generation`,
/// `desiredNumberScheduled == currentNumberScheduled == numberAvailable`,
/// `numberUnavailable == 0`, and at least one scheduled pod.
#[must_use]
pub fn is_available(ds: &DaemonSet) -> bool {
    let Some(status) = ds.status.as_ref() else {
        return false;
    };

    let generation_observed = ds.metadata.generation.is_some()
        && status.observed_generation == ds.metadata.generation;
    let available = status.number_available.unwrap_or(0);
    let unavailable = status.number_unavailable.unwrap_or(0);

    generation_observed
        && status.desired_number_scheduled > 0
        && status.desired_number_scheduled == status.current_number_scheduled
        && status.desired_number_scheduled == available
        && unavailable == 0
}

fn is_entry_for(entry: &GenerationStatus, namespace: &str, name: &str) -> bool {
    entry.group == DAEMON_SET_GROUP
        && entry.resource == DAEMON_SET_RESOURCE
        && entry.namespace == namespace
        && entry.name == name
}

/// Generation recorded for `ds` by the last apply, if any.
#[must_use]
pub fn expected_generation(generations: &[GenerationStatus], ds: &DaemonSet) -> Option<i64> {
    let namespace = ds.namespace().unwrap_or_default();
    let name = ds.name_any();
    generations
        .iter()
        .find(|entry| is_entry_for(entry, &namespace, &name))
        .map(|entry| entry.last_generation)
}

/// Record the generation of a freshly applied `ds`.
pub fn set_expected_generation(generations: &mut Vec<GenerationStatus>, ds: &DaemonSet) {
    let namespace = ds.namespace().unwrap_or_default();
    let name = ds.name_any();
    let generation = ds.metadata.generation.unwrap_or_default();

    if let Some(entry) = generations
        .iter_mut()
        .find(|entry| is_entry_for(entry, &namespace, &name))
    {
        entry.last_generation = generation;
        return;
    }

    generations.push(GenerationStatus {
        group: DAEMON_SET_GROUP.to_string(),
        resource: DAEMON_SET_RESOURCE.to_string(),
        namespace,
        name,
        last_generation: generation,
        hash: None,
    });
}

/// True when the live generation moved past the one recorded at apply time.
#[must_use]
pub fn generation_drifted(generations: &[GenerationStatus], live: &DaemonSet) -> bool {
    match expected_generation(generations, live) {
        Some(expected) => live.metadata.generation != Some(expected),
        None => false,
    }
}

/// Facade over the operand `DaemonSet`.
#[derive(Clone)]
pub struct DaemonSetFacade {
    client: Arc<dyn ClusterClient>,
    applier: Applier,
}

impl DaemonSetFacade {
    #[must_use]
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        let applier = Applier::new(client.clone());
        Self { client, applier }
    }

    /// Read the live `DaemonSet`.
    ///
    /// # Errors
    ///
    /// Returns the API error for anything but not-found.
    pub async fn get(&self, namespace: &str, name: &str) -> Result<Option<DaemonSet>, kube::Error> {
        self.client.get_daemon_set(namespace, name).await
    }

    /// Read the live `DaemonSet` and classify it.
    ///
    /// # Errors
    ///
    /// Returns the API error for anything but not-found.
    pub async fn probe(&self, namespace: &str, name: &str) -> Result<DaemonSetProbe, kube::Error> {
        Ok(match self.get(namespace, name).await? {
            None => DaemonSetProbe::NotFound,
            Some(ds) if is_available(&ds) => DaemonSetProbe::Available(Box::new(ds)),
            Some(ds) => DaemonSetProbe::NotAvailable(Box::new(ds)),
        })
    }

    /// Apply `desired` after running the two mutators.
    ///
    /// `parent` stamps the `DaemonSet` object's metadata, `child` stamps the
    /// pod template's metadata. The generation returned by the API server is
    /// recorded in `generations`.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError`] when the apply fails; `generations` is left
    /// untouched in that case.
    pub async fn ensure<P, C>(
        &self,
        mut desired: DaemonSet,
        parent: P,
        child: C,
        generations: &mut Vec<GenerationStatus>,
    ) -> Result<Applied<DaemonSet>, ApplyError>
    where
        P: FnOnce(&mut ObjectMeta) + Send,
        C: FnOnce(&mut ObjectMeta) + Send,
    {
        parent(&mut desired.metadata);
        if let Some(spec) = desired.spec.as_mut() {
            child(spec.template.metadata.get_or_insert_with(ObjectMeta::default));
        }

        let expected = expected_generation(generations, &desired);
        let applied = self
            .applier
            .ensure_with_generation(&desired, expected)
            .await?;

        debug!(
            "DaemonSet {} at generation {:?} (expected {:?})",
            applied.object.name_any(),
            applied.object.metadata.generation,
            expected
        );
        set_expected_generation(generations, &applied.object);

        Ok(applied)
    }
}

#[cfg(test)]
#[path = "daemonset_tests.rs"]
mod daemonset_tests;
