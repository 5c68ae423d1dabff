// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Drift-detecting apply of managed children.
//!
//! [`Applier::ensure`] reads the live object, compares it with the desired
//! form, and only server-side applies when they differ. The comparison is a
//! semantic subset check: every field the operator sets must match, while
//! fields the API server populates (defaults, `resourceVersion`, `uid`,
//! `managedFields`, `status`, ...) are ignored.
//!
//! ```text
//! fetch ──► missing ───────────────────────────► apply (created)
//!   │
//!   └─► present ──► subset-equal && generation ok ──► no-op (changed = false)
//!                    │
//!                    └─► otherwise ─────────────────► apply (updated)
//! ```

use crate::client::ClusterClient;
use crate::crd::ResourceReference;
use crate::metrics;
use crate::reconcilers::retry::{is_conflict, retry_on_conflict};
use async_trait::async_trait;
use k8s_openapi::api::admissionregistration::v1::MutatingWebhookConfiguration;
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use k8s_openapi::kube_aggregator::pkg::apis::apiregistration::v1::APIService;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Metadata fields owned by the API server.
const SERVER_POPULATED_METADATA: &[&str] = &[
    "resourceVersion",
    "uid",
    "creationTimestamp",
    "generation",
    "managedFields",
    "selfLink",
    "deletionTimestamp",
    "deletionGracePeriodSeconds",
];

/// Errors returned by the apply adapter.
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("failed to read {kind} {name}: {source}")]
    Get {
        kind: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("failed to apply {kind} {name}: {source}")]
    Apply {
        kind: String,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("failed to compare {kind} {name}: {source}")]
    Compare {
        kind: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{kind} {name} has no {field}")]
    MissingField {
        kind: String,
        name: String,
        field: &'static str,
    },
}

/// A kind the apply adapter can manage.
///
/// Each implementation routes to the matching [`ClusterClient`] calls.
/// `namespace` is ignored for cluster-scoped kinds.
#[async_trait]
pub trait ManagedObject:
    Resource<DynamicType = ()> + Clone + Serialize + DeserializeOwned + Debug + Send + Sync + 'static
{
    async fn fetch(
        client: &dyn ClusterClient,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<Self>, kube::Error>;

    async fn push(client: &dyn ClusterClient, desired: &Self) -> Result<Self, kube::Error>;
}

macro_rules! namespaced_object {
    ($kind:ty, $get:ident, $apply:ident) => {
        #[async_trait]
        impl ManagedObject for $kind {
            async fn fetch(
                client: &dyn ClusterClient,
                namespace: Option<&str>,
                name: &str,
            ) -> Result<Option<Self>, kube::Error> {
                client.$get(namespace.unwrap_or_default(), name).await
            }

            async fn push(client: &dyn ClusterClient, desired: &Self) -> Result<Self, kube::Error> {
                client.$apply(desired).await
            }
        }
    };
}

macro_rules! cluster_object {
    ($kind:ty, $get:ident, $apply:ident) => {
        #[async_trait]
        impl ManagedObject for $kind {
            async fn fetch(
                client: &dyn ClusterClient,
                _namespace: Option<&str>,
                name: &str,
            ) -> Result<Option<Self>, kube::Error> {
                client.$get(name).await
            }

            async fn push(client: &dyn ClusterClient, desired: &Self) -> Result<Self, kube::Error> {
                client.$apply(desired).await
            }
        }
    };
}

namespaced_object!(ConfigMap, get_config_map, apply_config_map);
namespaced_object!(Secret, get_secret, apply_secret);
namespaced_object!(Service, get_service, apply_service);
namespaced_object!(ServiceAccount, get_service_account, apply_service_account);
namespaced_object!(Role, get_role, apply_role);
namespaced_object!(RoleBinding, get_role_binding, apply_role_binding);
namespaced_object!(DaemonSet, get_daemon_set, apply_daemon_set);
cluster_object!(ClusterRole, get_cluster_role, apply_cluster_role);
cluster_object!(
    ClusterRoleBinding,
    get_cluster_role_binding,
    apply_cluster_role_binding
);
cluster_object!(
    MutatingWebhookConfiguration,
    get_mutating_webhook_configuration,
    apply_mutating_webhook_configuration
);
cluster_object!(APIService, get_api_service, apply_api_service);

/// Outcome of [`Applier::ensure`].
#[derive(Debug, Clone)]
pub struct Applied<K> {
    /// The live object after the call.
    pub object: K,
    /// False only when no write reached the API server.
    pub changed: bool,
}

/// Apply adapter shared by the handlers.
#[derive(Clone)]
pub struct Applier {
    client: Arc<dyn ClusterClient>,
}

impl Applier {
    #[must_use]
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self { client }
    }

    /// Make the live object match `desired`.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError`] when the read or the apply fails. Conflicts are
    /// retried before giving up.
    pub async fn ensure<K: ManagedObject>(&self, desired: &K) -> Result<Applied<K>, ApplyError> {
        self.ensure_with_generation(desired, None).await
    }

    /// Like [`ensure`](Self::ensure), and also re-applies when the live
    /// object's `metadata.generation` differs from `expected_generation`.
    ///
    /// # Errors
    ///
    /// Returns [`ApplyError`] when the read or the apply fails.
    pub async fn ensure_with_generation<K: ManagedObject>(
        &self,
        desired: &K,
        expected_generation: Option<i64>,
    ) -> Result<Applied<K>, ApplyError> {
        let kind = K::kind(&()).to_string();
        let name = desired.name_any();
        let namespace = desired.namespace();

        let current = K::fetch(self.client.as_ref(), namespace.as_deref(), &name)
            .await
            .map_err(|source| ApplyError::Get {
                kind: kind.clone(),
                name: name.clone(),
                source,
            })?;

        let created = current.is_none();
        if let Some(current) = current {
            let generation_matches = expected_generation
                .is_none_or(|expected| current.meta().generation == Some(expected));
            let equal = semantically_equal(desired, &current).map_err(|source| {
                ApplyError::Compare {
                    kind: kind.clone(),
                    name: name.clone(),
                    source,
                }
            })?;

            if equal && generation_matches {
                debug!("{} {} is up to date", kind, name);
                return Ok(Applied {
                    object: current,
                    changed: false,
                });
            }

            debug!(
                "{} {} drifted (content equal: {}, generation matches: {})",
                kind, name, equal, generation_matches
            );
        }

        let client = self.client.as_ref();
        let object = retry_on_conflict(
            |_| K::push(client, desired),
            is_conflict,
            &format!("apply {kind} {name}"),
        )
        .await
        .map_err(|source| ApplyError::Apply {
            kind: kind.clone(),
            name: name.clone(),
            source,
        })?;

        if created {
            info!("Created {} {}", kind, qualified(namespace.as_deref(), &name));
            metrics::record_resource_created(&kind);
        } else {
            info!("Updated {} {}", kind, qualified(namespace.as_deref(), &name));
            metrics::record_resource_updated(&kind);
        }

        Ok(Applied {
            object,
            changed: true,
        })
    }
}

fn qualified(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{ns}/{name}"),
        _ => name.to_string(),
    }
}

/// True when every field set in `desired` has the same value in `current`.
///
/// Server-populated metadata and `status` are excluded from `desired` before
/// comparing; lists must have the same length and match element-wise.
///
/// # Errors
///
/// Returns an error if either object fails to serialize.
pub fn semantically_equal<K: Serialize>(desired: &K, current: &K) -> Result<bool, serde_json::Error> {
    let mut desired = serde_json::to_value(desired)?;
    let current = serde_json::to_value(current)?;

    if let Value::Object(fields) = &mut desired {
        fields.remove("status");
        if let Some(Value::Object(meta)) = fields.get_mut("metadata") {
            for key in SERVER_POPULATED_METADATA {
                meta.remove(*key);
            }
        }
    }

    Ok(is_subset(&desired, &current))
}

fn is_subset(desired: &Value, current: &Value) -> bool {
    match (desired, current) {
        (Value::Null, _) => true,
        (Value::Object(want), Value::Object(have)) => want.iter().all(|(key, value)| {
            match have.get(key) {
                Some(actual) => is_subset(value, actual),
                None => is_empty(value),
            }
        }),
        (Value::Array(want), Value::Array(have)) => {
            want.len() == have.len() && want.iter().zip(have).all(|(w, h)| is_subset(w, h))
        }
        (want, Value::Null) => is_empty(want),
        (want, have) => want == have,
    }
}

/// Values the API server drops on write.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Typed reference to a live object.
///
/// # Errors
///
/// Returns [`ApplyError::MissingField`] when the object has no name or no
/// `resourceVersion` (it was never persisted).
pub fn reference_of<K: Resource<DynamicType = ()>>(
    object: &K,
) -> Result<ResourceReference, ApplyError> {
    let kind = K::kind(&()).to_string();
    let meta = object.meta();

    let name = meta.name.clone().ok_or_else(|| ApplyError::MissingField {
        kind: kind.clone(),
        name: String::new(),
        field: "metadata.name",
    })?;
    let resource_version =
        meta.resource_version
            .clone()
            .ok_or_else(|| ApplyError::MissingField {
                kind: kind.clone(),
                name: name.clone(),
                field: "metadata.resourceVersion",
            })?;

    Ok(ResourceReference {
        kind,
        namespace: meta.namespace.clone(),
        name,
        resource_version,
    })
}

/// True when `recorded` does not point at `live`'s current `resourceVersion`.
#[must_use]
pub fn reference_drifted<K: Resource<DynamicType = ()>>(
    recorded: Option<&ResourceReference>,
    live: &K,
) -> bool {
    recorded.is_none_or(|r| live.meta().resource_version.as_deref() != Some(r.resource_version.as_str()))
}

#[cfg(test)]
#[path = "apply_tests.rs"]
mod apply_tests;
