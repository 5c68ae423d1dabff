// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed access to the Kubernetes API for every kind the operator touches.
//!
//! Handlers, the apply adapter, and the status writer depend on the
//! [`ClusterClient`] trait rather than on `kube::Client`, so the whole
//! reconciliation engine runs against mocks and an in-memory cluster in tests.
//! [`KubeClusterClient`] is the production implementation: reads go straight
//! to the API server (retrying transient failures), writes use server-side
//! apply with the operator's field manager, and the singleton's status is
//! replaced whole through the `/status` subresource.

use crate::constants::FIELD_MANAGER;
use crate::crd::RunOnceDurationOverride;
use crate::reconcilers::retry::retry_api_call;
use async_trait::async_trait;
use k8s_openapi::api::admissionregistration::v1::MutatingWebhookConfiguration;
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use k8s_openapi::kube_aggregator::pkg::apis::apiregistration::v1::APIService;
use k8s_openapi::{ClusterResourceScope, NamespaceResourceScope};
use kube::api::{DeleteParams, Patch, PatchParams, PostParams};
use kube::runtime::reflector::{ObjectRef, Store};
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

/// Kubernetes operations used by the reconciliation engine.
///
/// `get_*` returns `Ok(None)` for objects that do not exist. `apply_*`
/// server-side applies the full desired object and returns the server's copy.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn get_config_map(&self, namespace: &str, name: &str)
        -> Result<Option<ConfigMap>, kube::Error>;
    async fn apply_config_map(&self, desired: &ConfigMap) -> Result<ConfigMap, kube::Error>;

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, kube::Error>;
    async fn apply_secret(&self, desired: &Secret) -> Result<Secret, kube::Error>;

    async fn get_service(&self, namespace: &str, name: &str)
        -> Result<Option<Service>, kube::Error>;
    async fn apply_service(&self, desired: &Service) -> Result<Service, kube::Error>;

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ServiceAccount>, kube::Error>;
    async fn apply_service_account(
        &self,
        desired: &ServiceAccount,
    ) -> Result<ServiceAccount, kube::Error>;

    async fn get_role(&self, namespace: &str, name: &str) -> Result<Option<Role>, kube::Error>;
    async fn apply_role(&self, desired: &Role) -> Result<Role, kube::Error>;

    async fn get_role_binding(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<RoleBinding>, kube::Error>;
    async fn apply_role_binding(&self, desired: &RoleBinding) -> Result<RoleBinding, kube::Error>;

    async fn get_cluster_role(&self, name: &str) -> Result<Option<ClusterRole>, kube::Error>;
    async fn apply_cluster_role(&self, desired: &ClusterRole) -> Result<ClusterRole, kube::Error>;

    async fn get_cluster_role_binding(
        &self,
        name: &str,
    ) -> Result<Option<ClusterRoleBinding>, kube::Error>;
    async fn apply_cluster_role_binding(
        &self,
        desired: &ClusterRoleBinding,
    ) -> Result<ClusterRoleBinding, kube::Error>;

    async fn get_daemon_set(&self, namespace: &str, name: &str)
        -> Result<Option<DaemonSet>, kube::Error>;
    async fn apply_daemon_set(&self, desired: &DaemonSet) -> Result<DaemonSet, kube::Error>;

    async fn get_mutating_webhook_configuration(
        &self,
        name: &str,
    ) -> Result<Option<MutatingWebhookConfiguration>, kube::Error>;
    async fn apply_mutating_webhook_configuration(
        &self,
        desired: &MutatingWebhookConfiguration,
    ) -> Result<MutatingWebhookConfiguration, kube::Error>;
    /// Delete by name; deleting a missing object succeeds.
    async fn delete_mutating_webhook_configuration(&self, name: &str) -> Result<(), kube::Error>;

    async fn get_api_service(&self, name: &str) -> Result<Option<APIService>, kube::Error>;
    async fn apply_api_service(&self, desired: &APIService) -> Result<APIService, kube::Error>;

    /// Quorum read of the configuration singleton.
    async fn get_run_once_duration_override(
        &self,
        name: &str,
    ) -> Result<Option<RunOnceDurationOverride>, kube::Error>;

    /// Replace the whole `.status` of `obj`, failing with 409 when its
    /// `metadata.resourceVersion` is stale. Fields absent from `obj.status`
    /// are cleared.
    async fn update_run_once_duration_override_status(
        &self,
        obj: &RunOnceDurationOverride,
    ) -> Result<RunOnceDurationOverride, kube::Error>;
}

/// Cached view of the configuration singleton.
///
/// Reads are in-memory and may trail the API server; callers that need the
/// latest state use [`ClusterClient::get_run_once_duration_override`].
pub trait SingletonLister: Send + Sync {
    fn get(&self, name: &str) -> Option<RunOnceDurationOverride>;
}

impl SingletonLister for Store<RunOnceDurationOverride> {
    fn get(&self, name: &str) -> Option<RunOnceDurationOverride> {
        Store::get(self, &ObjectRef::new(name)).map(|cached| (*cached).clone())
    }
}

/// Production [`ClusterClient`] backed by `kube::Client`.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn get_namespaced<K>(&self, namespace: &str, name: &str) -> Result<Option<K>, kube::Error>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Debug,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        retry_api_call(
            || api.get_opt(name),
            &format!("get {} {namespace}/{name}", K::kind(&())),
        )
        .await
    }

    async fn get_cluster<K>(&self, name: &str) -> Result<Option<K>, kube::Error>
    where
        K: Resource<Scope = ClusterResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Debug,
    {
        let api: Api<K> = Api::all(self.client.clone());
        retry_api_call(
            || api.get_opt(name),
            &format!("get {} {name}", K::kind(&())),
        )
        .await
    }

    async fn apply_namespaced<K>(&self, desired: &K) -> Result<K, kube::Error>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + Serialize
            + DeserializeOwned
            + Debug,
    {
        let namespace = desired.namespace().unwrap_or_default();
        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);
        server_side_apply(&api, desired).await
    }

    async fn apply_cluster<K>(&self, desired: &K) -> Result<K, kube::Error>
    where
        K: Resource<Scope = ClusterResourceScope, DynamicType = ()>
            + Clone
            + Serialize
            + DeserializeOwned
            + Debug,
    {
        let api: Api<K> = Api::all(self.client.clone());
        server_side_apply(&api, desired).await
    }
}

async fn server_side_apply<K>(api: &Api<K>, desired: &K) -> Result<K, kube::Error>
where
    K: Resource<DynamicType = ()> + Clone + Serialize + DeserializeOwned + Debug,
{
    let name = desired.name_any();
    debug!("Applying {} {}", K::kind(&()), name);
    api.patch(
        &name,
        &PatchParams::apply(FIELD_MANAGER).force(),
        &Patch::Apply(desired),
    )
    .await
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ConfigMap>, kube::Error> {
        self.get_namespaced(namespace, name).await
    }

    async fn apply_config_map(&self, desired: &ConfigMap) -> Result<ConfigMap, kube::Error> {
        self.apply_namespaced(desired).await
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, kube::Error> {
        self.get_namespaced(namespace, name).await
    }

    async fn apply_secret(&self, desired: &Secret) -> Result<Secret, kube::Error> {
        self.apply_namespaced(desired).await
    }

    async fn get_service(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Service>, kube::Error> {
        self.get_namespaced(namespace, name).await
    }

    async fn apply_service(&self, desired: &Service) -> Result<Service, kube::Error> {
        self.apply_namespaced(desired).await
    }

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ServiceAccount>, kube::Error> {
        self.get_namespaced(namespace, name).await
    }

    async fn apply_service_account(
        &self,
        desired: &ServiceAccount,
    ) -> Result<ServiceAccount, kube::Error> {
        self.apply_namespaced(desired).await
    }

    async fn get_role(&self, namespace: &str, name: &str) -> Result<Option<Role>, kube::Error> {
        self.get_namespaced(namespace, name).await
    }

    async fn apply_role(&self, desired: &Role) -> Result<Role, kube::Error> {
        self.apply_namespaced(desired).await
    }

    async fn get_role_binding(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<RoleBinding>, kube::Error> {
        self.get_namespaced(namespace, name).await
    }

    async fn apply_role_binding(&self, desired: &RoleBinding) -> Result<RoleBinding, kube::Error> {
        self.apply_namespaced(desired).await
    }

    async fn get_cluster_role(&self, name: &str) -> Result<Option<ClusterRole>, kube::Error> {
        self.get_cluster(name).await
    }

    async fn apply_cluster_role(&self, desired: &ClusterRole) -> Result<ClusterRole, kube::Error> {
        self.apply_cluster(desired).await
    }

    async fn get_cluster_role_binding(
        &self,
        name: &str,
    ) -> Result<Option<ClusterRoleBinding>, kube::Error> {
        self.get_cluster(name).await
    }

    async fn apply_cluster_role_binding(
        &self,
        desired: &ClusterRoleBinding,
    ) -> Result<ClusterRoleBinding, kube::Error> {
        self.apply_cluster(desired).await
    }

    async fn get_daemon_set(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<DaemonSet>, kube::Error> {
        self.get_namespaced(namespace, name).await
    }

    async fn apply_daemon_set(&self, desired: &DaemonSet) -> Result<DaemonSet, kube::Error> {
        self.apply_namespaced(desired).await
    }

    async fn get_mutating_webhook_configuration(
        &self,
        name: &str,
    ) -> Result<Option<MutatingWebhookConfiguration>, kube::Error> {
        self.get_cluster(name).await
    }

    async fn apply_mutating_webhook_configuration(
        &self,
        desired: &MutatingWebhookConfiguration,
    ) -> Result<MutatingWebhookConfiguration, kube::Error> {
        self.apply_cluster(desired).await
    }

    async fn delete_mutating_webhook_configuration(&self, name: &str) -> Result<(), kube::Error> {
        let api: Api<MutatingWebhookConfiguration> = Api::all(self.client.clone());
        match api.delete(name, &DeleteParams::default()).await {
            Ok(_) => {
                debug!("Deleted MutatingWebhookConfiguration {}", name);
                Ok(())
            }
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn get_api_service(&self, name: &str) -> Result<Option<APIService>, kube::Error> {
        self.get_cluster(name).await
    }

    async fn apply_api_service(&self, desired: &APIService) -> Result<APIService, kube::Error> {
        self.apply_cluster(desired).await
    }

    async fn get_run_once_duration_override(
        &self,
        name: &str,
    ) -> Result<Option<RunOnceDurationOverride>, kube::Error> {
        self.get_cluster(name).await
    }

    async fn update_run_once_duration_override_status(
        &self,
        obj: &RunOnceDurationOverride,
    ) -> Result<RunOnceDurationOverride, kube::Error> {
        let api: Api<RunOnceDurationOverride> = Api::all(self.client.clone());
        api.replace_status(&obj.name_any(), &PostParams::default(), obj)
            .await
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod client_tests;
