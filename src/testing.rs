// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! In-memory cluster for end-to-end reconciliation tests.
//!
//! [`FakeCluster`] stores objects as JSON keyed by `(kind, namespace, name)`
//! and mimics the server-populated fields the engine relies on:
//! `resourceVersion` only moves when content changes, `generation` moves when
//! anything outside `metadata`/`status` changes, and `uid`, `creationTimestamp`
//! and `status` survive applies. The operand `DaemonSet` can be made ready or
//! left rolling out, and any operation can be made to fail.

use crate::client::{ClusterClient, SingletonLister};
use crate::crd::{RunOnceDurationOverride, RunOnceDurationOverrideSpec};
use async_trait::async_trait;
use k8s_openapi::api::admissionregistration::v1::MutatingWebhookConfiguration;
use k8s_openapi::api::apps::v1::DaemonSet;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding};
use k8s_openapi::kube_aggregator::pkg::apis::apiregistration::v1::APIService;
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

type Key = (String, String, String);

const SERVER_METADATA: &[&str] = &[
    "resourceVersion",
    "generation",
    "uid",
    "creationTimestamp",
    "managedFields",
];

/// Build an API error the way the server reports it.
pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(
            kube::error::Status::failure(&format!("injected {reason}"), reason)
                .with_code(code)
                .boxed(),
        )
}

#[derive(Default)]
struct State {
    objects: BTreeMap<Key, Value>,
    next_resource_version: u64,
    next_uid: u64,
    failures: HashMap<String, (u16, String)>,
    applies: HashMap<String, u32>,
    deletes: HashMap<String, u32>,
    status_writes: u32,
    daemon_set_ready: bool,
    singleton: Option<RunOnceDurationOverride>,
    stale_singleton: Option<RunOnceDurationOverride>,
}

impl State {
    fn bump(&mut self) -> String {
        self.next_resource_version += 1;
        self.next_resource_version.to_string()
    }

    fn check(&self, op: &str) -> Result<(), kube::Error> {
        match self.failures.get(op) {
            Some((code, reason)) => Err(api_error(*code, reason)),
            None => Ok(()),
        }
    }
}

fn content(value: &Value) -> Value {
    let mut value = value.clone();
    if let Value::Object(fields) = &mut value {
        fields.remove("status");
        if let Some(Value::Object(meta)) = fields.get_mut("metadata") {
            for key in SERVER_METADATA {
                meta.remove(*key);
            }
        }
    }
    value
}

fn spec_part(value: &Value) -> Value {
    let mut value = content(value);
    if let Value::Object(fields) = &mut value {
        fields.remove("metadata");
    }
    value
}

fn key_of(kind: &str, namespace: Option<&str>, name: &str) -> Key {
    (
        kind.to_string(),
        namespace.unwrap_or_default().to_string(),
        name.to_string(),
    )
}

fn daemon_set_status(generation: i64, ready: bool) -> Value {
    let available = i32::from(ready);
    json!({
        "observedGeneration": generation,
        "desiredNumberScheduled": 1,
        "currentNumberScheduled": 1,
        "numberReady": available,
        "numberAvailable": available,
        "numberUnavailable": 1 - available,
        "numberMisscheduled": 0,
        "updatedNumberScheduled": 1,
    })
}

/// In-memory [`ClusterClient`] and [`SingletonLister`].
#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<State>,
}

impl FakeCluster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Whether applied `DaemonSet`s report a completed rollout.
    pub fn set_daemon_set_ready(&self, ready: bool) {
        let mut state = self.state();
        state.daemon_set_ready = ready;
        for ((kind, _, _), object) in &mut state.objects {
            if kind == "DaemonSet" {
                let generation = object["metadata"]["generation"].as_i64().unwrap_or(1);
                object["status"] = daemon_set_status(generation, ready);
            }
        }
    }

    /// Make every call of `op` (e.g. `"apply:DaemonSet"`, `"get:Secret"`,
    /// `"delete:MutatingWebhookConfiguration"`, `"update_status"`) fail.
    pub fn fail(&self, op: &str, code: u16, reason: &str) {
        self.state()
            .failures
            .insert(op.to_string(), (code, reason.to_string()));
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    /// Apply calls that reached the server for `kind`.
    #[must_use]
    pub fn applies(&self, kind: &str) -> u32 {
        self.state().applies.get(kind).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_applies(&self) -> u32 {
        self.state().applies.values().sum()
    }

    #[must_use]
    pub fn deletes(&self, kind: &str) -> u32 {
        self.state().deletes.get(kind).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn status_writes(&self) -> u32 {
        self.state().status_writes
    }

    pub fn reset_counters(&self) {
        let mut state = self.state();
        state.applies.clear();
        state.deletes.clear();
        state.status_writes = 0;
    }

    /// Persist the singleton as the API server would on create.
    pub fn seed_singleton(&self, name: &str, spec: RunOnceDurationOverrideSpec) {
        let mut state = self.state();
        let mut obj = RunOnceDurationOverride::new(name, spec);
        obj.metadata.resource_version = Some(state.bump());
        obj.metadata.uid = Some(format!("uid-{name}"));
        obj.metadata.generation = Some(1);
        state.singleton = Some(obj);
    }

    /// Replace the singleton's spec, bumping its generation.
    pub fn update_singleton_spec(&self, spec: RunOnceDurationOverrideSpec) {
        let mut state = self.state();
        let resource_version = state.bump();
        if let Some(obj) = state.singleton.as_mut() {
            obj.spec = spec;
            obj.metadata.resource_version = Some(resource_version);
            obj.metadata.generation = Some(obj.metadata.generation.unwrap_or(0) + 1);
        }
    }

    /// Latest persisted singleton.
    #[must_use]
    pub fn singleton(&self) -> Option<RunOnceDurationOverride> {
        self.state().singleton.clone()
    }

    /// Serve a frozen copy of the current singleton from the lister.
    pub fn freeze_lister(&self) {
        let mut state = self.state();
        state.stale_singleton = state.singleton.clone();
    }

    pub fn thaw_lister(&self) {
        self.state().stale_singleton = None;
    }

    /// Typed read of a stored object.
    #[must_use]
    pub fn object<K>(&self, namespace: Option<&str>, name: &str) -> Option<K>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let key = key_of(&K::kind(&()), namespace, name);
        self.state()
            .objects
            .get(&key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Names of every stored object of `kind`.
    #[must_use]
    pub fn names(&self, kind: &str) -> Vec<String> {
        self.state()
            .objects
            .keys()
            .filter(|(k, _, _)| k == kind)
            .map(|(_, _, name)| name.clone())
            .collect()
    }

    /// Change an object behind the operator's back.
    pub fn mutate<K, F>(&self, namespace: Option<&str>, name: &str, mutate: F)
    where
        K: Resource<DynamicType = ()> + Serialize + DeserializeOwned,
        F: FnOnce(&mut K),
    {
        let Some(mut object) = self.object::<K>(namespace, name) else {
            return;
        };
        mutate(&mut object);
        let value = serde_json::to_value(&object).unwrap();
        let key = key_of(&K::kind(&()), namespace, name);
        let mut state = self.state();
        Self::write(&mut state, key, value);
    }

    /// Delete an object behind the operator's back.
    pub fn remove(&self, kind: &str, namespace: Option<&str>, name: &str) {
        self.state().objects.remove(&key_of(kind, namespace, name));
    }

    fn write(state: &mut State, key: Key, mut desired: Value) -> Value {
        let existing = state.objects.get(&key).cloned();

        if let Some(existing) = &existing {
            if content(existing) == content(&desired) {
                return existing.clone();
            }
        }

        let generation = match &existing {
            None => 1,
            Some(existing) => {
                let current = existing["metadata"]["generation"].as_i64().unwrap_or(1);
                if spec_part(existing) == spec_part(&desired) {
                    current
                } else {
                    current + 1
                }
            }
        };

        let uid = match &existing {
            Some(existing) => existing["metadata"]["uid"].clone(),
            None => {
                state.next_uid += 1;
                json!(format!("uid-{}", state.next_uid))
            }
        };
        let resource_version = state.bump();

        let meta = &mut desired["metadata"];
        meta["resourceVersion"] = json!(resource_version);
        meta["generation"] = json!(generation);
        meta["uid"] = uid;
        meta["creationTimestamp"] = json!("2025-01-01T00:00:00Z");

        if key.0 == "DaemonSet" {
            desired["status"] = daemon_set_status(generation, state.daemon_set_ready);
        } else if let Some(status) = existing.as_ref().and_then(|e| e.get("status")) {
            desired["status"] = status.clone();
        }

        state.objects.insert(key, desired.clone());
        desired
    }

    fn read<K>(&self, namespace: Option<&str>, name: &str) -> Result<Option<K>, kube::Error>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let kind = K::kind(&()).to_string();
        self.state().check(&format!("get:{kind}"))?;
        Ok(self.object(namespace, name))
    }

    fn apply<K>(&self, desired: &K) -> Result<K, kube::Error>
    where
        K: Resource<DynamicType = ()> + Serialize + DeserializeOwned,
    {
        let kind = K::kind(&()).to_string();
        let mut state = self.state();
        state.check(&format!("apply:{kind}"))?;
        *state.applies.entry(kind.clone()).or_default() += 1;

        let value = serde_json::to_value(desired).map_err(kube::Error::SerdeError)?;
        let key = key_of(&kind, desired.namespace().as_deref(), &desired.name_any());
        let stored = Self::write(&mut state, key, value);
        serde_json::from_value(stored).map_err(kube::Error::SerdeError)
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>, kube::Error> {
        self.read(Some(namespace), name)
    }

    async fn apply_config_map(&self, desired: &ConfigMap) -> Result<ConfigMap, kube::Error> {
        self.apply(desired)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, kube::Error> {
        self.read(Some(namespace), name)
    }

    async fn apply_secret(&self, desired: &Secret) -> Result<Secret, kube::Error> {
        self.apply(desired)
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Service>, kube::Error> {
        self.read(Some(namespace), name)
    }

    async fn apply_service(&self, desired: &Service) -> Result<Service, kube::Error> {
        self.apply(desired)
    }

    async fn get_service_account(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ServiceAccount>, kube::Error> {
        self.read(Some(namespace), name)
    }

    async fn apply_service_account(&self, desired: &ServiceAccount) -> Result<ServiceAccount, kube::Error> {
        self.apply(desired)
    }

    async fn get_role(&self, namespace: &str, name: &str) -> Result<Option<Role>, kube::Error> {
        self.read(Some(namespace), name)
    }

    async fn apply_role(&self, desired: &Role) -> Result<Role, kube::Error> {
        self.apply(desired)
    }

    async fn get_role_binding(&self, namespace: &str, name: &str) -> Result<Option<RoleBinding>, kube::Error> {
        self.read(Some(namespace), name)
    }

    async fn apply_role_binding(&self, desired: &RoleBinding) -> Result<RoleBinding, kube::Error> {
        self.apply(desired)
    }

    async fn get_cluster_role(&self, name: &str) -> Result<Option<ClusterRole>, kube::Error> {
        self.read(None, name)
    }

    async fn apply_cluster_role(&self, desired: &ClusterRole) -> Result<ClusterRole, kube::Error> {
        self.apply(desired)
    }

    async fn get_cluster_role_binding(&self, name: &str) -> Result<Option<ClusterRoleBinding>, kube::Error> {
        self.read(None, name)
    }

    async fn apply_cluster_role_binding(
        &self,
        desired: &ClusterRoleBinding,
    ) -> Result<ClusterRoleBinding, kube::Error> {
        self.apply(desired)
    }

    async fn get_daemon_set(&self, namespace: &str, name: &str) -> Result<Option<DaemonSet>, kube::Error> {
        self.read(Some(namespace), name)
    }

    async fn apply_daemon_set(&self, desired: &DaemonSet) -> Result<DaemonSet, kube::Error> {
        self.apply(desired)
    }

    async fn get_mutating_webhook_configuration(
        &self,
        name: &str,
    ) -> Result<Option<MutatingWebhookConfiguration>, kube::Error> {
        self.read(None, name)
    }

    async fn apply_mutating_webhook_configuration(
        &self,
        desired: &MutatingWebhookConfiguration,
    ) -> Result<MutatingWebhookConfiguration, kube::Error> {
        self.apply(desired)
    }

    async fn delete_mutating_webhook_configuration(&self, name: &str) -> Result<(), kube::Error> {
        let kind = MutatingWebhookConfiguration::kind(&()).to_string();
        let mut state = self.state();
        state.check(&format!("delete:{kind}"))?;
        if state.objects.remove(&key_of(&kind, None, name)).is_some() {
            *state.deletes.entry(kind).or_default() += 1;
        }
        Ok(())
    }

    async fn get_api_service(&self, name: &str) -> Result<Option<APIService>, kube::Error> {
        self.read(None, name)
    }

    async fn apply_api_service(&self, desired: &APIService) -> Result<APIService, kube::Error> {
        self.apply(desired)
    }

    async fn get_run_once_duration_override(
        &self,
        name: &str,
    ) -> Result<Option<RunOnceDurationOverride>, kube::Error> {
        let state = self.state();
        state.check("get:RunOnceDurationOverride")?;
        Ok(state.singleton.clone().filter(|obj| obj.name_any() == name))
    }

    async fn update_run_once_duration_override_status(
        &self,
        replacement: &RunOnceDurationOverride,
    ) -> Result<RunOnceDurationOverride, kube::Error> {
        let name = replacement.name_any();
        let resource_version = replacement.metadata.resource_version.as_deref().unwrap_or_default();
        let mut state = self.state();
        state.check("update_status")?;

        let current_version = match state.singleton.as_ref() {
            Some(obj) if obj.name_any() == name => obj.metadata.resource_version.clone(),
            _ => return Err(api_error(404, "NotFound")),
        };
        if current_version.as_deref() != Some(resource_version) {
            return Err(api_error(409, "Conflict"));
        }

        let next = state.bump();
        state.status_writes += 1;
        let obj = state
            .singleton
            .as_mut()
            .ok_or_else(|| api_error(404, "NotFound"))?;
        obj.status.clone_from(&replacement.status);
        obj.metadata.resource_version = Some(next);
        Ok(obj.clone())
    }
}

impl SingletonLister for FakeCluster {
    fn get(&self, name: &str) -> Option<RunOnceDurationOverride> {
        let state = self.state();
        state
            .stale_singleton
            .clone()
            .or_else(|| state.singleton.clone())
            .filter(|obj| obj.name_any() == name)
    }
}
