// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Maps events on secondary objects back to the singleton key.
//!
//! An object belongs to the singleton when it carries a controller owner
//! reference to a `RunOnceDurationOverride`, or failing that, the owner
//! annotation naming it. Pods are matched by annotation only (their
//! controller is the `DaemonSet`). Events whose `resourceVersion` was already
//! seen are dropped, which filters informer relists and no-op updates. A
//! deleted object's entry is forgotten and the map is bounded.

use crate::constants::{API_GROUP, FANIN_SEEN_CAPACITY, KIND_RUN_ONCE_DURATION_OVERRIDE};
use crate::crd::RunOnceDurationOverride;
use kube::runtime::reflector::ObjectRef;
use kube::{Resource, ResourceExt};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, trace};

/// Owner name recorded on `obj`, by controller reference first, then annotation.
#[must_use]
pub fn resolve_owner<K: Resource>(obj: &K, owner_annotation: &str) -> Option<String> {
    let controller = obj
        .owner_references()
        .iter()
        .find(|owner| owner.controller == Some(true));

    if let Some(owner) = controller {
        let group = owner.api_version.split('/').next().unwrap_or_default();
        if owner.kind == KIND_RUN_ONCE_DURATION_OVERRIDE && group == API_GROUP {
            return Some(owner.name.clone());
        }
    }

    obj.annotations()
        .get(owner_annotation)
        .filter(|name| !name.is_empty())
        .cloned()
}

/// Event mapper shared by every secondary watch.
#[derive(Debug)]
pub struct SecondaryFanIn {
    singleton_name: String,
    owner_annotation: String,
    seen: Mutex<HashMap<String, String>>,
}

impl SecondaryFanIn {
    #[must_use]
    pub fn new(singleton_name: impl Into<String>, owner_annotation: impl Into<String>) -> Self {
        Self {
            singleton_name: singleton_name.into(),
            owner_annotation: owner_annotation.into(),
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Key to enqueue for an event on `obj`, if any.
    pub fn map<K>(&self, obj: &K) -> Option<ObjectRef<RunOnceDurationOverride>>
    where
        K: Resource<DynamicType = ()>,
    {
        let owner = resolve_owner(obj, &self.owner_annotation)?;
        if owner != self.singleton_name {
            trace!(
                "{} {} is owned by {}, not the singleton",
                K::kind(&()),
                obj.name_any(),
                owner
            );
            return None;
        }

        if obj.meta().deletion_timestamp.is_some() {
            self.forget(obj);
        } else if !self.first_sighting(obj) {
            return None;
        }

        trace!(
            "{} {}/{} changed, enqueueing {}",
            K::kind(&()),
            obj.namespace().unwrap_or_default(),
            obj.name_any(),
            self.singleton_name
        );
        Some(ObjectRef::new(&self.singleton_name))
    }

    /// Number of objects whose `resourceVersion` is remembered.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    fn key<K>(obj: &K) -> String
    where
        K: Resource<DynamicType = ()>,
    {
        format!(
            "{}/{}/{}",
            K::kind(&()),
            obj.namespace().unwrap_or_default(),
            obj.name_any()
        )
    }

    /// Drops what was remembered about a deleted `obj`.
    fn forget<K>(&self, obj: &K)
    where
        K: Resource<DynamicType = ()>,
    {
        self.seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(&Self::key(obj));
    }

    /// Records `obj`'s `resourceVersion`; false if it was already recorded.
    ///
    /// The map holds at most [`FANIN_SEEN_CAPACITY`] objects. When a new object
    /// would exceed it, the map starts over.
    fn first_sighting<K>(&self, obj: &K) -> bool
    where
        K: Resource<DynamicType = ()>,
    {
        let Some(resource_version) = obj.resource_version() else {
            return true;
        };
        let key = Self::key(obj);

        let mut seen = self
            .seen
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if seen.get(&key) == Some(&resource_version) {
            return false;
        }
        if !seen.contains_key(&key) && seen.len() >= FANIN_SEEN_CAPACITY {
            debug!(
                "Fan-in remembers {} objects, forgetting all resourceVersions",
                seen.len()
            );
            seen.clear();
        }
        seen.insert(key, resource_version);
        true
    }
}

#[cfg(test)]
#[path = "fanin_tests.rs"]
mod fanin_tests;
