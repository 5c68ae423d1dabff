// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Immutable identity of the operand the operator installs.

use crate::constants::{
    ADMISSION_API_GROUP, ADMISSION_API_VERSION, ADMISSION_RESOURCE, API_GROUP,
};

/// The `(name, namespace, singleton name, image, version)` tuple threaded
/// through the asset catalog and every handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperandContext {
    name: String,
    namespace: String,
    singleton_name: String,
    image: String,
    version: String,
}

impl OperandContext {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        singleton_name: impl Into<String>,
        image: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            singleton_name: singleton_name.into(),
            image: image.into(),
            version: version.into(),
        }
    }

    /// Operand name (`<op>`), the base of every managed object name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace the operand workload runs in.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Name of the only configuration object the operator honors.
    #[must_use]
    pub fn singleton_name(&self) -> &str {
        &self.singleton_name
    }

    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Prefix of every annotation key the operator stamps, `<op>.<group>`.
    #[must_use]
    pub fn annotation_prefix(&self) -> String {
        format!("{}.{API_GROUP}", self.name)
    }

    /// DNS names the operand is reachable under, in SAN order.
    #[must_use]
    pub fn service_dns_names(&self) -> Vec<String> {
        vec![
            format!("{}.{}.svc", self.name, self.namespace),
            format!("{}.{}.svc.cluster.local", self.name, self.namespace),
            "localhost".to_string(),
        ]
    }

    /// Path the API server calls the admission endpoint on.
    #[must_use]
    pub fn webhook_path(&self) -> String {
        format!("/apis/{ADMISSION_API_GROUP}/{ADMISSION_API_VERSION}/{ADMISSION_RESOURCE}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_dns_names_include_localhost() {
        let ctx = OperandContext::new("rodoo", "ops", "cluster", "img", "1.0");
        assert_eq!(
            ctx.service_dns_names(),
            vec![
                "rodoo.ops.svc".to_string(),
                "rodoo.ops.svc.cluster.local".to_string(),
                "localhost".to_string(),
            ]
        );
    }

    #[test]
    fn test_annotation_prefix_and_webhook_path() {
        let ctx = OperandContext::new("runoncedurationoverride", "ops", "cluster", "img", "1.0");
        assert_eq!(
            ctx.annotation_prefix(),
            "runoncedurationoverride.operator.openshift.io"
        );
        assert_eq!(
            ctx.webhook_path(),
            "/apis/admission.runoncedurationoverride.openshift.io/v1/runoncedurationoverrides"
        );
    }
}
