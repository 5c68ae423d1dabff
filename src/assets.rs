// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Desired state of every managed object.
//!
//! [`Assets`] is a pure factory over the [`OperandContext`]: the same context
//! and owner always produce identical objects. Every object carries the common
//! labels, the owner annotation (`<op>.operator.openshift.io/owner=<singleton>`),
//! and, when the singleton has a UID, a controller owner reference to it.
//!
//! # Managed objects
//!
//! | Kind | Name | Namespace |
//! |---|---|---|
//! | `ConfigMap` | `<op>-configuration` | operand |
//! | `Secret` | `server-serving-cert-<op>` | operand |
//! | `ConfigMap` | `<op>-service-serving` | operand |
//! | `Service` | `<op>` | operand |
//! | `ServiceAccount` | `<op>` | operand |
//! | `Role`/`RoleBinding` | `<op>` | operand |
//! | `RoleBinding` | `extension-server-authentication-reader-<op>` | `kube-system` |
//! | `ClusterRole`/`ClusterRoleBinding` | `<op>`, `system:<op>-requester`, `<op>-scc`, ... | - |
//! | `DaemonSet` | `<op>` | operand |
//! | `MutatingWebhookConfiguration` | `runoncedurationoverrides.admission...` | - |
//! | `APIService` | `v1.admission.runoncedurationoverride.openshift.io` | - |

use crate::cert::CertBundle;
use crate::constants::{
    ADMISSION_API_GROUP, ADMISSION_API_VERSION, ADMISSION_RESOURCE, API_GROUP_VERSION,
    API_SERVICE_GROUP_PRIORITY_MINIMUM, API_SERVICE_NAME, API_SERVICE_VERSION_PRIORITY,
    AUTH_DELEGATOR_CLUSTER_ROLE, CONFIGURATION_API_VERSION, CONFIGURATION_KEY,
    CONFIGURATION_KIND, CONFIGURATION_MOUNT_PATH, EXTENSION_APISERVER_AUTH_READER_ROLE,
    KIND_RUN_ONCE_DURATION_OVERRIDE, KUBE_SYSTEM_NAMESPACE, MUTATING_WEBHOOK_CONFIGURATION_NAME,
    OPERAND_CONTAINER_NAME, OPERAND_HEALTH_PATH, OPERAND_PRIORITY_CLASS, OPERAND_SCC,
    OPERAND_SECURE_PORT, READINESS_INITIAL_DELAY_SECS, READINESS_PERIOD_SECS, SECRET_TYPE_TLS,
    SERVICE_CA_KEY, SERVICE_PORT, SERVING_CERT_MOUNT_PATH, TLS_CERT, TLS_KEY,
    WEBHOOK_TIMEOUT_SECS,
};
use crate::crd::{RunOnceDurationOverride, RunOnceDurationOverrideConfigSpec};
use crate::labels::{
    APP_LABEL, COMPONENT_ADMISSION_WEBHOOK, CONFIGURATION_HASH_SUFFIX, CONTROL_PLANE_NODE_LABEL,
    INJECT_CABUNDLE_ANNOTATION, K8S_COMPONENT, K8S_MANAGED_BY, K8S_NAME, K8S_PART_OF,
    MANAGED_BY_OPERATOR, NAMESPACE_OPT_IN_LABEL, NAMESPACE_OPT_IN_VALUE,
    OBSERVED_CONFIG_HASH_SUFFIX, OWNER_SUFFIX, SELECTOR_VALUE, SERVING_CERT_HASH_SUFFIX,
};
use crate::operand::OperandContext;
use k8s_openapi::api::admissionregistration::v1::{
    MutatingWebhook, MutatingWebhookConfiguration, RuleWithOperations, ServiceReference,
    WebhookClientConfig,
};
use k8s_openapi::api::apps::v1::{
    DaemonSet, DaemonSetSpec, DaemonSetUpdateStrategy, RollingUpdateDaemonSet,
};
use k8s_openapi::api::core::v1::{
    Capabilities, ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, EnvVar,
    HTTPGetAction, PodSpec, PodTemplateSpec, Probe, ResourceRequirements, Secret,
    SecretVolumeSource, SecurityContext, Service, ServiceAccount, ServicePort, ServiceSpec,
    Toleration, Volume, VolumeMount,
};
use k8s_openapi::api::rbac::v1::{
    ClusterRole, ClusterRoleBinding, PolicyRule, Role, RoleBinding, RoleRef, Subject,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use k8s_openapi::kube_aggregator::pkg::apis::apiregistration::v1::{
    APIService, APIServiceSpec, ServiceReference as APIServiceReference,
};
use k8s_openapi::ByteString;
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";
const CONFIGURATION_VOLUME: &str = "configuration";
const SERVING_CERT_VOLUME: &str = "serving-cert";

/// Document written under `configuration.yaml` and read by the operand.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OperandConfiguration {
    pub api_version: String,
    pub kind: String,
    pub spec: RunOnceDurationOverrideConfigSpec,
}

impl OperandConfiguration {
    #[must_use]
    pub fn new(spec: &RunOnceDurationOverrideConfigSpec) -> Self {
        Self {
            api_version: CONFIGURATION_API_VERSION.to_string(),
            kind: CONFIGURATION_KIND.to_string(),
            spec: spec.clone(),
        }
    }

    /// Parse the document back out of a configuration `ConfigMap` payload.
    ///
    /// # Errors
    ///
    /// Returns the YAML error when the payload is not a configuration document.
    pub fn parse(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }
}

/// Controller owner reference to the singleton, if it has been persisted.
#[must_use]
pub fn build_owner_reference(owner: &RunOnceDurationOverride) -> Option<OwnerReference> {
    let uid = owner.metadata.uid.clone().filter(|uid| !uid.is_empty())?;
    Some(OwnerReference {
        api_version: API_GROUP_VERSION.to_string(),
        kind: KIND_RUN_ONCE_DURATION_OVERRIDE.to_string(),
        name: owner.name_any(),
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

/// Stamp `caBundle` on every webhook of a configuration.
pub fn stamp_ca_bundle(config: &mut MutatingWebhookConfiguration, ca: &[u8]) {
    for webhook in config.webhooks.iter_mut().flatten() {
        webhook.client_config.ca_bundle = Some(ByteString(ca.to_vec()));
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

fn rule(api_groups: &[&str], resources: &[&str], verbs: &[&str]) -> PolicyRule {
    PolicyRule {
        api_groups: Some(strings(api_groups)),
        resources: Some(strings(resources)),
        verbs: strings(verbs),
        ..Default::default()
    }
}

/// Factory for the desired managed objects.
#[derive(Clone, Copy, Debug)]
pub struct Assets<'a> {
    operand: &'a OperandContext,
    owner: Option<&'a OwnerReference>,
}

impl<'a> Assets<'a> {
    #[must_use]
    pub fn new(operand: &'a OperandContext, owner: Option<&'a OwnerReference>) -> Self {
        Self { operand, owner }
    }

    #[must_use]
    pub fn operand(&self) -> &'a OperandContext {
        self.operand
    }

    // ------------------------------------------------------------------------
    // Names
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn configuration_config_map_name(&self) -> String {
        format!("{}-configuration", self.operand.name())
    }

    #[must_use]
    pub fn serving_cert_secret_name(&self) -> String {
        format!("server-serving-cert-{}", self.operand.name())
    }

    #[must_use]
    pub fn service_ca_config_map_name(&self) -> String {
        format!("{}-service-serving", self.operand.name())
    }

    #[must_use]
    pub fn daemon_set_name(&self) -> String {
        self.operand.name().to_string()
    }

    #[must_use]
    pub fn mutating_webhook_configuration_name(&self) -> &'static str {
        MUTATING_WEBHOOK_CONFIGURATION_NAME
    }

    #[must_use]
    pub fn api_service_name(&self) -> &'static str {
        API_SERVICE_NAME
    }

    // ------------------------------------------------------------------------
    // Labels and annotations
    // ------------------------------------------------------------------------

    /// `<op>.operator.openshift.io/<suffix>`
    #[must_use]
    pub fn annotation_key(&self, suffix: &str) -> String {
        format!("{}/{suffix}", self.operand.annotation_prefix())
    }

    #[must_use]
    pub fn configuration_hash_annotation(&self) -> String {
        self.annotation_key(CONFIGURATION_HASH_SUFFIX)
    }

    #[must_use]
    pub fn serving_cert_hash_annotation(&self) -> String {
        self.annotation_key(SERVING_CERT_HASH_SUFFIX)
    }

    #[must_use]
    pub fn observed_config_hash_annotation(&self) -> String {
        self.annotation_key(OBSERVED_CONFIG_HASH_SUFFIX)
    }

    #[must_use]
    pub fn owner_annotation(&self) -> String {
        self.annotation_key(OWNER_SUFFIX)
    }

    /// Labels selecting the operand pods.
    #[must_use]
    pub fn selector_labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(self.operand.name().to_string(), SELECTOR_VALUE.to_string())])
    }

    /// Labels carried by every managed object.
    #[must_use]
    pub fn labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::from([
            (APP_LABEL.to_string(), self.operand.name().to_string()),
            (K8S_NAME.to_string(), self.operand.name().to_string()),
            (K8S_COMPONENT.to_string(), COMPONENT_ADMISSION_WEBHOOK.to_string()),
            (K8S_PART_OF.to_string(), self.operand.name().to_string()),
            (K8S_MANAGED_BY.to_string(), MANAGED_BY_OPERATOR.to_string()),
        ]);
        labels.extend(self.selector_labels());
        labels
    }

    fn owner_annotations(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(
            self.owner_annotation(),
            self.operand.singleton_name().to_string(),
        )])
    }

    fn metadata(&self, name: impl Into<String>, namespace: Option<&str>) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.into()),
            namespace: namespace.map(ToString::to_string),
            labels: Some(self.labels()),
            annotations: Some(self.owner_annotations()),
            owner_references: self.owner.map(|owner| vec![owner.clone()]),
            ..Default::default()
        }
    }

    fn namespaced(&self, name: impl Into<String>) -> ObjectMeta {
        self.metadata(name, Some(self.operand.namespace()))
    }

    fn service_account_subject(&self) -> Subject {
        Subject {
            kind: "ServiceAccount".to_string(),
            name: self.operand.name().to_string(),
            namespace: Some(self.operand.namespace().to_string()),
            api_group: None,
        }
    }

    // ------------------------------------------------------------------------
    // Configuration and certificates
    // ------------------------------------------------------------------------

    /// Configuration `ConfigMap` carrying the serialized admission payload.
    ///
    /// # Errors
    ///
    /// Returns the YAML error if the payload cannot be serialized.
    pub fn configuration_config_map(
        &self,
        config: &RunOnceDurationOverrideConfigSpec,
    ) -> Result<ConfigMap, serde_yaml::Error> {
        let document = serde_yaml::to_string(&OperandConfiguration::new(config))?;
        Ok(ConfigMap {
            metadata: self.namespaced(self.configuration_config_map_name()),
            data: Some(BTreeMap::from([(CONFIGURATION_KEY.to_string(), document)])),
            ..Default::default()
        })
    }

    /// TLS `Secret` carrying the serving key and certificate.
    #[must_use]
    pub fn serving_cert_secret(&self, bundle: &CertBundle) -> Secret {
        Secret {
            metadata: self.namespaced(self.serving_cert_secret_name()),
            type_: Some(SECRET_TYPE_TLS.to_string()),
            data: Some(BTreeMap::from([
                (TLS_KEY.to_string(), ByteString(bundle.service_key.clone())),
                (TLS_CERT.to_string(), ByteString(bundle.service_cert.clone())),
            ])),
            ..Default::default()
        }
    }

    /// CA bundle `ConfigMap`, annotated for an external CA injector.
    #[must_use]
    pub fn service_ca_config_map(&self, bundle: &CertBundle) -> ConfigMap {
        let mut metadata = self.namespaced(self.service_ca_config_map_name());
        metadata
            .annotations
            .get_or_insert_with(BTreeMap::new)
            .insert(INJECT_CABUNDLE_ANNOTATION.to_string(), "true".to_string());
        ConfigMap {
            metadata,
            data: Some(BTreeMap::from([(
                SERVICE_CA_KEY.to_string(),
                String::from_utf8_lossy(&bundle.serving_cert_ca).into_owned(),
            )])),
            ..Default::default()
        }
    }

    // ------------------------------------------------------------------------
    // Service and RBAC
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn service(&self) -> Service {
        Service {
            metadata: self.namespaced(self.operand.name()),
            spec: Some(ServiceSpec {
                selector: Some(self.selector_labels()),
                ports: Some(vec![ServicePort {
                    name: Some("https".into()),
                    port: SERVICE_PORT,
                    target_port: Some(IntOrString::Int(OPERAND_SECURE_PORT)),
                    protocol: Some("TCP".into()),
                    ..Default::default()
                }]),
                type_: Some("ClusterIP".into()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn service_account(&self) -> ServiceAccount {
        ServiceAccount {
            metadata: self.namespaced(self.operand.name()),
            ..Default::default()
        }
    }

    /// Namespaced roles: read access to the operand's own configuration.
    #[must_use]
    pub fn roles(&self) -> Vec<Role> {
        vec![Role {
            metadata: self.namespaced(self.operand.name()),
            rules: Some(vec![rule(
                &[""],
                &["configmaps", "secrets"],
                &["get", "list", "watch"],
            )]),
        }]
    }

    /// Namespaced bindings, including the `kube-system` authentication reader.
    #[must_use]
    pub fn role_bindings(&self) -> Vec<RoleBinding> {
        let name = self.operand.name();
        vec![
            RoleBinding {
                metadata: self.namespaced(name),
                role_ref: RoleRef {
                    api_group: RBAC_API_GROUP.to_string(),
                    kind: "Role".to_string(),
                    name: name.to_string(),
                },
                subjects: Some(vec![self.service_account_subject()]),
            },
            RoleBinding {
                metadata: self.metadata(
                    format!("extension-server-authentication-reader-{name}"),
                    Some(KUBE_SYSTEM_NAMESPACE),
                ),
                role_ref: RoleRef {
                    api_group: RBAC_API_GROUP.to_string(),
                    kind: "Role".to_string(),
                    name: EXTENSION_APISERVER_AUTH_READER_ROLE.to_string(),
                },
                subjects: Some(vec![self.service_account_subject()]),
            },
        ]
    }

    /// Cluster roles: aggregated-apiserver defaults, anonymous access, SCC use.
    #[must_use]
    pub fn cluster_roles(&self) -> Vec<ClusterRole> {
        let name = self.operand.name();
        vec![
            ClusterRole {
                metadata: self.metadata(name, None),
                rules: Some(vec![
                    rule(&[""], &["namespaces"], &["get", "list", "watch"]),
                    rule(
                        &["admissionregistration.k8s.io"],
                        &["mutatingwebhookconfigurations", "validatingwebhookconfigurations"],
                        &["get", "list", "watch"],
                    ),
                    rule(
                        &["flowcontrol.apiserver.k8s.io"],
                        &["prioritylevelconfigurations", "flowschemas"],
                        &["get", "list", "watch"],
                    ),
                ]),
                ..Default::default()
            },
            ClusterRole {
                metadata: self.metadata(format!("system:{name}-requester"), None),
                rules: Some(vec![rule(
                    &[ADMISSION_API_GROUP],
                    &[ADMISSION_RESOURCE],
                    &["create"],
                )]),
                ..Default::default()
            },
            ClusterRole {
                metadata: self.metadata(format!("{name}-scc"), None),
                rules: Some(vec![PolicyRule {
                    resource_names: Some(vec![OPERAND_SCC.to_string()]),
                    ..rule(
                        &["security.openshift.io"],
                        &["securitycontextconstraints"],
                        &["use"],
                    )
                }]),
                ..Default::default()
            },
        ]
    }

    /// Cluster role bindings: auth delegation, defaults, anonymous access, SCC use.
    #[must_use]
    pub fn cluster_role_bindings(&self) -> Vec<ClusterRoleBinding> {
        let name = self.operand.name();
        let binding = |binding_name: String, role: String, subject: Subject| ClusterRoleBinding {
            metadata: self.metadata(binding_name, None),
            role_ref: RoleRef {
                api_group: RBAC_API_GROUP.to_string(),
                kind: "ClusterRole".to_string(),
                name: role,
            },
            subjects: Some(vec![subject]),
        };
        vec![
            binding(
                format!("{name}-auth-delegator"),
                AUTH_DELEGATOR_CLUSTER_ROLE.to_string(),
                self.service_account_subject(),
            ),
            binding(name.to_string(), name.to_string(), self.service_account_subject()),
            binding(
                format!("{name}-anonymous-access"),
                format!("system:{name}-requester"),
                Subject {
                    api_group: Some(RBAC_API_GROUP.to_string()),
                    kind: "User".to_string(),
                    name: "system:anonymous".to_string(),
                    namespace: None,
                },
            ),
            binding(
                format!("{name}-scc"),
                format!("{name}-scc"),
                self.service_account_subject(),
            ),
        ]
    }

    // ------------------------------------------------------------------------
    // Workload
    // ------------------------------------------------------------------------

    /// Operand `DaemonSet` running the webhook server at `--v=<verbosity>`.
    ///
    /// Hash annotations are stamped by the deployment facade, not here.
    #[must_use]
    pub fn daemon_set(&self, verbosity: u8) -> DaemonSet {
        let mut template_labels = self.labels();
        template_labels.extend(self.selector_labels());

        let container = Container {
            name: OPERAND_CONTAINER_NAME.to_string(),
            image: Some(self.operand.image().to_string()),
            image_pull_policy: Some("IfNotPresent".to_string()),
            command: Some(vec!["/usr/bin/run-once-duration-override".to_string()]),
            args: Some(vec![
                format!("--secure-port={OPERAND_SECURE_PORT}"),
                "--bind-address=0.0.0.0".to_string(),
                "--audit-log-path=-".to_string(),
                format!("--tls-cert-file={SERVING_CERT_MOUNT_PATH}/{TLS_CERT}"),
                format!("--tls-private-key-file={SERVING_CERT_MOUNT_PATH}/{TLS_KEY}"),
                format!("--v={verbosity}"),
            ]),
            env: Some(vec![EnvVar {
                name: "CONFIGURATION_PATH".to_string(),
                value: Some(format!("{CONFIGURATION_MOUNT_PATH}/{CONFIGURATION_KEY}")),
                ..Default::default()
            }]),
            ports: Some(vec![ContainerPort {
                name: Some("https".into()),
                container_port: OPERAND_SECURE_PORT,
                protocol: Some("TCP".into()),
                ..Default::default()
            }]),
            readiness_probe: Some(Probe {
                http_get: Some(HTTPGetAction {
                    path: Some(OPERAND_HEALTH_PATH.to_string()),
                    port: IntOrString::Int(OPERAND_SECURE_PORT),
                    scheme: Some("HTTPS".to_string()),
                    ..Default::default()
                }),
                initial_delay_seconds: Some(READINESS_INITIAL_DELAY_SECS),
                period_seconds: Some(READINESS_PERIOD_SECS),
                ..Default::default()
            }),
            resources: Some(ResourceRequirements {
                requests: Some(BTreeMap::from([
                    ("cpu".to_string(), Quantity("10m".to_string())),
                    ("memory".to_string(), Quantity("50Mi".to_string())),
                ])),
                ..Default::default()
            }),
            security_context: Some(SecurityContext {
                allow_privilege_escalation: Some(false),
                read_only_root_filesystem: Some(true),
                run_as_non_root: Some(true),
                capabilities: Some(Capabilities {
                    drop: Some(vec!["ALL".to_string()]),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            volume_mounts: Some(vec![
                VolumeMount {
                    name: SERVING_CERT_VOLUME.to_string(),
                    mount_path: SERVING_CERT_MOUNT_PATH.to_string(),
                    read_only: Some(true),
                    ..Default::default()
                },
                VolumeMount {
                    name: CONFIGURATION_VOLUME.to_string(),
                    mount_path: CONFIGURATION_MOUNT_PATH.to_string(),
                    read_only: Some(true),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        };

        DaemonSet {
            metadata: self.namespaced(self.daemon_set_name()),
            spec: Some(DaemonSetSpec {
                selector: LabelSelector {
                    match_labels: Some(self.selector_labels()),
                    ..Default::default()
                },
                update_strategy: Some(DaemonSetUpdateStrategy {
                    type_: Some("RollingUpdate".to_string()),
                    rolling_update: Some(RollingUpdateDaemonSet {
                        max_unavailable: Some(IntOrString::Int(1)),
                        ..Default::default()
                    }),
                }),
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        name: Some(self.daemon_set_name()),
                        labels: Some(template_labels),
                        annotations: Some(self.owner_annotations()),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        service_account_name: Some(self.operand.name().to_string()),
                        priority_class_name: Some(OPERAND_PRIORITY_CLASS.to_string()),
                        node_selector: Some(BTreeMap::from([(
                            CONTROL_PLANE_NODE_LABEL.to_string(),
                            String::new(),
                        )])),
                        tolerations: Some(vec![Toleration {
                            key: Some(CONTROL_PLANE_NODE_LABEL.to_string()),
                            operator: Some("Exists".to_string()),
                            effect: Some("NoSchedule".to_string()),
                            ..Default::default()
                        }]),
                        containers: vec![container],
                        volumes: Some(vec![
                            Volume {
                                name: SERVING_CERT_VOLUME.to_string(),
                                secret: Some(SecretVolumeSource {
                                    secret_name: Some(self.serving_cert_secret_name()),
                                    ..Default::default()
                                }),
                                ..Default::default()
                            },
                            Volume {
                                name: CONFIGURATION_VOLUME.to_string(),
                                config_map: Some(ConfigMapVolumeSource {
                                    name: self.configuration_config_map_name(),
                                    ..Default::default()
                                }),
                                ..Default::default()
                            },
                        ]),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    // ------------------------------------------------------------------------
    // API registration
    // ------------------------------------------------------------------------

    /// Webhook registration without a CA bundle; see [`stamp_ca_bundle`].
    #[must_use]
    pub fn mutating_webhook_configuration(&self) -> MutatingWebhookConfiguration {
        MutatingWebhookConfiguration {
            metadata: self.metadata(MUTATING_WEBHOOK_CONFIGURATION_NAME, None),
            webhooks: Some(vec![MutatingWebhook {
                name: MUTATING_WEBHOOK_CONFIGURATION_NAME.to_string(),
                admission_review_versions: vec!["v1".to_string()],
                client_config: WebhookClientConfig {
                    service: Some(ServiceReference {
                        name: self.operand.name().to_string(),
                        namespace: self.operand.namespace().to_string(),
                        path: Some(self.operand.webhook_path()),
                        port: Some(SERVICE_PORT),
                    }),
                    ..Default::default()
                },
                failure_policy: Some("Ignore".to_string()),
                match_policy: Some("Equivalent".to_string()),
                namespace_selector: Some(LabelSelector {
                    match_labels: Some(BTreeMap::from([(
                        NAMESPACE_OPT_IN_LABEL.to_string(),
                        NAMESPACE_OPT_IN_VALUE.to_string(),
                    )])),
                    ..Default::default()
                }),
                reinvocation_policy: Some("Never".to_string()),
                rules: Some(vec![RuleWithOperations {
                    api_groups: Some(vec![String::new()]),
                    api_versions: Some(vec!["v1".to_string()]),
                    operations: Some(vec!["CREATE".to_string()]),
                    resources: Some(vec!["pods".to_string()]),
                    scope: Some("Namespaced".to_string()),
                }]),
                side_effects: "None".to_string(),
                timeout_seconds: Some(WEBHOOK_TIMEOUT_SECS),
                ..Default::default()
            }]),
        }
    }

    /// Aggregated API registration trusting `ca`.
    #[must_use]
    pub fn api_service(&self, ca: &[u8]) -> APIService {
        APIService {
            metadata: self.metadata(API_SERVICE_NAME, None),
            spec: Some(APIServiceSpec {
                ca_bundle: Some(ByteString(ca.to_vec())),
                group: Some(ADMISSION_API_GROUP.to_string()),
                version: Some(ADMISSION_API_VERSION.to_string()),
                group_priority_minimum: API_SERVICE_GROUP_PRIORITY_MINIMUM,
                version_priority: API_SERVICE_VERSION_PRIORITY,
                service: Some(APIServiceReference {
                    name: Some(self.operand.name().to_string()),
                    namespace: Some(self.operand.namespace().to_string()),
                    port: Some(SERVICE_PORT),
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[cfg(test)]
#[path = "assets_tests.rs"]
mod assets_tests;
