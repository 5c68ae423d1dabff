// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label and annotation constants used across the asset catalog and fan-in.
//!
//! This module defines standard Kubernetes labels and operator-specific labels/annotations
//! to ensure consistency across all resources created by the controller.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the component name within the architecture
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of the application
pub const K8S_NAME: &str = "app.kubernetes.io/name";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

// ============================================================================
// Kubernetes Standard Label Values
// ============================================================================

/// Value for `app.kubernetes.io/managed-by` on every managed object
pub const MANAGED_BY_OPERATOR: &str = "runoncedurationoverride-operator";

/// Component value for the admission webhook workload
pub const COMPONENT_ADMISSION_WEBHOOK: &str = "admission-webhook";

// ============================================================================
// Operand Selector
// ============================================================================

/// Legacy `app` label carried by operand pods
pub const APP_LABEL: &str = "app";

/// Label value marking operand pods for the DaemonSet and Service selectors
pub const SELECTOR_VALUE: &str = "true";

// ============================================================================
// Annotation Key Suffixes
//
// Full keys are `<operand name>.<API_GROUP>/<suffix>`; see
// `assets::Assets::annotation_key`.
// ============================================================================

/// Hash of the configuration payload the workload was rolled out with
pub const CONFIGURATION_HASH_SUFFIX: &str = "configuration.hash";

/// Hash of the serving certificate bundle the workload was rolled out with
pub const SERVING_CERT_HASH_SUFFIX: &str = "servingcert.hash";

/// Hash of the operand-affecting operator knobs (log level)
pub const OBSERVED_CONFIG_HASH_SUFFIX: &str = "observedconfig.hash";

/// Name of the owning configuration object, for objects without an owner reference
pub const OWNER_SUFFIX: &str = "owner";

// ============================================================================
// Well-Known Cluster Annotations and Labels
// ============================================================================

/// Hint for an external CA injector to populate the CA bundle `ConfigMap`
pub const INJECT_CABUNDLE_ANNOTATION: &str = "service.beta.openshift.io/inject-cabundle";

/// Namespace opt-in label honored by the admission webhook
pub const NAMESPACE_OPT_IN_LABEL: &str =
    "runoncedurationoverrides.admission.runoncedurationoverride.openshift.io/enabled";

/// Value of the namespace opt-in label
pub const NAMESPACE_OPT_IN_VALUE: &str = "true";

/// Node role label the operand is scheduled onto
pub const CONTROL_PLANE_NODE_LABEL: &str = "node-role.kubernetes.io/master";
