// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # rodoo - RunOnceDurationOverride Operator for Kubernetes
//!
//! rodoo installs and maintains the RunOnceDurationOverride admission webhook,
//! which sets `activeDeadlineSeconds` on run-once pods in namespaces that opted
//! in by label. One cluster-scoped `RunOnceDurationOverride` object (the
//! singleton, named `cluster` by default) drives the whole install.
//!
//! ## Modules
//!
//! - [`crd`] - The `RunOnceDurationOverride` custom resource and its status model
//! - [`assets`] - Desired form of every managed object
//! - [`cert`] - Self-signed serving certificate generation and rotation timing
//! - [`hashing`] - Content hashes driving change detection
//! - [`client`] - Cluster access used by the reconciliation engine
//! - [`reconcilers`] - The handler pipeline, status writer, apply adapter and event fan-in
//! - [`controller`] - kube-rs controller wiring
//! - [`config`] - Command line and environment configuration
//! - [`metrics`] and [`health`] - Prometheus metrics and the health endpoint
//!
//! ## Example
//!
//! ```rust,no_run
//! use rodoo::crd::{RunOnceDurationOverride, RunOnceDurationOverrideSpec};
//!
//! let spec: RunOnceDurationOverrideSpec = serde_json::from_value(serde_json::json!({
//!     "runOnceDurationOverride": { "spec": { "activeDeadlineSeconds": 3600 } }
//! }))
//! .unwrap();
//! let singleton = RunOnceDurationOverride::new("cluster", spec);
//! ```

pub mod assets;
pub mod cert;
pub mod client;
pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod crd;
pub mod handler_errors;
pub mod hashing;
pub mod health;
pub mod labels;
pub mod metrics;
pub mod operand;
pub mod reconcilers;
pub mod status_reasons;

#[cfg(test)]
pub mod testing;
