// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Stable content hashes driving change detection.
//!
//! Hashes are hex-encoded SHA-256 digests over canonical strings. The canonical
//! form lists `key=value` pairs sorted by key and joined by newlines, so adding
//! a field only changes the hash once the field carries a value.

use crate::crd::{RunOnceDurationOverrideConfigSpec, RunOnceDurationOverrideSpec};
use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `data`.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Join `key=value` pairs in key order.
fn canonical<'a>(pairs: impl IntoIterator<Item = (&'a str, String)>) -> String {
    let mut pairs: Vec<(&str, String)> = pairs.into_iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Canonical string of the admission payload, e.g. `activeDeadlineSeconds=3600`.
#[must_use]
pub fn canonical_configuration(config: &RunOnceDurationOverrideConfigSpec) -> String {
    canonical([(
        "activeDeadlineSeconds",
        config.active_deadline_seconds.to_string(),
    )])
}

/// Hash of the admission payload stored as `status.hash.configuration`.
#[must_use]
pub fn configuration_hash(config: &RunOnceDurationOverrideConfigSpec) -> String {
    sha256_hex(canonical_configuration(config).as_bytes())
}

/// Hash of the operand-affecting operator knobs stored as `status.hash.observedConfig`.
#[must_use]
pub fn observed_config_hash(spec: &RunOnceDurationOverrideSpec) -> String {
    sha256_hex(canonical([("logLevel", spec.operand_log_level().to_string())]).as_bytes())
}

#[cfg(test)]
#[path = "hashing_tests.rs"]
mod hashing_tests;
