// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `daemonset.rs`

#[cfg(test)]
mod tests {
    use super::super::{apply_trigger, DaemonSetTrigger};
    use crate::assets::Assets;
    use crate::crd::{GenerationStatus, RunOnceDurationOverrideStatus};
    use crate::operand::OperandContext;
    use k8s_openapi::api::apps::v1::DaemonSet;
    use std::collections::BTreeMap;

    const IMAGE: &str = "quay.io/openshift/run-once-duration-override:1.0";

    fn operand() -> OperandContext {
        OperandContext::new("runoncedurationoverride", "rodoo-ns", "cluster", IMAGE, "1.0")
    }

    fn status() -> RunOnceDurationOverrideStatus {
        let mut status = RunOnceDurationOverrideStatus::default();
        status.hash.configuration = "cfg".into();
        status.hash.serving_cert = "cert".into();
        status
    }

    fn stamped(assets: &Assets<'_>, generation: i64) -> DaemonSet {
        let mut ds = assets.daemon_set(2);
        ds.metadata.generation = Some(generation);
        ds.metadata.annotations = Some(BTreeMap::from([
            (assets.configuration_hash_annotation(), "cfg".to_string()),
            (assets.serving_cert_hash_annotation(), "cert".to_string()),
            (assets.observed_config_hash_annotation(), "observed".to_string()),
        ]));
        ds
    }

    #[test]
    fn test_in_sync_daemon_set_has_no_trigger() {
        let operand = operand();
        let assets = Assets::new(&operand, None);
        let ds = stamped(&assets, 1);

        assert_eq!(
            apply_trigger(Some(&ds), &assets, &status(), "observed", IMAGE),
            None
        );
    }

    #[test]
    fn test_missing_daemon_set_triggers() {
        let operand = operand();
        let assets = Assets::new(&operand, None);

        assert_eq!(
            apply_trigger(None, &assets, &status(), "observed", IMAGE),
            Some(DaemonSetTrigger::Missing)
        );
    }

    #[test]
    fn test_hash_mismatches_trigger() {
        let operand = operand();
        let assets = Assets::new(&operand, None);
        let ds = stamped(&assets, 1);

        let mut changed = status();
        changed.hash.configuration = "cfg-2".into();
        assert_eq!(
            apply_trigger(Some(&ds), &assets, &changed, "observed", IMAGE),
            Some(DaemonSetTrigger::ConfigurationHash)
        );

        let mut changed = status();
        changed.hash.serving_cert = "cert-2".into();
        assert_eq!(
            apply_trigger(Some(&ds), &assets, &changed, "observed", IMAGE),
            Some(DaemonSetTrigger::ServingCertHash)
        );

        assert_eq!(
            apply_trigger(Some(&ds), &assets, &status(), "observed-2", IMAGE),
            Some(DaemonSetTrigger::ObservedConfigHash)
        );
    }

    #[test]
    fn test_image_change_triggers() {
        let operand = operand();
        let assets = Assets::new(&operand, None);
        let ds = stamped(&assets, 1);

        assert_eq!(
            apply_trigger(Some(&ds), &assets, &status(), "observed", "other:2.0"),
            Some(DaemonSetTrigger::Image)
        );
    }

    #[test]
    fn test_generation_drift_triggers() {
        let operand = operand();
        let assets = Assets::new(&operand, None);
        let ds = stamped(&assets, 3);

        let mut tracked = status();
        tracked.generations.push(GenerationStatus {
            group: "apps".into(),
            resource: "daemonsets".into(),
            namespace: "rodoo-ns".into(),
            name: "runoncedurationoverride".into(),
            last_generation: 2,
            hash: None,
        });

        assert_eq!(
            apply_trigger(Some(&ds), &assets, &tracked, "observed", IMAGE),
            Some(DaemonSetTrigger::GenerationDrift)
        );
    }
}
