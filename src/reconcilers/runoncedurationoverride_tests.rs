// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `runoncedurationoverride.rs`
//!
//! Full reconciliation cycles against the in-memory cluster.

#[cfg(test)]
mod tests {
    use super::super::{ReconcileError, Reconciler, Verdict};
    use crate::assets::OperandConfiguration;
    use crate::cert::{parse_rotate_at, CertConfig};
    use crate::client::{ClusterClient, SingletonLister};
    use crate::crd::{
        RunOnceDurationOverride, RunOnceDurationOverrideConfig, RunOnceDurationOverrideConfigSpec,
        RunOnceDurationOverrideSpec, RunOnceDurationOverrideStatus,
    };
    use crate::handler_errors::HandlerError;
    use crate::hashing::{configuration_hash, sha256_hex};
    use crate::operand::OperandContext;
    use crate::reconcilers::pipeline::Pipeline;
    use crate::reconcilers::status::{find_condition, set_condition, StatusOutcome, StatusWriter};
    use crate::testing::FakeCluster;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use k8s_openapi::api::admissionregistration::v1::MutatingWebhookConfiguration;
    use k8s_openapi::api::apps::v1::DaemonSet;
    use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service, ServiceAccount};
    use k8s_openapi::kube_aggregator::pkg::apis::apiregistration::v1::APIService;
    use std::sync::Arc;
    use std::time::Duration;

    const OP: &str = "runoncedurationoverride";
    const NS: &str = "rodoo-ns";
    const IMAGE: &str = "quay.io/openshift/run-once-duration-override:1.0";
    const WEBHOOK: &str = "runoncedurationoverrides.admission.runoncedurationoverride.openshift.io";
    const API_SERVICE: &str = "v1.admission.runoncedurationoverride.openshift.io";
    const RESYNC: Duration = Duration::from_secs(300);

    struct Harness {
        cluster: Arc<FakeCluster>,
        reconciler: Reconciler,
    }

    impl Harness {
        fn new(active_deadline_seconds: i64, ready: bool) -> Self {
            let cluster = Arc::new(FakeCluster::new());
            cluster.set_daemon_set_ready(ready);
            cluster.seed_singleton("cluster", spec(active_deadline_seconds));

            let operand = Arc::new(OperandContext::new(OP, NS, "cluster", IMAGE, "1.0"));
            let client: Arc<dyn ClusterClient> = cluster.clone();
            let lister: Arc<dyn SingletonLister> = cluster.clone();
            let reconciler = Reconciler::new(
                operand,
                Pipeline::standard(client.clone(), CertConfig::default()),
                StatusWriter::new(client, lister),
                RESYNC,
            );

            Self {
                cluster,
                reconciler,
            }
        }

        async fn cycle(&self, now: DateTime<Utc>) -> Result<Verdict, ReconcileError> {
            let obj = self.cluster.singleton().unwrap();
            self.reconciler.reconcile(&obj, now).await
        }

        fn status(&self) -> RunOnceDurationOverrideStatus {
            self.cluster.singleton().unwrap().status.unwrap_or_default()
        }

        fn daemon_set(&self) -> DaemonSet {
            self.cluster.object::<DaemonSet>(Some(NS), OP).unwrap()
        }
    }

    fn spec(active_deadline_seconds: i64) -> RunOnceDurationOverrideSpec {
        RunOnceDurationOverrideSpec {
            run_once_duration_override: RunOnceDurationOverrideConfig {
                spec: RunOnceDurationOverrideConfigSpec {
                    active_deadline_seconds,
                },
            },
            ..Default::default()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap()
    }

    fn condition(status: &RunOnceDurationOverrideStatus, condition_type: &str) -> (String, String) {
        let c = find_condition(&status.conditions, condition_type)
            .unwrap_or_else(|| panic!("missing condition {condition_type}"));
        (c.status.clone(), c.reason.clone().unwrap_or_default())
    }

    fn annotation(ds: &DaemonSet, suffix: &str) -> String {
        ds.metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(&format!("{OP}.operator.openshift.io/{suffix}")))
            .cloned()
            .unwrap_or_default()
    }

    fn image(ds: &DaemonSet) -> Option<String> {
        ds.spec.as_ref()?.template.spec.as_ref()?.containers.first()?.image.clone()
    }

    #[tokio::test]
    async fn test_fresh_install() {
        let h = Harness::new(3600, true);

        let verdict = h.cycle(t0()).await.unwrap();
        assert_eq!(verdict, Verdict::Synced { requeue_after: RESYNC });

        let status = h.status();
        assert_eq!(
            status.hash.configuration,
            sha256_hex(b"activeDeadlineSeconds=3600")
        );
        assert!(!status.hash.serving_cert.is_empty());
        assert_eq!(condition(&status, "Available"), ("True".into(), "AsExpected".into()));
        assert_eq!(
            condition(&status, "InstallReadinessFailure"),
            ("False".into(), "AsExpected".into())
        );
        assert_eq!(status.observed_generation, Some(1));
        assert_eq!(status.image.as_deref(), Some(IMAGE));
        assert_eq!(status.version.as_deref(), Some("1.0"));

        // every managed object exists
        let configuration = h
            .cluster
            .object::<ConfigMap>(Some(NS), &format!("{OP}-configuration"))
            .unwrap();
        let secret = h
            .cluster
            .object::<Secret>(Some(NS), &format!("server-serving-cert-{OP}"))
            .unwrap();
        let ca = h
            .cluster
            .object::<ConfigMap>(Some(NS), &format!("{OP}-service-serving"))
            .unwrap();
        assert!(h.cluster.object::<Service>(Some(NS), OP).is_some());
        assert!(h.cluster.object::<ServiceAccount>(Some(NS), OP).is_some());
        let webhook = h
            .cluster
            .object::<MutatingWebhookConfiguration>(None, WEBHOOK)
            .unwrap();
        assert!(h.cluster.object::<APIService>(None, API_SERVICE).is_some());
        assert!(!h.cluster.names("Role").is_empty());
        assert!(!h.cluster.names("RoleBinding").is_empty());
        assert!(!h.cluster.names("ClusterRole").is_empty());
        assert!(!h.cluster.names("ClusterRoleBinding").is_empty());

        // the stored configuration hashes to the recorded value
        let document = &configuration.data.as_ref().unwrap()["configuration.yaml"];
        let parsed = OperandConfiguration::parse(document).unwrap();
        assert_eq!(configuration_hash(&parsed.spec), status.hash.configuration);

        // references point at the live objects
        assert_eq!(
            status.resources.configuration_ref.unwrap().resource_version,
            configuration.metadata.resource_version.unwrap()
        );
        assert_eq!(
            status.resources.service_cert_secret_ref.unwrap().resource_version,
            secret.metadata.resource_version.clone().unwrap()
        );
        assert!(status.resources.service_ref.is_some());
        assert!(status.resources.api_service_ref.is_some());
        assert_eq!(
            status.resources.mutating_webhook_configuration_ref.unwrap().name,
            WEBHOOK
        );

        // the DaemonSet carries the hashes it was rolled out with
        let ds = h.daemon_set();
        assert_eq!(annotation(&ds, "configuration.hash"), status.hash.configuration);
        assert_eq!(annotation(&ds, "servingcert.hash"), status.hash.serving_cert);
        assert_eq!(annotation(&ds, "owner"), "cluster");
        assert_eq!(
            status.resources.deployment_ref.unwrap().resource_version,
            ds.metadata.resource_version.clone().unwrap()
        );

        // the webhook trusts the generated CA
        let ca_pem = ca.data.as_ref().unwrap()["service-ca.crt"].as_bytes().to_vec();
        let webhooks = webhook.webhooks.unwrap();
        assert_eq!(webhooks[0].client_config.ca_bundle.as_ref().unwrap().0, ca_pem);

        // every child is owned by the singleton
        for owners in [
            ds.metadata.owner_references.clone(),
            secret.metadata.owner_references.clone(),
            webhook.metadata.owner_references.clone(),
        ] {
            let owners = owners.unwrap();
            assert_eq!(owners[0].uid, "uid-cluster");
            assert_eq!(owners[0].controller, Some(true));
        }

        // rotation is scheduled one validity period minus the threshold ahead
        let rotate_at = parse_rotate_at(status.certs_rotate_at.as_deref()).unwrap();
        assert_eq!(
            rotate_at,
            t0() + ChronoDuration::days(365) - ChronoDuration::hours(48)
        );
    }

    #[tokio::test]
    async fn test_second_cycle_is_idempotent() {
        let h = Harness::new(3600, true);
        h.cycle(t0()).await.unwrap();
        assert!(h.cluster.total_applies() > 0);
        assert_eq!(h.cluster.status_writes(), 1);

        h.cluster.reset_counters();
        let before = h.cluster.singleton().unwrap();

        let verdict = h.cycle(t0() + ChronoDuration::minutes(5)).await.unwrap();

        assert_eq!(verdict, Verdict::Synced { requeue_after: RESYNC });
        assert_eq!(h.cluster.total_applies(), 0);
        assert_eq!(h.cluster.deletes("MutatingWebhookConfiguration"), 0);
        assert_eq!(h.cluster.status_writes(), 0);
        assert_eq!(h.cluster.singleton().unwrap(), before);
    }

    #[tokio::test]
    async fn test_invalid_spec_stops_before_any_apply() {
        let h = Harness::new(-1, true);

        let err = h.cycle(t0()).await.unwrap_err();

        match err {
            ReconcileError::Handler { handler, source } => {
                assert_eq!(handler, "validation");
                assert!(matches!(source, HandlerError::InvalidParameters(_)));
            }
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(h.cluster.total_applies(), 0);

        let status = h.status();
        assert_eq!(
            condition(&status, "InstallReadinessFailure"),
            ("True".into(), "InvalidParameters".into())
        );
        assert_eq!(status.observed_generation, None);
    }

    #[tokio::test]
    async fn test_deleted_secret_is_regenerated() {
        let h = Harness::new(3600, true);
        h.cycle(t0()).await.unwrap();
        let before = h.status();

        h.cluster
            .remove("Secret", Some(NS), &format!("server-serving-cert-{OP}"));
        let later = t0() + ChronoDuration::hours(1);
        h.cycle(later).await.unwrap();

        let after = h.status();
        assert_ne!(after.hash.serving_cert, before.hash.serving_cert);
        assert_ne!(after.certs_rotate_at, before.certs_rotate_at);
        assert!(h
            .cluster
            .object::<Secret>(Some(NS), &format!("server-serving-cert-{OP}"))
            .is_some());

        let ds = h.daemon_set();
        assert_eq!(annotation(&ds, "servingcert.hash"), after.hash.serving_cert);

        // the webhook was re-registered against the new CA
        assert_eq!(h.cluster.deletes("MutatingWebhookConfiguration"), 1);
        let ca = h
            .cluster
            .object::<ConfigMap>(Some(NS), &format!("{OP}-service-serving"))
            .unwrap();
        let webhook = h
            .cluster
            .object::<MutatingWebhookConfiguration>(None, WEBHOOK)
            .unwrap();
        assert_eq!(
            webhook.webhooks.unwrap()[0].client_config.ca_bundle.as_ref().unwrap().0,
            ca.data.unwrap()["service-ca.crt"].as_bytes().to_vec()
        );
    }

    #[tokio::test]
    async fn test_due_rotation_renews_bundle() {
        let h = Harness::new(3600, true);
        h.cycle(t0()).await.unwrap();
        let before = h.status();
        let rotate_at = parse_rotate_at(before.certs_rotate_at.as_deref()).unwrap();

        let now = rotate_at + ChronoDuration::seconds(1);
        let verdict = h.cycle(now).await.unwrap();

        let after = h.status();
        assert_ne!(after.hash.serving_cert, before.hash.serving_cert);
        assert!(parse_rotate_at(after.certs_rotate_at.as_deref()).unwrap() > now);
        assert_eq!(verdict, Verdict::Synced { requeue_after: RESYNC });
    }

    #[tokio::test]
    async fn test_requeue_at_rotation_time() {
        let h = Harness::new(3600, true);
        h.cycle(t0()).await.unwrap();
        let rotate_at = parse_rotate_at(h.status().certs_rotate_at.as_deref()).unwrap();

        let verdict = h.cycle(rotate_at - ChronoDuration::seconds(90)).await.unwrap();

        assert_eq!(
            verdict,
            Verdict::Synced {
                requeue_after: Duration::from_secs(90)
            }
        );
    }

    #[tokio::test]
    async fn test_daemon_set_not_ready() {
        let h = Harness::new(3600, false);

        let err = h.cycle(t0()).await.unwrap_err();

        assert!(matches!(
            err,
            ReconcileError::Handler {
                handler: "deployment-ready",
                source: HandlerError::DeploymentNotReady(_)
            }
        ));
        let status = h.status();
        assert_eq!(
            condition(&status, "InstallReadinessFailure"),
            ("True".into(), "DeploymentNotReady".into())
        );
        assert_eq!(
            condition(&status, "Available"),
            ("False".into(), "AdmissionWebhookNotAvailable".into())
        );
        // webhook registration waits for the rollout
        assert!(h
            .cluster
            .object::<MutatingWebhookConfiguration>(None, WEBHOOK)
            .is_none());

        // once the pods are up the install completes without a re-apply
        h.cluster.set_daemon_set_ready(true);
        h.cluster.reset_counters();
        h.cycle(t0() + ChronoDuration::minutes(1)).await.unwrap();

        let status = h.status();
        assert_eq!(condition(&status, "Available"), ("True".into(), "AsExpected".into()));
        assert_eq!(h.cluster.applies("DaemonSet"), 0);
        assert_eq!(h.cluster.applies("MutatingWebhookConfiguration"), 1);
    }

    #[tokio::test]
    async fn test_non_singleton_is_ignored() {
        let h = Harness::new(3600, true);
        let mut other = RunOnceDurationOverride::new("other", spec(60));
        other.metadata.resource_version = Some("7".into());

        let verdict = h.reconciler.reconcile(&other, t0()).await.unwrap();

        assert_eq!(verdict, Verdict::Ignored);
        assert_eq!(h.cluster.total_applies(), 0);
        assert_eq!(h.cluster.status_writes(), 0);
    }

    #[tokio::test]
    async fn test_image_drift_is_reverted() {
        let h = Harness::new(3600, true);
        h.cycle(t0()).await.unwrap();
        let before = h.status().resources.deployment_ref.unwrap();

        h.cluster.mutate::<DaemonSet, _>(Some(NS), OP, |ds| {
            if let Some(pod) = ds.spec.as_mut().and_then(|s| s.template.spec.as_mut()) {
                pod.containers[0].image = Some("registry.example/other:9".into());
            }
        });
        h.cycle(t0() + ChronoDuration::minutes(1)).await.unwrap();

        assert_eq!(image(&h.daemon_set()).as_deref(), Some(IMAGE));
        let after = h.status().resources.deployment_ref.unwrap();
        assert_ne!(after.resource_version, before.resource_version);
        assert_eq!(
            after.resource_version,
            h.daemon_set().metadata.resource_version.unwrap()
        );
    }

    #[tokio::test]
    async fn test_configuration_change_rolls_out() {
        let h = Harness::new(3600, true);
        h.cycle(t0()).await.unwrap();

        h.cluster.update_singleton_spec(spec(600));
        h.cycle(t0() + ChronoDuration::minutes(1)).await.unwrap();

        let status = h.status();
        assert_eq!(status.hash.configuration, sha256_hex(b"activeDeadlineSeconds=600"));
        assert_eq!(status.observed_generation, Some(2));
        assert_eq!(
            annotation(&h.daemon_set(), "configuration.hash"),
            status.hash.configuration
        );
    }

    #[tokio::test]
    async fn test_stale_cache_falls_back_to_quorum_read() {
        let h = Harness::new(3600, true);
        let client: Arc<dyn ClusterClient> = h.cluster.clone();
        let lister: Arc<dyn SingletonLister> = h.cluster.clone();
        let writer = StatusWriter::new(client, lister);

        // the cache keeps serving the first resourceVersion after the server moved on
        h.cluster.freeze_lister();
        h.cluster.update_singleton_spec(spec(60));

        let outcome = writer
            .update("cluster", |status| {
                set_condition(
                    &mut status.conditions,
                    "Available",
                    "True",
                    "AsExpected",
                    "",
                    t0(),
                );
            })
            .await
            .unwrap();

        assert!(matches!(outcome, StatusOutcome::Written(_)));
        assert_eq!(h.cluster.status_writes(), 1);
        assert_eq!(condition(&h.status(), "Available").0, "True");
    }

    #[tokio::test]
    async fn test_status_write_failure_is_reported() {
        let h = Harness::new(3600, true);
        h.cluster.fail("update_status", 500, "InternalError");

        let err = h.cycle(t0()).await.unwrap_err();

        assert!(matches!(err, ReconcileError::Status(_)));
    }
}
