// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `availability.rs`

#[cfg(test)]
mod tests {
    use super::super::AvailabilityHandler;
    use crate::assets::Assets;
    use crate::client::ClusterClient;
    use crate::crd::{RunOnceDurationOverride, RunOnceDurationOverrideSpec};
    use crate::operand::OperandContext;
    use crate::reconcilers::pipeline::{Handler, ReconcileContext, Step};
    use crate::reconcilers::status::find_condition;
    use crate::status_reasons::{
        CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE, CONDITION_TYPE_AVAILABLE,
        REASON_ADMISSION_WEBHOOK_NOT_AVAILABLE, REASON_AS_EXPECTED, REASON_INTERNAL_ERROR,
    };
    use crate::testing::FakeCluster;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    const IMAGE: &str = "quay.io/openshift/run-once-duration-override:1.0";

    fn operand() -> Arc<OperandContext> {
        Arc::new(OperandContext::new(
            "runoncedurationoverride",
            "rodoo-ns",
            "cluster",
            IMAGE,
            "1.0",
        ))
    }

    /// Run the post-pass handler and return the `Available` condition's
    /// status, reason and message.
    async fn available(cluster: Arc<FakeCluster>) -> (String, String, String) {
        let handler = AvailabilityHandler::post(cluster);
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut ctx = ReconcileContext::new(operand(), None, now);
        let mut obj = RunOnceDurationOverride::new("cluster", RunOnceDurationOverrideSpec::default());

        let step = handler.handle(&mut ctx, &mut obj).await.unwrap();
        assert_eq!(step, Step::Continue);

        let status = obj.status.unwrap();
        let condition = find_condition(&status.conditions, CONDITION_TYPE_AVAILABLE).unwrap();
        (
            condition.status.clone(),
            condition.reason.clone().unwrap_or_default(),
            condition.message.clone().unwrap_or_default(),
        )
    }

    async fn with_daemon_set(ready: bool) -> Arc<FakeCluster> {
        let cluster = Arc::new(FakeCluster::new());
        cluster.set_daemon_set_ready(ready);
        let operand = operand();
        let assets = Assets::new(&operand, None);
        cluster.apply_daemon_set(&assets.daemon_set(2)).await.unwrap();
        cluster
    }

    #[tokio::test]
    async fn test_missing_daemon_set_reports_webhook_not_available() {
        let (status, reason, message) = available(Arc::new(FakeCluster::new())).await;

        assert_eq!(status, CONDITION_STATUS_FALSE);
        assert_eq!(reason, REASON_ADMISSION_WEBHOOK_NOT_AVAILABLE);
        assert_eq!(message, "DaemonSet rodoo-ns/runoncedurationoverride not found");
    }

    #[tokio::test]
    async fn test_unready_daemon_set_reports_webhook_not_available() {
        let (status, reason, message) = available(with_daemon_set(false).await).await;

        assert_eq!(status, CONDITION_STATUS_FALSE);
        assert_eq!(reason, REASON_ADMISSION_WEBHOOK_NOT_AVAILABLE);
        assert_eq!(
            message,
            "DaemonSet rodoo-ns/runoncedurationoverride has 0/1 pods available"
        );
    }

    #[tokio::test]
    async fn test_ready_daemon_set_reports_available() {
        let (status, reason, message) = available(with_daemon_set(true).await).await;

        assert_eq!(status, CONDITION_STATUS_TRUE);
        assert_eq!(reason, REASON_AS_EXPECTED);
        assert!(message.is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_degrades_available_only() {
        let cluster = Arc::new(FakeCluster::new());
        cluster.fail("get:DaemonSet", 500, "InternalError");

        let (status, reason, message) = available(cluster).await;

        assert_eq!(status, CONDITION_STATUS_FALSE);
        assert_eq!(reason, REASON_INTERNAL_ERROR);
        assert!(message.starts_with("failed to read DaemonSet rodoo-ns/runoncedurationoverride"));
    }
}
