// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `client.rs`

#[cfg(test)]
mod tests {
    use super::super::{ClusterClient, KubeClusterClient};
    use crate::crd::{
        ResourceReference, RunOnceDurationOverride, RunOnceDurationOverrideSpec,
        RunOnceDurationOverrideStatus,
    };
    use http::{Method, Request, Response, StatusCode};
    use kube::client::Body;
    use kube::Client;
    use serde_json::{json, Value};
    use std::convert::Infallible;
    use std::sync::{Arc, Mutex};

    /// Request as seen by the API server: method, path, JSON body.
    type Recorded = Arc<Mutex<Vec<(Method, String, Value)>>>;

    /// A `kube::Client` answering every request with `status` and `reply`.
    fn recording_client(status: StatusCode, reply: Value) -> (Client, Recorded) {
        let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = recorded.clone();
        let service = tower::service_fn(move |req: Request<Body>| {
            let sink = sink.clone();
            let reply = reply.clone();
            async move {
                let (parts, body) = req.into_parts();
                let bytes = body.collect_bytes().await.unwrap();
                let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
                sink.lock()
                    .unwrap()
                    .push((parts.method, parts.uri.path().to_string(), body));
                Ok::<_, Infallible>(
                    Response::builder()
                        .status(status)
                        .header("content-type", "application/json")
                        .body(Body::from(serde_json::to_vec(&reply).unwrap()))
                        .unwrap(),
                )
            }
        });
        (Client::new(service, "default"), recorded)
    }

    fn singleton_with_status(status: RunOnceDurationOverrideStatus) -> RunOnceDurationOverride {
        let mut obj =
            RunOnceDurationOverride::new("cluster", RunOnceDurationOverrideSpec::default());
        obj.metadata.resource_version = Some("41".to_string());
        obj.status = Some(status);
        obj
    }

    #[tokio::test]
    async fn test_status_update_replaces_whole_status() {
        let mut status = RunOnceDurationOverrideStatus::default();
        status.resources.mutating_webhook_configuration_ref = Some(ResourceReference {
            kind: "MutatingWebhookConfiguration".to_string(),
            namespace: None,
            name: "runoncedurationoverrides.admission.runoncedurationoverride.openshift.io"
                .to_string(),
            resource_version: "7".to_string(),
        });
        status.certs_rotate_at = Some("2026-01-01T00:00:00Z".to_string());

        // The webhook was deleted for a rollout and the rotation time cleared.
        status.resources.mutating_webhook_configuration_ref.take();
        status.certs_rotate_at = None;
        let obj = singleton_with_status(status);

        let mut reply = serde_json::to_value(&obj).unwrap();
        reply["metadata"]["resourceVersion"] = json!("42");
        let (client, recorded) = recording_client(StatusCode::OK, reply);

        let updated = KubeClusterClient::new(client)
            .update_run_once_duration_override_status(&obj)
            .await
            .unwrap();
        assert_eq!(updated.metadata.resource_version.as_deref(), Some("42"));

        let recorded = recorded.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        let (method, path, body) = &recorded[0];

        // A PUT replaces the stored status; a merge patch would keep the old ref.
        assert_eq!(method, Method::PUT);
        assert_eq!(
            path,
            "/apis/operator.openshift.io/v1/runoncedurationoverrides/cluster/status"
        );
        assert_eq!(body["metadata"]["resourceVersion"], json!("41"));
        assert!(body["status"]["resources"]
            .get("mutatingWebhookConfigurationRef")
            .is_none());
        assert!(body["status"].get("certsRotateAt").is_none());
    }

    #[tokio::test]
    async fn test_status_update_surfaces_conflict() {
        let conflict = json!({
            "kind": "Status",
            "apiVersion": "v1",
            "status": "Failure",
            "message": "the object has been modified",
            "reason": "Conflict",
            "code": 409
        });
        let (client, _) = recording_client(StatusCode::CONFLICT, conflict);

        let err = KubeClusterClient::new(client)
            .update_run_once_duration_override_status(&singleton_with_status(
                RunOnceDurationOverrideStatus::default(),
            ))
            .await
            .unwrap_err();

        assert!(crate::reconcilers::retry::is_conflict(&err));
    }
}
