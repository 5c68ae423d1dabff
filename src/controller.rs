// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Controller wiring.
//!
//! Watches the `RunOnceDurationOverride` kind cluster-wide and every secondary
//! kind the operand is made of. Secondary events are mapped to the singleton
//! key by [`SecondaryFanIn`]; the reflector store of the primary watch doubles
//! as the lister of the [`StatusWriter`].

use crate::assets::Assets;
use crate::client::{ClusterClient, KubeClusterClient, SingletonLister};
use crate::config::OperatorConfig;
use crate::constants::{
    ERROR_REQUEUE_BASE_MILLIS, ERROR_REQUEUE_MAX_SECS, KIND_RUN_ONCE_DURATION_OVERRIDE,
};
use crate::context::Context;
use crate::crd::RunOnceDurationOverride;
use crate::metrics;
use crate::reconcilers::fanin::SecondaryFanIn;
use crate::reconcilers::pipeline::Pipeline;
use crate::reconcilers::retry::RequeueLimiter;
use crate::reconcilers::status::StatusWriter;
use crate::reconcilers::{ReconcileError, Reconciler, Verdict};
use futures::StreamExt;
use k8s_openapi::api::admissionregistration::v1::MutatingWebhookConfiguration;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment};
use k8s_openapi::api::core::v1::{ConfigMap, Pod, Secret, Service, ServiceAccount};
use kube::runtime::controller::{self, Action};
use kube::runtime::{watcher, Controller};
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Run the controller until a shutdown signal arrives.
pub async fn run(client: Client, config: OperatorConfig) -> anyhow::Result<()> {
    let operand = Arc::new(config.operand.clone());
    let namespace = operand.namespace().to_string();
    info!(
        "Starting RunOnceDurationOverride controller for {} in {}",
        operand.singleton_name(),
        namespace
    );

    let fanin = Arc::new(SecondaryFanIn::new(
        operand.singleton_name(),
        Assets::new(&operand, None).owner_annotation(),
    ));
    let mwc_config = watcher::Config::default().fields(&format!(
        "metadata.name={}",
        Assets::new(&operand, None).mutating_webhook_configuration_name()
    ));

    let controller = Controller::new(
        Api::<RunOnceDurationOverride>::all(client.clone()),
        watcher::Config::default(),
    );
    let store = controller.store();

    let controller = controller
        .watches(
            Api::<Deployment>::namespaced(client.clone(), &namespace),
            watcher::Config::default(),
            mapper(&fanin),
        )
        .watches(
            Api::<DaemonSet>::namespaced(client.clone(), &namespace),
            watcher::Config::default(),
            mapper(&fanin),
        )
        .watches(
            Api::<Pod>::namespaced(client.clone(), &namespace),
            watcher::Config::default(),
            mapper(&fanin),
        )
        .watches(
            Api::<ConfigMap>::namespaced(client.clone(), &namespace),
            watcher::Config::default(),
            mapper(&fanin),
        )
        .watches(
            Api::<Service>::namespaced(client.clone(), &namespace),
            watcher::Config::default(),
            mapper(&fanin),
        )
        .watches(
            Api::<Secret>::namespaced(client.clone(), &namespace),
            watcher::Config::default(),
            mapper(&fanin),
        )
        .watches(
            Api::<ServiceAccount>::namespaced(client.clone(), &namespace),
            watcher::Config::default(),
            mapper(&fanin),
        )
        .watches(
            Api::<MutatingWebhookConfiguration>::all(client.clone()),
            mwc_config,
            mapper(&fanin),
        );

    let cluster: Arc<dyn ClusterClient> = Arc::new(KubeClusterClient::new(client));
    let lister: Arc<dyn SingletonLister> = Arc::new(store);
    let reconciler = Reconciler::new(
        operand,
        Pipeline::standard(cluster.clone(), config.cert.clone()),
        StatusWriter::new(cluster, lister),
        config.resync,
    );
    let limiter = RequeueLimiter::new(
        Duration::from_millis(ERROR_REQUEUE_BASE_MILLIS),
        Duration::from_secs(ERROR_REQUEUE_MAX_SECS),
    );
    let context = Arc::new(Context::new(reconciler, limiter));

    controller
        .with_config(controller::Config::default().concurrency(config.workers))
        .shutdown_on_signal()
        .run(reconcile_wrapper, error_policy, context)
        .for_each(|result| {
            if let Err(e) = result {
                debug!("Controller stream error: {}", e);
            }
            futures::future::ready(())
        })
        .await;

    info!("RunOnceDurationOverride controller stopped");
    Ok(())
}

fn mapper<K>(
    fanin: &Arc<SecondaryFanIn>,
) -> impl Fn(K) -> Option<kube::runtime::reflector::ObjectRef<RunOnceDurationOverride>>
       + Send
       + Sync
       + 'static
where
    K: kube::Resource<DynamicType = ()>,
{
    let fanin = fanin.clone();
    move |obj: K| fanin.map(&obj)
}

/// Reconcile wrapper for `RunOnceDurationOverride`
async fn reconcile_wrapper(
    obj: Arc<RunOnceDurationOverride>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let name = obj.name_any();
    match ctx.reconciler.reconcile(&obj, chrono::Utc::now()).await {
        Ok(Verdict::Ignored) => Ok(Action::await_change()),
        Ok(Verdict::Synced { requeue_after }) => {
            ctx.succeeded(&name);
            debug!("{} synced, next check in {:?}", name, requeue_after);
            Ok(Action::requeue(requeue_after))
        }
        Ok(Verdict::RequeueAfter(delay)) => {
            ctx.succeeded(&name);
            Ok(Action::requeue(delay))
        }
        Ok(Verdict::RequeueRateLimited) => {
            let delay = ctx.failure_delay(&name);
            metrics::record_reconciliation_requeue(KIND_RUN_ONCE_DURATION_OVERRIDE, "rate-limited");
            Ok(Action::requeue(delay))
        }
        Err(e) => {
            error!("Failed to reconcile {}: {}", name, e);
            Err(e)
        }
    }
}

/// Error policy: back off per key, doubling up to the cap.
fn error_policy(obj: Arc<RunOnceDurationOverride>, err: &ReconcileError, ctx: Arc<Context>) -> Action {
    let name = obj.name_any();
    let delay = ctx.failure_delay(&name);
    warn!("Requeueing {} in {:?} after error: {}", name, delay, err);
    Action::requeue(delay)
}
