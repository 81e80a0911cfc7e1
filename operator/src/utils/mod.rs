//! Utils is shared functions and constants for the controller

use std::sync::Arc;

use k8s_openapi::{
    api::core::v1::{Pod, PodSpec},
    apimachinery::pkg::apis::meta::v1::OwnerReference,
};
use kube::{
    api::{ObjectMeta, PostParams},
    client::Client,
    Api,
};

use opentelemetry::{
    global,
    metrics::{Counter, Meter},
};

use crate::{book::pod::PodConfig, labels::managed_labels, CONTROLLER_NAME};

/// Operator Context
pub struct Context {
    /// Kube client
    pub k_client: Client,
    /// Settings for pods created on behalf of books
    pub pod_config: PodConfig,
    /// Reconcile metrics
    pub metrics: Metrics,
}

impl Context {
    /// Create new context reporting to the global meter provider
    pub fn new(k_client: Client, pod_config: PodConfig) -> Self {
        Self::with_meter(k_client, pod_config, &global::meter("books-operator"))
    }

    /// Create new context reporting to the given meter
    pub fn with_meter(k_client: Client, pod_config: PodConfig, meter: &Meter) -> Self {
        Context {
            k_client,
            pod_config,
            metrics: Metrics::new(meter),
        }
    }
}

/// Counters reported by the book controller.
pub struct Metrics {
    /// Reconcile passes, labeled with `result=ok|err`
    pub reconciles: Counter<u64>,
    /// Pods created for books
    pub pods_created: Counter<u64>,
}

impl Metrics {
    /// Create the counters on a meter
    pub fn new(meter: &Meter) -> Self {
        Self {
            reconciles: meter
                .u64_counter("book_reconcile_count")
                .with_description("Number of book reconciles")
                .init(),
            pods_created: meter
                .u64_counter("book_pod_created_count")
                .with_description("Number of pods created for books")
                .init(),
        }
    }
}

/// Get a pod in namespace, None if it does not exist.
pub async fn get_pod(
    cx: Arc<Context>,
    ns: &str,
    name: &str,
) -> Result<Option<Pod>, kube::error::Error> {
    let pods: Api<Pod> = Api::namespaced(cx.k_client.clone(), ns);
    pods.get_opt(name).await
}

/// Create a pod in namespace.
///
/// Unlike the apply style helpers this never modifies an existing pod,
/// creating a pod that already exists fails with a conflict.
pub async fn create_pod(
    cx: Arc<Context>,
    ns: &str,
    orefs: Vec<OwnerReference>,
    name: &str,
    spec: PodSpec,
) -> Result<Pod, kube::error::Error> {
    let pods: Api<Pod> = Api::namespaced(cx.k_client.clone(), ns);
    let params = PostParams {
        field_manager: Some(CONTROLLER_NAME.to_owned()),
        ..Default::default()
    };

    let pod: Pod = Pod {
        metadata: ObjectMeta {
            name: Some(name.to_owned()),
            namespace: Some(ns.to_owned()),
            owner_references: Some(orefs),
            labels: managed_labels(),
            ..ObjectMeta::default()
        },
        spec: Some(spec),
        ..Default::default()
    };
    pods.create(&params, &pod).await
}
