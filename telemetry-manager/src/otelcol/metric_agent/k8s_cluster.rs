//! `k8s_cluster` receiver reporting workload state. A single agent instance collects it, elected
//! through the `k8s_leader_elector` extension.
use crate::apis::metric_pipeline::{MetricPipeline, RuntimeResource};
use crate::otelcol::config::extensions::K8S_LEADER_ELECTOR;
use crate::otelcol::config::receivers::{K8sClusterReceiver, MetricToggle};
use crate::otelcol::config::Receiver;
use crate::otelcol::metric_components::any_runtime_resource_enabled;
use std::collections::BTreeMap;

/// Never exported.
const DEFAULT_DROPPED: [&str; 16] = [
    "k8s.container.storage_request",
    "k8s.container.storage_limit",
    "k8s.container.ephemeralstorage_request",
    "k8s.container.ephemeralstorage_limit",
    "k8s.container.ready",
    "k8s.namespace.phase",
    "k8s.hpa.current_replicas",
    "k8s.hpa.desired_replicas",
    "k8s.hpa.min_replicas",
    "k8s.hpa.max_replicas",
    "k8s.replicaset.available",
    "k8s.replicaset.desired",
    "k8s.replication_controller.available",
    "k8s.replication_controller.desired",
    "k8s.resource_quota.hard_limit",
    "k8s.resource_quota.used",
];

fn resource_metrics(resource: RuntimeResource) -> &'static [&'static str] {
    match resource {
        RuntimeResource::Pod => &["k8s.pod.phase"],
        RuntimeResource::Container => &[
            "k8s.container.cpu_request",
            "k8s.container.cpu_limit",
            "k8s.container.memory_request",
            "k8s.container.memory_limit",
            "k8s.container.restarts",
        ],
        RuntimeResource::StatefulSet => &[
            "k8s.statefulset.current_pods",
            "k8s.statefulset.desired_pods",
            "k8s.statefulset.ready_pods",
            "k8s.statefulset.updated_pods",
        ],
        RuntimeResource::Job => &[
            "k8s.job.active_pods",
            "k8s.job.desired_successful_pods",
            "k8s.job.failed_pods",
            "k8s.job.max_parallel_pods",
            "k8s.job.successful_pods",
        ],
        RuntimeResource::Deployment => &["k8s.deployment.available", "k8s.deployment.desired"],
        RuntimeResource::DaemonSet => &[
            "k8s.daemonset.current_scheduled_nodes",
            "k8s.daemonset.desired_scheduled_nodes",
            "k8s.daemonset.misscheduled_nodes",
            "k8s.daemonset.ready_nodes",
        ],
        RuntimeResource::Node | RuntimeResource::Volume => &[],
    }
}

/// Drops the metrics of every resource no pipeline collects on top of the default drop set.
pub fn receiver(pipelines: &[&MetricPipeline]) -> Receiver {
    let mut metrics: BTreeMap<String, MetricToggle> = DEFAULT_DROPPED
        .iter()
        .map(|name| (name.to_string(), MetricToggle { enabled: false }))
        .collect();
    for resource in RuntimeResource::ALL {
        if any_runtime_resource_enabled(pipelines, resource) {
            continue;
        }
        for name in resource_metrics(resource) {
            metrics.insert(name.to_string(), MetricToggle { enabled: false });
        }
    }

    Receiver::K8sCluster(K8sClusterReceiver {
        auth_type: "serviceAccount".to_string(),
        collection_interval: "30s".to_string(),
        node_conditions_to_report: Vec::new(),
        metrics,
        k8s_leader_elector: K8S_LEADER_ELECTOR.to_string(),
    })
}
