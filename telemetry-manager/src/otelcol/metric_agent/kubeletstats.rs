//! `kubeletstats` receiver reading pod, container, node and volume stats from the local kubelet.
use crate::apis::metric_pipeline::{MetricPipeline, RuntimeResource};
use crate::otelcol::config::receivers::{
    KubeletStatsReceiver, MetricToggle, NetworkInterfaces,
};
use crate::otelcol::config::{ENV_NODE_NAME, Receiver, env_ref};
use crate::otelcol::metric_components::any_runtime_resource_enabled;

const KUBELET_PORT: u16 = 10250;

/// Resources served by the kubelet, with the metric group reporting them.
const METRIC_GROUPS: [(RuntimeResource, &str); 4] = [
    (RuntimeResource::Container, "container"),
    (RuntimeResource::Pod, "pod"),
    (RuntimeResource::Node, "node"),
    (RuntimeResource::Volume, "volume"),
];

/// Optional metrics switched away from their receiver default.
const METRIC_TOGGLES: [(&str, bool); 6] = [
    ("container.cpu.usage", true),
    ("k8s.pod.cpu.usage", true),
    ("k8s.node.cpu.usage", true),
    ("k8s.node.cpu.time", false),
    ("k8s.node.memory.major_page_faults", false),
    ("k8s.node.memory.page_faults", false),
];

/// Only the groups some pipeline collects are queried.
pub fn receiver(pipelines: &[&MetricPipeline]) -> Receiver {
    Receiver::KubeletStats(KubeletStatsReceiver {
        collection_interval: "30s".to_string(),
        auth_type: "serviceAccount".to_string(),
        endpoint: format!("https://{}:{KUBELET_PORT}", env_ref(ENV_NODE_NAME)),
        insecure_skip_verify: true,
        metric_groups: METRIC_GROUPS
            .iter()
            .filter(|(resource, _)| any_runtime_resource_enabled(pipelines, *resource))
            .map(|(_, group)| group.to_string())
            .collect(),
        metrics: METRIC_TOGGLES
            .iter()
            .map(|(name, enabled)| (name.to_string(), MetricToggle { enabled: *enabled }))
            .collect(),
        extra_metadata_labels: vec!["k8s.volume.type".to_string()],
        collect_all_network_interfaces: NetworkInterfaces { node: true },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn pipeline(resources: &str) -> MetricPipeline {
        MetricPipeline::new(
            "p",
            serde_yaml::from_str(&format!(
                "input: {{runtime: {{enabled: true, resources: {resources}}}}}"
            ))
            .unwrap(),
        )
    }

    #[test]
    fn test_defaults() {
        let p = pipeline("{}");

        assert_matches!(receiver(&[&p]), Receiver::KubeletStats(r) => {
            assert_eq!(r.endpoint, "https://${MY_NODE_NAME}:10250");
            assert_eq!(r.metric_groups, vec!["container", "pod", "node", "volume"]);
            assert!(r.metrics["k8s.pod.cpu.usage"].enabled);
            assert!(!r.metrics["k8s.node.cpu.time"].enabled);
            assert_eq!(r.extra_metadata_labels, vec!["k8s.volume.type"]);
            assert!(r.collect_all_network_interfaces.node);
        });
    }

    #[test]
    fn test_groups_follow_any_pipeline() {
        let without_volume = pipeline("{volume: {enabled: false}, node: {enabled: false}}");
        let without_node = pipeline("{node: {enabled: false}}");

        assert_matches!(receiver(&[&without_volume, &without_node]), Receiver::KubeletStats(r) => {
            assert_eq!(r.metric_groups, vec!["container", "pod", "volume"]);
        });
    }
}
