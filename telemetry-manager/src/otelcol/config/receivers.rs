use super::{ENV_POD_IP, OTLP_GRPC_PORT, OTLP_HTTP_PORT, env_ref};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Receiver {
    Otlp(OtlpReceiver),
    KymaStats(KymaStatsReceiver),
    KubeletStats(KubeletStatsReceiver),
    K8sCluster(K8sClusterReceiver),
    Prometheus(PrometheusReceiver),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtlpReceiver {
    pub protocols: ReceiverProtocols,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiverProtocols {
    pub http: Endpoint,
    pub grpc: Endpoint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub endpoint: String,
}

impl OtlpReceiver {
    /// HTTP and gRPC listeners bound to the pod IP.
    pub fn on_pod_ip() -> Self {
        let endpoint = |port: u16| Endpoint {
            endpoint: format!("{}:{port}", env_ref(ENV_POD_IP)),
        };
        Self {
            protocols: ReceiverProtocols {
                http: endpoint(OTLP_HTTP_PORT),
                grpc: endpoint(OTLP_GRPC_PORT),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KymaStatsReceiver {
    pub auth_type: String,
    pub collection_interval: String,
    pub resources: Vec<ModuleGvr>,
    pub k8s_leader_elector: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleGvr {
    pub group: String,
    pub version: String,
    pub resource: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricToggle {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KubeletStatsReceiver {
    pub collection_interval: String,
    pub auth_type: String,
    pub endpoint: String,
    pub insecure_skip_verify: bool,
    pub metric_groups: Vec<String>,
    pub metrics: BTreeMap<String, MetricToggle>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_metadata_labels: Vec<String>,
    pub collect_all_network_interfaces: NetworkInterfaces,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInterfaces {
    pub node: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct K8sClusterReceiver {
    pub auth_type: String,
    pub collection_interval: String,
    pub node_conditions_to_report: Vec<String>,
    pub metrics: BTreeMap<String, MetricToggle>,
    pub k8s_leader_elector: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrometheusReceiver {
    pub config: PrometheusConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrometheusConfig {
    pub scrape_configs: Vec<ScrapeConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapeConfig {
    pub job_name: String,
    pub sample_limit: u32,
    pub scrape_interval: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics_path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relabel_configs: Vec<RelabelConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metric_relabel_configs: Vec<RelabelConfig>,
    pub kubernetes_sd_configs: Vec<KubernetesDiscoveryConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_config: Option<ScrapeTlsConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RelabelAction {
    Keep,
    Drop,
    Replace,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelabelConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub source_labels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_label: Option<String>,
    pub action: RelabelAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryRole {
    Pod,
    Endpoints,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KubernetesDiscoveryConfig {
    pub role: DiscoveryRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapeTlsConfig {
    pub ca_file: String,
    pub cert_file: String,
    pub key_file: String,
    pub insecure_skip_verify: bool,
}
