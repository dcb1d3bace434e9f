//! Component and service pipeline IDs.
use crate::apis::metric_pipeline::InputSource;
use crate::apis::shared::OtlpProtocol;

pub const OTLP_RECEIVER: &str = "otlp";
pub const KYMA_STATS_RECEIVER: &str = "kymastats";
pub const KUBELET_STATS_RECEIVER: &str = "kubeletstats";
pub const K8S_CLUSTER_RECEIVER: &str = "k8s_cluster";
pub const PROMETHEUS_APP_PODS_RECEIVER: &str = "prometheus/app-pods";
pub const PROMETHEUS_APP_SERVICES_RECEIVER: &str = "prometheus/app-services";
pub const PROMETHEUS_ISTIO_RECEIVER: &str = "prometheus/istio";

pub const MEMORY_LIMITER: &str = "memory_limiter";
pub const BATCH: &str = "batch";
pub const K8S_ATTRIBUTES: &str = "k8sattributes";
pub const SERVICE_ENRICHMENT: &str = "service_enrichment";
pub const ISTIO_NOISE_FILTER: &str = "istio_noise_filter";
pub const SET_OBSERVED_TIME_IF_ZERO: &str = "transform/set-observed-time-if-zero";
pub const DROP_UNKNOWN_SERVICE_NAME: &str = "transform/drop-unknown-service-name";
pub const SET_INSTRUMENTATION_SCOPE_RUNTIME: &str = "transform/set-instrumentation-scope-runtime";
pub const SET_INSTRUMENTATION_SCOPE_PROMETHEUS: &str =
    "transform/set-instrumentation-scope-prometheus";
pub const SET_INSTRUMENTATION_SCOPE_ISTIO: &str = "transform/set-instrumentation-scope-istio";
pub const SET_INSTRUMENTATION_SCOPE_KYMA: &str = "transform/set-instrumentation-scope-kyma";
pub const INSERT_SKIP_ENRICHMENT_ATTRIBUTE: &str = "transform/insert-skip-enrichment-attribute";
pub const DROP_ISTIO_PROXY_SERVICE_ENRICHMENT: &str =
    "transform/drop-istio-proxy-service-enrichment";
pub const INSERT_CLUSTER_ATTRIBUTES: &str = "resource/insert-cluster-attributes";
pub const DROP_KYMA_ATTRIBUTES: &str = "resource/drop-kyma-attributes";
pub const DELETE_SKIP_ENRICHMENT_ATTRIBUTE: &str = "resource/delete-skip-enrichment-attribute";
pub const DROP_SERVICE_NAME: &str = "resource/drop-service-name";
pub const DROP_ENVOY_METRICS_IF_DISABLED: &str = "filter/drop-envoy-metrics-if-disabled";
pub const DROP_NON_PVC_VOLUMES_METRICS: &str = "filter/drop-non-pvc-volumes-metrics";
pub const DROP_VIRTUAL_NETWORK_INTERFACES: &str = "filter/drop-virtual-network-interfaces";

pub const ENRICHMENT_ROUTING_CONNECTOR: &str = "routing/enrichment";
pub const ENRICHMENT_FORWARD_CONNECTOR: &str = "forward/enrichment";
pub const INPUT_FORWARD_CONNECTOR: &str = "forward/input";
pub const RUNTIME_INPUT_ROUTING_CONNECTOR: &str = "routing/runtime-input";
pub const PROMETHEUS_INPUT_ROUTING_CONNECTOR: &str = "routing/prometheus-input";
pub const ISTIO_INPUT_ROUTING_CONNECTOR: &str = "routing/istio-input";

pub const METRICS_INPUT_OTLP_PIPELINE: &str = "metrics/input-otlp";
pub const METRICS_INPUT_KYMA_STATS_PIPELINE: &str = "metrics/input-kyma-stats";
pub const METRICS_ENRICHMENT_PIPELINE: &str = "metrics/enrichment";
pub const METRICS_INPUT_RUNTIME_PIPELINE: &str = "metrics/input-runtime";
pub const METRICS_INPUT_PROMETHEUS_PIPELINE: &str = "metrics/input-prometheus";
pub const METRICS_INPUT_ISTIO_PIPELINE: &str = "metrics/input-istio";
pub const METRICS_ENRICHMENT_CONDITIONAL_PIPELINE: &str = "metrics/enrichment-conditional";

pub fn otlp_exporter(protocol: OtlpProtocol, pipeline: &str) -> String {
    match protocol {
        OtlpProtocol::Http => format!("otlphttp/{pipeline}"),
        OtlpProtocol::Grpc => format!("otlp/{pipeline}"),
    }
}

pub fn oauth2_extension(pipeline: &str) -> String {
    format!("oauth2client/{pipeline}")
}

pub fn user_defined_transform(pipeline: &str) -> String {
    format!("transform/user-defined-{pipeline}")
}

pub fn user_defined_filter(pipeline: &str) -> String {
    format!("filter/user-defined-{pipeline}")
}

pub fn log_namespace_filter(pipeline: &str) -> String {
    format!("filter/{pipeline}-filter-by-namespace")
}

pub fn metric_namespace_filter(pipeline: &str, source: InputSource) -> String {
    format!(
        "filter/{pipeline}-filter-by-namespace-{}-input",
        source.as_str()
    )
}

pub fn drop_if_input_source(source: InputSource) -> String {
    format!("filter/drop-if-input-source-{}", source.as_str())
}

pub fn drop_diagnostic_metrics(source: InputSource) -> String {
    format!(
        "filter/drop-diagnostic-metrics-if-input-source-{}",
        source.as_str()
    )
}

pub fn drop_runtime_metrics(resource: &str) -> String {
    format!("filter/drop-runtime-{resource}-metrics")
}

pub fn logs_pipeline(pipeline: &str) -> String {
    format!("logs/{pipeline}")
}

pub fn traces_pipeline(pipeline: &str) -> String {
    format!("traces/{pipeline}")
}

pub fn metrics_pipeline(pipeline: &str) -> String {
    format!("metrics/{pipeline}")
}

pub fn metrics_output_pipeline(pipeline: &str) -> String {
    format!("metrics/output-{pipeline}")
}
