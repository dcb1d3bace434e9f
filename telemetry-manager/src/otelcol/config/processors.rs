use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Processor {
    Batch(BatchProcessor),
    MemoryLimiter(MemoryLimiter),
    K8sAttributes(K8sAttributesProcessor),
    Resource(ResourceProcessor),
    Transform(TransformProcessor),
    Filter(FilterProcessor),
    ServiceEnrichment(ServiceEnrichmentProcessor),
    IstioNoiseFilter(IstioNoiseFilterProcessor),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchProcessor {
    pub send_batch_size: usize,
    pub timeout: String,
    pub send_batch_max_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryLimiter {
    pub check_interval: String,
    pub limit_percentage: u8,
    pub spike_limit_percentage: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct K8sAttributesProcessor {
    pub auth_type: String,
    pub passthrough: bool,
    pub extract: ExtractK8sMetadata,
    pub pod_association: Vec<PodAssociations>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractK8sMetadata {
    pub metadata: Vec<String>,
    pub labels: Vec<ExtractLabel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractLabel {
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub tag_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_regex: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodAssociations {
    pub sources: Vec<PodAssociation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodAssociation {
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceProcessor {
    pub attributes: Vec<AttributeAction>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttributeAction {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformProcessor {
    pub error_mode: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub log_statements: Vec<TransformStatements>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metric_statements: Vec<TransformStatements>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace_statements: Vec<TransformStatements>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformStatements {
    pub statements: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterProcessor {
    pub error_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logs: Option<FilterLogs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<FilterMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traces: Option<FilterTraces>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterLogs {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub log_record: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterMetrics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub metric: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub datapoint: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterTraces {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub span: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub spanevent: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceEnrichmentProcessor {
    pub resource_attributes: Vec<String>,
}

/// Drops noisy telemetry emitted by the Istio proxies. It has no settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IstioNoiseFilterProcessor {}
