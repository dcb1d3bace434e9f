use crate::status::Condition;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Annotation selecting how `service.name` is derived on enriched telemetry.
pub const SERVICE_ENRICHMENT_ANNOTATION: &str = "telemetry.kyma-project.io/service-enrichment";

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "operator.kyma-project.io",
    version = "v1beta1",
    kind = "Telemetry",
    plural = "telemetries",
    namespaced,
    status = "TelemetryStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichments: Option<Enrichments>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrichments {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extract_pod_labels: Vec<PodLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<ClusterOptions>,
}

/// Pod label to copy onto telemetry, matched exactly by `key` or by `keyPrefix`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodLabel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_prefix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOptions {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// How the gateways derive `service.name`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServiceEnrichment {
    /// Fills `service.name` from the Kyma app labels.
    #[default]
    KymaLegacy,
    /// Leaves `service.name` to the OpenTelemetry semantic conventions.
    Otel,
}

impl ServiceEnrichment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KymaLegacy => "kyma-legacy",
            Self::Otel => "otel",
        }
    }
}

impl Telemetry {
    /// Reads the strategy from the annotation; unknown values fall back to the default.
    pub fn service_enrichment(&self) -> ServiceEnrichment {
        match self
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(SERVICE_ENRICHMENT_ANNOTATION))
            .map(String::as_str)
        {
            Some("otel") => ServiceEnrichment::Otel,
            _ => ServiceEnrichment::KymaLegacy,
        }
    }

    pub fn extract_pod_labels(&self) -> &[PodLabel] {
        self.spec
            .enrichments
            .as_ref()
            .map(|e| e.extract_pod_labels.as_slice())
            .unwrap_or_default()
    }

    pub fn cluster_name(&self) -> Option<&str> {
        self.spec
            .enrichments
            .as_ref()
            .and_then(|e| e.cluster.as_ref())
            .map(|c| c.name.as_str())
            .filter(|n| !n.is_empty())
    }
}
