use super::shared::{
    FilterSpec, NamespaceSelector, OtlpInput, OtlpOutput, OutputKind, TransformSpec,
};
use crate::status::Condition;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "telemetry.kyma-project.io",
    version = "v1beta1",
    kind = "LogPipeline",
    plural = "logpipelines",
    status = "LogPipelineStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct LogPipelineSpec {
    #[serde(default)]
    pub input: LogPipelineInput,
    #[serde(default)]
    pub output: LogPipelineOutput,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transforms: Vec<TransformSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPipelineInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<LogRuntimeInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otlp: Option<OtlpInput>,
}

/// Container log tailing performed by the Fluent Bit agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRuntimeInput {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<NamespaceSelector>,
}

/// Exactly one variant is expected to be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPipelineOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otlp: Option<OtlpOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loki: Option<serde_json::Value>,
}

impl LogPipelineOutput {
    /// Every output variant that is set.
    pub fn kinds(&self) -> Vec<OutputKind> {
        let mut kinds = Vec::new();
        if self.otlp.is_some() {
            kinds.push(OutputKind::Otlp);
        }
        if self.http.is_some() {
            kinds.push(OutputKind::Http);
        }
        if self.custom.as_deref().is_some_and(|c| !c.is_empty()) {
            kinds.push(OutputKind::Custom);
        }
        if self.loki.is_some() {
            kinds.push(OutputKind::Loki);
        }
        kinds
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPipelineStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// Set when the pipeline carries raw Fluent Bit syntax.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsupported_mode: Option<bool>,
}

impl LogPipeline {
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn otlp_output(&self) -> Option<&OtlpOutput> {
        self.spec.output.otlp.as_ref()
    }

    pub fn otlp_input(&self) -> Option<&OtlpInput> {
        self.spec.input.otlp.as_ref()
    }

    pub fn is_otlp_input_enabled(&self) -> bool {
        self.otlp_input().is_none_or(|input| !input.disabled)
    }
}
