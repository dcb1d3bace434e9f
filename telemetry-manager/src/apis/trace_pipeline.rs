use super::shared::{FilterSpec, OtlpOutput, TransformSpec};
use crate::status::Condition;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "telemetry.kyma-project.io",
    version = "v1beta1",
    kind = "TracePipeline",
    plural = "tracepipelines",
    status = "TracePipelineStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct TracePipelineSpec {
    #[serde(default)]
    pub output: TracePipelineOutput,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transforms: Vec<TransformSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracePipelineOutput {
    #[serde(default)]
    pub otlp: OtlpOutput,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracePipelineStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl TracePipeline {
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }
}
