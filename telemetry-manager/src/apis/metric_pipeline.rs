use super::shared::{FilterSpec, NamespaceSelector, OtlpInput, OtlpOutput, TransformSpec};
use crate::status::Condition;
use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Namespaces excluded from agent inputs when the user does not configure a selector.
pub const SYSTEM_NAMESPACES: [&str; 4] = ["kyma-system", "kube-system", "istio-system", "compass-system"];

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[kube(
    group = "telemetry.kyma-project.io",
    version = "v1beta1",
    kind = "MetricPipeline",
    plural = "metricpipelines",
    status = "MetricPipelineStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct MetricPipelineSpec {
    #[serde(default)]
    pub input: MetricPipelineInput,
    #[serde(default)]
    pub output: MetricPipelineOutput,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transforms: Vec<TransformSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<FilterSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricPipelineInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prometheus: Option<PrometheusInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub istio: Option<IstioInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otlp: Option<OtlpInput>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Toggle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<NamespaceSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic_metrics: Option<Toggle>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<NamespaceSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<RuntimeResources>,
}

/// Per-resource toggles of the runtime input. Every resource defaults to enabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeResources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod: Option<Toggle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<Toggle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<Toggle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Toggle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment: Option<Toggle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daemonset: Option<Toggle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statefulset: Option<Toggle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<Toggle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuntimeResource {
    Pod,
    Container,
    Node,
    Volume,
    Deployment,
    DaemonSet,
    StatefulSet,
    Job,
}

impl RuntimeResource {
    pub const ALL: [RuntimeResource; 8] = [
        Self::Pod,
        Self::Container,
        Self::Node,
        Self::Volume,
        Self::Deployment,
        Self::DaemonSet,
        Self::StatefulSet,
        Self::Job,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pod => "pod",
            Self::Container => "container",
            Self::Node => "node",
            Self::Volume => "volume",
            Self::Deployment => "deployment",
            Self::DaemonSet => "daemonset",
            Self::StatefulSet => "statefulset",
            Self::Job => "job",
        }
    }
}

impl RuntimeResources {
    fn toggle(&self, resource: RuntimeResource) -> Option<&Toggle> {
        match resource {
            RuntimeResource::Pod => self.pod.as_ref(),
            RuntimeResource::Container => self.container.as_ref(),
            RuntimeResource::Node => self.node.as_ref(),
            RuntimeResource::Volume => self.volume.as_ref(),
            RuntimeResource::Deployment => self.deployment.as_ref(),
            RuntimeResource::DaemonSet => self.daemonset.as_ref(),
            RuntimeResource::StatefulSet => self.statefulset.as_ref(),
            RuntimeResource::Job => self.job.as_ref(),
        }
    }

    pub fn is_enabled(&self, resource: RuntimeResource) -> bool {
        self.toggle(resource)
            .and_then(|t| t.enabled)
            .unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IstioInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<NamespaceSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic_metrics: Option<Toggle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envoy_metrics: Option<Toggle>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricPipelineOutput {
    #[serde(default)]
    pub otlp: OtlpOutput,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricPipelineStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// Input sources a metric can originate from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InputSource {
    Runtime,
    Prometheus,
    Istio,
    Otlp,
}

impl InputSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Runtime => "runtime",
            Self::Prometheus => "prometheus",
            Self::Istio => "istio",
            Self::Otlp => "otlp",
        }
    }
}

fn toggle_on(toggle: Option<&Toggle>) -> bool {
    toggle.and_then(|t| t.enabled).unwrap_or(false)
}

impl MetricPipeline {
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn is_input_enabled(&self, source: InputSource) -> bool {
        let input = &self.spec.input;
        match source {
            InputSource::Runtime => input.runtime.as_ref().and_then(|i| i.enabled).unwrap_or(false),
            InputSource::Prometheus => input
                .prometheus
                .as_ref()
                .and_then(|i| i.enabled)
                .unwrap_or(false),
            InputSource::Istio => input.istio.as_ref().and_then(|i| i.enabled).unwrap_or(false),
            InputSource::Otlp => input.otlp.as_ref().is_none_or(|i| !i.disabled),
        }
    }

    /// The user selector of an input, if any.
    pub fn namespace_selector(&self, source: InputSource) -> Option<&NamespaceSelector> {
        let input = &self.spec.input;
        match source {
            InputSource::Runtime => input.runtime.as_ref().and_then(|i| i.namespaces.as_ref()),
            InputSource::Prometheus => input
                .prometheus
                .as_ref()
                .and_then(|i| i.namespaces.as_ref()),
            InputSource::Istio => input.istio.as_ref().and_then(|i| i.namespaces.as_ref()),
            InputSource::Otlp => input.otlp.as_ref().and_then(|i| i.namespaces.as_ref()),
        }
    }

    /// Selector applied to an input: the user selector, or the system namespace exclusion
    /// for agent inputs when none is set.
    pub fn effective_namespace_selector(&self, source: InputSource) -> Option<NamespaceSelector> {
        match self.namespace_selector(source) {
            Some(selector) if !selector.is_empty() => Some(selector.clone()),
            _ if source == InputSource::Otlp => None,
            _ => Some(NamespaceSelector {
                include: Vec::new(),
                exclude: SYSTEM_NAMESPACES.iter().map(|ns| ns.to_string()).collect(),
            }),
        }
    }

    pub fn is_runtime_resource_enabled(&self, resource: RuntimeResource) -> bool {
        self.spec
            .input
            .runtime
            .as_ref()
            .and_then(|r| r.resources.as_ref())
            .is_none_or(|r| r.is_enabled(resource))
    }

    pub fn is_diagnostic_metrics_enabled(&self, source: InputSource) -> bool {
        let input = &self.spec.input;
        match source {
            InputSource::Prometheus => toggle_on(
                input
                    .prometheus
                    .as_ref()
                    .and_then(|i| i.diagnostic_metrics.as_ref()),
            ),
            InputSource::Istio => toggle_on(
                input
                    .istio
                    .as_ref()
                    .and_then(|i| i.diagnostic_metrics.as_ref()),
            ),
            InputSource::Runtime | InputSource::Otlp => false,
        }
    }

    pub fn is_envoy_metrics_enabled(&self) -> bool {
        toggle_on(
            self.spec
                .input
                .istio
                .as_ref()
                .and_then(|i| i.envoy_metrics.as_ref()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(yaml: &str) -> MetricPipeline {
        MetricPipeline::new("p", serde_yaml::from_str(yaml).unwrap())
    }

    #[test]
    fn test_input_defaults() {
        let p = pipeline("output: {otlp: {endpoint: {value: 'http://backend:4317'}}}");

        assert!(p.is_input_enabled(InputSource::Otlp));
        assert!(!p.is_input_enabled(InputSource::Runtime));
        assert!(!p.is_input_enabled(InputSource::Prometheus));
        assert!(!p.is_input_enabled(InputSource::Istio));
        assert!(
            RuntimeResource::ALL
                .iter()
                .all(|r| p.is_runtime_resource_enabled(*r))
        );
        assert!(!p.is_envoy_metrics_enabled());
    }

    #[test]
    fn test_runtime_resources_toggles() {
        let p = pipeline(
            r#"
input:
  runtime:
    enabled: true
    resources:
      volume: {enabled: false}
      pod: {enabled: true}
"#,
        );

        assert!(p.is_input_enabled(InputSource::Runtime));
        assert!(!p.is_runtime_resource_enabled(RuntimeResource::Volume));
        assert!(p.is_runtime_resource_enabled(RuntimeResource::Pod));
        assert!(p.is_runtime_resource_enabled(RuntimeResource::Job));
    }

    #[test]
    fn test_effective_namespace_selector() {
        let p = pipeline(
            r#"
input:
  prometheus:
    enabled: true
    namespaces: {include: [default]}
  runtime:
    enabled: true
  otlp: {}
"#,
        );

        assert_eq!(
            p.effective_namespace_selector(InputSource::Prometheus)
                .unwrap()
                .include,
            vec!["default".to_string()]
        );
        assert_eq!(
            p.effective_namespace_selector(InputSource::Runtime)
                .unwrap()
                .exclude,
            SYSTEM_NAMESPACES.map(String::from).to_vec()
        );
        assert_eq!(p.effective_namespace_selector(InputSource::Otlp), None);
    }
}
