//! Config of the metric agent, the per-node collector scraping runtime, Prometheus and Istio
//! metrics and exporting them directly to the pipeline backends.
//!
//! Every enabled input has its own `metrics/input-*` pipeline ending in a routing connector.
//! Metrics about cluster objects skip the enrichment and go straight to the output pipelines of
//! the subscribed pipelines, the rest passes `metrics/enrichment-conditional` first.
pub mod k8s_cluster;
pub mod kubeletstats;
pub mod prometheus;

use super::builder::{Component, ComponentBuilder, static_id};
use super::config::connectors::RoutingConnector;
use super::config::extensions::{K8S_LEADER_ELECTOR, K8sLeaderElectorExtension};
use super::config::{Config, Connector, Extension};
use super::env_vars::EnvVars;
use super::metric_components::{
    self as shared, any_input_enabled, any_runtime_resource_enabled, input_route,
};
use super::oauth2::ExtensionBuild;
use super::otlp_exporter::OtlpExporterBuilder;
use super::processors::ScopeSource;
use super::secret::SecretReader;
use super::{BuildError, BuildOptions, SignalType, ids, processors, queue_size};
use crate::apis::metric_pipeline::{InputSource, MetricPipeline, RuntimeResource};
use crate::apis::telemetry::ServiceEnrichment;
use std::collections::BTreeMap;
use tracing::debug;

const K8S_CLUSTER_LEASE: &str = "telemetry-metric-agent-k8scluster";

/// Inputs scraped by the agent, in routing order.
const AGENT_INPUTS: [InputSource; 3] = [
    InputSource::Runtime,
    InputSource::Prometheus,
    InputSource::Istio,
];

fn input_routing_connector_id(source: InputSource) -> &'static str {
    match source {
        InputSource::Runtime => ids::RUNTIME_INPUT_ROUTING_CONNECTOR,
        InputSource::Prometheus => ids::PROMETHEUS_INPUT_ROUTING_CONNECTOR,
        InputSource::Istio => ids::ISTIO_INPUT_ROUTING_CONNECTOR,
        InputSource::Otlp => ids::ENRICHMENT_ROUTING_CONNECTOR,
    }
}

fn leader_elector(namespace: &str) -> ExtensionBuild {
    ExtensionBuild {
        id: K8S_LEADER_ELECTOR.to_string(),
        extension: Extension::K8sLeaderElector(K8sLeaderElectorExtension {
            auth_type: "serviceAccount".to_string(),
            lease_name: K8S_CLUSTER_LEASE.to_string(),
            lease_namespace: namespace.to_string(),
        }),
        env_vars: EnvVars::new(),
    }
}

pub struct Builder<'a> {
    reader: &'a dyn SecretReader,
}

impl<'a> Builder<'a> {
    pub fn new(reader: &'a dyn SecretReader) -> Self {
        Self { reader }
    }

    /// Pipelines without any agent input are left to the gateway.
    pub async fn build(
        &self,
        pipelines: &[MetricPipeline],
        options: &BuildOptions,
    ) -> Result<(Config, EnvVars), BuildError> {
        let mut pipelines: Vec<&MetricPipeline> = pipelines
            .iter()
            .filter(|p| AGENT_INPUTS.iter().any(|&source| p.is_input_enabled(source)))
            .collect();
        pipelines.sort_by(|a, b| a.name().cmp(b.name()));
        debug!(pipelines = pipelines.len(), "building metric agent config");

        let mut builder = ComponentBuilder::new();
        if pipelines.is_empty() {
            return Ok(builder.finish());
        }

        // Output pipelines subscribed to each input.
        let subscribers: BTreeMap<InputSource, Vec<String>> = AGENT_INPUTS
            .into_iter()
            .filter(|&source| any_input_enabled(&pipelines, source))
            .map(|source| {
                let outputs = pipelines
                    .iter()
                    .filter(|p| p.is_input_enabled(source))
                    .map(|p| ids::metrics_output_pipeline(p.name()))
                    .collect();
                (source, outputs)
            })
            .collect();
        let input_routing = |source: InputSource| {
            subscribers.get(&source).map(|outputs| {
                shared::skip_enrichment_routing(
                    &[ids::METRICS_ENRICHMENT_CONDITIONAL_PIPELINE],
                    outputs.clone(),
                )
            })
        };
        let enrichment_routing = Connector::Routing(RoutingConnector {
            default_pipelines: Vec::new(),
            error_mode: "ignore".to_string(),
            table: subscribers
                .iter()
                .map(|(&source, outputs)| input_route(source, outputs.clone()))
                .collect(),
        });

        if subscribers.contains_key(&InputSource::Runtime) {
            builder.add_extension(leader_elector(&options.agent_namespace));
            let volumes_enabled = any_runtime_resource_enabled(&pipelines, RuntimeResource::Volume);
            builder.add_service_pipeline(
                &(),
                ids::METRICS_INPUT_RUNTIME_PIPELINE,
                vec![
                    Component::receiver(static_id(ids::KUBELET_STATS_RECEIVER), |_| {
                        Some(kubeletstats::receiver(&pipelines))
                    }),
                    Component::receiver(static_id(ids::K8S_CLUSTER_RECEIVER), |_| {
                        Some(k8s_cluster::receiver(&pipelines))
                    }),
                    Component::static_processor(
                        ids::MEMORY_LIMITER,
                        processors::memory_limiter(),
                    ),
                    Component::processor(static_id(ids::DROP_NON_PVC_VOLUMES_METRICS), |_| {
                        volumes_enabled.then(processors::drop_non_pvc_volumes_metrics)
                    }),
                    Component::static_processor(
                        ids::DROP_VIRTUAL_NETWORK_INTERFACES,
                        processors::drop_virtual_network_interfaces(),
                    ),
                    Component::static_processor(
                        ids::DROP_SERVICE_NAME,
                        processors::drop_service_name(),
                    ),
                    Component::static_processor(
                        ids::INSERT_SKIP_ENRICHMENT_ATTRIBUTE,
                        processors::insert_skip_enrichment_attribute(),
                    ),
                    Component::static_processor(
                        ids::SET_INSTRUMENTATION_SCOPE_RUNTIME,
                        processors::instrumentation_scope(
                            &options.instrumentation_scope_version,
                            &[ScopeSource::Runtime, ScopeSource::K8sCluster],
                        ),
                    ),
                    Component::connector_as_exporter(
                        static_id(ids::RUNTIME_INPUT_ROUTING_CONNECTOR),
                        |_| input_routing(InputSource::Runtime),
                    ),
                ],
            );
        }

        if subscribers.contains_key(&InputSource::Prometheus) {
            builder.add_service_pipeline(
                &(),
                ids::METRICS_INPUT_PROMETHEUS_PIPELINE,
                vec![
                    Component::receiver(static_id(ids::PROMETHEUS_APP_PODS_RECEIVER), |_| {
                        Some(prometheus::app_pods(options))
                    }),
                    Component::receiver(static_id(ids::PROMETHEUS_APP_SERVICES_RECEIVER), |_| {
                        Some(prometheus::app_services(options))
                    }),
                    Component::static_processor(
                        ids::MEMORY_LIMITER,
                        processors::memory_limiter(),
                    ),
                    Component::static_processor(
                        ids::DROP_SERVICE_NAME,
                        processors::drop_service_name(),
                    ),
                    Component::static_processor(
                        ids::SET_INSTRUMENTATION_SCOPE_PROMETHEUS,
                        processors::instrumentation_scope(
                            &options.instrumentation_scope_version,
                            &[ScopeSource::Prometheus],
                        ),
                    ),
                    Component::connector_as_exporter(
                        static_id(ids::PROMETHEUS_INPUT_ROUTING_CONNECTOR),
                        |_| input_routing(InputSource::Prometheus),
                    ),
                ],
            );
        }

        if subscribers.contains_key(&InputSource::Istio) {
            let envoy_metrics = pipelines
                .iter()
                .any(|p| p.is_input_enabled(InputSource::Istio) && p.is_envoy_metrics_enabled());
            builder.add_service_pipeline(
                &(),
                ids::METRICS_INPUT_ISTIO_PIPELINE,
                vec![
                    Component::receiver(static_id(ids::PROMETHEUS_ISTIO_RECEIVER), |_| {
                        Some(prometheus::istio(envoy_metrics))
                    }),
                    Component::static_processor(
                        ids::MEMORY_LIMITER,
                        processors::memory_limiter(),
                    ),
                    Component::static_processor(
                        ids::DROP_SERVICE_NAME,
                        processors::drop_service_name(),
                    ),
                    Component::static_processor(
                        ids::ISTIO_NOISE_FILTER,
                        processors::istio_noise_filter(),
                    ),
                    Component::static_processor(
                        ids::SET_INSTRUMENTATION_SCOPE_ISTIO,
                        processors::instrumentation_scope(
                            &options.instrumentation_scope_version,
                            &[ScopeSource::Istio],
                        ),
                    ),
                    Component::connector_as_exporter(
                        static_id(ids::ISTIO_INPUT_ROUTING_CONNECTOR),
                        |_| input_routing(InputSource::Istio),
                    ),
                ],
            );
        }

        let mut enrichment: Vec<Component<'_, ()>> = subscribers
            .keys()
            .map(|&source| {
                Component::connector_as_receiver(
                    static_id(input_routing_connector_id(source)),
                    move |_| input_routing(source),
                )
            })
            .collect();
        enrichment.extend([
            Component::static_processor(
                ids::K8S_ATTRIBUTES,
                processors::k8s_attributes(&options.extract_pod_labels),
            ),
            Component::processor(static_id(ids::SERVICE_ENRICHMENT), |_| {
                (options.service_enrichment == ServiceEnrichment::KymaLegacy)
                    .then(processors::service_enrichment)
            }),
            Component::connector_as_exporter(static_id(ids::ENRICHMENT_ROUTING_CONNECTOR), |_| {
                Some(enrichment_routing.clone())
            }),
        ]);
        builder.add_service_pipeline(
            &(),
            ids::METRICS_ENRICHMENT_CONDITIONAL_PIPELINE,
            enrichment,
        );

        let queue_size = queue_size(pipelines.len());
        for pipeline in pipelines.iter().copied() {
            let exporter = OtlpExporterBuilder::new(
                self.reader,
                &pipeline.spec.output.otlp,
                pipeline.name(),
                queue_size,
                SignalType::Metric,
            )
            .build()
            .await?;
            let exporter = builder.exporter(exporter);

            let mut components = vec![Component::connector_as_receiver(
                static_id(ids::ENRICHMENT_ROUTING_CONNECTOR),
                |_: &MetricPipeline| Some(enrichment_routing.clone()),
            )];
            components.extend(AGENT_INPUTS.into_iter().map(|source| {
                Component::connector_as_receiver(
                    static_id(input_routing_connector_id(source)),
                    move |p: &MetricPipeline| {
                        if p.is_input_enabled(source) {
                            input_routing(source)
                        } else {
                            None
                        }
                    },
                )
            }));
            components.extend(shared::runtime_resource_filters());
            components.extend(shared::diagnostic_filters());
            components.push(shared::envoy_filter());
            components.extend(shared::namespace_filters(&AGENT_INPUTS));
            components.extend(shared::output_tail(options));
            components.push(exporter);

            builder.add_service_pipeline(
                pipeline,
                &ids::metrics_output_pipeline(pipeline.name()),
                components,
            );
        }

        Ok(builder.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::metric_pipeline::MetricPipelineSpec;
    use crate::otelcol::builder::tests::{assert_component_closure, assert_env_refs_resolved};
    use crate::otelcol::config::{Pipeline, Processor, Receiver};
    use crate::otelcol::secret::tests::reader_with;
    use assert_matches::assert_matches;

    fn pipeline(name: &str, input: &str) -> MetricPipeline {
        let yaml = format!(
            "output: {{otlp: {{endpoint: {{value: 'https://{name}:4317'}}}}}}\ninput: {input}"
        );
        MetricPipeline::new(name, serde_yaml::from_str::<MetricPipelineSpec>(&yaml).unwrap())
    }

    async fn build(pipelines: &[MetricPipeline], options: &BuildOptions) -> (Config, EnvVars) {
        let reader = reader_with(vec![]);
        Builder::new(&reader).build(pipelines, options).await.unwrap()
    }

    fn routing(config: &Config, id: &str) -> RoutingConnector {
        match &config.connectors[id] {
            Connector::Routing(routing) => routing.clone(),
            other => panic!("unexpected connector {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_otlp_only_pipelines_are_skipped() {
        let (config, env_vars) = build(&[pipeline("otlp", "{}")], &BuildOptions::default()).await;

        assert_eq!(config, Config::new());
        assert!(env_vars.is_empty());
    }

    #[tokio::test]
    async fn test_runtime_input() {
        let options = BuildOptions {
            agent_namespace: "telemetry".into(),
            ..Default::default()
        };
        let (config, env_vars) = build(
            &[pipeline(
                "test",
                "{runtime: {enabled: true, resources: {volume: {enabled: false}}}}",
            )],
            &options,
        )
        .await;

        assert_eq!(
            config.service.pipelines[ids::METRICS_INPUT_RUNTIME_PIPELINE],
            Pipeline {
                receivers: vec!["kubeletstats".into(), "k8s_cluster".into()],
                processors: vec![
                    "memory_limiter".into(),
                    "filter/drop-virtual-network-interfaces".into(),
                    "resource/drop-service-name".into(),
                    "transform/insert-skip-enrichment-attribute".into(),
                    "transform/set-instrumentation-scope-runtime".into(),
                ],
                exporters: vec!["routing/runtime-input".into()],
            }
        );
        assert_eq!(
            config.service.pipelines[ids::METRICS_ENRICHMENT_CONDITIONAL_PIPELINE],
            Pipeline {
                receivers: vec!["routing/runtime-input".into()],
                processors: vec!["k8sattributes".into(), "service_enrichment".into()],
                exporters: vec!["routing/enrichment".into()],
            }
        );

        let output = &config.service.pipelines["metrics/output-test"];
        assert_eq!(output.receivers, vec!["routing/enrichment", "routing/runtime-input"]);
        assert_eq!(
            output.processors,
            vec![
                "filter/drop-runtime-volume-metrics",
                "filter/drop-envoy-metrics-if-disabled",
                "filter/test-filter-by-namespace-runtime-input",
                "resource/insert-cluster-attributes",
                "resource/delete-skip-enrichment-attribute",
                "resource/drop-kyma-attributes",
                "batch",
            ]
        );
        assert_eq!(output.exporters, vec!["otlp/test"]);

        assert_matches!(
            &config.extensions["k8s_leader_elector"],
            Extension::K8sLeaderElector(elector) => {
                assert_eq!(elector.lease_name, "telemetry-metric-agent-k8scluster");
                assert_eq!(elector.lease_namespace, "telemetry");
            }
        );
        assert_component_closure(&config);
        assert_env_refs_resolved(&config, &env_vars);
    }

    #[tokio::test]
    async fn test_routing_by_input() {
        let (config, _) = build(
            &[
                pipeline("b", "{prometheus: {enabled: true}, istio: {enabled: true}}"),
                pipeline("a", "{runtime: {enabled: true}, prometheus: {enabled: true}}"),
            ],
            &BuildOptions::default(),
        )
        .await;

        let runtime = routing(&config, "routing/runtime-input");
        assert_eq!(runtime.default_pipelines, vec!["metrics/enrichment-conditional"]);
        assert_eq!(runtime.table[0].pipelines, vec!["metrics/output-a"]);
        let prometheus = routing(&config, "routing/prometheus-input");
        assert_eq!(
            prometheus.table[0].pipelines,
            vec!["metrics/output-a", "metrics/output-b"]
        );

        let enrichment = routing(&config, "routing/enrichment");
        assert!(enrichment.default_pipelines.is_empty());
        assert_eq!(
            enrichment
                .table
                .iter()
                .map(|entry| entry.statement.as_str())
                .collect::<Vec<_>>(),
            vec![
                r#"route() where scope.name == "io.kyma-project.telemetry/runtime""#,
                r#"route() where resource.attributes["kyma.input.name"] == "prometheus""#,
                r#"route() where scope.name == "io.kyma-project.telemetry/istio""#,
            ]
        );
        assert_eq!(enrichment.table[2].pipelines, vec!["metrics/output-b"]);

        assert_eq!(
            config.service.pipelines["metrics/enrichment-conditional"].receivers,
            vec![
                "routing/runtime-input",
                "routing/prometheus-input",
                "routing/istio-input"
            ]
        );
        assert_eq!(
            config.service.pipelines["metrics/output-b"].receivers,
            vec![
                "routing/enrichment",
                "routing/prometheus-input",
                "routing/istio-input"
            ]
        );
        assert_component_closure(&config);
    }

    #[tokio::test]
    async fn test_prometheus_with_istio() {
        let options = BuildOptions {
            istio_active: true,
            ..Default::default()
        };
        let (config, _) = build(&[pipeline("test", "{prometheus: {enabled: true}}")], &options).await;

        assert_eq!(
            config.service.pipelines[ids::METRICS_INPUT_PROMETHEUS_PIPELINE].receivers,
            vec!["prometheus/app-pods", "prometheus/app-services"]
        );
        assert_matches!(&config.receivers["prometheus/app-pods"], Receiver::Prometheus(r) => {
            assert_eq!(r.config.scrape_configs[1].job_name, "app-pods-secure");
        });
        assert!(!config.extensions.contains_key("k8s_leader_elector"));
        assert_eq!(
            config.service.pipelines["metrics/output-test"].processors[..2],
            [
                "filter/drop-diagnostic-metrics-if-input-source-prometheus",
                "filter/drop-envoy-metrics-if-disabled",
            ]
        );
    }

    #[tokio::test]
    async fn test_istio_input_with_envoy_metrics() {
        let (config, _) = build(
            &[pipeline(
                "test",
                "{istio: {enabled: true, envoyMetrics: {enabled: true}, diagnosticMetrics: {enabled: true}}}",
            )],
            &BuildOptions::default(),
        )
        .await;

        assert_eq!(
            config.service.pipelines[ids::METRICS_INPUT_ISTIO_PIPELINE].processors,
            vec![
                "memory_limiter",
                "resource/drop-service-name",
                "istio_noise_filter",
                "transform/set-instrumentation-scope-istio",
            ]
        );
        let output = &config.service.pipelines["metrics/output-test"].processors;
        assert!(!output.contains(&"filter/drop-envoy-metrics-if-disabled".to_string()));
        assert_eq!(output[0], "filter/test-filter-by-namespace-istio-input");
        assert_matches!(
            &config.processors["filter/test-filter-by-namespace-istio-input"],
            Processor::Filter(_)
        );
    }

    #[tokio::test]
    async fn test_pipeline_order_does_not_matter() {
        let a = pipeline("a", "{runtime: {enabled: true}}");
        let b = pipeline("b", "{prometheus: {enabled: true}, runtime: {enabled: true, resources: {pod: {enabled: false}}}}");

        let (first, first_env) = build(&[a.clone(), b.clone()], &BuildOptions::default()).await;
        let (second, second_env) = build(&[b, a], &BuildOptions::default()).await;

        assert_eq!(first.to_yaml().unwrap(), second.to_yaml().unwrap());
        assert_eq!(first_env, second_env);
    }
}
