//! Config of the metric gateway.
//!
//! OTLP metrics enter through `metrics/input-otlp` and are routed either through the shared
//! `metrics/enrichment` pipeline or, when already enriched at the source, straight to the
//! per-pipeline `metrics/<name>` pipelines. Kyma module stats are collected by the gateway
//! itself and forwarded to the pipelines subscribing to runtime metrics.
use super::builder::{Component, ComponentBuilder, static_id};
use super::config::connectors::ForwardConnector;
use super::config::extensions::{K8S_LEADER_ELECTOR, K8sLeaderElectorExtension};
use super::config::receivers::{KymaStatsReceiver, ModuleGvr, OtlpReceiver};
use super::config::{Config, Connector, Extension, Receiver};
use super::env_vars::EnvVars;
use super::metric_components::{self as shared, any_input_enabled};
use super::oauth2::ExtensionBuild;
use super::otlp_exporter::OtlpExporterBuilder;
use super::processors::ScopeSource;
use super::secret::SecretReader;
use super::{BuildError, BuildOptions, SignalType, ids, processors, queue_size};
use crate::apis::metric_pipeline::{InputSource, MetricPipeline};
use crate::apis::telemetry::ServiceEnrichment;
use tracing::debug;

const KYMA_STATS_LEASE: &str = "telemetry-metric-gateway-kymastats";
const COLLECTION_INTERVAL: &str = "30s";
const AUTH_TYPE_SERVICE_ACCOUNT: &str = "serviceAccount";

/// Modules whose status the `kymastats` receiver reports.
const KYMA_MODULES: [(&str, &str, &str); 4] = [
    ("operator.kyma-project.io", "v1alpha1", "telemetries"),
    ("telemetry.kyma-project.io", "v1alpha1", "logpipelines"),
    ("telemetry.kyma-project.io", "v1alpha1", "metricpipelines"),
    ("telemetry.kyma-project.io", "v1alpha1", "tracepipelines"),
];

fn kyma_stats_receiver() -> Receiver {
    Receiver::KymaStats(KymaStatsReceiver {
        auth_type: AUTH_TYPE_SERVICE_ACCOUNT.to_string(),
        collection_interval: COLLECTION_INTERVAL.to_string(),
        resources: KYMA_MODULES
            .iter()
            .map(|(group, version, resource)| ModuleGvr {
                group: group.to_string(),
                version: version.to_string(),
                resource: resource.to_string(),
            })
            .collect(),
        k8s_leader_elector: K8S_LEADER_ELECTOR.to_string(),
    })
}

fn leader_elector(namespace: &str) -> ExtensionBuild {
    ExtensionBuild {
        id: K8S_LEADER_ELECTOR.to_string(),
        extension: Extension::K8sLeaderElector(K8sLeaderElectorExtension {
            auth_type: AUTH_TYPE_SERVICE_ACCOUNT.to_string(),
            lease_name: KYMA_STATS_LEASE.to_string(),
            lease_namespace: namespace.to_string(),
        }),
        env_vars: EnvVars::new(),
    }
}

fn forward() -> Option<Connector> {
    Some(Connector::Forward(ForwardConnector {}))
}

pub struct Builder<'a> {
    reader: &'a dyn SecretReader,
}

impl<'a> Builder<'a> {
    pub fn new(reader: &'a dyn SecretReader) -> Self {
        Self { reader }
    }

    pub async fn build(
        &self,
        pipelines: &[MetricPipeline],
        options: &BuildOptions,
    ) -> Result<(Config, EnvVars), BuildError> {
        let mut pipelines: Vec<&MetricPipeline> = pipelines.iter().collect();
        pipelines.sort_by(|a, b| a.name().cmp(b.name()));
        debug!(pipelines = pipelines.len(), "building metric gateway config");

        let mut builder = ComponentBuilder::new();
        if pipelines.is_empty() {
            return Ok(builder.finish());
        }

        let output_pipelines: Vec<String> = pipelines
            .iter()
            .map(|p| ids::metrics_pipeline(p.name()))
            .collect();
        let enrichment_routing = shared::skip_enrichment_routing(
            &[ids::METRICS_ENRICHMENT_PIPELINE],
            output_pipelines,
        );

        builder.add_service_pipeline(
            &(),
            ids::METRICS_INPUT_OTLP_PIPELINE,
            vec![
                Component::receiver(static_id(ids::OTLP_RECEIVER), |_| {
                    Some(Receiver::Otlp(OtlpReceiver::on_pod_ip()))
                }),
                Component::static_processor(ids::MEMORY_LIMITER, processors::memory_limiter()),
                Component::connector_as_exporter(
                    static_id(ids::ENRICHMENT_ROUTING_CONNECTOR),
                    |_| Some(enrichment_routing.clone()),
                ),
            ],
        );

        if any_input_enabled(&pipelines, InputSource::Runtime) {
            builder.add_extension(leader_elector(&options.gateway_namespace));
            builder.add_service_pipeline(
                &(),
                ids::METRICS_INPUT_KYMA_STATS_PIPELINE,
                vec![
                    Component::receiver(static_id(ids::KYMA_STATS_RECEIVER), |_| {
                        Some(kyma_stats_receiver())
                    }),
                    Component::static_processor(
                        ids::MEMORY_LIMITER,
                        processors::memory_limiter(),
                    ),
                    Component::static_processor(
                        ids::SET_INSTRUMENTATION_SCOPE_KYMA,
                        processors::instrumentation_scope(
                            &options.instrumentation_scope_version,
                            &[ScopeSource::Kyma],
                        ),
                    ),
                    Component::connector_as_exporter(
                        static_id(ids::INPUT_FORWARD_CONNECTOR),
                        |_| forward(),
                    ),
                ],
            );
        }

        builder.add_service_pipeline(
            &(),
            ids::METRICS_ENRICHMENT_PIPELINE,
            vec![
                Component::connector_as_receiver(
                    static_id(ids::ENRICHMENT_ROUTING_CONNECTOR),
                    |_| Some(enrichment_routing.clone()),
                ),
                Component::static_processor(
                    ids::K8S_ATTRIBUTES,
                    processors::k8s_attributes(&options.extract_pod_labels),
                ),
                Component::processor(static_id(ids::SERVICE_ENRICHMENT), |_| {
                    (options.service_enrichment == ServiceEnrichment::KymaLegacy)
                        .then(processors::service_enrichment)
                }),
                Component::connector_as_exporter(
                    static_id(ids::ENRICHMENT_FORWARD_CONNECTOR),
                    |_| forward(),
                ),
            ],
        );

        let queue_size = queue_size(pipelines.len());
        for pipeline in pipelines {
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

            let mut components = vec![
                Component::connector_as_receiver(
                    static_id(ids::ENRICHMENT_ROUTING_CONNECTOR),
                    |_| Some(enrichment_routing.clone()),
                ),
                Component::connector_as_receiver(
                    static_id(ids::ENRICHMENT_FORWARD_CONNECTOR),
                    |_| forward(),
                ),
                Component::connector_as_receiver(
                    static_id(ids::INPUT_FORWARD_CONNECTOR),
                    |p: &MetricPipeline| {
                        p.is_input_enabled(InputSource::Runtime)
                            .then_some(Connector::Forward(ForwardConnector {}))
                    },
                ),
                Component::processor(static_id(ids::DROP_UNKNOWN_SERVICE_NAME), |_| {
                    (options.service_enrichment == ServiceEnrichment::Otel)
                        .then(|| processors::drop_unknown_service_name(SignalType::Metric))
                }),
            ];
            components.extend(
                [
                    InputSource::Runtime,
                    InputSource::Prometheus,
                    InputSource::Istio,
                    InputSource::Otlp,
                ]
                .into_iter()
                .map(|source| {
                    Component::processor(
                        static_id(ids::drop_if_input_source(source)),
                        move |p: &MetricPipeline| {
                            (!p.is_input_enabled(source))
                                .then(|| processors::drop_if_input_source(source))
                        },
                    )
                }),
            );
            components.push(shared::envoy_filter());
            components.extend(shared::namespace_filters(&[
                InputSource::Runtime,
                InputSource::Prometheus,
                InputSource::Istio,
                InputSource::Otlp,
            ]));
            components.extend(shared::runtime_resource_filters());
            components.extend(shared::diagnostic_filters());
            components.extend(shared::output_tail(options));
            components.push(exporter);

            builder.add_service_pipeline(
                pipeline,
                &ids::metrics_pipeline(pipeline.name()),
                components,
            );
        }

        Ok(builder.finish())
    }
}
