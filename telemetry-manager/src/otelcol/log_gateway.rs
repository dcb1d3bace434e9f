//! Config of the log gateway, the collector receiving OTLP logs for every [LogPipeline] with an
//! OTLP output.
use super::builder::{Component, ComponentBuilder, static_id};
use super::config::receivers::OtlpReceiver;
use super::config::{Config, Receiver};
use super::env_vars::EnvVars;
use super::otlp_exporter::OtlpExporterBuilder;
use super::secret::SecretReader;
use super::{BuildError, BuildOptions, SignalType, ids, processors, queue_size};
use crate::apis::log_pipeline::LogPipeline;
use crate::apis::metric_pipeline::InputSource;
use crate::apis::telemetry::ServiceEnrichment;
use tracing::debug;

pub struct Builder<'a> {
    reader: &'a dyn SecretReader,
}

impl<'a> Builder<'a> {
    pub fn new(reader: &'a dyn SecretReader) -> Self {
        Self { reader }
    }

    /// Pipelines with other outputs are served by the log agent and left out.
    pub async fn build(
        &self,
        pipelines: &[LogPipeline],
        options: &BuildOptions,
    ) -> Result<(Config, EnvVars), BuildError> {
        let mut pipelines: Vec<&LogPipeline> = pipelines
            .iter()
            .filter(|p| p.otlp_output().is_some())
            .collect();
        pipelines.sort_by(|a, b| a.name().cmp(b.name()));
        debug!(pipelines = pipelines.len(), "building log gateway config");

        let queue_size = queue_size(pipelines.len());
        let mut builder = ComponentBuilder::new();

        for pipeline in pipelines {
            let Some(output) = pipeline.otlp_output() else {
                continue;
            };
            let exporter = OtlpExporterBuilder::new(
                self.reader,
                output,
                pipeline.name(),
                queue_size,
                SignalType::Log,
            )
            .build()
            .await?;
            let exporter = builder.exporter(exporter);

            let components = vec![
                Component::receiver(static_id(ids::OTLP_RECEIVER), |_| {
                    Some(Receiver::Otlp(OtlpReceiver::on_pod_ip()))
                }),
                Component::static_processor(ids::MEMORY_LIMITER, processors::memory_limiter()),
                Component::static_processor(
                    ids::SET_OBSERVED_TIME_IF_ZERO,
                    processors::set_observed_time_if_zero(),
                ),
                Component::processor(static_id(ids::DROP_UNKNOWN_SERVICE_NAME), |_| {
                    (options.service_enrichment == ServiceEnrichment::Otel)
                        .then(|| processors::drop_unknown_service_name(SignalType::Log))
                }),
                Component::static_processor(
                    ids::K8S_ATTRIBUTES,
                    processors::k8s_attributes(&options.extract_pod_labels),
                ),
                Component::static_processor(
                    ids::ISTIO_NOISE_FILTER,
                    processors::istio_noise_filter(),
                ),
                Component::processor(
                    static_id(ids::drop_if_input_source(InputSource::Otlp)),
                    |p: &LogPipeline| {
                        (!p.is_otlp_input_enabled()).then(processors::drop_all_logs)
                    },
                ),
                Component::processor(
                    Box::new(|p: &LogPipeline| ids::log_namespace_filter(p.name())),
                    |p: &LogPipeline| {
                        p.otlp_input()
                            .and_then(|input| input.namespaces.as_ref())
                            .and_then(processors::log_namespace_filter)
                    },
                ),
                Component::static_processor(
                    ids::INSERT_CLUSTER_ATTRIBUTES,
                    processors::insert_cluster_attributes(&options.cluster),
                ),
                Component::processor(static_id(ids::SERVICE_ENRICHMENT), |_| {
                    (options.service_enrichment == ServiceEnrichment::KymaLegacy)
                        .then(processors::service_enrichment)
                }),
                Component::static_processor(
                    ids::DROP_KYMA_ATTRIBUTES,
                    processors::drop_kyma_attributes(),
                ),
                Component::processor(
                    Box::new(|p: &LogPipeline| ids::user_defined_transform(p.name())),
                    |p: &LogPipeline| {
                        processors::user_defined_transform(SignalType::Log, &p.spec.transforms)
                    },
                ),
                Component::processor(
                    Box::new(|p: &LogPipeline| ids::user_defined_filter(p.name())),
                    |p: &LogPipeline| {
                        processors::user_defined_filter(SignalType::Log, &p.spec.filters)
                    },
                ),
                Component::static_processor(
                    ids::BATCH,
                    processors::batch(processors::LOG_TRACE_BATCH_SIZE),
                ),
                exporter,
            ];
            builder.add_service_pipeline(
                pipeline,
                &ids::logs_pipeline(pipeline.name()),
                components,
            );
        }

        Ok(builder.finish())
    }
}
