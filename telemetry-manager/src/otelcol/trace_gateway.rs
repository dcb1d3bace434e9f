//! Config of the trace gateway. Every [TracePipeline] gets its own `traces/<name>` service
//! pipeline behind the shared OTLP receiver.
use super::builder::{Component, ComponentBuilder, static_id};
use super::config::receivers::OtlpReceiver;
use super::config::{Config, Receiver};
use super::env_vars::EnvVars;
use super::otlp_exporter::OtlpExporterBuilder;
use super::secret::SecretReader;
use super::{BuildError, BuildOptions, SignalType, ids, processors, queue_size};
use crate::apis::telemetry::ServiceEnrichment;
use crate::apis::trace_pipeline::TracePipeline;
use tracing::debug;

pub struct Builder<'a> {
    reader: &'a dyn SecretReader,
}

impl<'a> Builder<'a> {
    pub fn new(reader: &'a dyn SecretReader) -> Self {
        Self { reader }
    }

    pub async fn build(
        &self,
        pipelines: &[TracePipeline],
        options: &BuildOptions,
    ) -> Result<(Config, EnvVars), BuildError> {
        let mut pipelines: Vec<&TracePipeline> = pipelines.iter().collect();
        pipelines.sort_by(|a, b| a.name().cmp(b.name()));
        debug!(pipelines = pipelines.len(), "building trace gateway config");

        let queue_size = queue_size(pipelines.len());
        let mut builder = ComponentBuilder::new();

        for pipeline in pipelines {
            let exporter = OtlpExporterBuilder::new(
                self.reader,
                &pipeline.spec.output.otlp,
                pipeline.name(),
                queue_size,
                SignalType::Trace,
            )
            .build()
            .await?;
            let exporter = builder.exporter(exporter);

            let components = vec![
                Component::receiver(static_id(ids::OTLP_RECEIVER), |_| {
                    Some(Receiver::Otlp(OtlpReceiver::on_pod_ip()))
                }),
                Component::static_processor(ids::MEMORY_LIMITER, processors::memory_limiter()),
                Component::processor(static_id(ids::DROP_UNKNOWN_SERVICE_NAME), |_| {
                    (options.service_enrichment == ServiceEnrichment::Otel)
                        .then(|| processors::drop_unknown_service_name(SignalType::Trace))
                }),
                Component::static_processor(
                    ids::K8S_ATTRIBUTES,
                    processors::k8s_attributes(&options.extract_pod_labels),
                ),
                Component::static_processor(
                    ids::ISTIO_NOISE_FILTER,
                    processors::istio_noise_filter(),
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
                Component::static_processor(
                    ids::DROP_ISTIO_PROXY_SERVICE_ENRICHMENT,
                    processors::drop_istio_proxy_service_enrichment(),
                ),
                Component::processor(
                    Box::new(|p: &TracePipeline| ids::user_defined_transform(p.name())),
                    |p: &TracePipeline| {
                        processors::user_defined_transform(SignalType::Trace, &p.spec.transforms)
                    },
                ),
                Component::processor(
                    Box::new(|p: &TracePipeline| ids::user_defined_filter(p.name())),
                    |p: &TracePipeline| {
                        processors::user_defined_filter(SignalType::Trace, &p.spec.filters)
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
                &ids::traces_pipeline(pipeline.name()),
                components,
            );
        }

        Ok(builder.finish())
    }
}
