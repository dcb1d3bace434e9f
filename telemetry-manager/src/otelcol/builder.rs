//! Assembly of service pipelines out of component-adding steps.
//!
//! A signal builder describes each service pipeline as an ordered list of [Component]s. Every
//! component knows how to compute its ID and its config for the pipeline being built; a config of
//! `None` leaves the component out. The first occurrence of an ID writes the component map, later
//! ones only reference it, so a component shared by many pipelines is configured once.
use super::config::{Config, Connector, Exporter, Pipeline, Processor, Receiver};
use super::env_vars::EnvVars;
use super::oauth2::ExtensionBuild;
use super::otlp_exporter::ExporterBuild;
use std::collections::BTreeMap;
use tracing::trace;

pub type IdFn<'a, P> = Box<dyn Fn(&P) -> String + 'a>;
pub type ConfigFn<'a, P, T> = Box<dyn Fn(&P) -> Option<T> + 'a>;

/// One step of a service pipeline. Connectors appear as exporter of the pipeline feeding them and
/// as receiver of the pipeline they feed.
pub enum Component<'a, P> {
    Receiver(IdFn<'a, P>, ConfigFn<'a, P, Receiver>),
    Processor(IdFn<'a, P>, ConfigFn<'a, P, Processor>),
    Exporter(IdFn<'a, P>, ConfigFn<'a, P, Exporter>),
    ConnectorAsReceiver(IdFn<'a, P>, ConfigFn<'a, P, Connector>),
    ConnectorAsExporter(IdFn<'a, P>, ConfigFn<'a, P, Connector>),
}

/// ID that does not depend on the pipeline.
pub fn static_id<'a, P: 'a>(id: impl Into<String>) -> IdFn<'a, P> {
    let id = id.into();
    Box::new(move |_: &P| id.clone())
}

impl<'a, P: 'a> Component<'a, P> {
    pub fn receiver(
        id: IdFn<'a, P>,
        config: impl Fn(&P) -> Option<Receiver> + 'a,
    ) -> Self {
        Self::Receiver(id, Box::new(config))
    }

    pub fn processor(
        id: IdFn<'a, P>,
        config: impl Fn(&P) -> Option<Processor> + 'a,
    ) -> Self {
        Self::Processor(id, Box::new(config))
    }

    pub fn exporter(
        id: IdFn<'a, P>,
        config: impl Fn(&P) -> Option<Exporter> + 'a,
    ) -> Self {
        Self::Exporter(id, Box::new(config))
    }

    pub fn connector_as_receiver(
        id: IdFn<'a, P>,
        config: impl Fn(&P) -> Option<Connector> + 'a,
    ) -> Self {
        Self::ConnectorAsReceiver(id, Box::new(config))
    }

    pub fn connector_as_exporter(
        id: IdFn<'a, P>,
        config: impl Fn(&P) -> Option<Connector> + 'a,
    ) -> Self {
        Self::ConnectorAsExporter(id, Box::new(config))
    }

    /// A processor present in every pipeline with the same config.
    pub fn static_processor(id: &str, processor: Processor) -> Self {
        Self::processor(static_id(id), move |_| Some(processor.clone()))
    }
}

/// Accumulates the collector config and env vars of one build.
#[derive(Debug, Default)]
pub struct ComponentBuilder {
    config: Config,
    env_vars: EnvVars,
}

impl ComponentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn add_extension(&mut self, build: ExtensionBuild) {
        self.env_vars.extend(build.env_vars);
        self.config.add_extension(&build.id, build.extension);
    }

    /// Registers the env vars and extension of a resolved exporter and returns the component
    /// placing it into a pipeline.
    pub fn exporter<'a, P: 'a>(&mut self, build: ExporterBuild) -> Component<'a, P> {
        self.env_vars.extend(build.env_vars);
        if let Some(extension) = build.extension {
            self.add_extension(extension);
        }
        let exporter = build.exporter;
        Component::exporter(static_id(build.id), move |_| Some(exporter.clone()))
    }

    /// Runs the components in order and stores the resulting service pipeline under
    /// `pipeline_id`.
    pub fn add_service_pipeline<P>(
        &mut self,
        pipeline: &P,
        pipeline_id: &str,
        components: Vec<Component<'_, P>>,
    ) {
        let mut service_pipeline = Pipeline::default();

        for component in components {
            match component {
                Component::Receiver(id, config) => {
                    if let Some(id) = add(&mut self.config.receivers, pipeline, &id, &config) {
                        service_pipeline.receivers.push(id);
                    }
                }
                Component::Processor(id, config) => {
                    if let Some(id) = add(&mut self.config.processors, pipeline, &id, &config) {
                        service_pipeline.processors.push(id);
                    }
                }
                Component::Exporter(id, config) => {
                    if let Some(id) = add(&mut self.config.exporters, pipeline, &id, &config) {
                        service_pipeline.exporters.push(id);
                    }
                }
                Component::ConnectorAsReceiver(id, config) => {
                    if let Some(id) = add(&mut self.config.connectors, pipeline, &id, &config) {
                        service_pipeline.receivers.push(id);
                    }
                }
                Component::ConnectorAsExporter(id, config) => {
                    if let Some(id) = add(&mut self.config.connectors, pipeline, &id, &config) {
                        service_pipeline.exporters.push(id);
                    }
                }
            }
        }

        trace!(pipeline_id, "service pipeline assembled");
        self.config
            .service
            .pipelines
            .insert(pipeline_id.to_string(), service_pipeline);
    }

    pub fn finish(self) -> (Config, EnvVars) {
        (self.config, self.env_vars)
    }
}

fn add<P, T>(
    components: &mut BTreeMap<String, T>,
    pipeline: &P,
    id: &IdFn<'_, P>,
    config: &ConfigFn<'_, P, T>,
) -> Option<String> {
    let config = config(pipeline)?;
    let id = id(pipeline);
    components.entry(id.clone()).or_insert(config);
    Some(id)
}
