//! Components shared by the metric gateway and the metric agent output pipelines.
use super::builder::{Component, static_id};
use super::config::Connector;
use super::config::connectors::{RoutingConnector, RoutingTableEntry};
use super::{BuildOptions, SignalType, ids, processors};
use crate::apis::metric_pipeline::{InputSource, MetricPipeline, RuntimeResource};

const ERROR_MODE_IGNORE: &str = "ignore";

/// Routing connector sending metrics marked with [processors::SKIP_ENRICHMENT_ATTRIBUTE] straight
/// to `skip_to`, everything else to `default_pipelines`.
pub fn skip_enrichment_routing(default_pipelines: &[&str], skip_to: Vec<String>) -> Connector {
    Connector::Routing(RoutingConnector {
        default_pipelines: default_pipelines.iter().map(|p| p.to_string()).collect(),
        error_mode: ERROR_MODE_IGNORE.to_string(),
        table: vec![RoutingTableEntry {
            context: None,
            statement: format!(
                r#"route() where attributes["{}"] == "true""#,
                processors::SKIP_ENRICHMENT_ATTRIBUTE
            ),
            pipelines: skip_to,
        }],
    })
}

/// Metric context route matching the records of one input.
pub fn input_route(source: InputSource, pipelines: Vec<String>) -> RoutingTableEntry {
    RoutingTableEntry {
        context: Some("metric".to_string()),
        statement: format!(
            "route() where {}",
            processors::input_source_condition(source)
        ),
        pipelines,
    }
}

/// Drops the metrics of runtime resources a pipeline turned off.
pub fn runtime_resource_filters<'a>() -> Vec<Component<'a, MetricPipeline>> {
    RuntimeResource::ALL
        .into_iter()
        .map(|resource| {
            Component::processor(
                static_id(ids::drop_runtime_metrics(resource.as_str())),
                move |p: &MetricPipeline| {
                    (p.is_input_enabled(InputSource::Runtime)
                        && !p.is_runtime_resource_enabled(resource))
                    .then(|| processors::drop_runtime_resource_metrics(resource))
                },
            )
        })
        .collect()
}

/// Drops the scrape loop metrics of the inputs that did not ask for them.
pub fn diagnostic_filters<'a>() -> Vec<Component<'a, MetricPipeline>> {
    [InputSource::Prometheus, InputSource::Istio]
        .into_iter()
        .map(|source| {
            Component::processor(
                static_id(ids::drop_diagnostic_metrics(source)),
                move |p: &MetricPipeline| {
                    (p.is_input_enabled(source) && !p.is_diagnostic_metrics_enabled(source))
                        .then(|| processors::drop_diagnostic_metrics(source))
                },
            )
        })
        .collect()
}

pub fn envoy_filter<'a>() -> Component<'a, MetricPipeline> {
    Component::processor(
        static_id(ids::DROP_ENVOY_METRICS_IF_DISABLED),
        |p: &MetricPipeline| {
            (!(p.is_input_enabled(InputSource::Istio) && p.is_envoy_metrics_enabled()))
                .then(processors::drop_envoy_metrics)
        },
    )
}

/// One namespace filter per enabled input of `sources` that has a selector.
pub fn namespace_filters<'a>(sources: &[InputSource]) -> Vec<Component<'a, MetricPipeline>> {
    sources
        .iter()
        .map(|&source| {
            Component::processor(
                Box::new(move |p: &MetricPipeline| ids::metric_namespace_filter(p.name(), source)),
                move |p: &MetricPipeline| {
                    if !p.is_input_enabled(source) {
                        return None;
                    }
                    p.effective_namespace_selector(source)
                        .and_then(|selector| processors::metric_namespace_filter(&selector, source))
                },
            )
        })
        .collect()
}

/// Tail of every output pipeline, up to and excluding the exporter.
pub fn output_tail<'a>(options: &'a BuildOptions) -> Vec<Component<'a, MetricPipeline>> {
    vec![
        Component::static_processor(
            ids::INSERT_CLUSTER_ATTRIBUTES,
            processors::insert_cluster_attributes(&options.cluster),
        ),
        Component::static_processor(
            ids::DELETE_SKIP_ENRICHMENT_ATTRIBUTE,
            processors::delete_skip_enrichment_attribute(),
        ),
        Component::static_processor(ids::DROP_KYMA_ATTRIBUTES, processors::drop_kyma_attributes()),
        Component::processor(
            Box::new(|p: &MetricPipeline| ids::user_defined_transform(p.name())),
            |p: &MetricPipeline| {
                processors::user_defined_transform(SignalType::Metric, &p.spec.transforms)
            },
        ),
        Component::processor(
            Box::new(|p: &MetricPipeline| ids::user_defined_filter(p.name())),
            |p: &MetricPipeline| processors::user_defined_filter(SignalType::Metric, &p.spec.filters),
        ),
        Component::static_processor(
            ids::BATCH,
            processors::batch(processors::METRIC_BATCH_SIZE),
        ),
    ]
}

/// Whether any pipeline enables the input.
pub fn any_input_enabled(pipelines: &[&MetricPipeline], source: InputSource) -> bool {
    pipelines.iter().any(|p| p.is_input_enabled(source))
}

/// Whether any pipeline collects the runtime metrics of the resource.
pub fn any_runtime_resource_enabled(pipelines: &[&MetricPipeline], resource: RuntimeResource) -> bool {
    pipelines.iter().any(|p| {
        p.is_input_enabled(InputSource::Runtime) && p.is_runtime_resource_enabled(resource)
    })
}
