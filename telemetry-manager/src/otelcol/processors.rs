//! Processor configs shared by the signal builders.
use super::config::Processor;
use super::config::processors::{
    AttributeAction, BatchProcessor, ExtractK8sMetadata, ExtractLabel, FilterLogs, FilterMetrics,
    FilterProcessor, FilterTraces, IstioNoiseFilterProcessor, K8sAttributesProcessor,
    MemoryLimiter, PodAssociation, PodAssociations, ResourceProcessor, ServiceEnrichmentProcessor,
    TransformProcessor, TransformStatements,
};
use super::{ClusterInfo, SignalType};
use crate::apis::metric_pipeline::{InputSource, RuntimeResource};
use crate::apis::shared::{FilterSpec, NamespaceSelector, TransformSpec};
use crate::apis::telemetry::PodLabel;
use crate::ottl::expr;

/// Resource attribute marking metrics that bypass the k8s enrichment.
pub const SKIP_ENRICHMENT_ATTRIBUTE: &str = "io.kyma-project.telemetry.skip_enrichment";
/// Resource attribute naming the agent input a metric was scraped by.
pub const KYMA_INPUT_NAME_ATTRIBUTE: &str = "kyma.input.name";
pub const KYMA_INPUT_PROMETHEUS: &str = "prometheus";
pub const KYMA_K8S_IO_APP_NAME: &str = "kyma.kubernetes_io_app_name";
pub const KYMA_APP_NAME: &str = "kyma.app_name";

pub const LOG_TRACE_BATCH_SIZE: usize = 512;
pub const METRIC_BATCH_SIZE: usize = 1024;

const ERROR_MODE_IGNORE: &str = "ignore";

/// Metrics reported by the Prometheus scrape loop itself.
const DIAGNOSTIC_METRIC_NAMES: [&str; 5] = [
    "up",
    "scrape_duration_seconds",
    "scrape_samples_scraped",
    "scrape_samples_post_metric_relabeling",
    "scrape_series_added",
];

/// Receivers whose instrumentation scope gets rewritten to a telemetry scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeSource {
    Runtime,
    K8sCluster,
    Prometheus,
    Istio,
    Kyma,
}

impl ScopeSource {
    pub fn scope_name(&self) -> &'static str {
        match self {
            Self::Runtime | Self::K8sCluster => "io.kyma-project.telemetry/runtime",
            Self::Prometheus => "io.kyma-project.telemetry/prometheus",
            Self::Istio => "io.kyma-project.telemetry/istio",
            Self::Kyma => "io.kyma-project.telemetry/kyma",
        }
    }

    fn upstream_scope_name(&self) -> &'static str {
        match self {
            Self::Runtime => {
                "github.com/open-telemetry/opentelemetry-collector-contrib/receiver/kubeletstatsreceiver"
            }
            Self::K8sCluster => {
                "github.com/open-telemetry/opentelemetry-collector-contrib/receiver/k8sclusterreceiver"
            }
            Self::Prometheus | Self::Istio => {
                "github.com/open-telemetry/opentelemetry-collector-contrib/receiver/prometheusreceiver"
            }
            Self::Kyma => {
                "github.com/kyma-project/opentelemetry-collector-components/receiver/kymastatsreceiver"
            }
        }
    }
}

pub fn memory_limiter() -> Processor {
    Processor::MemoryLimiter(MemoryLimiter {
        check_interval: "1s".to_string(),
        limit_percentage: 75,
        spike_limit_percentage: 15,
    })
}

pub fn batch(size: usize) -> Processor {
    Processor::Batch(BatchProcessor {
        send_batch_size: size,
        timeout: "10s".to_string(),
        send_batch_max_size: size,
    })
}

pub fn istio_noise_filter() -> Processor {
    Processor::IstioNoiseFilter(IstioNoiseFilterProcessor {})
}

/// Extracts workload metadata, the app labels used by the service enrichment, node topology and
/// the pod labels requested in the [crate::apis::telemetry::Telemetry] resource.
pub fn k8s_attributes(pod_labels: &[PodLabel]) -> Processor {
    let metadata = [
        "k8s.pod.name",
        "k8s.node.name",
        "k8s.namespace.name",
        "k8s.deployment.name",
        "k8s.statefulset.name",
        "k8s.daemonset.name",
        "k8s.cronjob.name",
        "k8s.job.name",
    ];
    let fixed_labels = [
        ("pod", "app.kubernetes.io/name", KYMA_K8S_IO_APP_NAME),
        ("pod", "app", KYMA_APP_NAME),
        ("node", "topology.kubernetes.io/region", "cloud.region"),
        ("node", "topology.kubernetes.io/zone", "cloud.availability_zone"),
        ("node", "node.kubernetes.io/instance-type", "host.type"),
        ("node", "kubernetes.io/arch", "host.arch"),
    ];

    let mut labels: Vec<ExtractLabel> = fixed_labels
        .into_iter()
        .map(|(from, key, tag_name)| ExtractLabel {
            from: from.to_string(),
            key: Some(key.to_string()),
            tag_name: tag_name.to_string(),
            key_regex: None,
        })
        .collect();
    labels.extend(pod_labels.iter().map(|label| {
        let key_regex = match label.key_prefix.as_deref().filter(|p| !p.is_empty()) {
            Some(prefix) => format!("({prefix}.*)"),
            None => format!("(^{}$)", label.key.as_deref().unwrap_or_default()),
        };
        ExtractLabel {
            from: "pod".to_string(),
            key: None,
            tag_name: "k8s.pod.label.$0".to_string(),
            key_regex: Some(key_regex),
        }
    }));

    let from_resource = |name: &str| PodAssociations {
        sources: vec![PodAssociation {
            from: "resource_attribute".to_string(),
            name: Some(name.to_string()),
        }],
    };

    Processor::K8sAttributes(K8sAttributesProcessor {
        auth_type: "serviceAccount".to_string(),
        passthrough: false,
        extract: ExtractK8sMetadata {
            metadata: metadata.map(String::from).to_vec(),
            labels,
        },
        pod_association: vec![
            from_resource("k8s.pod.ip"),
            from_resource("k8s.pod.uid"),
            PodAssociations {
                sources: vec![PodAssociation {
                    from: "connection".to_string(),
                    name: None,
                }],
            },
        ],
    })
}

fn attribute_action(action: &str, key: &str, value: Option<&str>) -> AttributeAction {
    AttributeAction {
        action: action.to_string(),
        key: Some(key.to_string()),
        value: value.map(String::from),
        pattern: None,
    }
}

/// Cluster name and UID are always inserted; the cloud provider only when known.
pub fn insert_cluster_attributes(cluster: &ClusterInfo) -> Processor {
    let mut attributes = vec![
        attribute_action("insert", "k8s.cluster.name", Some(&cluster.name)),
        attribute_action("insert", "k8s.cluster.uid", Some(&cluster.uid)),
    ];
    if !cluster.cloud_provider.is_empty() {
        attributes.push(attribute_action(
            "insert",
            "cloud.provider",
            Some(&cluster.cloud_provider),
        ));
    }
    Processor::Resource(ResourceProcessor { attributes })
}

pub fn drop_kyma_attributes() -> Processor {
    Processor::Resource(ResourceProcessor {
        attributes: vec![AttributeAction {
            action: "delete".to_string(),
            pattern: Some("kyma.*".to_string()),
            ..Default::default()
        }],
    })
}

pub fn service_enrichment() -> Processor {
    Processor::ServiceEnrichment(ServiceEnrichmentProcessor {
        resource_attributes: vec![KYMA_K8S_IO_APP_NAME.to_string(), KYMA_APP_NAME.to_string()],
    })
}

pub fn drop_service_name() -> Processor {
    Processor::Resource(ResourceProcessor {
        attributes: vec![attribute_action("delete", "service.name", None)],
    })
}

pub fn delete_skip_enrichment_attribute() -> Processor {
    Processor::Resource(ResourceProcessor {
        attributes: vec![attribute_action("delete", SKIP_ENRICHMENT_ATTRIBUTE, None)],
    })
}

fn transform(signal: SignalType, statements: Vec<TransformStatements>) -> Processor {
    let mut processor = TransformProcessor {
        error_mode: ERROR_MODE_IGNORE.to_string(),
        ..Default::default()
    };
    match signal {
        SignalType::Log => processor.log_statements = statements,
        SignalType::Metric => processor.metric_statements = statements,
        SignalType::Trace => processor.trace_statements = statements,
    }
    Processor::Transform(processor)
}

fn statements<S: Into<String>>(
    statements: impl IntoIterator<Item = S>,
    conditions: impl IntoIterator<Item = S>,
) -> TransformStatements {
    TransformStatements {
        statements: statements.into_iter().map(Into::into).collect(),
        conditions: conditions.into_iter().map(Into::into).collect(),
    }
}

/// Sets the observed timestamp of log records that arrive without one.
pub fn set_observed_time_if_zero() -> Processor {
    transform(
        SignalType::Log,
        vec![statements(
            ["set(log.observed_time, Now())"],
            ["log.observed_time_unix_nano == 0"],
        )],
    )
}

/// Removes the SDK fallback `unknown_service` names, so the collector derives a proper one.
pub fn drop_unknown_service_name(signal: SignalType) -> Processor {
    let condition = expr::is_match(
        &expr::resource_attribute("service.name"),
        "^unknown_service(:.+)?$",
    );
    transform(
        signal,
        vec![statements(
            [r#"delete_key(resource.attributes, "service.name")"#.to_string()],
            [condition],
        )],
    )
}

/// Spans recorded by the Istio proxy carry the service name of the proxy container. Dropping it
/// lets the backend fall back to the workload name.
pub fn drop_istio_proxy_service_enrichment() -> Processor {
    let condition = expr::join_with_and(&[
        r#"span.attributes["component"] == "proxy""#.to_string(),
        expr::resource_attribute_equals("service.name", "istio-proxy"),
    ]);
    transform(
        SignalType::Trace,
        vec![statements(
            [r#"delete_key(resource.attributes, "service.name")"#.to_string()],
            [condition],
        )],
    )
}

/// Rewrites the scope of metrics produced by the given receivers, stamping the configured
/// version. Prometheus metrics additionally get tagged with [KYMA_INPUT_NAME_ATTRIBUTE].
pub fn instrumentation_scope(version: &str, sources: &[ScopeSource]) -> Processor {
    let mut blocks = Vec::new();
    let mut scope_statements = Vec::new();
    for source in sources {
        let upstream = source.upstream_scope_name();
        scope_statements.push(format!(
            r#"set(scope.version, "{version}") where scope.name == "{upstream}""#
        ));
        scope_statements.push(format!(
            r#"set(scope.name, "{}") where scope.name == "{upstream}""#,
            source.scope_name()
        ));
        if *source == ScopeSource::Prometheus {
            blocks.push(statements(
                vec![format!(
                    r#"set({}, "{KYMA_INPUT_PROMETHEUS}")"#,
                    expr::resource_attribute(KYMA_INPUT_NAME_ATTRIBUTE)
                )],
                vec![],
            ));
        }
    }
    blocks.push(statements(scope_statements, vec![]));
    transform(SignalType::Metric, blocks)
}

/// Marks metrics about cluster objects, which are already enriched at the source.
pub fn insert_skip_enrichment_attribute() -> Processor {
    let conditions = ["node", "statefulset", "daemonset", "deployment", "job"]
        .iter()
        .map(|resource| expr::is_match("metric.name", &format!("^k8s.{resource}.*")))
        .collect::<Vec<_>>();
    transform(
        SignalType::Metric,
        vec![statements(
            vec![format!(
                r#"set({}, "true")"#,
                expr::resource_attribute(SKIP_ENRICHMENT_ATTRIBUTE)
            )],
            conditions,
        )],
    )
}

/// The pipeline's transforms in declaration order, or `None` when there are none.
pub fn user_defined_transform(signal: SignalType, specs: &[TransformSpec]) -> Option<Processor> {
    if specs.is_empty() {
        return None;
    }
    let blocks = specs
        .iter()
        .map(|spec| TransformStatements {
            statements: spec.statements.clone(),
            conditions: spec.conditions.clone(),
        })
        .collect();
    Some(transform(signal, blocks))
}

/// Flattens the conditions of every filter into one drop list.
pub fn user_defined_filter(signal: SignalType, specs: &[FilterSpec]) -> Option<Processor> {
    if specs.is_empty() {
        return None;
    }
    let conditions = specs
        .iter()
        .flat_map(|spec| spec.conditions.iter().cloned())
        .collect();
    Some(filter(signal, conditions))
}

fn filter(signal: SignalType, conditions: Vec<String>) -> Processor {
    let mut processor = FilterProcessor {
        error_mode: ERROR_MODE_IGNORE.to_string(),
        ..Default::default()
    };
    match signal {
        SignalType::Log => {
            processor.logs = Some(FilterLogs {
                log_record: conditions,
            })
        }
        SignalType::Metric => {
            processor.metrics = Some(FilterMetrics {
                metric: conditions,
                datapoint: Vec::new(),
            })
        }
        SignalType::Trace => {
            processor.traces = Some(FilterTraces {
                span: conditions,
                spanevent: Vec::new(),
            })
        }
    }
    Processor::Filter(processor)
}

fn metric_filter(conditions: Vec<String>) -> Processor {
    filter(SignalType::Metric, conditions)
}

/// Drop conditions for a namespace selector, the exclusion first. `source_condition` restricts
/// them to the records of one input; an empty string applies them to every record.
fn namespace_conditions(selector: &NamespaceSelector, source_condition: &str) -> Vec<String> {
    let mut conditions = Vec::new();
    if !selector.exclude.is_empty() {
        conditions.push(expr::join_with_and(&[
            source_condition.to_string(),
            expr::namespaces_match(&selector.exclude),
        ]));
    }
    if !selector.include.is_empty() {
        conditions.push(expr::join_with_and(&[
            source_condition.to_string(),
            expr::drop_unless_namespace_in(&selector.include),
        ]));
    }
    conditions
}

/// Log namespace filter, or `None` for an empty selector.
pub fn log_namespace_filter(selector: &NamespaceSelector) -> Option<Processor> {
    if selector.is_empty() {
        return None;
    }
    Some(filter(SignalType::Log, namespace_conditions(selector, "")))
}

/// Metric namespace filter limited to one input, or `None` for an empty selector.
pub fn metric_namespace_filter(
    selector: &NamespaceSelector,
    source: InputSource,
) -> Option<Processor> {
    if selector.is_empty() {
        return None;
    }
    Some(metric_filter(namespace_conditions(
        selector,
        &input_source_condition(source),
    )))
}

/// Condition matching metrics of an input. OTLP metrics are whatever no other input produced.
pub fn input_source_condition(source: InputSource) -> String {
    match source {
        InputSource::Runtime => expr::scope_name_equals(ScopeSource::Runtime.scope_name()),
        InputSource::Prometheus => {
            expr::resource_attribute_equals(KYMA_INPUT_NAME_ATTRIBUTE, KYMA_INPUT_PROMETHEUS)
        }
        InputSource::Istio => expr::scope_name_equals(ScopeSource::Istio.scope_name()),
        InputSource::Otlp => expr::not_any(&[
            input_source_condition(InputSource::Runtime),
            input_source_condition(InputSource::Prometheus),
            input_source_condition(InputSource::Istio),
            expr::scope_name_equals(ScopeSource::Kyma.scope_name()),
        ]),
    }
}

/// Drops every metric of an input the pipeline does not subscribe to.
pub fn drop_if_input_source(source: InputSource) -> Processor {
    metric_filter(vec![input_source_condition(source)])
}

pub fn drop_envoy_metrics() -> Processor {
    metric_filter(vec![expr::join_with_and(&[
        expr::is_match("name", "^envoy_.*"),
        expr::scope_name_equals(ScopeSource::Istio.scope_name()),
    ])])
}

fn runtime_resource_pattern(resource: RuntimeResource) -> &'static str {
    match resource {
        RuntimeResource::Pod => "^k8s.pod.*",
        RuntimeResource::Container => "(^k8s.container.*)|(^container.*)",
        RuntimeResource::Node => "^k8s.node.*",
        RuntimeResource::Volume => "^k8s.volume.*",
        RuntimeResource::Deployment => "^k8s.deployment.*",
        RuntimeResource::DaemonSet => "^k8s.daemonset.*",
        RuntimeResource::StatefulSet => "^k8s.statefulset.*",
        RuntimeResource::Job => "^k8s.job.*",
    }
}

/// Drops the runtime metrics of a resource kind turned off in the pipeline.
pub fn drop_runtime_resource_metrics(resource: RuntimeResource) -> Processor {
    metric_filter(vec![expr::join_with_and(&[
        input_source_condition(InputSource::Runtime),
        expr::is_match("name", runtime_resource_pattern(resource)),
    ])])
}

pub fn drop_diagnostic_metrics(source: InputSource) -> Processor {
    let names: Vec<String> = DIAGNOSTIC_METRIC_NAMES
        .iter()
        .map(|name| expr::name_attribute_equals(name))
        .collect();
    metric_filter(vec![expr::join_with_and(&[
        input_source_condition(source),
        expr::join_with_or(&names),
    ])])
}

/// Keeps the volume metrics of persistent volume claims only.
pub fn drop_non_pvc_volumes_metrics() -> Processor {
    metric_filter(vec![expr::join_with_and(&[
        expr::resource_attribute_is_not_nil("k8s.volume.name"),
        expr::resource_attribute_not_equals("k8s.volume.type", "persistentVolumeClaim"),
    ])])
}

/// Keeps node network data points of physical interfaces only.
pub fn drop_virtual_network_interfaces() -> Processor {
    Processor::Filter(FilterProcessor {
        error_mode: ERROR_MODE_IGNORE.to_string(),
        metrics: Some(FilterMetrics {
            metric: Vec::new(),
            datapoint: vec![expr::join_with_and(&[
                expr::is_match("metric.name", "^k8s.node.network.*"),
                expr::not(&expr::is_match(r#"attributes["interface"]"#, "^(eth|en).*")),
            ])],
        }),
        ..Default::default()
    })
}

/// Condition that holds for every log record, used to drop all OTLP logs.
pub fn drop_all_logs() -> Processor {
    filter(
        SignalType::Log,
        vec!["(log.observed_time != nil or log.time != nil)".to_string()],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[test]
    fn test_k8s_attributes_with_pod_labels() {
        let processor = k8s_attributes(&[
            PodLabel {
                key: Some("app".into()),
                key_prefix: None,
            },
            PodLabel {
                key: None,
                key_prefix: Some("team.io/".into()),
            },
        ]);

        assert_matches!(processor, Processor::K8sAttributes(p) => {
            assert_eq!(p.extract.metadata.len(), 8);
            assert_eq!(p.extract.labels.len(), 8);
            assert_eq!(p.extract.labels[0].tag_name, KYMA_K8S_IO_APP_NAME);
            assert_eq!(p.extract.labels[6].key_regex.as_deref(), Some("(^app$)"));
            assert_eq!(p.extract.labels[7].key_regex.as_deref(), Some("(team.io/.*)"));
            assert_eq!(p.extract.labels[7].tag_name, "k8s.pod.label.$0");
            let sources: Vec<_> = p.pod_association.iter().map(|a| a.sources[0].from.as_str()).collect();
            assert_eq!(sources, vec!["resource_attribute", "resource_attribute", "connection"]);
        });
    }

    #[rstest]
    #[case("", 2)]
    #[case("gcp", 3)]
    fn test_insert_cluster_attributes(#[case] provider: &str, #[case] expected: usize) {
        let cluster = ClusterInfo {
            name: "test".into(),
            uid: "uid".into(),
            cloud_provider: provider.into(),
        };
        assert_matches!(insert_cluster_attributes(&cluster), Processor::Resource(p) => {
            assert_eq!(p.attributes.len(), expected);
            assert!(p.attributes.iter().all(|a| a.action == "insert"));
        });
    }

    #[test]
    fn test_instrumentation_scope_prometheus_tags_input_first() {
        let processor = instrumentation_scope("1.0", &[ScopeSource::Prometheus]);
        assert_matches!(processor, Processor::Transform(p) => {
            assert_eq!(p.metric_statements.len(), 2);
            assert_eq!(
                p.metric_statements[0].statements,
                vec![r#"set(resource.attributes["kyma.input.name"], "prometheus")"#]
            );
            assert_eq!(
                p.metric_statements[1].statements[1],
                r#"set(scope.name, "io.kyma-project.telemetry/prometheus") where scope.name == "github.com/open-telemetry/opentelemetry-collector-contrib/receiver/prometheusreceiver""#
            );
        });
    }

    #[test]
    fn test_instrumentation_scope_runtime_covers_both_receivers() {
        let processor =
            instrumentation_scope("1.0", &[ScopeSource::Runtime, ScopeSource::K8sCluster]);
        assert_matches!(processor, Processor::Transform(p) => {
            assert_eq!(p.metric_statements.len(), 1);
            assert_eq!(p.metric_statements[0].statements.len(), 4);
            assert!(p.metric_statements[0].statements[0].starts_with(r#"set(scope.version, "1.0")"#));
        });
    }

    #[rstest]
    #[case(SignalType::Log)]
    #[case(SignalType::Metric)]
    #[case(SignalType::Trace)]
    fn test_user_defined_processors(#[case] signal: SignalType) {
        assert_eq!(user_defined_transform(signal, &[]), None);
        assert_eq!(user_defined_filter(signal, &[]), None);

        let filter = user_defined_filter(
            signal,
            &[
                FilterSpec {
                    conditions: vec!["a".into()],
                },
                FilterSpec {
                    conditions: vec!["b".into(), "c".into()],
                },
            ],
        )
        .unwrap();
        assert_matches!(filter, Processor::Filter(p) => {
            let conditions = match signal {
                SignalType::Log => p.logs.unwrap().log_record,
                SignalType::Metric => p.metrics.unwrap().metric,
                SignalType::Trace => p.traces.unwrap().span,
            };
            assert_eq!(conditions, vec!["a", "b", "c"]);
            assert_eq!(p.error_mode, "ignore");
        });
    }

    #[test]
    fn test_log_namespace_filter() {
        let selector = NamespaceSelector {
            include: vec!["default".into()],
            exclude: Vec::new(),
        };
        assert_matches!(log_namespace_filter(&selector), Some(Processor::Filter(p)) => {
            assert_eq!(
                p.logs.unwrap().log_record,
                vec![r#"resource.attributes["k8s.namespace.name"] != nil and not((resource.attributes["k8s.namespace.name"] == "default"))"#]
            );
        });
        assert_eq!(log_namespace_filter(&NamespaceSelector::default()), None);
    }

    #[test]
    fn test_metric_namespace_filter_exclude() {
        let selector = NamespaceSelector {
            include: Vec::new(),
            exclude: vec!["kube-system".into(), "kyma-system".into()],
        };
        assert_matches!(metric_namespace_filter(&selector, InputSource::Runtime), Some(Processor::Filter(p)) => {
            assert_eq!(
                p.metrics.unwrap().metric,
                vec![r#"scope.name == "io.kyma-project.telemetry/runtime" and (resource.attributes["k8s.namespace.name"] == "kube-system" or resource.attributes["k8s.namespace.name"] == "kyma-system")"#]
            );
        });
    }

    #[test]
    fn test_otlp_input_source_condition() {
        assert_eq!(
            input_source_condition(InputSource::Otlp),
            r#"not(scope.name == "io.kyma-project.telemetry/runtime" or resource.attributes["kyma.input.name"] == "prometheus" or scope.name == "io.kyma-project.telemetry/istio" or scope.name == "io.kyma-project.telemetry/kyma")"#
        );
    }

    #[rstest]
    #[case(RuntimeResource::Pod, r#"scope.name == "io.kyma-project.telemetry/runtime" and IsMatch(name, "^k8s.pod.*")"#)]
    #[case(RuntimeResource::Container, r#"scope.name == "io.kyma-project.telemetry/runtime" and IsMatch(name, "(^k8s.container.*)|(^container.*)")"#)]
    #[case(RuntimeResource::Job, r#"scope.name == "io.kyma-project.telemetry/runtime" and IsMatch(name, "^k8s.job.*")"#)]
    fn test_drop_runtime_resource_metrics(#[case] resource: RuntimeResource, #[case] expected: &str) {
        assert_matches!(drop_runtime_resource_metrics(resource), Processor::Filter(p) => {
            assert_eq!(p.metrics.unwrap().metric, vec![expected]);
        });
    }

    #[test]
    fn test_drop_diagnostic_metrics() {
        assert_matches!(drop_diagnostic_metrics(InputSource::Istio), Processor::Filter(p) => {
            assert_eq!(
                p.metrics.unwrap().metric,
                vec![r#"scope.name == "io.kyma-project.telemetry/istio" and (name == "up" or name == "scrape_duration_seconds" or name == "scrape_samples_scraped" or name == "scrape_samples_post_metric_relabeling" or name == "scrape_series_added")"#]
            );
        });
    }

    #[test]
    fn test_drop_virtual_network_interfaces() {
        assert_matches!(drop_virtual_network_interfaces(), Processor::Filter(p) => {
            let metrics = p.metrics.unwrap();
            assert!(metrics.metric.is_empty());
            assert_eq!(
                metrics.datapoint,
                vec![r#"IsMatch(metric.name, "^k8s.node.network.*") and not(IsMatch(attributes["interface"], "^(eth|en).*"))"#]
            );
        });
    }

    #[test]
    fn test_insert_skip_enrichment_attribute() {
        assert_matches!(insert_skip_enrichment_attribute(), Processor::Transform(p) => {
            assert_eq!(p.metric_statements[0].conditions.len(), 5);
            assert_eq!(
                p.metric_statements[0].statements,
                vec![r#"set(resource.attributes["io.kyma-project.telemetry.skip_enrichment"], "true")"#]
            );
        });
    }

    #[test]
    fn test_drop_kyma_attributes() {
        assert_matches!(drop_kyma_attributes(), Processor::Resource(p) => {
            assert_eq!(p.attributes[0].action, "delete");
            assert_eq!(p.attributes[0].key, None);
            assert_eq!(p.attributes[0].pattern.as_deref(), Some("kyma.*"));
        });
    }
}
