//! Prometheus receivers of the metric agent.
//!
//! Annotated pods and services are scraped by the agent running on the same node. With Istio in
//! the cluster, every receiver carries a second `-secure` job scraping meshed targets over mTLS
//! with the certificates the proxy writes to `istio_cert_path`.
use crate::otelcol::BuildOptions;
use crate::otelcol::config::receivers::{
    DiscoveryRole, KubernetesDiscoveryConfig, PrometheusConfig, PrometheusReceiver, RelabelAction,
    RelabelConfig, ScrapeConfig, ScrapeTlsConfig,
};
use crate::otelcol::config::{ENV_NODE_NAME, Receiver, env_ref};
use std::path::Path;

const SCRAPE_INTERVAL: &str = "30s";
const SAMPLE_LIMIT: u32 = 50000;

const ISTIO_JOB: &str = "istio-proxy";
const ISTIO_METRICS_PATH: &str = "/stats/prometheus";

/// Kind of object a scrape target is discovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Pod,
    Service,
}

impl Target {
    fn job(&self) -> &'static str {
        match self {
            Self::Pod => "app-pods",
            Self::Service => "app-services",
        }
    }

    fn role(&self) -> DiscoveryRole {
        match self {
            Self::Pod => DiscoveryRole::Pod,
            Self::Service => DiscoveryRole::Endpoints,
        }
    }

    /// Meta label prefix carrying the node of the target.
    fn node_affiliated(&self) -> &'static str {
        match self {
            Self::Pod => "pod",
            Self::Service => "endpoint",
        }
    }

    /// Meta label prefix carrying the `prometheus.io/*` annotations.
    fn annotated(&self) -> &'static str {
        match self {
            Self::Pod => "pod",
            Self::Service => "service",
        }
    }
}

fn relabel(source: &[&str], action: RelabelAction, regex: Option<&str>) -> RelabelConfig {
    RelabelConfig {
        source_labels: source.iter().map(|s| s.to_string()).collect(),
        regex: regex.map(str::to_string),
        replacement: None,
        target_label: None,
        action,
    }
}

fn keep_matching(label: &str, regex: &str) -> RelabelConfig {
    relabel(&[label], RelabelAction::Keep, Some(regex))
}

fn drop_matching(label: &str, regex: &str) -> RelabelConfig {
    relabel(&[label], RelabelAction::Drop, Some(regex))
}

fn replace(source: &[&str], regex: Option<&str>, target: &str) -> RelabelConfig {
    RelabelConfig {
        target_label: Some(target.to_string()),
        ..relabel(source, RelabelAction::Replace, regex)
    }
}

fn keep_if_running_on_same_node(node_affiliated: &str) -> RelabelConfig {
    keep_matching(
        &format!("__meta_kubernetes_{node_affiliated}_node_name"),
        &env_ref(ENV_NODE_NAME),
    )
}

fn drop_if_pod_not_running() -> RelabelConfig {
    drop_matching("__meta_kubernetes_pod_phase", "Pending|Succeeded|Failed")
}

/// Relabeling of an annotated target. `require_https` selects the targets of the secure job:
/// meshed pods, unless annotated with `prometheus.io/scheme: http`, and vice versa.
fn target_relabel_configs(target: Target, require_https: bool) -> Vec<RelabelConfig> {
    let annotation = |name: &str| {
        format!(
            "__meta_kubernetes_{}_annotation_prometheus_io_{name}",
            target.annotated()
        )
    };

    let mut configs = vec![
        keep_if_running_on_same_node(target.node_affiliated()),
        keep_matching(&annotation("scrape"), "true"),
        drop_if_pod_not_running(),
        drop_matching("__meta_kubernetes_pod_container_init", "(true)"),
        drop_matching("__meta_kubernetes_pod_container_name", "(istio-proxy)"),
        RelabelConfig {
            replacement: Some("https".to_string()),
            ..replace(
                &["__meta_kubernetes_pod_label_security_istio_io_tlsMode"],
                Some("(istio)"),
                "__scheme__",
            )
        },
        replace(&[&annotation("scheme")], Some("(https?)"), "__scheme__"),
        drop_matching(
            "__scheme__",
            if require_https { "(http)" } else { "(https)" },
        ),
        replace(&[&annotation("path")], Some("(.+)"), "__metrics_path__"),
        RelabelConfig {
            replacement: Some("$$1:$$2".to_string()),
            ..replace(
                &["__address__", &annotation("port")],
                Some(r"([^:]+)(?::\d+)?;(\d+)"),
                "__address__",
            )
        },
    ];
    if target == Target::Service {
        configs.push(replace(&["__meta_kubernetes_service_name"], None, "service"));
    }
    configs
}

fn scrape_config(job_name: String, role: DiscoveryRole) -> ScrapeConfig {
    ScrapeConfig {
        job_name,
        sample_limit: SAMPLE_LIMIT,
        scrape_interval: SCRAPE_INTERVAL.to_string(),
        kubernetes_sd_configs: vec![KubernetesDiscoveryConfig { role }],
        ..Default::default()
    }
}

fn istio_tls_config(cert_path: &str) -> ScrapeTlsConfig {
    let file = |name: &str| Path::new(cert_path).join(name).to_string_lossy().into_owned();
    ScrapeTlsConfig {
        ca_file: file("root-cert.pem"),
        cert_file: file("cert-chain.pem"),
        key_file: file("key.pem"),
        insecure_skip_verify: true,
    }
}

fn annotated_targets(target: Target, options: &BuildOptions) -> Receiver {
    let mut scrape_configs = vec![ScrapeConfig {
        relabel_configs: target_relabel_configs(target, false),
        ..scrape_config(target.job().to_string(), target.role())
    }];
    if options.istio_active {
        scrape_configs.push(ScrapeConfig {
            relabel_configs: target_relabel_configs(target, true),
            tls_config: Some(istio_tls_config(&options.istio_cert_path)),
            ..scrape_config(format!("{}-secure", target.job()), target.role())
        });
    }
    Receiver::Prometheus(PrometheusReceiver {
        config: PrometheusConfig { scrape_configs },
    })
}

/// `prometheus/app-pods`: pods annotated with `prometheus.io/scrape: "true"`.
pub fn app_pods(options: &BuildOptions) -> Receiver {
    annotated_targets(Target::Pod, options)
}

/// `prometheus/app-services`: endpoints of services annotated with `prometheus.io/scrape: "true"`.
pub fn app_services(options: &BuildOptions) -> Receiver {
    annotated_targets(Target::Service, options)
}

/// `prometheus/istio`: the Istio proxies of the node. Envoy metrics are only kept when some
/// pipeline asks for them.
pub fn istio(envoy_metrics: bool) -> Receiver {
    let metric_names = if envoy_metrics {
        "envoy_.*|istio_.*"
    } else {
        "istio_.*"
    };
    Receiver::Prometheus(PrometheusReceiver {
        config: PrometheusConfig {
            scrape_configs: vec![ScrapeConfig {
                metrics_path: Some(ISTIO_METRICS_PATH.to_string()),
                relabel_configs: vec![
                    keep_if_running_on_same_node("pod"),
                    keep_matching("__meta_kubernetes_pod_container_name", "istio-proxy"),
                    keep_matching("__meta_kubernetes_pod_container_port_name", "http-envoy-prom"),
                    drop_if_pod_not_running(),
                ],
                metric_relabel_configs: vec![keep_matching("__name__", metric_names)],
                ..scrape_config(ISTIO_JOB.to_string(), DiscoveryRole::Pod)
            }],
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scrape_configs(receiver: Receiver) -> Vec<ScrapeConfig> {
        match receiver {
            Receiver::Prometheus(r) => r.config.scrape_configs,
            other => panic!("unexpected receiver {other:?}"),
        }
    }

    #[test]
    fn test_app_pods_without_istio() {
        let configs = scrape_configs(app_pods(&BuildOptions::default()));

        assert_eq!(configs.len(), 1);
        let job = &configs[0];
        assert_eq!(job.job_name, "app-pods");
        assert_eq!(job.sample_limit, 50000);
        assert_eq!(job.scrape_interval, "30s");
        assert_eq!(job.kubernetes_sd_configs[0].role, DiscoveryRole::Pod);
        assert_eq!(job.tls_config, None);
        assert_eq!(job.relabel_configs.len(), 10);
        assert_eq!(
            job.relabel_configs[0],
            keep_matching("__meta_kubernetes_pod_node_name", "${MY_NODE_NAME}")
        );
        assert_eq!(job.relabel_configs[7], drop_matching("__scheme__", "(https)"));
        assert_eq!(
            job.relabel_configs[9],
            RelabelConfig {
                source_labels: vec![
                    "__address__".into(),
                    "__meta_kubernetes_pod_annotation_prometheus_io_port".into()
                ],
                regex: Some(r"([^:]+)(?::\d+)?;(\d+)".into()),
                replacement: Some("$$1:$$2".into()),
                target_label: Some("__address__".into()),
                action: RelabelAction::Replace,
            }
        );
    }

    #[test]
    fn test_app_services_with_istio() {
        let options = BuildOptions {
            istio_active: true,
            istio_cert_path: "/etc/istio-output-certs".into(),
            ..Default::default()
        };
        let configs = scrape_configs(app_services(&options));

        assert_eq!(
            configs.iter().map(|c| c.job_name.as_str()).collect::<Vec<_>>(),
            vec!["app-services", "app-services-secure"]
        );
        let secure = &configs[1];
        assert_eq!(secure.kubernetes_sd_configs[0].role, DiscoveryRole::Endpoints);
        assert_eq!(
            secure.tls_config,
            Some(ScrapeTlsConfig {
                ca_file: "/etc/istio-output-certs/root-cert.pem".into(),
                cert_file: "/etc/istio-output-certs/cert-chain.pem".into(),
                key_file: "/etc/istio-output-certs/key.pem".into(),
                insecure_skip_verify: true,
            })
        );
        assert_eq!(secure.relabel_configs[0].source_labels, vec!["__meta_kubernetes_endpoint_node_name"]);
        assert_eq!(
            secure.relabel_configs[1].source_labels,
            vec!["__meta_kubernetes_service_annotation_prometheus_io_scrape"]
        );
        assert_eq!(secure.relabel_configs[7], drop_matching("__scheme__", "(http)"));
        assert_eq!(
            secure.relabel_configs.last(),
            Some(&replace(&["__meta_kubernetes_service_name"], None, "service"))
        );
    }

    #[test]
    fn test_istio_receiver() {
        let configs = scrape_configs(istio(false));

        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].job_name, "istio-proxy");
        assert_eq!(configs[0].metrics_path.as_deref(), Some("/stats/prometheus"));
        assert_eq!(configs[0].metric_relabel_configs, vec![keep_matching("__name__", "istio_.*")]);

        let configs = scrape_configs(istio(true));
        assert_eq!(
            configs[0].metric_relabel_configs,
            vec![keep_matching("__name__", "envoy_.*|istio_.*")]
        );
    }
}
