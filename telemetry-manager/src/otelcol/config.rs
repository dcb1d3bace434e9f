//! Typed model of the collector configuration.
//!
//! Every component map is a [BTreeMap] keyed by component ID, so serializing the same graph
//! always yields the same document regardless of insertion order.
use serde::Serialize;
use std::collections::BTreeMap;

pub mod connectors;
pub mod exporters;
pub mod extensions;
pub mod processors;
pub mod receivers;

pub use connectors::Connector;
pub use exporters::Exporter;
pub use extensions::Extension;
pub use processors::Processor;
pub use receivers::Receiver;

pub const HEALTH_CHECK_PORT: u16 = 13133;
pub const PPROF_PORT: u16 = 1777;
pub const METRICS_PORT: u16 = 8888;
pub const OTLP_HTTP_PORT: u16 = 4318;
pub const OTLP_GRPC_PORT: u16 = 4317;
pub const OPENCENSUS_PORT: u16 = 55678;
pub const ENVOY_METRICS_PORT: u16 = 15090;

/// Environment variable holding the pod IP of the collector.
pub const ENV_POD_IP: &str = "MY_POD_IP";
/// Environment variable holding the node name of the collector.
pub const ENV_NODE_NAME: &str = "MY_NODE_NAME";
/// Environment variable with the soft memory limit of the collector runtime.
pub const ENV_GO_MEM_LIMIT: &str = "GOMEMLIMIT";

/// `${NAME}` reference resolved by the collector at startup.
pub fn env_ref(name: &str) -> String {
    format!("${{{name}}}")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub extensions: BTreeMap<String, Extension>,
    pub receivers: BTreeMap<String, Receiver>,
    pub processors: BTreeMap<String, Processor>,
    pub exporters: BTreeMap<String, Exporter>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub connectors: BTreeMap<String, Connector>,
    pub service: Service,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
    pub telemetry: Telemetry,
    pub extensions: Vec<String>,
    pub pipelines: BTreeMap<String, Pipeline>,
}

/// A service pipeline. Processor order is the execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Pipeline {
    pub receivers: Vec<String>,
    pub processors: Vec<String>,
    pub exporters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Telemetry {
    pub metrics: TelemetryMetrics,
    pub logs: TelemetryLogs,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryMetrics {
    pub readers: Vec<MetricReader>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReader {
    pub pull: PullMetricReader,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullMetricReader {
    pub exporter: PullExporter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PullExporter {
    pub prometheus: PrometheusPullExporter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrometheusPullExporter {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryLogs {
    pub level: String,
    pub encoding: String,
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            metrics: TelemetryMetrics {
                readers: vec![MetricReader {
                    pull: PullMetricReader {
                        exporter: PullExporter {
                            prometheus: PrometheusPullExporter {
                                host: env_ref(ENV_POD_IP),
                                port: METRICS_PORT,
                            },
                        },
                    },
                }],
            },
            logs: TelemetryLogs {
                level: "info".to_string(),
                encoding: "json".to_string(),
            },
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigRenderError {
    #[error("failed to render collector config: `{0}`")]
    Yaml(#[from] serde_yaml::Error),
}

impl Config {
    /// Base config shared by every collector: health check and pprof extensions plus the
    /// self-telemetry block.
    pub fn new() -> Self {
        let extensions = BTreeMap::from([
            (
                extensions::HEALTH_CHECK.to_string(),
                Extension::Endpoint(extensions::EndpointExtension {
                    endpoint: format!("{}:{HEALTH_CHECK_PORT}", env_ref(ENV_POD_IP)),
                }),
            ),
            (
                extensions::PPROF.to_string(),
                Extension::Endpoint(extensions::EndpointExtension {
                    endpoint: format!("127.0.0.1:{PPROF_PORT}"),
                }),
            ),
        ]);

        Self {
            service: Service {
                telemetry: Telemetry::default(),
                extensions: extensions.keys().cloned().collect(),
                pipelines: BTreeMap::new(),
            },
            extensions,
            receivers: BTreeMap::new(),
            processors: BTreeMap::new(),
            exporters: BTreeMap::new(),
            connectors: BTreeMap::new(),
        }
    }

    /// Adds an extension once and keeps `service.extensions` in sync.
    pub fn add_extension(&mut self, id: &str, extension: Extension) {
        if self.extensions.contains_key(id) {
            return;
        }
        self.extensions.insert(id.to_string(), extension);
        self.service.extensions = self.extensions.keys().cloned().collect();
    }

    pub fn to_yaml(&self) -> Result<String, ConfigRenderError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_config_yaml() {
        let yaml = Config::new().to_yaml().unwrap();
        let expected = r#"extensions:
  health_check:
    endpoint: ${MY_POD_IP}:13133
  pprof:
    endpoint: 127.0.0.1:1777
receivers: {}
processors: {}
exporters: {}
service:
  telemetry:
    metrics:
      readers:
      - pull:
          exporter:
            prometheus:
              host: ${MY_POD_IP}
              port: 8888
    logs:
      level: info
      encoding: json
  extensions:
  - health_check
  - pprof
  pipelines: {}
"#;
        assert_eq!(
            serde_yaml::from_str::<serde_yaml::Value>(&yaml).unwrap(),
            serde_yaml::from_str::<serde_yaml::Value>(expected).unwrap()
        );
        let positions: Vec<usize> = ["extensions:", "receivers:", "processors:", "exporters:", "service:"]
            .iter()
            .map(|key| yaml.find(key).unwrap())
            .collect();
        assert!(positions.is_sorted());
        assert!(!yaml.contains("connectors"));
    }

    #[test]
    fn test_add_extension_keeps_service_in_sync() {
        let mut config = Config::new();
        config.add_extension(
            "oauth2client/test",
            Extension::Endpoint(extensions::EndpointExtension {
                endpoint: "x".to_string(),
            }),
        );
        config.add_extension(
            "oauth2client/test",
            Extension::Endpoint(extensions::EndpointExtension {
                endpoint: "y".to_string(),
            }),
        );

        assert_eq!(
            config.service.extensions,
            vec!["health_check", "oauth2client/test", "pprof"]
        );
        assert_eq!(config.extensions.len(), 3);
    }
}
