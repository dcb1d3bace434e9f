//! Manager configuration, read from a YAML file. Every field has a default, so an empty file is
//! a valid configuration.
use crate::k8s::client::ClientConfig;
use crate::logging::LoggingConfig;
use crate::otelcol::{BuildOptions, ClusterInfo, SignalType};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_NAMESPACE: &str = "kyma-system";
const DEFAULT_MAX_PIPELINES: usize = 5;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading config `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config: {0}")]
    Parse(#[from] serde_yaml::Error),
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct ManagerConfig {
    #[serde(default)]
    pub log: LoggingConfig,
    #[serde(default)]
    pub k8s: ClientConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default = "default_namespace")]
    pub gateway_namespace: String,
    #[serde(default = "default_namespace")]
    pub agent_namespace: String,
    /// Version stamped on the instrumentation scope of generated metrics.
    #[serde(default)]
    pub instrumentation_scope_version: String,
    #[serde(default)]
    pub max_pipelines: MaxPipelines,
    #[serde(default)]
    pub istio_active: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            log: LoggingConfig::default(),
            k8s: ClientConfig::default(),
            cluster: ClusterConfig::default(),
            gateway_namespace: default_namespace(),
            agent_namespace: default_namespace(),
            instrumentation_scope_version: String::new(),
            max_pipelines: MaxPipelines::default(),
            istio_active: false,
        }
    }
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Default)]
pub struct ClusterConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub cloud_provider: String,
}

/// Upper bound of pipelines per signal.
#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
pub struct MaxPipelines {
    #[serde(default = "default_max_pipelines")]
    pub log: usize,
    #[serde(default = "default_max_pipelines")]
    pub metric: usize,
    #[serde(default = "default_max_pipelines")]
    pub trace: usize,
}

fn default_max_pipelines() -> usize {
    DEFAULT_MAX_PIPELINES
}

impl Default for MaxPipelines {
    fn default() -> Self {
        Self {
            log: DEFAULT_MAX_PIPELINES,
            metric: DEFAULT_MAX_PIPELINES,
            trace: DEFAULT_MAX_PIPELINES,
        }
    }
}

impl MaxPipelines {
    pub fn for_signal(&self, signal: SignalType) -> usize {
        match signal {
            SignalType::Log => self.log,
            SignalType::Metric => self.metric,
            SignalType::Trace => self.trace,
        }
    }
}

impl ManagerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "loading config");
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        // an empty document deserializes to unit, not to an empty map
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Options shared by every build, before the `Telemetry` resource is applied.
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            cluster: ClusterInfo {
                name: self.cluster.name.clone(),
                uid: self.cluster.uid.clone(),
                cloud_provider: self.cluster.cloud_provider.clone(),
            },
            instrumentation_scope_version: self.instrumentation_scope_version.clone(),
            agent_namespace: self.agent_namespace.clone(),
            gateway_namespace: self.gateway_namespace.clone(),
            istio_active: self.istio_active,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_has_defaults() {
        let config = ManagerConfig::parse("").unwrap();
        assert_eq!(config, ManagerConfig::default());
        assert_eq!(config.gateway_namespace, "kyma-system");
        assert_eq!(config.max_pipelines.for_signal(SignalType::Trace), 5);
        assert_eq!(
            Duration::from(config.k8s.client_timeout),
            Duration::from_secs(295)
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
log:
  level: debug
k8s:
  client_timeout: 10s
cluster:
  name: prod
  uid: "1234"
  cloud_provider: gcp
gateway_namespace: telemetry
max_pipelines:
  metric: 3
istio_active: true
"#
        )
        .unwrap();

        let config = ManagerConfig::load(file.path()).unwrap();
        assert_eq!(config.gateway_namespace, "telemetry");
        assert_eq!(config.agent_namespace, "kyma-system");
        assert_eq!(
            config.max_pipelines,
            MaxPipelines {
                log: 5,
                metric: 3,
                trace: 5
            }
        );
        assert_eq!(
            Duration::from(config.k8s.client_timeout),
            Duration::from_secs(10)
        );

        let options = config.build_options();
        assert_eq!(options.cluster.name, "prod");
        assert_eq!(options.cluster.uid, "1234");
        assert_eq!(options.gateway_namespace, "telemetry");
        assert!(options.istio_active);
    }

    #[test]
    fn test_missing_file() {
        assert_matches!(
            ManagerConfig::load(Path::new("/does/not/exist.yaml")),
            Err(ConfigError::Read { .. })
        );
    }

    #[test]
    fn test_invalid_yaml() {
        assert_matches!(
            ManagerConfig::parse("max_pipelines: [1, 2]"),
            Err(ConfigError::Parse(_))
        );
    }
}
