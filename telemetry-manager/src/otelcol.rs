//! Compilation of pipeline resources into OpenTelemetry Collector configurations.
//!
//! Each signal builder takes the pipelines of its kind plus [BuildOptions] and returns a fresh
//! [config::Config] together with the [env_vars::EnvVars] the collector needs to resolve the
//! `${VAR}` references in it. No state is kept between builds.

pub mod builder;
pub mod config;
pub mod env_vars;
pub mod ids;
pub mod log_gateway;
pub mod metric_agent;
pub mod metric_components;
pub mod metric_gateway;
pub mod oauth2;
pub mod otlp_exporter;
pub mod processors;
pub mod secret;
pub mod tls;
pub mod trace_gateway;

use crate::apis::telemetry::{PodLabel, ServiceEnrichment, Telemetry};
use crate::status::Reason;
use crate::validation::endpoint::EndpointError;
use secret::SecretError;

/// Total number of batches every signal keeps queued, shared by its pipelines.
pub const MAX_QUEUE_SIZE: usize = 256;

/// Queue share of one pipeline out of `pipelines`, never below one.
pub fn queue_size(pipelines: usize) -> usize {
    (MAX_QUEUE_SIZE / pipelines.max(1)).max(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalType {
    Log,
    Metric,
    Trace,
}

impl SignalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Metric => "metric",
            Self::Trace => "trace",
        }
    }
}

/// Identity of the cluster stamped onto every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterInfo {
    pub name: String,
    pub uid: String,
    pub cloud_provider: String,
}

/// Cluster wide settings shared by every build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub cluster: ClusterInfo,
    pub service_enrichment: ServiceEnrichment,
    pub extract_pod_labels: Vec<PodLabel>,
    pub instrumentation_scope_version: String,
    pub agent_namespace: String,
    pub gateway_namespace: String,
    /// Istio runs in the cluster, so scrapes of meshed workloads need mTLS.
    pub istio_active: bool,
    pub istio_cert_path: String,
}

pub const DEFAULT_ISTIO_CERT_PATH: &str = "/etc/istio-output-certs";

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            cluster: ClusterInfo::default(),
            service_enrichment: ServiceEnrichment::default(),
            extract_pod_labels: Vec::new(),
            instrumentation_scope_version: String::new(),
            agent_namespace: "kyma-system".to_string(),
            gateway_namespace: "kyma-system".to_string(),
            istio_active: false,
            istio_cert_path: DEFAULT_ISTIO_CERT_PATH.to_string(),
        }
    }
}

impl BuildOptions {
    /// Applies the settings of the singleton [Telemetry] resource, when there is one.
    pub fn with_telemetry(mut self, telemetry: Option<&Telemetry>) -> Self {
        let Some(telemetry) = telemetry else {
            return self;
        };
        self.service_enrichment = telemetry.service_enrichment();
        self.extract_pod_labels = telemetry.extract_pod_labels().to_vec();
        if let Some(name) = telemetry.cluster_name().filter(|n| !n.is_empty()) {
            self.cluster.name = name.to_string();
        }
        self
    }
}

#[derive(thiserror::Error, Debug)]
pub enum BuildError {
    #[error("pipeline `{pipeline}`: {source}")]
    Secret {
        pipeline: String,
        #[source]
        source: SecretError,
    },

    #[error("pipeline `{pipeline}` has an invalid endpoint: {source}")]
    Endpoint {
        pipeline: String,
        #[source]
        source: EndpointError,
    },

    #[error("pipeline `{0}` has no OTLP output")]
    MissingOtlpOutput(String),
}

impl BuildError {
    /// Status reason the reconciler reports for the failed build.
    pub fn reason(&self) -> Reason {
        match self {
            Self::Secret { .. } => Reason::ReferencedSecretMissing,
            Self::Endpoint { .. } => Reason::EndpointInvalid,
            Self::MissingOtlpOutput(_) => Reason::EndpointInvalid,
        }
    }
}
