//! Command line operations of the `telemetry-manager` binary.
pub mod error;
pub mod migrate;
pub mod render;
pub mod validate;

use crate::config::ManagerConfig;
use crate::k8s::client::AsyncK8sClient;
use crate::k8s::error::K8sError;
use crate::otelcol::SignalType;
use crate::otelcol::secret::{SecretData, SecretReader};
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand, ValueEnum};
use error::CliError;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Compiles telemetry pipelines into OpenTelemetry Collector configurations
#[derive(Parser, Debug)]
#[command(author, about, long_about = None)]
pub struct Cli {
    /// Path of the manager configuration file. Defaults apply when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub operation: Operation,
}

#[derive(Subcommand, Debug)]
pub enum Operation {
    /// Print the collector configuration built from pipeline resources
    Render(render::RenderArgs),

    /// Run the admission checks over pipeline resources
    Validate(validate::ValidateArgs),

    /// Rewrite stored resources of the old API version and drop it from the CRDs
    Migrate,
}

/// Collector a configuration is built for.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Log,
    Trace,
    Metric,
    MetricAgent,
}

impl Target {
    pub fn signal(&self) -> SignalType {
        match self {
            Target::Log => SignalType::Log,
            Target::Trace => SignalType::Trace,
            Target::Metric | Target::MetricAgent => SignalType::Metric,
        }
    }
}

/// Pipeline resources read from a file.
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    #[arg(long, value_enum)]
    pub signal: Target,

    /// YAML file with one or more pipeline resources, separated by `---`
    #[arg(long)]
    pub pipelines: PathBuf,

    /// Read referenced secrets from the cluster. Without it every referenced secret is missing.
    #[arg(long)]
    pub cluster_secrets: bool,
}

/// Runs the requested operation to completion.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => ManagerConfig::load(path)?,
        None => ManagerConfig::default(),
    };
    config.log.try_init()?;

    match cli.operation {
        Operation::Render(args) => {
            let reader = secret_reader(&config, &args.pipeline).await?;
            let rendered = render::render(&args, &config, reader.as_ref()).await?;
            println!("{rendered}");
            Ok(())
        }
        Operation::Validate(args) => {
            let reader = secret_reader(&config, &args.pipeline).await?;
            for line in validate::validate(&args, &config, reader.as_ref()).await? {
                println!("{line}");
            }
            Ok(())
        }
        Operation::Migrate => migrate::migrate(&config).await,
    }
}

async fn secret_reader(
    config: &ManagerConfig,
    args: &PipelineArgs,
) -> Result<Box<dyn SecretReader>, CliError> {
    if args.cluster_secrets {
        return Ok(Box::new(AsyncK8sClient::try_new(&config.k8s).await?));
    }
    Ok(Box::new(NoSecrets))
}

/// Reader used when the cluster is not consulted.
pub struct NoSecrets;

#[async_trait]
impl SecretReader for NoSecrets {
    async fn get_secret(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<SecretData>, K8sError> {
        warn!(%name, %namespace, "secrets are not read without --cluster-secrets");
        Ok(None)
    }
}

pub(crate) fn read_file(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.display().to_string(),
        source,
    })
}

/// Parses every document of a multi-document YAML file.
pub(crate) fn parse_documents<T: DeserializeOwned>(
    path: &Path,
    content: &str,
) -> Result<Vec<T>, CliError> {
    serde_yaml::Deserializer::from_str(content)
        .map(T::deserialize)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| CliError::Parse {
            path: path.display().to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::trace_pipeline::TracePipeline;
    use clap::CommandFactory;
    use tracing_test::traced_test;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_render() {
        let cli = Cli::try_parse_from([
            "telemetry-manager",
            "--config",
            "/etc/manager.yaml",
            "render",
            "--signal",
            "metric-agent",
            "--pipelines",
            "pipelines.yaml",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("/etc/manager.yaml")));
        let Operation::Render(args) = cli.operation else {
            panic!("expected render");
        };
        assert_eq!(args.pipeline.signal, Target::MetricAgent);
        assert_eq!(args.pipeline.signal.signal(), SignalType::Metric);
        assert!(!args.pipeline.cluster_secrets);
    }

    #[test]
    fn test_unknown_signal() {
        assert!(
            Cli::try_parse_from([
                "telemetry-manager",
                "validate",
                "--signal",
                "profiles",
                "--pipelines",
                "p.yaml"
            ])
            .is_err()
        );
    }

    #[test]
    fn test_parse_documents() {
        let content = r#"
apiVersion: telemetry.kyma-project.io/v1beta1
kind: TracePipeline
metadata: {name: a}
spec: {output: {otlp: {endpoint: {value: 'https://backend:4317'}}}}
---
apiVersion: telemetry.kyma-project.io/v1beta1
kind: TracePipeline
metadata: {name: b}
spec: {output: {otlp: {endpoint: {value: 'https://backend:4317'}}}}
"#;
        let pipelines: Vec<TracePipeline> =
            parse_documents(Path::new("p.yaml"), content).unwrap();
        assert_eq!(
            pipelines.iter().map(|p| p.name()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn test_no_secrets_reports_missing() {
        let secret = NoSecrets.get_secret("backend", "default").await.unwrap();

        assert!(secret.is_none());
        assert!(logs_contain("secrets are not read without --cluster-secrets"));
    }

    #[test]
    fn test_parse_documents_error() {
        let err = parse_documents::<TracePipeline>(Path::new("p.yaml"), "spec: [").unwrap_err();
        assert!(matches!(err, CliError::Parse { path, .. } if path == "p.yaml"));
    }
}
