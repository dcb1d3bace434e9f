use super::error::CliError;
use super::{PipelineArgs, Target, parse_documents, read_file};
use crate::apis::telemetry::Telemetry;
use crate::config::ManagerConfig;
use crate::otelcol::config::Config;
use crate::otelcol::env_vars::EnvVars;
use crate::otelcol::secret::SecretReader;
use crate::otelcol::{log_gateway, metric_agent, metric_gateway, trace_gateway};
use clap::Args;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    /// YAML file with the `Telemetry` resource
    #[arg(long)]
    pub telemetry: Option<PathBuf>,
}

/// Builds the collector configuration and returns it as YAML, followed by a comment naming the
/// environment variables the collector needs. Values are never printed.
pub async fn render(
    args: &RenderArgs,
    config: &ManagerConfig,
    reader: &dyn SecretReader,
) -> Result<String, CliError> {
    let telemetry = match &args.telemetry {
        Some(path) => parse_documents::<Telemetry>(path, &read_file(path)?)?
            .into_iter()
            .next(),
        None => None,
    };
    let options = config.build_options().with_telemetry(telemetry.as_ref());

    let path = &args.pipeline.pipelines;
    let content = read_file(path)?;
    let (collector_config, env_vars) = match args.pipeline.signal {
        Target::Log => {
            let pipelines = parse_documents(path, &content)?;
            log_gateway::Builder::new(reader)
                .build(&pipelines, &options)
                .await?
        }
        Target::Trace => {
            let pipelines = parse_documents(path, &content)?;
            trace_gateway::Builder::new(reader)
                .build(&pipelines, &options)
                .await?
        }
        Target::Metric => {
            let pipelines = parse_documents(path, &content)?;
            metric_gateway::Builder::new(reader)
                .build(&pipelines, &options)
                .await?
        }
        Target::MetricAgent => {
            let pipelines = parse_documents(path, &content)?;
            metric_agent::Builder::new(reader)
                .build(&pipelines, &options)
                .await?
        }
    };
    info!(
        signal = ?args.pipeline.signal,
        env_vars = env_vars.len(),
        "collector config built"
    );
    to_output(&collector_config, &env_vars)
}

fn to_output(config: &Config, env_vars: &EnvVars) -> Result<String, CliError> {
    let mut output = serde_yaml::to_string(config)?;
    if !env_vars.is_empty() {
        let names: Vec<&str> = env_vars.keys().map(String::as_str).collect();
        output.push_str(&format!("# environment: {}\n", names.join(", ")));
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::NoSecrets;
    use assert_matches::assert_matches;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    fn args(signal: Target, pipelines: &NamedTempFile, telemetry: Option<&NamedTempFile>) -> RenderArgs {
        RenderArgs {
            pipeline: PipelineArgs {
                signal,
                pipelines: pipelines.path().to_path_buf(),
                cluster_secrets: false,
            },
            telemetry: telemetry.map(|t| t.path().to_path_buf()),
        }
    }

    const TRACE_PIPELINE: &str = r#"
apiVersion: telemetry.kyma-project.io/v1beta1
kind: TracePipeline
metadata: {name: backend}
spec:
  output:
    otlp:
      endpoint: {value: 'https://backend:4317'}
"#;

    #[tokio::test]
    async fn test_render_trace_gateway() {
        let pipelines = file(TRACE_PIPELINE);
        let telemetry = file(
            r#"
apiVersion: operator.kyma-project.io/v1beta1
kind: Telemetry
metadata: {name: default, namespace: kyma-system}
spec:
  enrichments:
    cluster: {name: prod}
"#,
        );

        let output = render(
            &args(Target::Trace, &pipelines, Some(&telemetry)),
            &ManagerConfig::default(),
            &NoSecrets,
        )
        .await
        .unwrap();

        let rendered: serde_yaml::Value = serde_yaml::from_str(&output).unwrap();
        assert!(rendered["exporters"]["otlp/backend"].is_mapping());
        assert!(rendered["service"]["pipelines"]["traces/backend"].is_mapping());
        assert!(output.contains("prod"));
        assert!(output.ends_with("# environment: OTLP_ENDPOINT_BACKEND\n"));
        assert!(!output.contains("https://backend:4317"));
    }

    #[tokio::test]
    async fn test_render_missing_secret() {
        let pipelines = file(
            r#"
apiVersion: telemetry.kyma-project.io/v1beta1
kind: MetricPipeline
metadata: {name: backend}
spec:
  output:
    otlp:
      endpoint:
        valueFrom: {secretKeyRef: {name: backend, namespace: default, key: endpoint}}
"#,
        );

        assert_matches!(
            render(&args(Target::Metric, &pipelines, None), &ManagerConfig::default(), &NoSecrets).await,
            Err(CliError::Build(_))
        );
    }

    #[tokio::test]
    async fn test_render_wrong_kind_of_file() {
        let pipelines = file("spec: [");

        assert_matches!(
            render(&args(Target::Log, &pipelines, None), &ManagerConfig::default(), &NoSecrets).await,
            Err(CliError::Parse { .. })
        );
    }
}
