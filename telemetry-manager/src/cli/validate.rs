use super::error::CliError;
use super::{PipelineArgs, Target, parse_documents, read_file};
use crate::apis::log_pipeline::LogPipeline;
use crate::apis::metric_pipeline::MetricPipeline;
use crate::apis::trace_pipeline::TracePipeline;
use crate::config::ManagerConfig;
use crate::otelcol::secret::SecretReader;
use crate::validation::{Admissible, PipelineValidator};
use clap::Args;
use serde::de::DeserializeOwned;
use tracing::debug;

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

/// Admits the pipelines of the file one after the other, as if they were created in that order.
/// Returns one line per admitted pipeline and stops at the first rejected one.
pub async fn validate(
    args: &ValidateArgs,
    config: &ManagerConfig,
    reader: &dyn SecretReader,
) -> Result<Vec<String>, CliError> {
    let validator = PipelineValidator::new(reader, config.max_pipelines);
    let path = &args.pipeline.pipelines;
    let content = read_file(path)?;
    match args.pipeline.signal {
        Target::Log => admit::<LogPipeline>(&validator, parse_documents(path, &content)?).await,
        Target::Trace => {
            admit::<TracePipeline>(&validator, parse_documents(path, &content)?).await
        }
        Target::Metric | Target::MetricAgent => {
            admit::<MetricPipeline>(&validator, parse_documents(path, &content)?).await
        }
    }
}

async fn admit<P>(
    validator: &PipelineValidator<'_>,
    pipelines: Vec<P>,
) -> Result<Vec<String>, CliError>
where
    P: Admissible + DeserializeOwned,
{
    let mut admitted: Vec<P> = Vec::with_capacity(pipelines.len());
    let mut lines = Vec::with_capacity(pipelines.len());
    for pipeline in pipelines {
        validator
            .validate(&pipeline, &admitted)
            .await
            .map_err(|source| CliError::Admission {
                pipeline: pipeline.pipeline_name().to_string(),
                source,
            })?;
        debug!(pipeline = pipeline.pipeline_name(), "pipeline admitted");
        lines.push(format!("pipeline `{}` is valid", pipeline.pipeline_name()));
        match admitted
            .iter()
            .position(|p| p.pipeline_name() == pipeline.pipeline_name())
        {
            Some(i) => admitted[i] = pipeline,
            None => admitted.push(pipeline),
        }
    }
    Ok(lines)
}
