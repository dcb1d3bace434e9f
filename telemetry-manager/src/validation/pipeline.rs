use super::endpoint::{EndpointError, validate_endpoint, validate_security};
use super::tls::validate_tls;
use super::{AdmissionError, is_output_switch};
use crate::apis::log_pipeline::LogPipeline;
use crate::apis::metric_pipeline::{InputSource, MetricPipeline};
use crate::apis::shared::{
    FilterSpec, NamespaceSelector, OtlpOutput, OtlpProtocol, OutputKind, TransformSpec,
};
use crate::apis::trace_pipeline::TracePipeline;
use crate::config::MaxPipelines;
use crate::otelcol::secret::{SecretError, SecretReader, resolve_value};
use crate::ottl::{Signal, Validator};
use tracing::debug;

/// What admission needs to know about a pipeline resource.
pub trait Admissible {
    const SIGNAL: Signal;

    fn pipeline_name(&self) -> &str;

    /// Every output variant that is set.
    fn output_kinds(&self) -> Vec<OutputKind>;

    fn otlp(&self) -> Option<&OtlpOutput>;

    /// Namespace selectors by the name of the input they belong to.
    fn namespace_selectors(&self) -> Vec<(&'static str, &NamespaceSelector)>;

    fn transforms(&self) -> &[TransformSpec];

    fn filters(&self) -> &[FilterSpec];
}

impl Admissible for LogPipeline {
    const SIGNAL: Signal = Signal::Log;

    fn pipeline_name(&self) -> &str {
        self.name()
    }

    fn output_kinds(&self) -> Vec<OutputKind> {
        self.spec.output.kinds()
    }

    fn otlp(&self) -> Option<&OtlpOutput> {
        self.otlp_output()
    }

    fn namespace_selectors(&self) -> Vec<(&'static str, &NamespaceSelector)> {
        let runtime = self
            .spec
            .input
            .runtime
            .as_ref()
            .and_then(|i| i.namespaces.as_ref())
            .map(|s| ("runtime", s));
        let otlp = self
            .otlp_input()
            .and_then(|i| i.namespaces.as_ref())
            .map(|s| ("otlp", s));
        runtime.into_iter().chain(otlp).collect()
    }

    fn transforms(&self) -> &[TransformSpec] {
        &self.spec.transforms
    }

    fn filters(&self) -> &[FilterSpec] {
        &self.spec.filters
    }
}

impl Admissible for MetricPipeline {
    const SIGNAL: Signal = Signal::Metric;

    fn pipeline_name(&self) -> &str {
        self.name()
    }

    fn output_kinds(&self) -> Vec<OutputKind> {
        vec![OutputKind::Otlp]
    }

    fn otlp(&self) -> Option<&OtlpOutput> {
        Some(&self.spec.output.otlp)
    }

    fn namespace_selectors(&self) -> Vec<(&'static str, &NamespaceSelector)> {
        [
            InputSource::Runtime,
            InputSource::Prometheus,
            InputSource::Istio,
            InputSource::Otlp,
        ]
        .into_iter()
        .filter_map(|source| {
            self.namespace_selector(source)
                .map(|selector| (source.as_str(), selector))
        })
        .collect()
    }

    fn transforms(&self) -> &[TransformSpec] {
        &self.spec.transforms
    }

    fn filters(&self) -> &[FilterSpec] {
        &self.spec.filters
    }
}

impl Admissible for TracePipeline {
    const SIGNAL: Signal = Signal::Trace;

    fn pipeline_name(&self) -> &str {
        self.name()
    }

    fn output_kinds(&self) -> Vec<OutputKind> {
        vec![OutputKind::Otlp]
    }

    fn otlp(&self) -> Option<&OtlpOutput> {
        Some(&self.spec.output.otlp)
    }

    fn namespace_selectors(&self) -> Vec<(&'static str, &NamespaceSelector)> {
        Vec::new()
    }

    fn transforms(&self) -> &[TransformSpec] {
        &self.spec.transforms
    }

    fn filters(&self) -> &[FilterSpec] {
        &self.spec.filters
    }
}

/// Runs the admission checks. Secrets referenced by outputs are read through `reader`.
pub struct PipelineValidator<'a> {
    reader: &'a dyn SecretReader,
    max_pipelines: MaxPipelines,
}

impl<'a> PipelineValidator<'a> {
    pub fn new(reader: &'a dyn SecretReader, max_pipelines: MaxPipelines) -> Self {
        Self {
            reader,
            max_pipelines,
        }
    }

    /// Validates `pipeline` against the pipelines of its kind already in the cluster. An
    /// existing pipeline with the same name is the previous version of `pipeline`.
    pub async fn validate<P: Admissible>(
        &self,
        pipeline: &P,
        existing: &[P],
    ) -> Result<(), AdmissionError> {
        debug!(
            pipeline = pipeline.pipeline_name(),
            signal = P::SIGNAL.as_str(),
            "validating pipeline"
        );
        let previous = existing
            .iter()
            .find(|p| p.pipeline_name() == pipeline.pipeline_name());

        self.validate_count(pipeline, existing)?;
        let kind = validate_output_kinds(pipeline)?;
        if let Some(previous_kind) = previous.and_then(|p| p.output_kinds().first().copied()) {
            if is_output_switch(previous_kind, kind) {
                return Err(AdmissionError::OutputSwitch {
                    from: previous_kind.as_str(),
                    to: kind.as_str(),
                });
            }
        }
        validate_namespace_selectors(pipeline)?;
        if let Some(output) = pipeline.otlp() {
            self.validate_otlp_output(output).await?;
        }

        let validator = Validator::new(P::SIGNAL);
        validator.validate_transforms(pipeline.transforms())?;
        validator.validate_filters(pipeline.filters())?;
        Ok(())
    }

    fn validate_count<P: Admissible>(
        &self,
        pipeline: &P,
        existing: &[P],
    ) -> Result<(), AdmissionError> {
        let max = self.max_pipelines.for_signal(P::SIGNAL);
        let others = existing
            .iter()
            .filter(|p| p.pipeline_name() != pipeline.pipeline_name())
            .count();
        if others >= max {
            return Err(AdmissionError::MaxPipelinesExceeded {
                signal: P::SIGNAL,
                max,
            });
        }
        Ok(())
    }

    async fn validate_otlp_output(&self, output: &OtlpOutput) -> Result<(), AdmissionError> {
        for value in output.values() {
            let Some(reference) = value.referenced_secret() else {
                continue;
            };
            let has_literal = value.value.as_deref().is_some_and(|v| !v.is_empty());
            if !has_literal && !reference.is_complete() {
                return Err(AdmissionError::IncompleteSecretRef {
                    name: reference.name.clone(),
                });
            }
        }

        if output.explicit_path().is_some() && output.protocol != OtlpProtocol::Http {
            return Err(AdmissionError::PathRequiresHttp);
        }

        let endpoint = match resolve_value(self.reader, &output.endpoint).await {
            Ok(endpoint) => String::from_utf8_lossy(&endpoint).into_owned(),
            Err(SecretError::ValueUnresolvable) => return Err(EndpointError::Empty.into()),
            Err(err) => return Err(err.into()),
        };
        validate_endpoint(&endpoint, output.protocol)?;
        validate_security(output, &endpoint)?;

        if let Some(tls) = &output.tls {
            validate_tls(self.reader, tls).await?;
        }
        Ok(())
    }
}

fn validate_output_kinds<P: Admissible>(pipeline: &P) -> Result<OutputKind, AdmissionError> {
    match pipeline.output_kinds().as_slice() {
        [OutputKind::Loki] => Err(AdmissionError::UnsupportedLokiOutput),
        [kind] => Ok(*kind),
        kinds => Err(AdmissionError::OutputCount(kinds.len())),
    }
}

fn validate_namespace_selectors<P: Admissible>(pipeline: &P) -> Result<(), AdmissionError> {
    match pipeline
        .namespace_selectors()
        .into_iter()
        .find(|(_, s)| !s.include.is_empty() && !s.exclude.is_empty())
    {
        Some((input, _)) => Err(AdmissionError::NamespaceSelector(input)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apis::log_pipeline::LogPipelineSpec;
    use crate::apis::metric_pipeline::MetricPipelineSpec;
    use crate::apis::trace_pipeline::TracePipelineSpec;
    use crate::otelcol::secret::MockSecretReader;
    use crate::otelcol::secret::tests::{reader_with, secret_data};
    use crate::ottl::ValidationError;
    use crate::validation::tls::TlsError;
    use assert_matches::assert_matches;
    use rstest::rstest;

    fn log(name: &str, yaml: &str) -> LogPipeline {
        LogPipeline::new(name, serde_yaml::from_str::<LogPipelineSpec>(yaml).unwrap())
    }

    fn metric(name: &str, yaml: &str) -> MetricPipeline {
        MetricPipeline::new(name, serde_yaml::from_str::<MetricPipelineSpec>(yaml).unwrap())
    }

    fn trace(name: &str, yaml: &str) -> TracePipeline {
        TracePipeline::new(name, serde_yaml::from_str::<TracePipelineSpec>(yaml).unwrap())
    }

    const OTLP: &str = "output: {otlp: {endpoint: {value: 'https://backend:4317'}}}";

    fn max(n: usize) -> MaxPipelines {
        MaxPipelines {
            log: n,
            metric: n,
            trace: n,
        }
    }

    #[tokio::test]
    async fn test_minimal_pipelines_are_valid() {
        let reader = MockSecretReader::new();
        let validator = PipelineValidator::new(&reader, max(5));

        assert_matches!(validator.validate(&trace("t", OTLP), &[]).await, Ok(()));
        assert_matches!(validator.validate(&metric("m", OTLP), &[]).await, Ok(()));
        assert_matches!(validator.validate(&log("l", OTLP), &[]).await, Ok(()));
        assert_matches!(
            validator
                .validate(&log("l", "output: {custom: '[OUTPUT]'}"), &[])
                .await,
            Ok(())
        );
    }

    #[rstest]
    #[case("output: {}", 0)]
    #[case(
        "output: {custom: '[OUTPUT]', otlp: {endpoint: {value: 'https://backend:4317'}}}",
        2
    )]
    #[tokio::test]
    async fn test_output_count(#[case] yaml: &str, #[case] count: usize) {
        let reader = MockSecretReader::new();
        let validator = PipelineValidator::new(&reader, max(5));

        assert_matches!(
            validator.validate(&log("l", yaml), &[]).await,
            Err(AdmissionError::OutputCount(n)) => assert_eq!(n, count)
        );
    }

    #[tokio::test]
    async fn test_loki_output() {
        let reader = MockSecretReader::new();
        let validator = PipelineValidator::new(&reader, max(5));

        let err = validator
            .validate(&log("l", "output: {loki: {url: 'http://loki'}}"), &[])
            .await
            .unwrap_err();
        assert_matches!(err, AdmissionError::UnsupportedLokiOutput);
    }

    #[tokio::test]
    async fn test_output_switch_is_rejected() {
        let reader = MockSecretReader::new();
        let validator = PipelineValidator::new(&reader, max(5));
        let previous = log("l", "output: {http: {host: {value: 'backend'}}}");

        assert_matches!(
            validator.validate(&log("l", OTLP), &[previous.clone()]).await,
            Err(AdmissionError::OutputSwitch { from: "http", to: "otlp" })
        );
        assert_matches!(
            validator
                .validate(&log("l", "output: {custom: '[OUTPUT]'}"), &[previous])
                .await,
            Ok(())
        );
    }

    #[tokio::test]
    async fn test_other_pipeline_with_other_output_is_fine() {
        let reader = MockSecretReader::new();
        let validator = PipelineValidator::new(&reader, max(5));
        let other = log("other", "output: {custom: '[OUTPUT]'}");

        assert_matches!(validator.validate(&log("l", OTLP), &[other]).await, Ok(()));
    }

    #[tokio::test]
    async fn test_max_pipelines() {
        let reader = MockSecretReader::new();
        let validator = PipelineValidator::new(&reader, max(2));
        let existing = vec![trace("a", OTLP), trace("b", OTLP)];

        assert_matches!(
            validator.validate(&trace("c", OTLP), &existing).await,
            Err(AdmissionError::MaxPipelinesExceeded { signal: Signal::Trace, max: 2 })
        );
        // updates of an existing pipeline do not count twice
        assert_matches!(validator.validate(&trace("b", OTLP), &existing).await, Ok(()));
    }

    #[tokio::test]
    async fn test_namespace_selector_exclusivity() {
        let reader = MockSecretReader::new();
        let validator = PipelineValidator::new(&reader, max(5));
        let pipeline = metric(
            "m",
            r#"
input:
  prometheus:
    enabled: true
    namespaces: {include: [a], exclude: [b]}
output: {otlp: {endpoint: {value: 'https://backend:4317'}}}
"#,
        );

        assert_matches!(
            validator.validate(&pipeline, &[]).await,
            Err(AdmissionError::NamespaceSelector("prometheus"))
        );
    }

    #[tokio::test]
    async fn test_log_otlp_input_selector() {
        let reader = MockSecretReader::new();
        let validator = PipelineValidator::new(&reader, max(5));
        let pipeline = log(
            "l",
            r#"
input:
  otlp:
    namespaces: {include: [a], exclude: [b]}
output: {otlp: {endpoint: {value: 'https://backend:4317'}}}
"#,
        );

        assert_matches!(
            validator.validate(&pipeline, &[]).await,
            Err(AdmissionError::NamespaceSelector("otlp"))
        );
    }

    #[tokio::test]
    async fn test_incomplete_secret_ref() {
        let reader = MockSecretReader::new();
        let validator = PipelineValidator::new(&reader, max(5));
        let pipeline = trace(
            "t",
            r#"
output:
  otlp:
    endpoint:
      valueFrom: {secretKeyRef: {name: backend, key: endpoint}}
"#,
        );

        let err = validator.validate(&pipeline, &[]).await.unwrap_err();
        assert_matches!(&err, AdmissionError::IncompleteSecretRef { name } => assert_eq!(name, "backend"));
        assert_eq!(err.reason(), crate::status::Reason::ReferencedSecretMissing);
    }

    #[tokio::test]
    async fn test_endpoint_from_secret() {
        let reader = reader_with(vec![(
            "backend",
            "default",
            secret_data(&[("endpoint", "backend:4317")]),
        )]);
        let validator = PipelineValidator::new(&reader, max(5));
        let pipeline = trace(
            "t",
            r#"
output:
  otlp:
    endpoint:
      valueFrom: {secretKeyRef: {name: backend, namespace: default, key: endpoint}}
"#,
        );

        assert_matches!(validator.validate(&pipeline, &[]).await, Ok(()));
    }

    #[tokio::test]
    async fn test_missing_endpoint_secret() {
        let reader = reader_with(vec![]);
        let validator = PipelineValidator::new(&reader, max(5));
        let pipeline = trace(
            "t",
            r#"
output:
  otlp:
    endpoint:
      valueFrom: {secretKeyRef: {name: backend, namespace: default, key: endpoint}}
"#,
        );

        assert_matches!(
            validator.validate(&pipeline, &[]).await,
            Err(AdmissionError::Secret(SecretError::SecretNotFound { .. }))
        );
    }

    #[rstest]
    #[case("output: {otlp: {endpoint: {}}}", EndpointError::Empty)]
    #[case("output: {otlp: {endpoint: {value: 'backend'}}}", EndpointError::PortMissing)]
    #[case(
        "output: {otlp: {protocol: http, endpoint: {value: 'backend:4318'}}}",
        EndpointError::UnsupportedScheme
    )]
    #[case(
        r#"
output:
  otlp:
    endpoint: {value: 'backend:4317'}
    authentication:
      oauth2:
        tokenURL: {value: 'https://auth/token'}
        clientID: {value: id}
        clientSecret: {value: secret}
"#,
        EndpointError::OAuth2RequiresTls
    )]
    #[tokio::test]
    async fn test_invalid_endpoints(#[case] yaml: &str, #[case] expected: EndpointError) {
        let reader = MockSecretReader::new();
        let validator = PipelineValidator::new(&reader, max(5));

        assert_matches!(
            validator.validate(&trace("t", yaml), &[]).await,
            Err(AdmissionError::Endpoint(err)) => assert_eq!(err, expected)
        );
    }

    #[tokio::test]
    async fn test_path_requires_http() {
        let reader = MockSecretReader::new();
        let validator = PipelineValidator::new(&reader, max(5));
        let grpc = "output: {otlp: {path: /v2/otlp, endpoint: {value: 'https://backend:4317'}}}";
        let http = "output: {otlp: {protocol: http, path: /v2/otlp, endpoint: {value: 'https://backend'}}}";

        assert_matches!(
            validator.validate(&trace("t", grpc), &[]).await,
            Err(AdmissionError::PathRequiresHttp)
        );
        assert_matches!(validator.validate(&trace("t", http), &[]).await, Ok(()));
    }

    #[tokio::test]
    async fn test_invalid_tls() {
        let reader = MockSecretReader::new();
        let validator = PipelineValidator::new(&reader, max(5));
        let pipeline = trace(
            "t",
            r#"
output:
  otlp:
    endpoint: {value: 'https://backend:4317'}
    tls:
      cert: {value: 'cert'}
"#,
        );

        let err = validator.validate(&pipeline, &[]).await.unwrap_err();
        assert_matches!(err, AdmissionError::Tls(TlsError::IncompletePair));
        assert_eq!(err.reason(), crate::status::Reason::TlsConfigurationInvalid);
    }

    #[tokio::test]
    async fn test_invalid_ottl() {
        let reader = MockSecretReader::new();
        let validator = PipelineValidator::new(&reader, max(5));
        let transform = trace(
            "t",
            r#"
output: {otlp: {endpoint: {value: 'https://backend:4317'}}}
transforms:
  - statements: ['set(log.body, "x")']
"#,
        );
        let filter = log(
            "l",
            r#"
output: {otlp: {endpoint: {value: 'https://backend:4317'}}}
filters:
  - conditions: ['log.body']
"#,
        );

        assert_matches!(
            validator.validate(&transform, &[]).await,
            Err(AdmissionError::Ottl(ValidationError::InvalidTransformSpec(_)))
        );
        assert_matches!(
            validator.validate(&filter, &[]).await,
            Err(AdmissionError::Ottl(ValidationError::InvalidFilterSpec(_)))
        );
    }
}
