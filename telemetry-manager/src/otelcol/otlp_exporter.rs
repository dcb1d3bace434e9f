//! OTLP exporter of a pipeline and the variables its config references.
//!
//! Every value of the output ends up in an environment variable, literals included, so a rendered
//! config never carries credentials or endpoints inline.
use super::config::exporters::{
    Authenticator, OtlpExporter, RetryOnFailure, SendingQueue, TlsConfig,
};
use super::config::{Exporter, env_ref};
use super::env_vars::{EnvVars, Purpose, env_var_name};
use super::oauth2::{ExtensionBuild, build_extension};
use super::secret::{SecretReader, resolve, resolve_into, resolve_value};
use super::tls::sanitize_pair;
use super::{BuildError, SignalType, ids};
use crate::apis::shared::{OtlpOutput, OtlpProtocol, OutputTls};
use crate::validation::endpoint::validate_security;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

/// Result of [OtlpExporterBuilder::build].
#[derive(Debug, Clone, PartialEq)]
pub struct ExporterBuild {
    pub id: String,
    pub exporter: Exporter,
    pub env_vars: EnvVars,
    /// Authenticator extension the exporter points to.
    pub extension: Option<ExtensionBuild>,
}

pub struct OtlpExporterBuilder<'a> {
    reader: &'a dyn SecretReader,
    output: &'a OtlpOutput,
    pipeline: &'a str,
    queue_size: usize,
    signal: SignalType,
}

impl<'a> OtlpExporterBuilder<'a> {
    pub fn new(
        reader: &'a dyn SecretReader,
        output: &'a OtlpOutput,
        pipeline: &'a str,
        queue_size: usize,
        signal: SignalType,
    ) -> Self {
        Self {
            reader,
            output,
            pipeline,
            queue_size,
            signal,
        }
    }

    pub async fn build(&self) -> Result<ExporterBuild, BuildError> {
        debug!(pipeline = self.pipeline, signal = self.signal.as_str(), "building OTLP exporter");
        let mut env_vars = EnvVars::new();

        let endpoint = self.endpoint(&mut env_vars).await?;
        let mut exporter = OtlpExporter {
            headers: Default::default(),
            tls: self.tls(&mut env_vars, &endpoint).await?,
            sending_queue: SendingQueue {
                enabled: true,
                queue_size: self.queue_size,
            },
            retry_on_failure: RetryOnFailure::default(),
            ..Default::default()
        };

        let endpoint_ref = env_ref(&env_var_name(Purpose::OtlpEndpoint, self.pipeline, None));
        match (self.output.protocol, self.output.explicit_path()) {
            (OtlpProtocol::Http, Some(_)) => match self.signal {
                SignalType::Log => exporter.logs_endpoint = Some(endpoint_ref),
                SignalType::Metric => exporter.metrics_endpoint = Some(endpoint_ref),
                SignalType::Trace => exporter.traces_endpoint = Some(endpoint_ref),
            },
            _ => exporter.endpoint = Some(endpoint_ref),
        }

        self.headers(&mut exporter, &mut env_vars).await?;

        let extension = build_extension(self.reader, self.output, self.pipeline)
            .await
            .map_err(|source| self.secret_error(source))?;
        if let Some(extension) = &extension {
            exporter.auth = Some(Authenticator {
                authenticator: extension.id.clone(),
            });
        }

        Ok(ExporterBuild {
            id: ids::otlp_exporter(self.output.protocol, self.pipeline),
            exporter: Exporter::Otlp(exporter),
            env_vars,
            extension,
        })
    }

    /// Resolves the endpoint, appends the explicit path for HTTP and stores the result.
    async fn endpoint(&self, env_vars: &mut EnvVars) -> Result<String, BuildError> {
        let resolved = resolve(
            self.reader,
            &self.output.endpoint,
            Purpose::OtlpEndpoint,
            self.pipeline,
            None,
        )
        .await
        .map_err(|source| self.secret_error(source))?;
        let endpoint = String::from_utf8_lossy(&resolved.bytes).into_owned();

        validate_security(self.output, &endpoint).map_err(|source| BuildError::Endpoint {
            pipeline: self.pipeline.to_string(),
            source,
        })?;

        let value = match (self.output.protocol, self.output.explicit_path()) {
            (OtlpProtocol::Http, Some(path)) => join_path(&endpoint, path),
            _ => endpoint.clone(),
        };
        env_vars.insert(
            resolved.env_name_or(Purpose::OtlpEndpoint, self.pipeline, None),
            value.into_bytes(),
        );
        Ok(endpoint)
    }

    async fn headers(
        &self,
        exporter: &mut OtlpExporter,
        env_vars: &mut EnvVars,
    ) -> Result<(), BuildError> {
        if let Some(basic) = self.output.basic_auth() {
            let user = resolve_value(self.reader, &basic.user)
                .await
                .map_err(|source| self.secret_error(source))?;
            let password = resolve_value(self.reader, &basic.password)
                .await
                .map_err(|source| self.secret_error(source))?;
            let name = env_var_name(Purpose::BasicAuthHeader, self.pipeline, None);
            env_vars.insert(name.clone(), basic_auth_header(&user, &password).into_bytes());
            exporter
                .headers
                .insert("Authorization".to_string(), env_ref(&name));
        }

        for header in &self.output.headers {
            let value = resolve_value(self.reader, &header.value)
                .await
                .map_err(|source| self.secret_error(source))?;
            let value = match header.prefix.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
                Some(prefix) => [prefix.as_bytes(), b" ", &value].concat(),
                None => value,
            };
            let name = env_var_name(Purpose::Header, self.pipeline, Some(&header.name));
            env_vars.insert(name.clone(), value);
            exporter.headers.insert(header.name.clone(), env_ref(&name));
        }
        Ok(())
    }

    async fn tls(&self, env_vars: &mut EnvVars, endpoint: &str) -> Result<TlsConfig, BuildError> {
        let plain_http = endpoint.trim().to_ascii_lowercase().starts_with("http://");
        let Some(tls) = &self.output.tls else {
            return Ok(TlsConfig {
                insecure: plain_http,
                ..Default::default()
            });
        };
        if tls.insecure || plain_http {
            return Ok(TlsConfig {
                insecure: true,
                ..Default::default()
            });
        }

        let mut config = TlsConfig {
            insecure: false,
            insecure_skip_verify: tls.insecure_skip_verify,
            ..Default::default()
        };
        if let Some(ca) = tls.ca.as_ref().filter(|ca| !ca.is_empty()) {
            config.ca_pem = Some(
                resolve_into(self.reader, env_vars, ca, Purpose::TlsCaPem, self.pipeline, None)
                    .await
                    .map_err(|source| self.secret_error(source))?,
            );
        }
        if let Some((cert, key)) = self.client_pair(tls).await? {
            let (cert, key) = sanitize_pair(cert, key);
            let cert_name = env_var_name(Purpose::TlsCertPem, self.pipeline, None);
            let key_name = env_var_name(Purpose::TlsKeyPem, self.pipeline, None);
            config.cert_pem = Some(env_ref(&cert_name));
            config.key_pem = Some(env_ref(&key_name));
            env_vars.insert(cert_name, cert);
            env_vars.insert(key_name, key);
        }
        Ok(config)
    }

    /// Client certificate and key, only when both are set.
    async fn client_pair(&self, tls: &OutputTls) -> Result<Option<(Vec<u8>, Vec<u8>)>, BuildError> {
        let (Some(cert), Some(key)) = (
            tls.cert.as_ref().filter(|c| !c.is_empty()),
            tls.key.as_ref().filter(|k| !k.is_empty()),
        ) else {
            return Ok(None);
        };
        let cert = resolve_value(self.reader, cert)
            .await
            .map_err(|source| self.secret_error(source))?;
        let key = resolve_value(self.reader, key)
            .await
            .map_err(|source| self.secret_error(source))?;
        Ok(Some((cert, key)))
    }

    fn secret_error(&self, source: super::secret::SecretError) -> BuildError {
        BuildError::Secret {
            pipeline: self.pipeline.to_string(),
            source,
        }
    }
}

/// `endpoint/path` with exactly one slash in between.
fn join_path(endpoint: &str, path: &str) -> String {
    format!(
        "{}/{}",
        endpoint.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn basic_auth_header(user: &[u8], password: &[u8]) -> String {
    let mut credentials = user.to_vec();
    credentials.push(b':');
    credentials.extend_from_slice(password);
    format!("Basic {}", STANDARD.encode(credentials))
}
