//! `oauth2client` extension used as authenticator by OTLP exporters.
use super::config::exporters::TlsConfig;
use super::config::extensions::OAuth2ClientExtension;
use super::config::Extension;
use super::env_vars::{EnvVars, Purpose};
use super::ids;
use super::secret::{SecretError, SecretReader, resolve_into};
use crate::apis::shared::OtlpOutput;

/// An extension ready to be registered, with the variables it references.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionBuild {
    pub id: String,
    pub extension: Extension,
    pub env_vars: EnvVars,
}

/// Builds the extension of a pipeline. Returns `None` when the output does not use OAuth2.
pub async fn build_extension(
    reader: &dyn SecretReader,
    output: &OtlpOutput,
    pipeline: &str,
) -> Result<Option<ExtensionBuild>, SecretError> {
    let Some(oauth2) = output.oauth2() else {
        return Ok(None);
    };

    let mut env_vars = EnvVars::new();
    let token_url = resolve_into(
        reader,
        &mut env_vars,
        &oauth2.token_url,
        Purpose::OAuth2TokenUrl,
        pipeline,
        None,
    )
    .await?;
    let client_id = resolve_into(
        reader,
        &mut env_vars,
        &oauth2.client_id,
        Purpose::OAuth2ClientId,
        pipeline,
        None,
    )
    .await?;
    let client_secret = resolve_into(
        reader,
        &mut env_vars,
        &oauth2.client_secret,
        Purpose::OAuth2ClientSecret,
        pipeline,
        None,
    )
    .await?;

    let tls = output.tls.as_ref().map(|tls| TlsConfig {
        insecure: tls.insecure,
        insecure_skip_verify: tls.insecure_skip_verify,
        ..Default::default()
    });

    Ok(Some(ExtensionBuild {
        id: ids::oauth2_extension(pipeline),
        extension: Extension::OAuth2Client(OAuth2ClientExtension {
            token_url,
            client_id,
            client_secret,
            scopes: oauth2.scopes.clone(),
            endpoint_params: oauth2.params.clone(),
            tls,
        }),
        env_vars,
    }))
}
