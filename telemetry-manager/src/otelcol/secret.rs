//! Resolution of [ValueType]s into bytes, reading referenced Kubernetes secrets.
use super::config::env_ref;
use super::env_vars::{EnvVars, Purpose, env_var_name};
use crate::apis::shared::{Value, ValueType};
use crate::k8s::error::K8sError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::debug;

/// Decoded data of a secret, by key.
pub type SecretData = BTreeMap<String, Vec<u8>>;

/// Read access to secrets. Returns `None` when the secret does not exist.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretReader: Send + Sync {
    async fn get_secret(&self, name: &str, namespace: &str)
    -> Result<Option<SecretData>, K8sError>;
}

#[derive(thiserror::Error, Debug)]
pub enum SecretError {
    #[error("secret `{namespace}/{name}` not found")]
    SecretNotFound { name: String, namespace: String },

    #[error("key `{key}` missing in secret `{namespace}/{name}`")]
    KeyMissingInSecret {
        key: String,
        name: String,
        namespace: String,
    },

    #[error("either value or secret key reference must be defined")]
    ValueUnresolvable,

    #[error("failed to read secret: `{0}`")]
    Read(#[from] K8sError),
}

/// A resolved value. `env_name` is only set when the value came from a secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub bytes: Vec<u8>,
    pub env_name: Option<String>,
}

impl Resolved {
    /// Variable the value is stored under, naming literals the same way as references.
    pub fn env_name_or(&self, purpose: Purpose, pipeline: &str, header: Option<&str>) -> String {
        self.env_name
            .clone()
            .unwrap_or_else(|| env_var_name(purpose, pipeline, header))
    }
}

/// Resolves a value and names the variable it would be stored under if it came from a secret.
pub async fn resolve(
    reader: &dyn SecretReader,
    value: &ValueType,
    purpose: Purpose,
    pipeline: &str,
    header: Option<&str>,
) -> Result<Resolved, SecretError> {
    match value.to_value().ok_or(SecretError::ValueUnresolvable)? {
        Value::Literal(literal) => Ok(Resolved {
            bytes: literal.into_bytes(),
            env_name: None,
        }),
        Value::SecretRef {
            name,
            namespace,
            key,
        } => Ok(Resolved {
            bytes: read_key(reader, &name, &namespace, &key).await?,
            env_name: Some(env_var_name(purpose, pipeline, header)),
        }),
    }
}

/// Resolves a value into `env_vars` and returns the `${VAR}` reference to it.
pub async fn resolve_into(
    reader: &dyn SecretReader,
    env_vars: &mut EnvVars,
    value: &ValueType,
    purpose: Purpose,
    pipeline: &str,
    header: Option<&str>,
) -> Result<String, SecretError> {
    let resolved = resolve(reader, value, purpose, pipeline, header).await?;
    let name = resolved.env_name_or(purpose, pipeline, header);
    env_vars.insert(name.clone(), resolved.bytes);
    Ok(env_ref(&name))
}

/// Resolves a value into its bytes.
pub async fn resolve_value(
    reader: &dyn SecretReader,
    value: &ValueType,
) -> Result<Vec<u8>, SecretError> {
    match value.to_value().ok_or(SecretError::ValueUnresolvable)? {
        Value::Literal(literal) => Ok(literal.into_bytes()),
        Value::SecretRef {
            name,
            namespace,
            key,
        } => read_key(reader, &name, &namespace, &key).await,
    }
}

async fn read_key(
    reader: &dyn SecretReader,
    name: &str,
    namespace: &str,
    key: &str,
) -> Result<Vec<u8>, SecretError> {
    debug!(%name, %namespace, %key, "reading referenced secret");
    let mut data = reader
        .get_secret(name, namespace)
        .await?
        .ok_or_else(|| SecretError::SecretNotFound {
            name: name.to_string(),
            namespace: namespace.to_string(),
        })?;

    data.remove(key).ok_or_else(|| SecretError::KeyMissingInSecret {
        key: key.to_string(),
        name: name.to_string(),
        namespace: namespace.to_string(),
    })
}
