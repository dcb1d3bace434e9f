//! Admission checks over pipeline resources.
//!
//! [pipeline::PipelineValidator] runs every check against a new or updated pipeline, given the
//! pipelines of the same kind that already exist. The first failing check is reported.

pub mod endpoint;
pub mod pipeline;
pub mod tls;

use crate::apis::shared::OutputKind;
use crate::otelcol::secret::SecretError;
use crate::ottl::{Signal, ValidationError};
use crate::status::Reason;
use endpoint::EndpointError;
use tls::TlsError;

pub use pipeline::{Admissible, PipelineValidator};

#[derive(thiserror::Error, Debug)]
pub enum AdmissionError {
    #[error("exactly one output must be defined, found {0}")]
    OutputCount(usize),

    #[error("the loki output is not supported anymore")]
    UnsupportedLokiOutput,

    #[error("switching the output from `{from}` to `{to}` is not allowed")]
    OutputSwitch { from: &'static str, to: &'static str },

    #[error("namespace selector of input `{0}` can only define one of include or exclude")]
    NamespaceSelector(&'static str),

    #[error("secret reference `{name}` must define name, namespace and key")]
    IncompleteSecretRef { name: String },

    #[error("path is only available with the HTTP protocol")]
    PathRequiresHttp,

    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] EndpointError),

    #[error("invalid TLS configuration: {0}")]
    Tls(#[from] TlsError),

    #[error(transparent)]
    Ottl(#[from] ValidationError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("maximum number of {} pipelines reached: {max}", .signal.as_str())]
    MaxPipelinesExceeded { signal: Signal, max: usize },
}

impl AdmissionError {
    /// Status reason reported for a pipeline failing the check.
    pub fn reason(&self) -> Reason {
        match self {
            Self::UnsupportedLokiOutput => Reason::UnsupportedLokiOutput,
            Self::Endpoint(_) | Self::PathRequiresHttp => Reason::EndpointInvalid,
            Self::Tls(TlsError::Secret(_)) | Self::Secret(_) => Reason::ReferencedSecretMissing,
            Self::Tls(TlsError::Expired { .. }) => Reason::TlsCertificateExpired,
            Self::Tls(_) => Reason::TlsConfigurationInvalid,
            Self::Ottl(_) => Reason::OttlSpecInvalid,
            Self::MaxPipelinesExceeded { .. } => Reason::MaxPipelinesExceeded,
            Self::IncompleteSecretRef { .. } => Reason::ReferencedSecretMissing,
            Self::OutputCount(_) | Self::OutputSwitch { .. } | Self::NamespaceSelector(_) => {
                Reason::EndpointInvalid
            }
        }
    }
}

/// OTLP and non-OTLP outputs are translated by different components, so a pipeline may not
/// move between them.
pub fn is_output_switch(from: OutputKind, to: OutputKind) -> bool {
    (from == OutputKind::Otlp) != (to == OutputKind::Otlp)
}
