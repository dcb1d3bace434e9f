use crate::config::ConfigError;
use crate::k8s::error::K8sError;
use crate::logging::LoggingError;
use crate::otelcol::BuildError;
use crate::storage_migration::MigrationError;
use crate::validation::AdmissionError;
use std::process::ExitCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("could not load config: {0}")]
    Config(#[from] ConfigError),

    #[error("could not initialize logging: {0}")]
    Logging(#[from] LoggingError),

    #[error("could not read `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse `{path}`: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to create k8s client: {0}")]
    K8sClient(#[from] K8sError),

    #[error("failed to build collector config: {0}")]
    Build(#[from] BuildError),

    #[error("failed to print collector config: {0}")]
    Output(#[from] serde_yaml::Error),

    #[error("pipeline `{pipeline}` is invalid ({}): {source}", .source.reason())]
    Admission {
        pipeline: String,
        #[source]
        source: AdmissionError,
    },

    #[error("{0}")]
    Migration(#[from] MigrationError),
}

impl CliError {
    /// Converts the error to an exit code, following the
    /// [BSD exit codes](https://man.freebsd.org/cgi/man.cgi?query=sysexits&manpath=FreeBSD+4.3-RELEASE).
    pub fn to_exit_code(&self) -> ExitCode {
        match self {
            CliError::Config(_) => ExitCode::from(78),
            CliError::Read { .. } => ExitCode::from(66),
            CliError::Parse { .. } => ExitCode::from(65),
            CliError::K8sClient(_) => ExitCode::from(69),
            CliError::Logging(_) | CliError::Output(_) => ExitCode::from(70),
            CliError::Build(_) | CliError::Admission { .. } | CliError::Migration(_) => {
                ExitCode::from(1)
            }
        }
    }
}
