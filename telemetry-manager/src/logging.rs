//! Setup of the global [tracing] subscriber.
pub mod format;

use format::LoggingFormat;
use serde::Deserialize;
use std::str::FromStr;
use thiserror::Error;
use tracing::{Level, debug};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::PrettyFields;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Environment variable overriding the configured level, in `EnvFilter` directive syntax.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("init logging error: `{0}`")]
    TryInitError(String),
}

#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub(crate) format: LoggingFormat,
    #[serde(default)]
    pub(crate) level: LogLevel,
}

impl LoggingConfig {
    /// Installs the global subscriber. Fails when one is already installed.
    pub fn try_init(&self) -> Result<(), LoggingError> {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .with_target(self.format.target)
            .with_timer(ChronoLocal::new(self.format.timestamp.0.clone()))
            .fmt_fields(PrettyFields::new())
            .with_filter(self.logging_filter()?);

        tracing_subscriber::Registry::default()
            .with(console_layer)
            .try_init()
            .map_err(|err| {
                LoggingError::TryInitError(format!("unable to set global logging subscriber: {err}"))
            })?;

        debug!("Logging initialized successfully");
        Ok(())
    }

    /// Directive enabling the crate's events at the configured level.
    fn crate_directive(&self) -> Result<Directive, LoggingError> {
        let level = self.level.as_level().to_string().to_lowercase();
        format!("telemetry_manager={level}")
            .parse::<Directive>()
            .map_err(|err| LoggingError::TryInitError(format!("invalid level `{level}`: {err}")))
    }

    fn logging_filter(&self) -> Result<EnvFilter, LoggingError> {
        Ok(EnvFilter::builder()
            .with_default_directive(self.crate_directive()?)
            .with_env_var(LOG_LEVEL_ENV)
            .from_env_lossy())
    }
}

#[derive(Debug, PartialEq, Clone)]
pub(crate) struct LogLevel(Level);

impl LogLevel {
    fn as_level(&self) -> Level {
        self.0
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self(Level::INFO)
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value_str = String::deserialize(deserializer)?;
        Level::from_str(&value_str)
            .map(LogLevel)
            .map_err(serde::de::Error::custom)
    }
}
