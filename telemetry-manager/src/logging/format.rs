use serde::Deserialize;

/// Custom timestamp format of log lines, in
/// [chrono strftime](https://docs.rs/chrono/latest/chrono/format/strftime/index.html) syntax.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct TimestampFormat(pub(crate) String);

impl Default for TimestampFormat {
    fn default() -> Self {
        Self("%Y-%m-%dT%H:%M:%S".to_string())
    }
}

/// Shape of every log line.
///
/// # Fields:
/// - `target`: whether the module emitting the event is printed.
/// - `timestamp`: the [TimestampFormat] of the line.
#[derive(Debug, Deserialize, PartialEq, Clone, Default)]
pub struct LoggingFormat {
    #[serde(default)]
    pub(crate) target: bool,
    #[serde(default)]
    pub(crate) timestamp: TimestampFormat,
}
