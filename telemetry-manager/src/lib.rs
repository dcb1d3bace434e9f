//! # Telemetry Manager library
//!
//! Compiles `LogPipeline`, `TracePipeline` and `MetricPipeline` resources into OpenTelemetry
//! Collector configurations, validates pipelines on admission and migrates stored resources to
//! the current API version. The `telemetry-manager` binary consumes this library.

pub mod apis;
pub mod cli;
pub mod config;
pub mod k8s;
pub mod logging;
pub mod otelcol;
pub mod ottl;
pub mod status;
pub mod storage_migration;
pub mod validation;
