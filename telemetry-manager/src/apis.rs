//! Custom resources read and written by the telemetry manager.
//!
//! Pipelines live in the `telemetry.kyma-project.io` group and are cluster scoped; the singleton
//! [telemetry::Telemetry] resource lives in `operator.kyma-project.io`.

pub mod log_pipeline;
pub mod metric_pipeline;
pub mod shared;
pub mod telemetry;
pub mod trace_pipeline;

/// Group of the pipeline resources.
pub const TELEMETRY_GROUP: &str = "telemetry.kyma-project.io";
/// Group of the [telemetry::Telemetry] resource.
pub const OPERATOR_GROUP: &str = "operator.kyma-project.io";
/// Version currently used to persist every managed resource.
pub const STORAGE_VERSION: &str = "v1beta1";
