//! Status conditions reported on pipeline resources and the state derived from them.
//!
//! The state is never persisted as a workflow: every reconcile computes the conditions for what it
//! observed ([conditions_for]) and readers derive the [PipelineState] back from them
//! ([PipelineState::from_conditions]).
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionType {
    ConfigurationGenerated,
    AgentHealthy,
    GatewayHealthy,
    TelemetryFlowHealthy,
}

impl ConditionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigurationGenerated => "ConfigurationGenerated",
            Self::AgentHealthy => "AgentHealthy",
            Self::GatewayHealthy => "GatewayHealthy",
            Self::TelemetryFlowHealthy => "TelemetryFlowHealthy",
        }
    }
}

/// Stable reason tokens used in conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reason {
    AgentConfigured,
    GatewayConfigured,
    ReferencedSecretMissing,
    UnsupportedLokiOutput,
    EndpointInvalid,
    TlsConfigurationInvalid,
    TlsCertificateExpired,
    OttlSpecInvalid,
    MaxPipelinesExceeded,
    AgentNotReady,
    AgentReady,
    GatewayNotReady,
    GatewayReady,
    FlowHealthy,
    SelfMonConfigNotGenerated,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AgentConfigured => "AgentConfigured",
            Self::GatewayConfigured => "GatewayConfigured",
            Self::ReferencedSecretMissing => "ReferencedSecretMissing",
            Self::UnsupportedLokiOutput => "UnsupportedLokiOutput",
            Self::EndpointInvalid => "EndpointInvalid",
            Self::TlsConfigurationInvalid => "TLSConfigurationInvalid",
            Self::TlsCertificateExpired => "TLSCertificateExpired",
            Self::OttlSpecInvalid => "OTTLSpecInvalid",
            Self::MaxPipelinesExceeded => "MaxPipelinesExceeded",
            Self::AgentNotReady => "AgentNotReady",
            Self::AgentReady => "AgentReady",
            Self::GatewayNotReady => "GatewayNotReady",
            Self::GatewayReady => "GatewayReady",
            Self::FlowHealthy => "FlowHealthy",
            Self::SelfMonConfigNotGenerated => "SelfMonConfigNotGenerated",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        [
            Self::AgentConfigured,
            Self::GatewayConfigured,
            Self::ReferencedSecretMissing,
            Self::UnsupportedLokiOutput,
            Self::EndpointInvalid,
            Self::TlsConfigurationInvalid,
            Self::TlsCertificateExpired,
            Self::OttlSpecInvalid,
            Self::MaxPipelinesExceeded,
            Self::AgentNotReady,
            Self::AgentReady,
            Self::GatewayNotReady,
            Self::GatewayReady,
            Self::FlowHealthy,
            Self::SelfMonConfigNotGenerated,
        ]
        .into_iter()
        .find(|r| r.as_str() == s)
    }
}

impl Display for Reason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConditionStatus {
    True,
    False,
    #[default]
    Unknown,
}

/// A status condition as stored on the pipeline resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: ConditionStatus,
    pub reason: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl Condition {
    pub fn new(
        type_: ConditionType,
        status: ConditionStatus,
        reason: Reason,
        message: impl Into<String>,
        observed_generation: i64,
    ) -> Self {
        Self {
            type_: type_.as_str().to_string(),
            status,
            reason: reason.as_str().to_string(),
            message: message.into(),
            observed_generation: Some(observed_generation),
        }
    }

    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

/// Replaces the condition of the same type or appends it.
pub fn set_condition(conditions: &mut Vec<Condition>, condition: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) => *existing = condition,
        None => conditions.push(condition),
    }
}

pub fn find_condition(conditions: &[Condition], type_: ConditionType) -> Option<&Condition> {
    conditions.iter().find(|c| c.type_ == type_.as_str())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workload {
    Agent,
    Gateway,
}

impl Workload {
    fn condition_type(&self) -> ConditionType {
        match self {
            Self::Agent => ConditionType::AgentHealthy,
            Self::Gateway => ConditionType::GatewayHealthy,
        }
    }

    fn ready_reason(&self) -> Reason {
        match self {
            Self::Agent => Reason::AgentReady,
            Self::Gateway => Reason::GatewayReady,
        }
    }

    fn not_ready_reason(&self) -> Reason {
        match self {
            Self::Agent => Reason::AgentNotReady,
            Self::Gateway => Reason::GatewayNotReady,
        }
    }

    fn configured_reason(&self) -> Reason {
        match self {
            Self::Agent => Reason::AgentConfigured,
            Self::Gateway => Reason::GatewayConfigured,
        }
    }
}

/// Why a configuration could not be generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationProblem {
    pub reason: Reason,
    pub message: String,
}

impl ConfigurationProblem {
    pub fn new(reason: Reason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

/// What a reconcile saw for one pipeline and one workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub generation: i64,
    pub workload: Workload,
    pub configuration: Result<(), ConfigurationProblem>,
    pub workload_ready: bool,
}

/// Computes the conditions describing an observation.
pub fn conditions_for(observation: &Observation) -> Vec<Condition> {
    let generation = observation.generation;
    let workload = observation.workload;

    let configuration = match &observation.configuration {
        Ok(()) => Condition::new(
            ConditionType::ConfigurationGenerated,
            ConditionStatus::True,
            workload.configured_reason(),
            "",
            generation,
        ),
        Err(problem) => Condition::new(
            ConditionType::ConfigurationGenerated,
            ConditionStatus::False,
            problem.reason,
            problem.message.clone(),
            generation,
        ),
    };

    let health = if observation.workload_ready {
        Condition::new(
            workload.condition_type(),
            ConditionStatus::True,
            workload.ready_reason(),
            "",
            generation,
        )
    } else {
        Condition::new(
            workload.condition_type(),
            ConditionStatus::False,
            workload.not_ready_reason(),
            "",
            generation,
        )
    };

    let flow = if configuration.is_true() && health.is_true() {
        Condition::new(
            ConditionType::TelemetryFlowHealthy,
            ConditionStatus::True,
            Reason::FlowHealthy,
            "",
            generation,
        )
    } else {
        Condition::new(
            ConditionType::TelemetryFlowHealthy,
            ConditionStatus::Unknown,
            Reason::SelfMonConfigNotGenerated,
            "",
            generation,
        )
    };

    vec![configuration, health, flow]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingReason {
    ReferencedSecretMissing,
    UnsupportedLokiOutput,
    AgentNotReady,
    GatewayNotReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningReason {
    AgentReady,
    GatewayReady,
}

/// Externally visible state of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Pending(PendingReason),
    Running(RunningReason),
    Deleting,
    /// Conditions do not match any known state, e.g. before the first reconcile.
    Unknown,
}

impl PipelineState {
    /// Derives the state. A set deletion timestamp always wins.
    pub fn from_conditions(conditions: &[Condition], deleting: bool) -> Self {
        if deleting {
            return Self::Deleting;
        }

        if let Some(generated) = find_condition(conditions, ConditionType::ConfigurationGenerated)
            && !generated.is_true()
        {
            match Reason::parse(&generated.reason) {
                Some(Reason::ReferencedSecretMissing) => {
                    return Self::Pending(PendingReason::ReferencedSecretMissing);
                }
                Some(Reason::UnsupportedLokiOutput) => {
                    return Self::Pending(PendingReason::UnsupportedLokiOutput);
                }
                _ => {}
            }
        }

        for workload in [Workload::Gateway, Workload::Agent] {
            let Some(health) = find_condition(conditions, workload.condition_type()) else {
                continue;
            };
            return match (workload, health.is_true()) {
                (Workload::Gateway, true) => Self::Running(RunningReason::GatewayReady),
                (Workload::Gateway, false) => Self::Pending(PendingReason::GatewayNotReady),
                (Workload::Agent, true) => Self::Running(RunningReason::AgentReady),
                (Workload::Agent, false) => Self::Pending(PendingReason::AgentNotReady),
            };
        }

        Self::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn observation(
        workload: Workload,
        configuration: Result<(), ConfigurationProblem>,
        ready: bool,
    ) -> Observation {
        Observation {
            generation: 3,
            workload,
            configuration,
            workload_ready: ready,
        }
    }

    #[test]
    fn test_conditions_for_healthy_gateway() {
        let conditions = conditions_for(&observation(Workload::Gateway, Ok(()), true));

        assert_eq!(conditions.len(), 3);
        assert_eq!(conditions[0].type_, "ConfigurationGenerated");
        assert_eq!(conditions[0].reason, "GatewayConfigured");
        assert_eq!(conditions[1].type_, "GatewayHealthy");
        assert!(conditions[1].is_true());
        assert_eq!(conditions[2].reason, "FlowHealthy");
        assert!(conditions.iter().all(|c| c.observed_generation == Some(3)));
    }

    #[test]
    fn test_conditions_for_missing_secret() {
        let problem = ConfigurationProblem::new(
            Reason::ReferencedSecretMissing,
            "one or more referenced Secrets are missing",
        );
        let conditions = conditions_for(&observation(Workload::Agent, Err(problem), true));

        assert_eq!(conditions[0].status, ConditionStatus::False);
        assert_eq!(conditions[0].reason, "ReferencedSecretMissing");
        assert_eq!(conditions[2].status, ConditionStatus::Unknown);
    }

    #[rstest]
    #[case::gateway_ready(Workload::Gateway, Ok(()), true, PipelineState::Running(RunningReason::GatewayReady))]
    #[case::gateway_not_ready(Workload::Gateway, Ok(()), false, PipelineState::Pending(PendingReason::GatewayNotReady))]
    #[case::agent_ready(Workload::Agent, Ok(()), true, PipelineState::Running(RunningReason::AgentReady))]
    #[case::agent_not_ready(Workload::Agent, Ok(()), false, PipelineState::Pending(PendingReason::AgentNotReady))]
    #[case::secret_missing(
        Workload::Gateway,
        Err(ConfigurationProblem::new(Reason::ReferencedSecretMissing, "")),
        true,
        PipelineState::Pending(PendingReason::ReferencedSecretMissing)
    )]
    #[case::loki(
        Workload::Agent,
        Err(ConfigurationProblem::new(Reason::UnsupportedLokiOutput, "")),
        true,
        PipelineState::Pending(PendingReason::UnsupportedLokiOutput)
    )]
    fn test_state_round_trip(
        #[case] workload: Workload,
        #[case] configuration: Result<(), ConfigurationProblem>,
        #[case] ready: bool,
        #[case] expected: PipelineState,
    ) {
        let conditions = conditions_for(&observation(workload, configuration, ready));
        assert_eq!(PipelineState::from_conditions(&conditions, false), expected);
    }

    #[test]
    fn test_deleting_wins() {
        let conditions = conditions_for(&observation(Workload::Gateway, Ok(()), true));
        assert_eq!(
            PipelineState::from_conditions(&conditions, true),
            PipelineState::Deleting
        );
        assert_eq!(PipelineState::from_conditions(&[], false), PipelineState::Unknown);
    }

    #[test]
    fn test_set_condition_replaces_same_type() {
        let mut conditions = conditions_for(&observation(Workload::Gateway, Ok(()), false));
        set_condition(
            &mut conditions,
            Condition::new(
                ConditionType::GatewayHealthy,
                ConditionStatus::True,
                Reason::GatewayReady,
                "",
                4,
            ),
        );

        assert_eq!(conditions.len(), 3);
        let health = find_condition(&conditions, ConditionType::GatewayHealthy).unwrap();
        assert_eq!(health.observed_generation, Some(4));
        assert!(health.is_true());
    }
}
