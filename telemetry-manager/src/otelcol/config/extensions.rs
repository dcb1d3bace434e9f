use super::exporters::TlsConfig;
use serde::Serialize;
use std::collections::BTreeMap;

pub const HEALTH_CHECK: &str = "health_check";
pub const PPROF: &str = "pprof";
pub const K8S_LEADER_ELECTOR: &str = "k8s_leader_elector";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Extension {
    Endpoint(EndpointExtension),
    OAuth2Client(OAuth2ClientExtension),
    K8sLeaderElector(K8sLeaderElectorExtension),
}

/// Health check and pprof only differ in their endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointExtension {
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OAuth2ClientExtension {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub endpoint_params: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct K8sLeaderElectorExtension {
    pub auth_type: String,
    pub lease_name: String,
    pub lease_namespace: String,
}
