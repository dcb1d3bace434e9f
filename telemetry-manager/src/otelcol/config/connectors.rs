use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Connector {
    Forward(ForwardConnector),
    Routing(RoutingConnector),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForwardConnector {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoutingConnector {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub default_pipelines: Vec<String>,
    pub error_mode: String,
    pub table: Vec<RoutingTableEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoutingTableEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    pub statement: String,
    pub pipelines: Vec<String>,
}
