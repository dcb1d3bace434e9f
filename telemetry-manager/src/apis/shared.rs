//! Types shared by the pipeline resources.
use serde::{Deserialize, Serialize};

/// A value given either inline or as a reference to a key of a Kubernetes secret.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<ValueFromSource>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueFromSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<SecretKeyRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeyRef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub key: String,
}

impl SecretKeyRef {
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.namespace.is_empty() && !self.key.is_empty()
    }
}

/// Resolved shape of a [ValueType].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Literal(String),
    SecretRef {
        name: String,
        namespace: String,
        key: String,
    },
}

impl ValueType {
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            value_from: None,
        }
    }

    pub fn secret_ref(
        name: impl Into<String>,
        namespace: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            value: None,
            value_from: Some(ValueFromSource {
                secret_key_ref: Some(SecretKeyRef {
                    name: name.into(),
                    namespace: namespace.into(),
                    key: key.into(),
                }),
            }),
        }
    }

    fn secret_key_ref(&self) -> Option<&SecretKeyRef> {
        self.value_from
            .as_ref()
            .and_then(|from| from.secret_key_ref.as_ref())
    }

    /// Returns the secret reference if one is set, complete or not.
    pub fn referenced_secret(&self) -> Option<&SecretKeyRef> {
        self.secret_key_ref()
    }

    /// Classifies the value. A non-empty literal wins over a reference; an explicitly empty
    /// literal is only used when no complete reference is present.
    /// Returns `None` when neither side is usable.
    pub fn to_value(&self) -> Option<Value> {
        match (self.value.as_deref(), self.secret_key_ref()) {
            (Some(literal), _) if !literal.is_empty() => Some(Value::Literal(literal.to_string())),
            (_, Some(reference)) if reference.is_complete() => Some(Value::SecretRef {
                name: reference.name.clone(),
                namespace: reference.namespace.clone(),
                key: reference.key.clone(),
            }),
            (Some(literal), None) => Some(Value::Literal(literal.to_string())),
            _ => None,
        }
    }

    /// True when the value carries nothing at all.
    pub fn is_empty(&self) -> bool {
        self.value.as_deref().is_none_or(str::is_empty) && self.secret_key_ref().is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtlpProtocol {
    #[default]
    Grpc,
    Http,
}

/// Output variants a pipeline can send to. Only logs support anything but OTLP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Otlp,
    Http,
    Custom,
    Loki,
}

impl OutputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Otlp => "otlp",
            Self::Http => "http",
            Self::Custom => "custom",
            Self::Loki => "loki",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtlpOutput {
    #[serde(default)]
    pub protocol: OtlpProtocol,
    #[serde(default)]
    pub endpoint: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<AuthenticationOptions>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Header>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<OutputTls>,
}

impl OtlpOutput {
    pub fn basic_auth(&self) -> Option<&BasicAuthOptions> {
        self.authentication.as_ref().and_then(|a| a.basic.as_ref())
    }

    pub fn oauth2(&self) -> Option<&OAuth2Options> {
        self.authentication.as_ref().and_then(|a| a.oauth2.as_ref())
    }

    /// Explicit path, ignoring an empty string.
    pub fn explicit_path(&self) -> Option<&str> {
        self.path.as_deref().filter(|p| !p.is_empty())
    }

    /// Every value of the output that may point to a secret.
    pub fn values(&self) -> Vec<&ValueType> {
        let mut values = vec![&self.endpoint];
        if let Some(basic) = self.basic_auth() {
            values.extend([&basic.user, &basic.password]);
        }
        if let Some(oauth2) = self.oauth2() {
            values.extend([&oauth2.token_url, &oauth2.client_id, &oauth2.client_secret]);
        }
        values.extend(self.headers.iter().map(|h| &h.value));
        if let Some(tls) = &self.tls {
            values.extend([&tls.ca, &tls.cert, &tls.key].into_iter().flatten());
        }
        values
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic: Option<BasicAuthOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth2: Option<OAuth2Options>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicAuthOptions {
    #[serde(default)]
    pub user: ValueType,
    #[serde(default)]
    pub password: ValueType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuth2Options {
    #[serde(default, rename = "tokenURL")]
    pub token_url: ValueType,
    #[serde(default, rename = "clientID")]
    pub client_id: ValueType,
    #[serde(default)]
    pub client_secret: ValueType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub params: std::collections::BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(flatten)]
    pub value: ValueType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputTls {
    #[serde(default)]
    pub insecure: bool,
    #[serde(default)]
    pub insecure_skip_verify: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca: Option<ValueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<ValueType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<ValueType>,
}

impl OutputTls {
    /// True when any of the PEM fields carries a value.
    pub fn has_material(&self) -> bool {
        [&self.ca, &self.cert, &self.key]
            .into_iter()
            .flatten()
            .any(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceSelector {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

impl NamespaceSelector {
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtlpInput {
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<NamespaceSelector>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statements: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::literal(ValueType::literal("abc"), Some(Value::Literal("abc".into())))]
    #[case::empty_literal(ValueType::literal(""), Some(Value::Literal("".into())))]
    #[case::secret(
        ValueType::secret_ref("s", "ns", "k"),
        Some(Value::SecretRef { name: "s".into(), namespace: "ns".into(), key: "k".into() })
    )]
    #[case::incomplete_secret(ValueType::secret_ref("s", "", "k"), None)]
    #[case::nothing(ValueType::default(), None)]
    fn test_to_value(#[case] value: ValueType, #[case] expected: Option<Value>) {
        assert_eq!(value.to_value(), expected);
    }

    #[test]
    fn test_empty_literal_defers_to_reference() {
        let value = ValueType {
            value: Some(String::new()),
            ..ValueType::secret_ref("s", "ns", "k")
        };
        assert_matches::assert_matches!(value.to_value(), Some(Value::SecretRef { .. }));
    }

    #[test]
    fn test_deserialize_output() {
        let yaml = r#"
protocol: http
endpoint:
  valueFrom:
    secretKeyRef: {name: backend, namespace: default, key: endpoint}
path: v1/traces
authentication:
  oauth2:
    tokenURL: {value: "https://auth/token"}
    clientID: {value: id}
    clientSecret: {value: secret}
headers:
  - name: X-Tenant
    prefix: Bearer
    value: abc
tls:
  insecureSkipVerify: true
"#;
        let output: OtlpOutput = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(output.protocol, OtlpProtocol::Http);
        assert_eq!(output.explicit_path(), Some("v1/traces"));
        assert_eq!(
            output.oauth2().unwrap().token_url,
            ValueType::literal("https://auth/token")
        );
        assert_eq!(output.headers[0].value, ValueType::literal("abc"));
        assert!(output.tls.as_ref().unwrap().insecure_skip_verify);
        assert!(!output.tls.as_ref().unwrap().has_material());
        assert_eq!(output.values().len(), 5);
    }
}
