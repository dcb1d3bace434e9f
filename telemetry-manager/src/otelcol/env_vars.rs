//! Environment variables carrying resolved secret material into the collector.
use std::collections::BTreeMap;

/// Variable name to raw value.
pub type EnvVars = BTreeMap<String, Vec<u8>>;

/// What a generated variable holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    OtlpEndpoint,
    BasicAuthHeader,
    Header,
    OAuth2TokenUrl,
    OAuth2ClientId,
    OAuth2ClientSecret,
    TlsCaPem,
    TlsCertPem,
    TlsKeyPem,
}

impl Purpose {
    fn prefix(&self) -> &'static str {
        match self {
            Self::OtlpEndpoint => "OTLP_ENDPOINT",
            Self::BasicAuthHeader => "BASIC_AUTH_HEADER",
            Self::Header => "HEADER",
            Self::OAuth2TokenUrl => "OAUTH2_TOKEN_URL",
            Self::OAuth2ClientId => "OAUTH2_CLIENT_ID",
            Self::OAuth2ClientSecret => "OAUTH2_CLIENT_SECRET",
            Self::TlsCaPem => "OTLP_TLS_CA_PEM",
            Self::TlsCertPem => "OTLP_TLS_CERT_PEM",
            Self::TlsKeyPem => "OTLP_TLS_KEY_PEM",
        }
    }
}

/// Builds the variable name for a purpose, pipeline and optional header.
pub fn env_var_name(purpose: Purpose, pipeline: &str, header: Option<&str>) -> String {
    let name = match header {
        Some(header) => format!("{}_{pipeline}_{header}", purpose.prefix()),
        None => format!("{}_{pipeline}", purpose.prefix()),
    };
    sanitize(&name)
}

fn sanitize(name: &str) -> String {
    name.to_uppercase().replace(['.', '-'], "_")
}
