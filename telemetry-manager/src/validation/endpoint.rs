//! Endpoint checks for OTLP outputs.
use crate::apis::shared::{OtlpOutput, OtlpProtocol};
use url::Url;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("endpoint is empty")]
    Empty,

    #[error("failed to parse `{endpoint}`: {message}")]
    Parse { endpoint: String, message: String },

    #[error("missing port")]
    PortMissing,

    #[error("missing or unsupported protocol scheme")]
    UnsupportedScheme,

    #[error("OAuth2 requires TLS when using gRPC protocol")]
    OAuth2RequiresTls,

    #[error("HTTP scheme with TLS not allowed")]
    HttpSchemeWithTls,
}

/// Checks that an endpoint is usable with the protocol. gRPC needs an explicit port and accepts
/// any scheme; HTTP needs an `http` or `https` scheme and an optional port.
pub fn validate_endpoint(endpoint: &str, protocol: OtlpProtocol) -> Result<(), EndpointError> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(EndpointError::Empty);
    }

    let has_scheme = endpoint.contains("://");
    if protocol == OtlpProtocol::Http && !has_scheme {
        return Err(EndpointError::UnsupportedScheme);
    }

    let url = if has_scheme {
        parse(endpoint, endpoint)?
    } else {
        parse(endpoint, &format!("http://{endpoint}"))?
    };

    match protocol {
        OtlpProtocol::Http if !matches!(url.scheme(), "http" | "https") => {
            Err(EndpointError::UnsupportedScheme)
        }
        OtlpProtocol::Grpc if !has_explicit_port(endpoint) => Err(EndpointError::PortMissing),
        _ => Ok(()),
    }
}

/// Checks the combination of authentication, TLS and scheme of an output with a resolved
/// endpoint.
pub fn validate_security(output: &OtlpOutput, endpoint: &str) -> Result<(), EndpointError> {
    if output.oauth2().is_none() {
        return Ok(());
    }
    let tls_enabled = output.tls.as_ref().is_some_and(|tls| !tls.insecure);

    match output.protocol {
        OtlpProtocol::Grpc if !tls_enabled => Err(EndpointError::OAuth2RequiresTls),
        OtlpProtocol::Http
            if has_plain_http_scheme(endpoint)
                && tls_enabled
                && output.tls.as_ref().is_some_and(|tls| tls.has_material()) =>
        {
            Err(EndpointError::HttpSchemeWithTls)
        }
        _ => Ok(()),
    }
}

fn parse(original: &str, candidate: &str) -> Result<Url, EndpointError> {
    Url::parse(candidate).map_err(|err| EndpointError::Parse {
        endpoint: original.to_string(),
        message: err.to_string(),
    })
}

fn has_plain_http_scheme(endpoint: &str) -> bool {
    endpoint.trim().to_ascii_lowercase().starts_with("http://")
}

/// Looks at the authority as written, since [Url::port] hides ports equal to the scheme default.
fn has_explicit_port(endpoint: &str) -> bool {
    let rest = endpoint
        .split_once("://")
        .map_or(endpoint, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    if host_port.ends_with(']') {
        return false;
    }
    host_port
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()))
}
