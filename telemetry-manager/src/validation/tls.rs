//! Checks of the TLS material of an OTLP output: the client certificate must parse, belong to
//! its private key and not be expired, and every CA certificate must be a CA.
use crate::apis::shared::{OutputTls, ValueType};
use crate::otelcol::secret::{SecretError, SecretReader, resolve_value};
use crate::otelcol::tls::{is_keypair, sanitize_pair, unescape_newlines};
use openssl::pkey::PKey;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};
use x509_parser::certificate::X509Certificate;
use x509_parser::pem::Pem;

const ABOUT_TO_EXPIRE: Duration = Duration::from_secs(14 * 24 * 60 * 60);
const CERTIFICATE: &str = "TLS certificate";
const CA_CERTIFICATE: &str = "TLS CA certificate";

#[derive(thiserror::Error, Debug)]
pub enum TlsError {
    #[error("a certificate and private key must either both be provided or both be missing")]
    IncompletePair,

    #[error("failed to parse certificate")]
    InvalidCert,

    #[error("failed to decode PEM block containing private key")]
    InvalidKey,

    #[error("certificate and private key do not match")]
    KeyMismatch,

    #[error("failed to parse CA certificate")]
    InvalidCa,

    #[error("not a CA certificate")]
    NotCa,

    #[error("{subject} expired on {expiry}")]
    Expired {
        subject: &'static str,
        expiry: String,
    },

    #[error("failed to resolve TLS material: {0}")]
    Secret(#[from] SecretError),
}

/// Remaining validity of a certificate at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Valid,
    AboutToExpire,
    Expired,
}

impl Expiry {
    /// `not_after` and `now` are seconds since the Unix epoch.
    pub fn at(not_after: i64, now: i64) -> Self {
        let left = not_after.saturating_sub(now);
        if left < 0 {
            Expiry::Expired
        } else if left.unsigned_abs() <= ABOUT_TO_EXPIRE.as_secs() {
            Expiry::AboutToExpire
        } else {
            Expiry::Valid
        }
    }
}

fn provided(value: Option<&ValueType>) -> Option<&ValueType> {
    value.filter(|v| !v.is_empty())
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

/// Validates the material of `tls` against the current time. Nothing is checked when TLS is
/// disabled. A certificate close to its expiry is admitted with a warning.
pub async fn validate_tls(reader: &dyn SecretReader, tls: &OutputTls) -> Result<(), TlsError> {
    validate_tls_at(reader, tls, unix_now()).await
}

/// Same as [validate_tls], with `now` given in seconds since the Unix epoch.
pub async fn validate_tls_at(
    reader: &dyn SecretReader,
    tls: &OutputTls,
    now: i64,
) -> Result<(), TlsError> {
    if tls.insecure {
        return Ok(());
    }

    match (provided(tls.cert.as_ref()), provided(tls.key.as_ref())) {
        (None, None) => {}
        (Some(cert), Some(key)) => {
            let cert = resolve_value(reader, cert).await?;
            let key = resolve_value(reader, key).await?;
            let (cert, key) = sanitize_pair(cert, key);
            check_client_pair(&cert, &key, now)?;
        }
        _ => return Err(TlsError::IncompletePair),
    }

    if let Some(ca) = provided(tls.ca.as_ref()) {
        let ca = unescape_newlines(&resolve_value(reader, ca).await?);
        check_ca(&ca, now)?;
    }
    Ok(())
}

fn check_client_pair(cert: &[u8], key: &[u8], now: i64) -> Result<(), TlsError> {
    let pems = read_pems(cert).map_err(|_| TlsError::InvalidCert)?;
    let leaf = pems.first().ok_or(TlsError::InvalidCert)?;
    let parsed = leaf.parse_x509().map_err(|_| TlsError::InvalidCert)?;
    if PKey::private_key_from_pem(key).is_err() {
        return Err(TlsError::InvalidKey);
    }
    if !is_keypair(cert, key) {
        return Err(TlsError::KeyMismatch);
    }
    check_expiry(&parsed, CERTIFICATE, now)
}

fn check_ca(ca: &[u8], now: i64) -> Result<(), TlsError> {
    let pems = read_pems(ca).map_err(|_| TlsError::InvalidCa)?;
    if pems.is_empty() {
        return Err(TlsError::InvalidCa);
    }
    for pem in &pems {
        let parsed = pem.parse_x509().map_err(|_| TlsError::InvalidCa)?;
        if !parsed.is_ca() {
            return Err(TlsError::NotCa);
        }
        check_expiry(&parsed, CA_CERTIFICATE, now)?;
    }
    Ok(())
}

fn read_pems(input: &[u8]) -> Result<Vec<Pem>, x509_parser::error::PEMError> {
    Pem::iter_from_buffer(input).collect()
}

fn check_expiry(
    cert: &X509Certificate<'_>,
    subject: &'static str,
    now: i64,
) -> Result<(), TlsError> {
    let not_after = &cert.validity().not_after;
    match Expiry::at(not_after.timestamp(), now) {
        Expiry::Valid => Ok(()),
        Expiry::AboutToExpire => {
            warn!(%subject, expiry = %not_after, "certificate is about to expire");
            Ok(())
        }
        Expiry::Expired => {
            debug!(%subject, expiry = %not_after, "certificate expired");
            Err(TlsError::Expired {
                subject,
                expiry: not_after.to_string(),
            })
        }
    }
}
