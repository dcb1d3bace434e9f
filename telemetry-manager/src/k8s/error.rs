use kube::config::KubeconfigError;

#[derive(thiserror::Error, Debug)]
pub enum K8sError {
    #[error("the kube client returned an error: `{0}`")]
    Generic(#[from] kube::Error),

    #[error("it is not possible to read kubeconfig: `{0}`")]
    UnableToSetupClientKubeconfig(#[from] KubeconfigError),

    #[error("the name of the object is missing")]
    MissingName,

    #[error("the object could not be converted: `{0}`")]
    Conversion(#[from] serde_json::Error),

    #[error("unexpected response from the api server: {0}")]
    UnexpectedResponse(String),
}

const CONFLICT: u16 = 409;
const NOT_FOUND: u16 = 404;
const TOO_MANY_REQUESTS: u16 = 429;
const SERVICE_UNAVAILABLE: u16 = 503;

impl K8sError {
    /// HTTP code of an api server error response.
    pub fn api_code(&self) -> Option<u16> {
        match self {
            K8sError::Generic(kube::Error::Api(response)) => Some(response.code),
            _ => None,
        }
    }

    pub fn is_conflict(&self) -> bool {
        self.api_code() == Some(CONFLICT)
    }

    pub fn is_not_found(&self) -> bool {
        self.api_code() == Some(NOT_FOUND)
    }

    /// Throttling and temporary unavailability are worth retrying after a pause.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.api_code(),
            Some(TOO_MANY_REQUESTS) | Some(SERVICE_UNAVAILABLE)
        )
    }
}
