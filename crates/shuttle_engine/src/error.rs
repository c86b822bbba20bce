use thiserror::Error;

/// Failure reported by an object-storage capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The service answered with an error code.
    #[error("{code}: {message}")]
    Service { code: String, message: String },
    /// The request never produced a service answer (dispatch, timeout, malformed response).
    #[error("request failed: {0}")]
    Request(String),
    /// A previous write failed, so the upload can no longer be finalized.
    #[error("upload aborted after a failed part")]
    Aborted,
}

/// Failure reported by the HTTP GET capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("http client setup failed: {0}")]
    Client(String),
}

/// Failure before any worker starts. Fatal for the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("missing credential: environment variable {0} is not set")]
    MissingCredential(&'static str),
    #[error(transparent)]
    HttpClient(#[from] FetchError),
}
