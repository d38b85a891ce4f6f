use thiserror::Error;

/// Failures talking to the crawl service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("request failed: {0}")]
    Transport(String),

    /// The service answered with a non-2xx status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        ServiceError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Malformed(err.to_string())
    }
}

/// Failures of a crawl job. Everything except `DownloadFailed` ends the job
/// and is shown to the user.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("{0}")]
    SubmissionFailed(#[source] ServiceError),

    #[error("error polling status")]
    PollingFailed(#[source] ServiceError),

    #[error("task failed")]
    TaskFailed,

    #[error("failed to fetch data")]
    FetchResultsFailed(#[source] ServiceError),

    #[error("download failed: {0}")]
    DownloadFailed(#[source] ServiceError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
