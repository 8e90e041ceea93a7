use http::StatusCode;
use thiserror::Error;

/// Errors that can occur while answering a lookup
#[derive(Error, Debug)]
pub enum EnterpriseCheckError {
    /// The bearer token was not present in the environment at startup
    #[error("Missing {0}")]
    MissingCredential(String),

    /// HubSpot answered with a non-success status
    #[error("HubSpot API error ({status})")]
    UpstreamStatus {
        status: StatusCode,
        details: serde_json::Value,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed HubSpot response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Lookup task failed: {0}")]
    Panicked(String),
}

impl From<crate::config::ValidationError> for EnterpriseCheckError {
    fn from(err: crate::config::ValidationError) -> Self {
        EnterpriseCheckError::InvalidConfig(err.to_string())
    }
}

impl EnterpriseCheckError {
    /// Metrics and log label for the response this error renders as.
    pub fn outcome(&self) -> &'static str {
        match self {
            EnterpriseCheckError::MissingCredential(_) => "missing_credential",
            EnterpriseCheckError::UpstreamStatus { .. } => "upstream_error",
            _ => "server_error",
        }
    }
}
