//! Error types
//!
//! Every fallible operation in the library returns [`ComputeError`]. Local
//! precondition failures are reported before any request is sent; remote
//! failures carry the HTTP status and the fault message from the response.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComputeError {
    /// A request parameter failed local validation
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Rebuild error: {0}")]
    Rebuild(String),

    #[error("Image error: {0}")]
    Image(String),

    /// A server action was attempted on a server that cannot accept it
    #[error("Server action error: {0}")]
    ServerAction(String),

    #[error("Server has no IPv{0} address")]
    ServerIp(u8),

    #[error("{0} has no ID")]
    MissingId(&'static str),

    /// The remote service answered with a non-success status
    #[error("API request failed: {status} - {message}")]
    Api { status: StatusCode, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("No endpoint for service '{service}' in region '{region}' ({url_type})")]
    EndpointNotFound {
        service: String,
        region: String,
        url_type: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timed out waiting for server to reach {0}")]
    Timeout(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ComputeError {
    /// HTTP status of a remote failure, if this is one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// True for errors raised by local validation, before any request
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter(_)
                | Self::Rebuild(_)
                | Self::Image(_)
                | Self::ServerAction(_)
                | Self::MissingId(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ComputeError>;
