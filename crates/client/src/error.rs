//! Error types for the HTTP client

use infrahub_core::FetchError;
use thiserror::Error;

/// Errors that can occur while talking to the API server
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport or schema lookup failure shared with the resolution engine
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The server answered with a non-success status
    #[error("Request to {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    /// The response body could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No artifact '{name}' found for target {target_id}")]
    ArtifactNotFound { name: String, target_id: String },

    /// Client construction failed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }
}

impl From<ClientError> for infrahub_core::Error {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Fetch(e) => infrahub_core::Error::Fetch(e),
            ClientError::Config(msg) => infrahub_core::Error::config(msg),
            other => infrahub_core::Error::Other(anyhow::anyhow!(other.to_string())),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Map a reqwest transport error onto the fetch error kinds
pub(crate) fn transport_error(url: &str, e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        FetchError::ServerUnresponsive(format!("Timeout waiting for {url}")).into()
    } else if e.is_connect() {
        FetchError::ServerUnreachable(format!("Unable to connect to {url}: {e}")).into()
    } else if e.is_decode() || e.is_body() {
        ClientError::invalid_response(format!("Failed to read response from {url}: {e}"))
    } else {
        FetchError::ServerUnreachable(format!("Request to {url} failed: {e}")).into()
    }
}
