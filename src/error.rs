//! Failure taxonomy for completion requests.

use thiserror::Error;

/// Any failure issuing or receiving a completion request.
///
/// Every variant is recovered locally by the conversation controller; none of
/// them escapes to the presentation layer.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// No credential was configured for the provider.
    #[error("no API key configured (set {env_var} or provider.api_key)")]
    MissingApiKey { env_var: String },

    /// The request could not be sent or the body could not be read.
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with a non-success status.
    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The body was not a chat completion.
    #[error("malformed completion response: {0}")]
    Malformed(String),

    /// The task carrying the request ended without reporting back.
    #[error("completion request was interrupted")]
    Interrupted,
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CompletionError::Malformed(err.to_string())
        } else {
            CompletionError::Network(err.to_string())
        }
    }
}
