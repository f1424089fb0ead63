//! Error types for review-resolver

use thiserror::Error;

/// Errors that can occur while resolving a merge request target
#[derive(Error, Debug)]
pub enum ReviewError {
    /// Connection parameters are missing or malformed, or were rejected by the server
    #[error("invalid GitLab configuration: {0}")]
    Configuration(String),

    /// No open merge request uses the branch as its source
    #[error("unable to find a merge request for this branch ({branch})")]
    NoReviewFound { branch: String },

    /// The server answered with an unexpected status
    #[error("GitLab request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ReviewError {
    fn from(err: reqwest::Error) -> Self {
        ReviewError::Http(err.to_string())
    }
}
