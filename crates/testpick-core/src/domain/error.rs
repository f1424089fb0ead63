//! Error taxonomy for test selection.

use review_resolver::ReviewError;

use crate::domain::unit::UnitId;

/// Errors raised while selecting and running tests.
#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    /// The version-control tool failed for a reason other than "differences found".
    #[error("git error: {0}")]
    VcsCommand(String),

    /// Remote connection parameters are missing, malformed or rejected.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unable to find a merge request for this branch ({branch})")]
    NoReviewFound { branch: String },

    /// Transport or unexpected-status failure talking to the review service.
    #[error("review service error: {0}")]
    ReviewService(String),

    /// The changed source has no compiled counterpart; the build is stale.
    #[error("unit not found in compiled output: {0}")]
    UnitNotFound(UnitId),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("build failed with exit code {exit_code}: {output}")]
    BuildFailure { exit_code: i32, output: String },

    /// A compiled artifact could not be read or decoded.
    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ReviewError> for SelectorError {
    fn from(err: ReviewError) -> Self {
        match err {
            ReviewError::Configuration(msg) => SelectorError::Configuration(msg),
            ReviewError::NoReviewFound { branch } => SelectorError::NoReviewFound { branch },
            other => SelectorError::ReviewService(other.to_string()),
        }
    }
}

/// Result type for testpick operations.
pub type Result<T> = std::result::Result<T, SelectorError>;
