//! Review-Resolver: GitLab merge request lookup for testpick
//!
//! Answers one question: which branch does the open merge request for the
//! current branch want to merge into? The answer is the diff base used to
//! select tests.

pub mod config;
pub mod error;
pub mod gitlab;

pub use config::{ReviewConfig, ValidatedConfig};
pub use error::ReviewError;
pub use gitlab::{select_target, GitLabClient, MergeRequest};

/// Result type for review-resolver operations
pub type Result<T> = std::result::Result<T, ReviewError>;
