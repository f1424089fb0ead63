//! Target branch resolution for the current branch.

use async_trait::async_trait;
use review_resolver::{GitLabClient, ReviewConfig};

use crate::domain::error::Result;

/// Resolves the branch the current branch is proposed to merge into.
#[async_trait]
pub trait TargetResolver: Send + Sync {
    async fn target_branch_for(&self, current_branch: &str) -> Result<String>;
}

#[async_trait]
impl TargetResolver for GitLabClient {
    async fn target_branch_for(&self, current_branch: &str) -> Result<String> {
        Ok(GitLabClient::target_branch_for(self, current_branch).await?)
    }
}

/// Validate the configuration and build a GitLab-backed resolver.
///
/// Fails with `Configuration` before any request is made.
pub fn gitlab_resolver(config: &ReviewConfig) -> Result<GitLabClient> {
    let validated = config.validate()?;
    Ok(GitLabClient::new(validated)?)
}

/// GitLab lookup whose configuration is validated on first use.
///
/// Construction never fails, so a missing or invalid configuration
/// surfaces in the stage that needs the target branch rather than before
/// the working tree has been checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewTarget {
    config: ReviewConfig,
}

impl ReviewTarget {
    pub fn new(config: ReviewConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TargetResolver for ReviewTarget {
    async fn target_branch_for(&self, current_branch: &str) -> Result<String> {
        let client = gitlab_resolver(&self.config)?;
        TargetResolver::target_branch_for(&client, current_branch).await
    }
}

/// Resolver that always answers with a branch given up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedTarget(pub String);

#[async_trait]
impl TargetResolver for FixedTarget {
    async fn target_branch_for(&self, _current_branch: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}
