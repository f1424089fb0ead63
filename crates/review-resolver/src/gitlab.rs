//! GitLab merge request client
//!
//! Resolves the target branch of the open merge request whose source is the
//! branch currently checked out.

use crate::config::ValidatedConfig;
use crate::error::ReviewError;
use crate::Result;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const MERGE_REQUESTS_PER_PAGE: &str = "100";

/// The subset of a GitLab merge request this crate cares about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeRequest {
    /// Internal id within the project
    #[serde(default)]
    pub iid: Option<u64>,
    pub source_branch: String,
    pub target_branch: String,
    #[serde(default)]
    pub web_url: Option<String>,
}

/// GitLab client for merge request lookups
#[derive(Debug)]
pub struct GitLabClient {
    config: ValidatedConfig,
    http_client: reqwest::Client,
}

impl GitLabClient {
    /// Create a new GitLab client
    pub fn new(config: ValidatedConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("testpick-review-resolver/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_http_client(config, http_client))
    }

    /// Create a client on top of an existing `reqwest::Client`
    pub fn with_http_client(config: ValidatedConfig, http_client: reqwest::Client) -> Self {
        GitLabClient {
            config,
            http_client,
        }
    }

    /// Endpoint listing the project's open merge requests from `branch`.
    pub fn merge_requests_url(&self, branch: &str) -> Result<Url> {
        let base = self.config.server_url.as_str().trim_end_matches('/');
        let endpoint = format!(
            "{base}/api/v4/projects/{}/merge_requests",
            self.config.project_id
        );
        Url::parse_with_params(
            &endpoint,
            &[
                ("state", "opened"),
                ("source_branch", branch),
                ("per_page", MERGE_REQUESTS_PER_PAGE),
            ],
        )
        .map_err(|e| ReviewError::Configuration(format!("cannot build request URL: {e}")))
    }

    /// Fetch open merge requests whose source branch is `branch`
    pub async fn open_merge_requests(&self, branch: &str) -> Result<Vec<MergeRequest>> {
        let url = self.merge_requests_url(branch)?;
        debug!(url = %url, "Querying GitLab merge requests");

        let response = self
            .http_client
            .get(url)
            .header("PRIVATE-TOKEN", &self.config.token)
            .send()
            .await?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
        ) {
            return Err(ReviewError::Configuration(format!(
                "GitLab rejected the request for project {} ({status}); check gitLabToken and gitLabProjectId",
                self.config.project_id
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReviewError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let merge_requests: Vec<MergeRequest> = serde_json::from_str(&body)?;
        Ok(merge_requests)
    }

    /// Target branch of the first open merge request from `branch`
    pub async fn target_branch_for(&self, branch: &str) -> Result<String> {
        info!(branch = %branch, "Looking for merge request(s)");
        let merge_requests = self.open_merge_requests(branch).await?;
        select_target(&merge_requests, branch)
    }
}

/// Pick the first merge request whose source is `branch`.
pub fn select_target(merge_requests: &[MergeRequest], branch: &str) -> Result<String> {
    merge_requests
        .iter()
        .find(|mr| mr.source_branch == branch)
        .map(|mr| mr.target_branch.clone())
        .ok_or_else(|| ReviewError::NoReviewFound {
            branch: branch.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReviewConfig;

    fn mr(source: &str, target: &str) -> MergeRequest {
        MergeRequest {
            iid: None,
            source_branch: source.to_string(),
            target_branch: target.to_string(),
            web_url: None,
        }
    }

    #[test]
    fn test_select_target_first_match_wins() {
        let mrs = vec![
            mr("feature/a", "develop"),
            mr("feature/b", "master"),
            mr("feature/b", "release/1.0"),
        ];
        assert_eq!(select_target(&mrs, "feature/b").unwrap(), "master");
    }

    #[test]
    fn test_select_target_no_match() {
        let mrs = vec![mr("feature/a", "develop")];
        let err = select_target(&mrs, "feature/z").unwrap_err();
        assert!(matches!(err, ReviewError::NoReviewFound { ref branch } if branch == "feature/z"));
    }

    #[test]
    fn test_merge_requests_url_encodes_branch() {
        let config = ReviewConfig::new("https://gitlab.example.com/", "t", 12)
            .validate()
            .unwrap();
        let client = GitLabClient::new(config).unwrap();
        let url = client.merge_requests_url("release/1.0.0").unwrap();
        assert_eq!(url.path(), "/api/v4/projects/12/merge_requests");
        let query = url.query().unwrap();
        assert!(query.contains("state=opened"));
        assert!(query.contains("source_branch=release%2F1.0.0"));
    }

    #[test]
    fn test_merge_requests_url_keeps_server_path_prefix() {
        let config = ReviewConfig::new("https://example.com/gitlab", "t", 5)
            .validate()
            .unwrap();
        let client = GitLabClient::new(config).unwrap();
        let url = client.merge_requests_url("main").unwrap();
        assert_eq!(url.path(), "/gitlab/api/v4/projects/5/merge_requests");
    }

    #[test]
    fn test_merge_request_deserializes_with_extra_fields() {
        let json = r#"[{"id":1,"iid":7,"source_branch":"f","target_branch":"main","state":"opened","web_url":"https://x/7"}]"#;
        let parsed: Vec<MergeRequest> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed[0].iid, Some(7));
        assert_eq!(parsed[0].target_branch, "main");
    }
}
