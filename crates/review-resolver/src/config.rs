//! GitLab connection parameters
//!
//! Parameters arrive as optional strings from the CLI or the environment and
//! are validated in one place, before any request is attempted.

use crate::error::ReviewError;
use crate::Result;
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Raw, unvalidated GitLab configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewConfig {
    /// GitLab server URL (e.g. `https://gitlab.example.com`)
    pub server_url: Option<String>,
    /// API token sent as `PRIVATE-TOKEN`
    #[serde(skip_serializing)]
    pub token: Option<String>,
    /// Numeric project id whose merge requests are searched
    pub project_id: Option<i64>,
}

impl ReviewConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        ReviewConfig {
            server_url: std::env::var("GITLAB_SERVER").ok(),
            token: std::env::var("GITLAB_TOKEN").ok(),
            project_id: std::env::var("GITLAB_PROJECT_ID")
                .ok()
                .and_then(|v| v.trim().parse().ok()),
        }
    }

    /// Create config for a specific server and project
    pub fn new(server_url: &str, token: &str, project_id: i64) -> Self {
        ReviewConfig {
            server_url: Some(server_url.to_string()),
            token: Some(token.to_string()),
            project_id: Some(project_id),
        }
    }

    /// Check every parameter and produce a usable configuration.
    pub fn validate(&self) -> Result<ValidatedConfig> {
        let server = self
            .server_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing("gitLabServer"))?;

        let server_url = Url::parse(server).map_err(|e| {
            ReviewError::Configuration(format!("server URL '{server}' is malformed: {e}"))
        })?;
        if !matches!(server_url.scheme(), "http" | "https") {
            return Err(ReviewError::Configuration(format!(
                "server URL '{server}' must use http or https"
            )));
        }

        let token = self
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| missing("gitLabToken"))?
            .to_string();

        let project_id = match self.project_id {
            Some(id) if id > 0 => id as u64,
            Some(id) => {
                return Err(ReviewError::Configuration(format!(
                    "project id must be positive, got {id}"
                )))
            }
            None => return Err(missing("gitLabProjectId")),
        };

        Ok(ValidatedConfig {
            server_url,
            token,
            project_id,
        })
    }
}

fn missing(param: &str) -> ReviewError {
    ReviewError::Configuration(format!(
        "missing {param}. Make sure to provide gitLabServer, gitLabProjectId and gitLabToken parameters"
    ))
}

/// Configuration that passed [`ReviewConfig::validate`]
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub server_url: Url,
    pub token: String,
    pub project_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = ReviewConfig::new("https://gitlab.example.com", "secret", 42);
        let validated = config.validate().unwrap();
        assert_eq!(validated.project_id, 42);
        assert_eq!(validated.token, "secret");
        assert_eq!(validated.server_url.host_str(), Some("gitlab.example.com"));
    }

    #[test]
    fn test_missing_server_is_configuration_error() {
        let config = ReviewConfig {
            server_url: None,
            token: Some("t".to_string()),
            project_id: Some(1),
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ReviewError::Configuration(_)));
        assert!(err.to_string().contains("gitLabServer"));
    }

    #[test]
    fn test_blank_token_is_configuration_error() {
        let config = ReviewConfig::new("https://gitlab.example.com", "   ", 1);
        assert!(matches!(
            config.validate(),
            Err(ReviewError::Configuration(_))
        ));
    }

    #[test]
    fn test_negative_project_id_rejected() {
        let config = ReviewConfig::new("https://gitlab.example.com", "t", -1);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        let config = ReviewConfig::new("ftp://gitlab.example.com", "t", 3);
        assert!(matches!(
            config.validate(),
            Err(ReviewError::Configuration(_))
        ));
    }

    #[test]
    fn test_unparseable_url_rejected() {
        let config = ReviewConfig::new("not a url", "t", 3);
        assert!(matches!(
            config.validate(),
            Err(ReviewError::Configuration(_))
        ));
    }

    #[test]
    fn test_token_not_serialized() {
        let config = ReviewConfig::new("https://gitlab.example.com", "secret", 7);
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
