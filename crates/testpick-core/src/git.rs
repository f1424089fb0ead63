//! Git integration: branch name, clean-tree check and changed paths.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::error::{Result, SelectorError};
use crate::domain::CommandResult;
use crate::process::{execute, CommandSpec};

/// Source of branch and diff information.
#[async_trait]
pub trait DiffProvider: Send + Sync {
    /// Name of the checked-out branch.
    async fn current_branch(&self) -> Result<String>;

    /// Whether tracked files have unstaged or staged modifications.
    async fn has_uncommitted_changes(&self) -> Result<bool>;

    /// Repository-relative paths that differ from `target_branch`, in git order.
    async fn changed_paths(&self, target_branch: &str) -> Result<Vec<String>>;
}

/// [`DiffProvider`] backed by the `git` executable.
#[derive(Debug, Clone)]
pub struct GitCli {
    executable: String,
    repo_dir: PathBuf,
}

impl GitCli {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self::with_executable("git", repo_dir)
    }

    pub fn with_executable(executable: impl Into<String>, repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            repo_dir: repo_dir.into(),
        }
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    async fn git(&self, args: &[&str]) -> Result<CommandResult> {
        let spec = CommandSpec::new(&self.executable, &self.repo_dir).args(args.iter().copied());
        execute(&spec)
            .await
            .map_err(|e| SelectorError::VcsCommand(format!("failed to run {}: {e}", self.executable)))
    }

    /// Run a quiet comparison: `Ok(true)` when differences were reported.
    async fn differs(&self, args: &[&str]) -> Result<bool> {
        let result = self.git(args).await?;
        if result.success() {
            return Ok(false);
        }
        let stderr = result.stderr.trim();
        if !stderr.is_empty() {
            return Err(SelectorError::VcsCommand(format!(
                "git {} failed: {stderr}",
                args.join(" ")
            )));
        }
        Ok(true)
    }
}

#[async_trait]
impl DiffProvider for GitCli {
    async fn current_branch(&self) -> Result<String> {
        let result = self
            .git(&["rev-parse", "--quiet", "--abbrev-ref", "HEAD"])
            .await?;
        if !result.success() {
            return Err(SelectorError::VcsCommand(format!(
                "git rev-parse --abbrev-ref HEAD failed: {}",
                result.error_text()
            )));
        }

        let branch = result.stdout.replace(['\n', '\r'], "");
        if branch.is_empty() {
            return Err(SelectorError::VcsCommand(
                "git rev-parse --abbrev-ref HEAD returned empty output".to_string(),
            ));
        }
        Ok(branch)
    }

    async fn has_uncommitted_changes(&self) -> Result<bool> {
        info!("Checking for uncommitted changes");

        if self
            .differs(&["diff", "--no-ext-diff", "--ignore-submodules", "--quiet", "--exit-code"])
            .await?
        {
            debug!("Working tree has unstaged modifications");
            return Ok(true);
        }

        let staged = self
            .differs(&[
                "diff-index",
                "--cached",
                "--quiet",
                "--ignore-submodules",
                "HEAD",
                "--",
            ])
            .await?;
        if staged {
            debug!("Index has staged modifications");
        }
        Ok(staged)
    }

    async fn changed_paths(&self, target_branch: &str) -> Result<Vec<String>> {
        let result = self
            .git(&["-c", "core.quotePath=false", "diff", "--name-only", target_branch])
            .await?;
        if !result.success() {
            return Err(SelectorError::VcsCommand(format!(
                "git diff --name-only {target_branch} failed: {}",
                result.error_text()
            )));
        }

        Ok(result
            .stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}
