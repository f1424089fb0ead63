//! Build and test invocation through the project's build tool.
//!
//! Defines the `BuildRunner` async trait plus a Maven-backed implementation
//! that compiles with tests skipped and runs an explicit list of test units.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::error::{Result, SelectorError};
use crate::domain::CommandResult;
use crate::process::{execute, CommandSpec};

// ---------------------------------------------------------------------------
// Runner trait
// ---------------------------------------------------------------------------

/// Trait for build tool backends.
#[async_trait]
pub trait BuildRunner: Send + Sync {
    /// Compile and install the project without running tests.
    async fn compile(&self) -> Result<CommandResult>;

    /// Run exactly the given test units (canonical names).
    async fn run_tests(&self, units: &[String]) -> Result<CommandResult>;
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// The two build invocations the pipeline needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum BuildStage {
    /// mvn install -DskipTests=true
    Install,

    /// mvn test -DskipTests=false -Dtest=<units>
    Test { units: Vec<String> },
}

impl BuildStage {
    pub fn name(&self) -> &'static str {
        match self {
            BuildStage::Install => "install",
            BuildStage::Test { .. } => "test",
        }
    }

    /// Build tool arguments for this stage.
    pub fn args(&self) -> Vec<String> {
        match self {
            BuildStage::Install => vec!["install".to_string(), "-DskipTests=true".to_string()],
            BuildStage::Test { units } => vec![
                "test".to_string(),
                "-DskipTests=false".to_string(),
                format!("-Dtest={}", units.join(",")),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the build tool runner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildToolConfig {
    /// Build tool executable.
    pub executable: String,

    /// Project root the tool runs in.
    pub work_dir: PathBuf,

    /// Extra arguments placed before the stage arguments (e.g. `-q`, `-o`).
    pub extra_args: Vec<String>,

    /// Timeout in seconds; 0 leaves timing to the tool.
    pub timeout_secs: u64,

    /// Echo captured tool output to the log.
    pub verbose: bool,
}

impl Default for BuildToolConfig {
    fn default() -> Self {
        Self {
            executable: "mvn".to_string(),
            work_dir: PathBuf::from("."),
            extra_args: Vec::new(),
            timeout_secs: 0,
            verbose: false,
        }
    }
}

impl BuildToolConfig {
    pub fn command_for(&self, stage: &BuildStage) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.executable, &self.work_dir)
            .args(self.extra_args.iter().cloned())
            .args(stage.args());
        spec.timeout_secs = self.timeout_secs;
        spec
    }
}

// ---------------------------------------------------------------------------
// Maven runner
// ---------------------------------------------------------------------------

/// [`BuildRunner`] that shells out to Maven (or a compatible wrapper such as `./mvnw`).
#[derive(Debug, Clone, Default)]
pub struct MavenRunner {
    config: BuildToolConfig,
}

impl MavenRunner {
    pub fn new(config: BuildToolConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuildToolConfig {
        &self.config
    }

    async fn execute_stage(&self, stage: &BuildStage) -> Result<CommandResult> {
        let spec = self.config.command_for(stage);
        info!(stage = stage.name(), command = %spec.command_line(), "Executing build stage");

        let result = execute(&spec).await.map_err(|e| SelectorError::BuildFailure {
            exit_code: -1,
            output: format!("failed to run {}: {e}", self.config.executable),
        })?;

        if self.config.verbose {
            for line in result.stdout.lines() {
                debug!(stage = stage.name(), "{line}");
            }
            if !result.stderr.trim().is_empty() {
                warn!(stage = stage.name(), "{}", result.stderr.trim());
            }
        }
        Ok(result)
    }
}

#[async_trait]
impl BuildRunner for MavenRunner {
    async fn compile(&self) -> Result<CommandResult> {
        self.execute_stage(&BuildStage::Install).await
    }

    async fn run_tests(&self, units: &[String]) -> Result<CommandResult> {
        self.execute_stage(&BuildStage::Test {
            units: units.to_vec(),
        })
        .await
    }
}
