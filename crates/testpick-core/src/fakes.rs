//! In-memory fakes for the pipeline's collaborators (testing only)
//!
//! `FakeDiff`, `FakeBuild` and `FakeTarget` satisfy the trait contracts
//! without git, a build tool or a network. `FakeBuild` can write class
//! artifacts during `compile`, standing in for compiler output.

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::catalog::encode_header;
use crate::domain::error::{Result, SelectorError};
use crate::domain::CommandResult;
use crate::git::DiffProvider;
use crate::runner::BuildRunner;
use crate::target::TargetResolver;

// ---------------------------------------------------------------------------
// FakeDiff
// ---------------------------------------------------------------------------

/// Scripted diff provider that records which operations were called.
#[derive(Debug, Default)]
pub struct FakeDiff {
    pub branch: String,
    pub dirty: bool,
    pub paths: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeDiff {
    pub fn new(branch: &str, paths: &[&str]) -> Self {
        Self {
            branch: branch.to_string(),
            paths: paths.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn dirty(mut self) -> Self {
        self.dirty = true;
        self
    }

    /// Operation names in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DiffProvider for FakeDiff {
    async fn current_branch(&self) -> Result<String> {
        self.record("current_branch".to_string());
        Ok(self.branch.clone())
    }

    async fn has_uncommitted_changes(&self) -> Result<bool> {
        self.record("has_uncommitted_changes".to_string());
        Ok(self.dirty)
    }

    async fn changed_paths(&self, target_branch: &str) -> Result<Vec<String>> {
        self.record(format!("changed_paths:{target_branch}"));
        Ok(self.paths.clone())
    }
}

// ---------------------------------------------------------------------------
// FakeTarget
// ---------------------------------------------------------------------------

/// Target resolver backed by a `(source, target)` table.
#[derive(Debug, Default)]
pub struct FakeTarget {
    reviews: Vec<(String, String)>,
}

impl FakeTarget {
    pub fn new(reviews: &[(&str, &str)]) -> Self {
        Self {
            reviews: reviews
                .iter()
                .map(|(s, t)| (s.to_string(), t.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl TargetResolver for FakeTarget {
    async fn target_branch_for(&self, current_branch: &str) -> Result<String> {
        self.reviews
            .iter()
            .find(|(source, _)| source == current_branch)
            .map(|(_, target)| target.clone())
            .ok_or_else(|| SelectorError::NoReviewFound {
                branch: current_branch.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// FakeBuild
// ---------------------------------------------------------------------------

/// A class artifact `FakeBuild` writes when compiling.
#[derive(Debug, Clone)]
pub struct FakeClass {
    pub internal_name: String,
    pub super_class: Option<String>,
    pub access_flags: u16,
}

impl FakeClass {
    pub fn concrete(name: &str, parent: &str) -> Self {
        Self {
            internal_name: name.to_string(),
            super_class: Some(parent.to_string()),
            access_flags: 0x0021,
        }
    }

    pub fn abstract_class(name: &str, parent: &str) -> Self {
        Self {
            internal_name: name.to_string(),
            super_class: Some(parent.to_string()),
            access_flags: 0x0421,
        }
    }
}

/// Build runner that "compiles" by writing class files and records test runs.
#[derive(Debug, Default)]
pub struct FakeBuild {
    output_root: PathBuf,
    classes: Vec<FakeClass>,
    pub compile_exit: i32,
    pub test_exit: i32,
    compiles: Mutex<usize>,
    test_runs: Mutex<Vec<Vec<String>>>,
}

impl FakeBuild {
    pub fn new(output_root: impl Into<PathBuf>, classes: Vec<FakeClass>) -> Self {
        Self {
            output_root: output_root.into(),
            classes,
            ..Default::default()
        }
    }

    pub fn failing_compile(mut self, exit_code: i32) -> Self {
        self.compile_exit = exit_code;
        self
    }

    pub fn failing_tests(mut self, exit_code: i32) -> Self {
        self.test_exit = exit_code;
        self
    }

    pub fn compile_count(&self) -> usize {
        *self.compiles.lock().unwrap()
    }

    /// Unit lists passed to `run_tests`, one entry per invocation.
    pub fn test_runs(&self) -> Vec<Vec<String>> {
        self.test_runs.lock().unwrap().clone()
    }
}

#[async_trait]
impl BuildRunner for FakeBuild {
    async fn compile(&self) -> Result<CommandResult> {
        *self.compiles.lock().unwrap() += 1;
        if self.compile_exit != 0 {
            return Ok(CommandResult::new(
                self.compile_exit,
                "[ERROR] COMPILATION ERROR",
                "",
            ));
        }
        for class in &self.classes {
            let path = self
                .output_root
                .join(format!("{}.class", class.internal_name));
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let bytes = encode_header(
                &class.internal_name,
                class.super_class.as_deref(),
                class.access_flags,
            );
            std::fs::write(&path, bytes)?;
        }
        Ok(CommandResult::new(0, "BUILD SUCCESS", ""))
    }

    async fn run_tests(&self, units: &[String]) -> Result<CommandResult> {
        self.test_runs.lock().unwrap().push(units.to_vec());
        let stdout = if self.test_exit == 0 {
            "BUILD SUCCESS"
        } else {
            "BUILD FAILURE"
        };
        Ok(CommandResult::new(self.test_exit, stdout, ""))
    }
}
