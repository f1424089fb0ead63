//! Selection pipeline: clean check, diff, compile, resolve, test.
//!
//! The pipeline is a linear state machine. Each stage consumes the previous
//! stage's output; a fatal error ends the run in `Aborted` and is returned
//! together with the report built up to that point.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::catalog::UnitCatalog;
use crate::domain::error::SelectorError;
use crate::domain::{CommandResult, UnitId};
use crate::git::DiffProvider;
use crate::resolver::ChangeResolver;
use crate::runner::BuildRunner;
use crate::target::TargetResolver;

/// Pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Init,
    CheckClean,
    Diffing,
    Compiling,
    Resolving,
    Testing,
    Done,
    Aborted,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Aborted)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Init => "init",
            PipelineState::CheckClean => "check-clean",
            PipelineState::Diffing => "diffing",
            PipelineState::Compiling => "compiling",
            PipelineState::Resolving => "resolving",
            PipelineState::Testing => "testing",
            PipelineState::Done => "done",
            PipelineState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Why a run ended in `Aborted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// The working tree has modifications; the diff needs a committed state.
    UncommittedChanges,
    /// A fatal error in `stage`; the run returned a [`PipelineError`].
    StageFailed { stage: PipelineState },
}

/// Result of the test invocation. A red run is an outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestOutcome {
    Passed,
    Failed { exit_code: i32 },
}

/// A fatal error together with the stage it ended the run in.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: PipelineState,
    #[source]
    pub source: SelectorError,
    /// Everything recorded before the failure, ending in `Aborted`.
    pub report: Box<RunReport>,
}

type StageResult = Result<(), (PipelineState, SelectorError)>;

/// Summary of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// States visited, in order, ending with the terminal state.
    pub states: Vec<PipelineState>,
    pub current_branch: Option<String>,
    pub target_branch: Option<String>,
    pub changed_paths: Vec<String>,
    pub selected: Vec<UnitId>,
    pub abort_reason: Option<AbortReason>,
    pub test_outcome: Option<TestOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_result: Option<CommandResult>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            duration_ms: 0,
            states: vec![PipelineState::Init],
            current_branch: None,
            target_branch: None,
            changed_paths: Vec::new(),
            selected: Vec::new(),
            abort_reason: None,
            test_outcome: None,
            test_result: None,
        }
    }

    pub fn final_state(&self) -> PipelineState {
        self.states.last().copied().unwrap_or(PipelineState::Init)
    }

    /// Whether the run finished and, if tests ran, they passed.
    pub fn succeeded(&self) -> bool {
        self.final_state() == PipelineState::Done
            && !matches!(self.test_outcome, Some(TestOutcome::Failed { .. }))
    }

    fn enter(&mut self, state: PipelineState) {
        info!(from = %self.final_state(), to = %state, "Pipeline transition");
        self.states.push(state);
    }
}

/// Pipeline orchestrator over the diff, target, build and catalog collaborators.
pub struct Pipeline {
    diff: Arc<dyn DiffProvider>,
    target: Arc<dyn TargetResolver>,
    build: Arc<dyn BuildRunner>,
    resolver: ChangeResolver,
    class_roots: Vec<PathBuf>,
}

impl Pipeline {
    pub fn new(
        diff: Arc<dyn DiffProvider>,
        target: Arc<dyn TargetResolver>,
        build: Arc<dyn BuildRunner>,
        resolver: ChangeResolver,
        class_roots: Vec<PathBuf>,
    ) -> Self {
        Self {
            diff,
            target,
            build,
            resolver,
            class_roots,
        }
    }

    /// Execute the pipeline once.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let start = Instant::now();
        let mut report = RunReport::new();
        info!(run_id = %report.run_id, "Starting test selection");

        if let Err((stage, source)) = self.drive(&mut report).await {
            warn!(run_id = %report.run_id, stage = %stage, error = %source, "Test selection failed");
            report.abort_reason = Some(AbortReason::StageFailed { stage });
            report.enter(PipelineState::Aborted);
            report.duration_ms = start.elapsed().as_millis() as u64;
            return Err(PipelineError {
                stage,
                source,
                report: Box::new(report),
            });
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            run_id = %report.run_id,
            state = %report.final_state(),
            selected = report.selected.len(),
            duration_ms = report.duration_ms,
            "Test selection finished"
        );
        Ok(report)
    }

    async fn drive(&self, report: &mut RunReport) -> StageResult {
        // Init -> CheckClean
        let dirty = self
            .diff
            .has_uncommitted_changes()
            .await
            .map_err(at(PipelineState::CheckClean))?;
        if dirty {
            warn!("You have some uncommitted files. Commit or discard local changes in order to proceed");
            report.abort_reason = Some(AbortReason::UncommittedChanges);
            report.enter(PipelineState::Aborted);
            return Ok(());
        }
        report.enter(PipelineState::CheckClean);

        // CheckClean -> Diffing
        let branch = self
            .diff
            .current_branch()
            .await
            .map_err(at(PipelineState::Diffing))?;
        report.current_branch = Some(branch.clone());

        let target = self
            .target
            .target_branch_for(&branch)
            .await
            .map_err(at(PipelineState::Diffing))?;
        info!(branch = %branch, target = %target, "Resolved target branch");
        report.target_branch = Some(target.clone());

        let changed = self
            .diff
            .changed_paths(&target)
            .await
            .map_err(at(PipelineState::Diffing))?;
        report.enter(PipelineState::Diffing);
        if changed.is_empty() {
            info!("No changes detected");
            report.enter(PipelineState::Done);
            return Ok(());
        }
        info!(count = changed.len(), paths = ?changed, "Detected changes");
        report.changed_paths = changed;

        // Diffing -> Compiling
        let compiled = self
            .build
            .compile()
            .await
            .map_err(at(PipelineState::Compiling))?;
        if !compiled.success() {
            return Err((
                PipelineState::Compiling,
                SelectorError::BuildFailure {
                    exit_code: compiled.exit_code,
                    output: compiled.error_text().to_string(),
                },
            ));
        }
        report.enter(PipelineState::Compiling);

        // Compiling -> Resolving
        let catalog =
            UnitCatalog::load(&self.class_roots).map_err(at(PipelineState::Resolving))?;
        let selected = self
            .resolver
            .resolve(&report.changed_paths, &catalog)
            .map_err(at(PipelineState::Resolving))?;
        report.selected = selected.ids();
        report.enter(PipelineState::Resolving);
        if selected.is_empty() {
            info!("No test units affected by the changes");
            report.enter(PipelineState::Done);
            return Ok(());
        }

        // Resolving -> Testing
        let names = selected.canonical_names();
        let result = self
            .build
            .run_tests(&names)
            .await
            .map_err(at(PipelineState::Testing))?;
        report.enter(PipelineState::Testing);
        report.test_outcome = Some(if result.success() {
            TestOutcome::Passed
        } else {
            warn!(exit_code = result.exit_code, "Error testing changes");
            TestOutcome::Failed {
                exit_code: result.exit_code,
            }
        });
        report.test_result = Some(result);

        // Testing -> Done
        report.enter(PipelineState::Done);
        Ok(())
    }
}

fn at(stage: PipelineState) -> impl FnOnce(SelectorError) -> (PipelineState, SelectorError) {
    move |source| (stage, source)
}
