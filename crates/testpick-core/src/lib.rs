//! testpick Core Library
//!
//! Change-driven test selection: diff the branch against its merge target,
//! map changed test sources to compiled units, pull in every unit that
//! inherits from a changed one, and run only those.

pub mod catalog;
pub mod config;
pub mod domain;
pub mod fakes;
pub mod git;
pub mod pipeline;
pub mod process;
pub mod resolver;
pub mod runner;
pub mod target;
pub mod telemetry;

pub use catalog::{DeclaredUnit, UnitCatalog};
pub use config::{SelectorConfig, DEFAULT_CLASS_ROOTS};
pub use domain::{
    CommandResult, ExecutionSet, Result, SelectorError, TestSourceLayout, Unit, UnitId,
};
pub use git::{DiffProvider, GitCli};
pub use pipeline::{AbortReason, Pipeline, PipelineError, PipelineState, RunReport, TestOutcome};
pub use resolver::ChangeResolver;
pub use runner::{BuildRunner, BuildStage, BuildToolConfig, MavenRunner};
pub use target::{gitlab_resolver, FixedTarget, ReviewTarget, TargetResolver};
pub use telemetry::init_tracing;

pub use review_resolver::ReviewConfig;
