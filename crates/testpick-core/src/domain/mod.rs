//! Domain models for testpick.
//!
//! Canonical definitions for the core entities:
//! - `UnitId` / `Unit`: a compiled test construct and its name
//! - `TestSourceLayout`: mapping from changed source paths to unit ids
//! - `ExecutionSet`: the deduplicated selection handed to the test runner
//! - `CommandResult`: captured output of an external tool

pub mod command;
pub mod error;
pub mod unit;

// Re-export main types and errors
pub use command::CommandResult;
pub use error::{Result, SelectorError};
pub use unit::{ExecutionSet, TestSourceLayout, Unit, UnitId};
