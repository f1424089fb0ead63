//! Selector configuration shared by the CLI and the pipeline.

use std::path::{Path, PathBuf};

use review_resolver::ReviewConfig;
use serde::{Deserialize, Serialize};

use crate::domain::TestSourceLayout;
use crate::runner::BuildToolConfig;

/// Compiled-output roots searched when no roots are configured.
pub const DEFAULT_CLASS_ROOTS: [&str; 2] = ["target/test-classes", "target/classes"];

/// Everything one selection run needs to know about the project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectorConfig {
    /// Repository / project root; git and the build tool run here.
    pub work_dir: PathBuf,

    /// Repository-relative test source root.
    pub test_source_root: String,

    /// Test source file extension.
    pub source_extension: String,

    /// Compiled-output roots, relative to `work_dir` unless absolute.
    pub class_roots: Vec<PathBuf>,

    /// Git executable.
    pub git_executable: String,

    pub build: BuildToolConfig,

    pub review: ReviewConfig,

    /// Fixed target branch; skips the merge request lookup when set.
    pub target_branch: Option<String>,

    pub verbose: bool,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            test_source_root: "src/test/java/".to_string(),
            source_extension: "java".to_string(),
            class_roots: DEFAULT_CLASS_ROOTS.iter().map(PathBuf::from).collect(),
            git_executable: "git".to_string(),
            build: BuildToolConfig::default(),
            review: ReviewConfig::default(),
            target_branch: None,
            verbose: false,
        }
    }
}

impl SelectorConfig {
    pub fn layout(&self) -> TestSourceLayout {
        TestSourceLayout::new(&self.test_source_root, &self.source_extension)
    }

    /// Class roots anchored at the working directory.
    pub fn resolved_class_roots(&self) -> Vec<PathBuf> {
        self.class_roots
            .iter()
            .map(|root| anchor(&self.work_dir, root))
            .collect()
    }
}

fn anchor(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
