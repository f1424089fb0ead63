//! testpick - change-driven test selection CLI
//!
//! Runs only the test units a branch touches, directly or through
//! inheritance, instead of the whole suite.
//!
//! ## Commands
//!
//! - `run`: check the tree, diff against the merge target, build, select and test
//! - `select`: print the selection for given paths against existing build output
//! - `target`: print the merge target of the current branch

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use testpick_core::telemetry::level_for;
use testpick_core::{
    AbortReason, BuildToolConfig, ChangeResolver, DiffProvider, FixedTarget, GitCli, MavenRunner,
    Pipeline, PipelineState, ReviewConfig, ReviewTarget, RunReport, SelectorConfig,
    TargetResolver, TestOutcome, UnitCatalog, DEFAULT_CLASS_ROOTS,
};

#[derive(Parser)]
#[command(name = "testpick")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run only the tests a branch changes", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    project: ProjectArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Project layout, tooling and merge request lookup.
#[derive(Args, Debug, Clone)]
struct ProjectArgs {
    /// Project root; git and the build tool run here
    #[arg(long, global = true, default_value = ".")]
    work_dir: PathBuf,

    /// Repository-relative test source root
    #[arg(long, global = true, default_value = "src/test/java/")]
    test_root: String,

    /// Test source file extension
    #[arg(long, global = true, default_value = "java")]
    source_ext: String,

    /// Compiled output root (repeatable)
    #[arg(long = "class-root", global = true)]
    class_roots: Vec<PathBuf>,

    /// Git executable
    #[arg(long, global = true, env = "TESTPICK_GIT", default_value = "git")]
    git: String,

    /// Build tool executable
    #[arg(long, global = true, env = "TESTPICK_BUILD_TOOL", default_value = "mvn")]
    build_tool: String,

    /// Extra build tool argument (repeatable)
    #[arg(long = "build-arg", global = true, allow_hyphen_values = true)]
    build_args: Vec<String>,

    /// Build tool timeout in seconds (0 = none)
    #[arg(long, global = true, env = "TESTPICK_BUILD_TIMEOUT", default_value = "0")]
    build_timeout: u64,

    /// GitLab server URL
    #[arg(long, global = true, env = "GITLAB_SERVER")]
    gitlab_server: Option<String>,

    /// GitLab API token
    #[arg(long, global = true, env = "GITLAB_TOKEN", hide_env_values = true)]
    gitlab_token: Option<String>,

    /// GitLab project id
    #[arg(long, global = true, env = "GITLAB_PROJECT_ID", allow_hyphen_values = true)]
    gitlab_project_id: Option<i64>,

    /// Diff against this branch instead of asking GitLab
    #[arg(long, global = true)]
    target: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the project and run the tests affected by the branch
    Run {
        /// Write the run report as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Print the units selected for the given changed paths
    Select {
        /// Print a JSON array instead of one name per line
        #[arg(long)]
        json_output: bool,

        /// Repository-relative changed paths
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Print the merge target of the current branch
    Target,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    testpick_core::init_tracing(cli.json, level_for(cli.verbose));

    let config = selector_config(&cli.project, cli.verbose);

    match cli.command {
        Commands::Run { report } => cmd_run(&config, report.as_deref()).await,
        Commands::Select { json_output, paths } => cmd_select(&config, &paths, json_output),
        Commands::Target => cmd_target(&config).await,
    }
}

/// Fold command-line arguments into a [`SelectorConfig`].
fn selector_config(args: &ProjectArgs, verbose: bool) -> SelectorConfig {
    let class_roots = if args.class_roots.is_empty() {
        DEFAULT_CLASS_ROOTS.iter().map(PathBuf::from).collect()
    } else {
        args.class_roots.clone()
    };

    SelectorConfig {
        work_dir: args.work_dir.clone(),
        test_source_root: args.test_root.clone(),
        source_extension: args.source_ext.clone(),
        class_roots,
        git_executable: args.git.clone(),
        build: BuildToolConfig {
            executable: args.build_tool.clone(),
            work_dir: args.work_dir.clone(),
            extra_args: args.build_args.clone(),
            timeout_secs: args.build_timeout,
            verbose,
        },
        review: ReviewConfig {
            server_url: args.gitlab_server.clone(),
            token: args.gitlab_token.clone(),
            project_id: args.gitlab_project_id,
        },
        target_branch: args.target.clone(),
        verbose,
    }
}

/// GitLab settings are only checked when the target branch is needed.
fn target_resolver(config: &SelectorConfig) -> Arc<dyn TargetResolver> {
    match &config.target_branch {
        Some(branch) => Arc::new(FixedTarget(branch.clone())),
        None => Arc::new(ReviewTarget::new(config.review.clone())),
    }
}

/// Run the full selection pipeline
async fn cmd_run(config: &SelectorConfig, report_path: Option<&Path>) -> Result<()> {
    let git = GitCli::with_executable(&config.git_executable, &config.work_dir);
    let pipeline = Pipeline::new(
        Arc::new(git),
        target_resolver(config),
        Arc::new(MavenRunner::new(config.build.clone())),
        ChangeResolver::new(config.layout()),
        config.resolved_class_roots(),
    );

    println!("Selecting tests in {:?}", config.work_dir);
    println!();

    let report = match pipeline.run().await {
        Ok(report) => report,
        Err(err) => {
            print_report(&err.report);
            if let Some(path) = report_path {
                write_report(&err.report, path)?;
                println!("\nReport written to {}", path.display());
            }
            return Err(anyhow::Error::new(err).context("Test selection failed"));
        }
    };

    print_report(&report);

    if let Some(path) = report_path {
        write_report(&report, path)?;
        println!("\nReport written to {}", path.display());
    }

    if report.abort_reason == Some(AbortReason::UncommittedChanges) {
        anyhow::bail!("Run aborted: commit or discard local changes first");
    }
    if !report.succeeded() {
        anyhow::bail!("Selected tests failed");
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("Run ID: {}", report.run_id);
    if let (Some(current), Some(target)) = (&report.current_branch, &report.target_branch) {
        println!("Branch: {} -> {}", current, target);
    }
    println!("Changed files: {}", report.changed_paths.len());
    println!("Duration: {}ms", report.duration_ms);
    println!();

    if report.selected.is_empty() {
        println!("No test units selected.");
    } else {
        println!("Selected {} test unit(s):", report.selected.len());
        for id in &report.selected {
            println!("  - {}", id.canonical_name());
        }
    }

    let status = match (&report.test_outcome, report.final_state()) {
        (_, PipelineState::Aborted) => "✗ ABORTED".to_string(),
        (Some(TestOutcome::Failed { exit_code }), _) => format!("✗ FAILED (exit code: {exit_code})"),
        (Some(TestOutcome::Passed), _) => "✓ PASSED".to_string(),
        (None, _) => "✓ NOTHING TO RUN".to_string(),
    };
    println!();
    println!("Status: {}", status);
}

fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write run report to {}", path.display()))?;
    Ok(())
}

/// Resolve the given paths against the already-compiled output.
fn select_units(config: &SelectorConfig, paths: &[String]) -> Result<Vec<String>> {
    let roots = config.resolved_class_roots();
    let catalog = UnitCatalog::load(roots.as_slice()).context("Failed to load compiled units")?;
    info!(units = catalog.len(), "Catalog loaded");

    let selection = ChangeResolver::new(config.layout())
        .resolve(paths, &catalog)
        .context("Failed to resolve changed paths")?;
    Ok(selection.canonical_names())
}

fn cmd_select(config: &SelectorConfig, paths: &[String], json: bool) -> Result<()> {
    let names = select_units(config, paths)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&names)?);
    } else {
        for name in &names {
            println!("{}", name);
        }
    }
    Ok(())
}

/// Print the resolved target branch
async fn cmd_target(config: &SelectorConfig) -> Result<()> {
    let git = GitCli::with_executable(&config.git_executable, &config.work_dir);
    let branch = git
        .current_branch()
        .await
        .context("Failed to read current branch")?;
    let target = target_resolver(config)
        .target_branch_for(&branch)
        .await
        .with_context(|| format!("Failed to resolve merge target of '{branch}'"))?;
    println!("{}", target);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use testpick_core::catalog::encode_header;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    fn write_class(root: &Path, name: &str, parent: &str, flags: u16) {
        let path = root.join(format!("{name}.class"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, encode_header(name, Some(parent), flags)).unwrap();
    }

    #[test]
    fn test_run_defaults() {
        let cli = parse(&["testpick", "run"]);
        let config = selector_config(&cli.project, cli.verbose);

        assert_eq!(config.work_dir, PathBuf::from("."));
        assert_eq!(config.test_source_root, "src/test/java/");
        assert_eq!(config.source_extension, "java");
        assert_eq!(
            config.class_roots,
            vec![
                PathBuf::from("target/test-classes"),
                PathBuf::from("target/classes")
            ]
        );
        assert!(config.build.extra_args.is_empty());
        assert!(config.target_branch.is_none());
        assert!(matches!(cli.command, Commands::Run { report: None }));
    }

    #[test]
    fn test_flags_after_subcommand() {
        let cli = parse(&[
            "testpick",
            "run",
            "--report",
            "out.json",
            "--work-dir",
            "/repo",
            "--build-tool",
            "./mvnw",
            "--build-arg",
            "-q",
            "--build-arg",
            "-o",
            "--class-root",
            "build/classes",
            "--target",
            "develop",
            "--verbose",
        ]);
        let config = selector_config(&cli.project, cli.verbose);

        assert!(config.verbose);
        assert!(config.build.verbose);
        assert_eq!(config.build.executable, "./mvnw");
        assert_eq!(config.build.work_dir, PathBuf::from("/repo"));
        assert_eq!(config.build.extra_args, vec!["-q", "-o"]);
        assert_eq!(config.class_roots, vec![PathBuf::from("build/classes")]);
        assert_eq!(config.target_branch.as_deref(), Some("develop"));
        assert_eq!(
            config.resolved_class_roots(),
            vec![PathBuf::from("/repo/build/classes")]
        );
    }

    #[test]
    fn test_gitlab_flags_build_review_config() {
        let cli = parse(&[
            "testpick",
            "target",
            "--gitlab-server",
            "https://gitlab.example.com",
            "--gitlab-token",
            "secret",
            "--gitlab-project-id",
            "42",
        ]);
        let config = selector_config(&cli.project, cli.verbose);

        assert_eq!(
            config.review,
            ReviewConfig::new("https://gitlab.example.com", "secret", 42)
        );
        assert!(config.review.validate().is_ok());
    }

    #[tokio::test]
    async fn test_fixed_target_skips_gitlab() {
        let cli = parse(&["testpick", "run", "--target", "develop"]);
        let config = selector_config(&cli.project, cli.verbose);
        let target = target_resolver(&config)
            .target_branch_for("feature/x")
            .await
            .unwrap();
        assert_eq!(target, "develop");
    }

    #[tokio::test]
    async fn test_negative_project_id_is_rejected_before_lookup() {
        let cli = parse(&[
            "testpick",
            "target",
            "--gitlab-server",
            "https://gitlab.example.com",
            "--gitlab-token",
            "secret",
            "--gitlab-project-id",
            "-1",
        ]);
        let config = selector_config(&cli.project, cli.verbose);
        assert_eq!(config.review.project_id, Some(-1));
        let err = target_resolver(&config)
            .target_branch_for("feature/x")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn test_select_requires_paths() {
        assert!(Cli::try_parse_from(["testpick", "select"]).is_err());
    }

    #[test]
    fn test_select_units_from_compiled_output() {
        let dir = tempfile::tempdir().unwrap();
        let classes = dir.path().join("target/test-classes");
        write_class(&classes, "app/BaseTest", "java/lang/Object", 0x0421);
        write_class(&classes, "app/FooTest", "app/BaseTest", 0x0021);
        write_class(&classes, "app/BarTest", "app/BaseTest", 0x0021);

        let cli = parse(&[
            "testpick",
            "select",
            "--work-dir",
            dir.path().to_str().unwrap(),
            "src/test/java/app/BaseTest.java",
            "README.md",
        ]);
        let Commands::Select { paths, .. } = &cli.command else {
            panic!("expected select");
        };
        let config = selector_config(&cli.project, cli.verbose);

        let names = select_units(&config, paths).unwrap();
        assert_eq!(names, vec!["app.BarTest", "app.FooTest"]);
    }

    #[test]
    fn test_select_units_unknown_unit_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = SelectorConfig {
            work_dir: dir.path().to_path_buf(),
            ..SelectorConfig::default()
        };

        let err = select_units(&config, &["src/test/java/app/MissingTest.java".to_string()])
            .unwrap_err();
        assert!(format!("{err:#}").contains("app.MissingTest"));
    }

    #[test]
    fn test_write_report_round_trips_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report: RunReport = serde_json::from_value(serde_json::json!({
            "run_id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "started_at": "2026-01-01T00:00:00Z",
            "duration_ms": 5,
            "states": ["init", "check_clean", "diffing", "done"],
            "current_branch": "feature/x",
            "target_branch": "main",
            "changed_paths": [],
            "selected": [],
            "abort_reason": null,
            "test_outcome": null
        }))
        .unwrap();

        write_report(&report, &path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["states"][3], "done");
        assert_eq!(written["target_branch"], "main");
    }
}
