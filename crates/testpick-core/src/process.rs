//! External command execution with captured output.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::debug;

use crate::domain::CommandResult;

/// A fully specified external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub work_dir: PathBuf,
    /// Timeout in seconds; 0 waits for the tool indefinitely.
    pub timeout_secs: u64,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            work_dir: work_dir.into(),
            timeout_secs: 0,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Command line as a single display string.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Run the command to completion and capture both streams.
///
/// A non-zero exit is not an error here; callers interpret the exit code.
pub async fn execute(spec: &CommandSpec) -> std::io::Result<CommandResult> {
    let start = Instant::now();
    debug!(
        command = %spec.command_line(),
        work_dir = %spec.work_dir.display(),
        "Running command"
    );

    let child = Command::new(&spec.program)
        .args(&spec.args)
        .current_dir(&spec.work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let output = if spec.timeout_secs > 0 {
        tokio::time::timeout(
            Duration::from_secs(spec.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| {
            std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!(
                    "{} timed out after {} seconds",
                    spec.program, spec.timeout_secs
                ),
            )
        })??
    } else {
        child.wait_with_output().await?
    };

    let result = CommandResult {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    };

    debug!(
        program = %spec.program,
        exit_code = result.exit_code,
        duration_ms = start.elapsed().as_millis() as u64,
        "Command finished"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_simple_command() {
        let spec = CommandSpec::new("echo", ".").args(["hello"]);
        let result = execute(&spec).await.expect("execute failed");
        assert!(result.success());
        assert!(result.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_execute_failing_command() {
        let spec = CommandSpec::new("false", ".");
        let result = execute(&spec).await.expect("execute failed");
        assert!(!result.success());
        assert_ne!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn test_execute_missing_program_is_io_error() {
        let spec = CommandSpec::new("definitely-not-a-real-binary-testpick", ".");
        assert!(execute(&spec).await.is_err());
    }

    #[tokio::test]
    async fn test_execute_times_out() {
        let mut spec = CommandSpec::new("sleep", ".").args(["5"]);
        spec.timeout_secs = 1;
        let err = execute(&spec).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);
    }

    #[test]
    fn test_command_line() {
        let spec = CommandSpec::new("mvn", ".").args(["install", "-DskipTests=true"]);
        assert_eq!(spec.command_line(), "mvn install -DskipTests=true");
    }
}
