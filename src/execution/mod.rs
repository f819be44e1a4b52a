//! Isolated execution of generated code in a subprocess.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::process::Command;

/// Outcome of one execution attempt. `output` is captured stdout on
/// success and captured stderr on failure.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
}

/// Seam for running a block of code out of process. A timeout can be
/// layered on by wrapping an implementation without changing the contract.
pub trait Executor {
    async fn execute(&self, code: &str) -> Result<ExecutionResult>;
}

#[derive(Debug, Clone)]
pub struct PythonExecutor {
    python_bin: String,
    scratch_root: Option<PathBuf>,
}

impl PythonExecutor {
    pub fn new(python_bin: impl Into<String>) -> Self {
        Self { python_bin: python_bin.into(), scratch_root: None }
    }

    /// Place per-run scratch directories under `root` instead of the
    /// system temp dir.
    #[allow(dead_code)]
    pub fn with_scratch_root(mut self, root: PathBuf) -> Self {
        self.scratch_root = Some(root);
        self
    }

    fn scratch_dir(&self) -> Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("datalyst-exec-");
        let dir = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        dir.context("failed to create scratch directory")
    }
}

impl Executor for PythonExecutor {
    async fn execute(&self, code: &str) -> Result<ExecutionResult> {
        // The scratch dir is removed when `dir` drops, on every exit path.
        let dir = self.scratch_dir()?;
        let source = dir.path().join("candidate.py");
        std::fs::write(&source, code).context("failed to persist candidate code")?;

        let output = Command::new(&self.python_bin)
            .arg(&source)
            .output()
            .await
            .with_context(|| format!("failed to run interpreter '{}'", self.python_bin))?;

        let success = output.status.success();
        let text = if success {
            String::from_utf8_lossy(&output.stdout).into_owned()
        } else {
            String::from_utf8_lossy(&output.stderr).into_owned()
        };
        Ok(ExecutionResult { success, output: text })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn python_bin() -> Option<String> {
        for candidate in ["python3", "python"] {
            let probe = std::process::Command::new(candidate).arg("--version").output();
            if probe.map(|o| o.status.success()).unwrap_or(false) {
                return Some(candidate.to_string());
            }
        }
        None
    }

    #[tokio::test]
    async fn captures_stdout_on_success() {
        let Some(py) = python_bin() else { return };
        let result = PythonExecutor::new(py).execute("print(\"ok\")").await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "ok\n");
    }

    #[tokio::test]
    async fn captures_stderr_on_failure() {
        let Some(py) = python_bin() else { return };
        let result = PythonExecutor::new(py)
            .execute("raise RuntimeError(\"boom\")")
            .await
            .unwrap();
        assert!(!result.success);
        assert!(!result.output.is_empty());
        assert!(result.output.contains("boom"));
    }

    #[tokio::test]
    async fn scratch_space_is_removed_on_both_paths() {
        let Some(py) = python_bin() else { return };
        let root = tempfile::tempdir().unwrap();
        let exec = PythonExecutor::new(py).with_scratch_root(root.path().to_path_buf());

        exec.execute("print(1)").await.unwrap();
        exec.execute("raise ValueError()").await.unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(root.path()).unwrap().collect();
        assert!(leftovers.is_empty(), "scratch dirs should be cleaned up");
    }

    #[tokio::test]
    async fn missing_interpreter_is_an_error_not_a_result() {
        let exec = PythonExecutor::new("definitely-not-an-interpreter");
        assert!(exec.execute("print(1)").await.is_err());
    }
}
