//! Invoking the external notebook grading engine.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Longest stderr tail kept in [`EngineError::Failed`].
const STDERR_TAIL: usize = 2000;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start grading engine `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("grading engine exited with code {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("grading engine did not finish within {0:?}")]
    TimedOut(Duration),
}

/// Executes the submitted notebook and records results in the working directory.
///
/// On success the graded notebook exists at `autograded/<student>/<assignment>/<assignment>.ipynb`
/// and the working directory's gradebook holds the scores.
#[async_trait]
pub trait GradingEngine: Send + Sync {
    async fn autograde(&self, workdir: &Path, assignment: &str) -> Result<(), EngineError>;
}

/// Runs `<program> autograde <assignment>` inside the working directory.
#[derive(Debug, Clone)]
pub struct NbgraderEngine {
    pub program: String,
    pub timeout: Duration,
}

impl NbgraderEngine {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

fn tail(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        text.to_string()
    } else {
        text.chars().skip(count - max).collect()
    }
}

#[async_trait]
impl GradingEngine for NbgraderEngine {
    async fn autograde(&self, workdir: &Path, assignment: &str) -> Result<(), EngineError> {
        debug!(program = %self.program, assignment, "Starting grading engine");

        let child = Command::new(&self.program)
            .arg("autograde")
            .arg(assignment)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let output = match timeout(self.timeout, child.wait_with_output()).await {
            Ok(res) => res.map_err(|source| EngineError::Spawn {
                program: self.program.clone(),
                source,
            })?,
            Err(_) => {
                warn!(assignment, "Grading engine timed out, killing it");
                return Err(EngineError::TimedOut(self.timeout));
            }
        };

        if output.status.success() {
            debug!(
                stdout = %String::from_utf8_lossy(&output.stdout),
                "Grading engine finished"
            );
            Ok(())
        } else {
            Err(EngineError::Failed {
                code: output.status.code(),
                stderr: tail(&String::from_utf8_lossy(&output.stderr), STDERR_TAIL),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    /// A working directory whose `autograde` script is run by `sh autograde <assignment>`.
    fn workdir_with_script(body: &str) -> TempDir {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("autograde"), body).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_runs_in_workdir_with_arguments() {
        let workdir = workdir_with_script(r#"echo "$0 $1" > invoked.txt"#);
        let engine = NbgraderEngine::new("sh", Duration::from_secs(10));

        engine.autograde(workdir.path(), "lab1").await.unwrap();
        let invoked = fs::read_to_string(workdir.path().join("invoked.txt")).unwrap();
        assert_eq!(invoked.trim(), "autograde lab1");
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_stderr() {
        let workdir = workdir_with_script("echo 'kernel died' >&2\nexit 3\n");
        let engine = NbgraderEngine::new("sh", Duration::from_secs(10));

        match engine.autograde(workdir.path(), "lab1").await {
            Err(EngineError::Failed { code, stderr }) => {
                assert_eq!(code, Some(3));
                assert!(stderr.contains("kernel died"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let workdir = workdir_with_script("sleep 30\n");
        let engine = NbgraderEngine::new("sh", Duration::from_millis(200));

        let err = engine.autograde(workdir.path(), "lab1").await.unwrap_err();
        assert!(matches!(err, EngineError::TimedOut(_)));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let workdir = tempdir().unwrap();
        let engine = NbgraderEngine::new("/nonexistent/engine", Duration::from_secs(1));
        let err = engine.autograde(workdir.path(), "lab1").await.unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));
    }

    #[test]
    fn test_tail_keeps_end() {
        assert_eq!(tail("abcdef", 3), "def");
        assert_eq!(tail("ab", 3), "ab");
    }
}
