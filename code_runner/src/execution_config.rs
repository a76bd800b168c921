use std::path::PathBuf;
use std::time::Duration;
use util::config::AppConfig;
use util::http::RetryPolicy;

/// Runtime settings for acquiring and grading one submission.
#[derive(Debug, Clone)]
pub struct ExecutionConfig {
    /// Directory holding the shared, read-only assignment resources.
    pub assignment_root: PathBuf,
    /// Student identity used for the working directory layout and gradebook lookups.
    pub student_id: String,
    /// Grading engine executable (invoked as `<program> autograde <assignment>`).
    pub engine_program: String,
    /// Max wall time for one engine run.
    pub engine_timeout: Duration,
    pub download: RetryPolicy,
    /// Parent of the per-request working directories.
    pub work_root: PathBuf,
}

impl ExecutionConfig {
    pub fn from_app_config(cfg: &AppConfig) -> Self {
        Self {
            assignment_root: util::paths::absolute(&cfg.assignment_root),
            student_id: cfg.student_id.clone(),
            engine_program: cfg.engine_program.clone(),
            engine_timeout: cfg.engine_timeout(),
            download: RetryPolicy {
                attempts: cfg.download_attempts,
                backoff: Duration::from_secs(cfg.download_backoff_secs),
                timeout: Duration::from_secs(cfg.download_timeout_secs),
            },
            work_root: std::env::temp_dir(),
        }
    }
}
