//! Global grader configuration manager.
//!
//! `AppConfig` is a lazily initialized, globally accessible singleton containing
//! runtime configuration values loaded from environment variables. It provides
//! thread-safe access and mutation for testing or overrides in runtime environments.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{OnceLock, RwLock};
use std::time::Duration;

/// Name of the worker binary looked up next to the running executable.
pub const WORKER_BINARY_NAME: &str = "grade-worker";

/// Represents the complete grader configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub project_name: String,
    pub log_level: String,
    pub log_file: String,
    pub log_to_stdout: bool,
    pub host: String,
    pub port: u16,
    /// Directory holding `gradebook.db`, `nbgrader_config.py`, `source/` and `release/`.
    pub assignment_root: PathBuf,
    /// Student identity used inside every per-request working directory.
    pub student_id: String,
    pub engine_program: String,
    pub engine_timeout_secs: u64,
    pub worker_program: PathBuf,
    pub worker_timeout_secs: u64,
    pub isolate_per_request: bool,
    pub max_concurrent_workers: usize,
    pub download_attempts: u32,
    pub download_backoff_secs: u64,
    pub download_timeout_secs: u64,
}

/// Lazily-initialized, thread-safe singleton instance of `AppConfig`.
static CONFIG_INSTANCE: OnceLock<RwLock<AppConfig>> = OnceLock::new();

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

fn parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// The worker binary installed alongside the current executable.
fn default_worker_program() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(WORKER_BINARY_NAME)))
        .unwrap_or_else(|| PathBuf::from(WORKER_BINARY_NAME))
}

impl AppConfig {
    /// Loads the configuration from `.env` and environment variables.
    ///
    /// Every key has a default; values that fail to parse fall back to it.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            project_name: var_or("PROJECT_NAME", "notebook-grader"),
            log_level: var_or("LOG_LEVEL", "info"),
            log_file: var_or("LOG_FILE", "grader.log"),
            log_to_stdout: var_or("LOG_TO_STDOUT", "false") == "true",
            host: var_or("HOST", "127.0.0.1"),
            port: parsed_or("PORT", 3010),
            assignment_root: PathBuf::from(var_or("ASSIGNMENT_ROOT", "relocate")),
            student_id: var_or("STUDENT_ID", "student"),
            engine_program: var_or("ENGINE_PROGRAM", "nbgrader"),
            engine_timeout_secs: parsed_or("ENGINE_TIMEOUT_SECS", 600),
            worker_program: env::var("WORKER_PROGRAM")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_worker_program()),
            worker_timeout_secs: parsed_or("WORKER_TIMEOUT_SECS", 900),
            isolate_per_request: var_or("ISOLATE_PER_REQUEST", "true") != "false",
            max_concurrent_workers: parsed_or("MAX_CONCURRENT_WORKERS", 4).max(1),
            download_attempts: parsed_or("DOWNLOAD_ATTEMPTS", 3).max(1),
            download_backoff_secs: parsed_or("DOWNLOAD_BACKOFF_SECS", 5),
            download_timeout_secs: parsed_or("DOWNLOAD_TIMEOUT_SECS", 60),
        }
    }

    /// Returns a snapshot of the global configuration.
    ///
    /// A poisoned lock still yields the last written value.
    pub fn global() -> AppConfig {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        match lock.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Resets the configuration by reloading from environment variables.
    ///
    /// Useful in tests to clear overrides.
    pub fn reset() {
        AppConfig::set_field(|cfg| *cfg = AppConfig::from_env());
    }

    /// Generic internal setter for any field in the config.
    fn set_field<F>(setter: F)
    where
        F: FnOnce(&mut AppConfig),
    {
        let lock = CONFIG_INSTANCE.get_or_init(|| RwLock::new(AppConfig::from_env()));
        let mut guard = match lock.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        setter(&mut guard);
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }

    pub fn worker_timeout(&self) -> Duration {
        Duration::from_secs(self.worker_timeout_secs)
    }

    // --- Per-field setters below ---

    pub fn set_student_id(value: impl Into<String>) {
        AppConfig::set_field(|cfg| cfg.student_id = value.into());
    }

    pub fn set_worker_timeout_secs(value: u64) {
        AppConfig::set_field(|cfg| cfg.worker_timeout_secs = value);
    }
}
