//! Request supervision.
//!
//! [`Supervisor::grade`] accepts a raw queue record and always returns a well-formed reply. Each
//! request is graded in its own worker so that a crash, hang or memory blow-up while grading one
//! submission only costs that submission. Workers are admitted through a FIFO slot queue.
//!
//! A worker process runs in its own process group with `TMPDIR` pointing at a scratch directory
//! owned by the supervisor. Whatever way the worker ends, the group is killed and the scratch
//! directory (with any working directory left inside it) is removed.

use crate::grading::failure::{FailureCode, GraderFailure};
use crate::grading::pipeline::{GradeReply, GradingContext};
use crate::grading::request::{GradingRequest, XQueueContent};
use crate::manager::queue::{Queue, SlotStats};
use crate::manager::worker::{run_guarded, WorkerMessage};
use code_runner::ExecutionConfig;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use util::config::AppConfig;
use util::metrics::{GraderMetrics, MetricsSnapshot};

/// Where a request is graded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsolationMode {
    /// A fresh worker process per request.
    Process { program: PathBuf },
    /// A task inside the supervisor process. Panics are contained, crashes are not.
    InProcess,
}

#[derive(Clone)]
pub struct Supervisor {
    context: GradingContext,
    mode: IsolationMode,
    worker_timeout: Duration,
    queue: Arc<Mutex<Queue>>,
    metrics: Arc<GraderMetrics>,
}

impl Supervisor {
    pub fn new(
        context: GradingContext,
        mode: IsolationMode,
        max_concurrent: usize,
        worker_timeout: Duration,
    ) -> Self {
        Self {
            context,
            mode,
            worker_timeout,
            queue: Arc::new(Mutex::new(Queue::new(max_concurrent))),
            metrics: Arc::new(GraderMetrics::new()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let mode = if config.isolate_per_request {
            IsolationMode::Process {
                program: config.worker_program.clone(),
            }
        } else {
            IsolationMode::InProcess
        };
        Self::new(
            GradingContext::from_config(&ExecutionConfig::from_app_config(config)),
            mode,
            config.max_concurrent_workers,
            config.worker_timeout(),
        )
    }

    pub fn mode(&self) -> &IsolationMode {
        &self.mode
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub async fn slots(&self) -> SlotStats {
        self.queue.lock().await.stats()
    }

    /// Grades one queue record. Never fails.
    pub async fn grade(&self, content: &XQueueContent) -> GradeReply {
        self.metrics.process_item();

        let request = match GradingRequest::parse(content) {
            Ok(request) => request,
            Err(err) => {
                if err.is_payload_error() {
                    self.metrics.payload_error();
                    debug!(body = %content.xqueue_body, "Cannot decode grader payload");
                } else if err.counts_as_reply() {
                    self.metrics.reply();
                }
                return GraderFailure::from_request(err).into();
            }
        };

        // Slot bookkeeping runs on its own task so a dropped caller cannot leak a slot.
        let this = self.clone();
        let task = tokio::spawn(async move { this.grade_in_slot(request).await });
        match task.await {
            Ok(reply) => reply,
            Err(err) => GraderFailure::new(FailureCode::WorkerError, "supervisor task failed")
                .with_cause(&err)
                .into(),
        }
    }

    async fn grade_in_slot(&self, request: GradingRequest) -> GradeReply {
        let maybe_notify = {
            let mut queue = self.queue.lock().await;
            queue.try_acquire_slot()
        };
        if let Some(notify) = maybe_notify {
            debug!(assignment = %request.assignment, "Waiting for a free worker slot");
            notify.notified().await;
        }

        let start = Instant::now();
        let outcome = match &self.mode {
            IsolationMode::Process { program } => self.run_process(program, &request).await,
            IsolationMode::InProcess => self.run_task(&request).await,
        };
        self.metrics.grading_time(start.elapsed());

        {
            let mut queue = self.queue.lock().await;
            queue.release_slot();
        }

        match outcome {
            Ok(reply) => {
                self.metrics.reply();
                reply
            }
            Err(failure) => failure.into(),
        }
    }

    fn timed_out(&self) -> GraderFailure {
        GraderFailure::new(
            FailureCode::WorkerTimeout,
            format!("worker exceeded {:?} and was killed", self.worker_timeout),
        )
    }

    async fn run_task(&self, request: &GradingRequest) -> Result<GradeReply, GraderFailure> {
        match timeout(
            self.worker_timeout,
            run_guarded(self.context.clone(), request.clone()),
        )
        .await
        {
            Ok(message) => from_message(message),
            Err(_) => Err(self.timed_out()),
        }
    }

    async fn run_process(
        &self,
        program: &Path,
        request: &GradingRequest,
    ) -> Result<GradeReply, GraderFailure> {
        let scratch = tempfile::Builder::new()
            .prefix("grade-worker-")
            .tempdir_in(&self.context.work_root)
            .map_err(|e| {
                GraderFailure::new(
                    FailureCode::WorkspaceSetup,
                    "cannot create worker scratch directory",
                )
                .with_cause(&e)
            })?;

        let outcome = self.run_worker(program, &scratch, request).await;

        let path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            warn!(scratch = %path.display(), error = %e, "Failed to remove worker scratch directory");
        }
        outcome
    }

    async fn run_worker(
        &self,
        program: &Path,
        scratch: &TempDir,
        request: &GradingRequest,
    ) -> Result<GradeReply, GraderFailure> {
        let lost = |detail: &str, err: &dyn std::fmt::Debug| {
            GraderFailure::new(FailureCode::WorkerUnreachable, detail).with_cause(&err)
        };

        let input = serde_json::to_vec(request)
            .map_err(|e| lost("cannot encode request for worker", &e))?;

        let mut child = Command::new(program)
            .env("TMPDIR", scratch.path())
            .process_group(0)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| lost("cannot start worker process", &e))?;
        let pgid = child.id();
        info!(pid = ?pgid, assignment = %request.assignment, "Started grading worker");

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| GraderFailure::new(FailureCode::WorkerUnreachable, "worker has no stdin"))?;

        let exchange = async move {
            stdin.write_all(&input).await?;
            stdin.shutdown().await?;
            drop(stdin);
            child.wait_with_output().await
        };

        let waited = timeout(self.worker_timeout, exchange).await;
        kill_group(pgid);

        let output = match waited {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(lost("queue wait error", &e)),
            Err(_) => return Err(self.timed_out()),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout.lines().rev().find(|l| !l.trim().is_empty());
        let message = match line.map(serde_json::from_str::<WorkerMessage>) {
            Some(Ok(message)) => message,
            Some(Err(e)) => return Err(lost("unreadable reply from worker", &e)),
            None => {
                return Err(lost(
                    "worker exited without a reply",
                    &output.status,
                ))
            }
        };
        from_message(message)
    }
}

/// Kills every process still in the worker's process group.
///
/// The worker leads its own group, so this also reaches the grading engine and its kernels.
fn kill_group(pgid: Option<u32>) {
    let Some(pgid) = pgid.and_then(|id| libc::pid_t::try_from(id).ok()) else {
        return;
    };
    // SAFETY: killpg takes no pointers; the group was created for this worker by process_group(0).
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc == 0 {
        debug!(pgid, "Killed leftover worker processes");
    }
}

fn from_message(message: WorkerMessage) -> Result<GradeReply, GraderFailure> {
    match message {
        WorkerMessage::Reply { reply } => Ok(reply),
        WorkerMessage::Error { message } => Err(GraderFailure::new(
            FailureCode::WorkerError,
            "uncaught error occurred",
        )
        .with_cause(&message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use code_runner::HttpFetcher;
    use code_runner::NbgraderEngine;

    fn supervisor(mode: IsolationMode) -> Supervisor {
        let context = GradingContext {
            assignment_root: "/nonexistent".into(),
            student_id: "student".into(),
            work_root: std::env::temp_dir(),
            engine: Arc::new(NbgraderEngine::new("true", Duration::from_secs(5))),
            fetcher: Arc::new(HttpFetcher::default()),
        };
        Supervisor::new(context, mode, 2, Duration::from_secs(30))
    }

    fn content(body: &str, files: &str) -> XQueueContent {
        XQueueContent {
            xqueue_body: body.into(),
            xqueue_files: files.into(),
        }
    }

    #[tokio::test]
    async fn test_payload_error_is_counted() {
        let sup = supervisor(IsolationMode::InProcess);
        let reply = sup
            .grade(&content(r#"{"grader_payload": "{oops"}"#, "{}"))
            .await;
        assert!(!reply.correct);
        assert_eq!(reply.score, 0.0);
        assert!(reply.msg.contains("error code 323"));

        let m = sup.metrics();
        assert_eq!(m.processed, 1);
        assert_eq!(m.payload_errors, 1);
        assert_eq!(m.replies, 0);
        assert_eq!(sup.slots().await.running, 0);
    }

    #[tokio::test]
    async fn test_missing_name_never_reaches_a_worker() {
        let sup = supervisor(IsolationMode::Process {
            program: "/nonexistent/worker".into(),
        });
        let reply = sup
            .grade(&content(
                r#"{"grader_payload": "{}"}"#,
                r#"{"lab.ipynb": "https://example.com/x"}"#,
            ))
            .await;
        assert!(reply.msg.contains("error code 323"));
        assert!(reply.msg.contains("contact the course administrators"));
        assert_eq!(sup.metrics().graded, 0);
        assert_eq!(sup.metrics().replies, 1);
    }

    #[tokio::test]
    async fn test_malformed_records_are_not_replies() {
        let sup = supervisor(IsolationMode::InProcess);
        for (body, files) in [
            ("not json", "{}"),
            ("{}", "{}"),
            (r#"{"grader_payload": "{\"name\": \"lab\"}"}"#, "not json"),
        ] {
            let reply = sup.grade(&content(body, files)).await;
            assert!(reply.msg.contains("error code 323"));
        }
        let m = sup.metrics();
        assert_eq!(m.processed, 3);
        assert_eq!((m.payload_errors, m.replies), (0, 0));
    }

    #[tokio::test]
    async fn test_unstartable_worker_reports_903() {
        let sup = supervisor(IsolationMode::Process {
            program: "/nonexistent/worker".into(),
        });
        let reply = sup
            .grade(&content(
                r#"{"grader_payload": "{\"name\": \"lab\"}"}"#,
                r#"{"lab.ipynb": "https://example.com/x"}"#,
            ))
            .await;
        assert!(!reply.correct);
        assert!(reply.msg.contains("error code 903"));
        assert_eq!(sup.slots().await.running, 0);
        assert_eq!(sup.metrics().replies, 0);
    }

    #[test]
    fn test_worker_error_message_maps_to_914() {
        let err = from_message(WorkerMessage::Error {
            message: "boom".into(),
        })
        .unwrap_err();
        assert_eq!(err.code, FailureCode::WorkerError);
        assert_eq!(err.cause.as_deref(), Some("\"boom\""));
    }
}
