//! The grading pipeline for one request.
//!
//! Seeds a working directory, downloads and validates the submission, runs the grading engine and
//! marks the result. Every failure is converted into a zero-credit [`GradingResult`] here, so
//! callers never see an error. A panic while the engine runs or the result is marked is a grading
//! failure like any other.

use crate::grading::failure::GraderFailure;
use crate::grading::request::GradingRequest;
use futures::FutureExt;
use code_runner::acquisition::acquire_submission;
use code_runner::{
    ExecutionConfig, GradingEngine, GradingWorkspace, HttpFetcher, NbgraderEngine,
    SubmissionFetcher,
};
use marker::report::GradingResult;
use marker::{MarkedSubmission, NotebookMarkingJob};
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Reply returned to the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeReply {
    pub correct: bool,
    pub score: f64,
    pub msg: String,
}

impl From<&GradingResult> for GradeReply {
    fn from(result: &GradingResult) -> Self {
        Self {
            correct: result.is_correct(),
            score: result.score,
            msg: result.render(),
        }
    }
}

impl From<GraderFailure> for GradeReply {
    fn from(failure: GraderFailure) -> Self {
        GradeReply::from(&failure.into_result())
    }
}

/// Collaborators shared by every request.
#[derive(Clone)]
pub struct GradingContext {
    pub assignment_root: PathBuf,
    pub student_id: String,
    /// Parent of the per-request working directories.
    pub work_root: PathBuf,
    pub engine: Arc<dyn GradingEngine>,
    pub fetcher: Arc<dyn SubmissionFetcher>,
}

impl GradingContext {
    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self {
            assignment_root: config.assignment_root.clone(),
            student_id: config.student_id.clone(),
            work_root: config.work_root.clone(),
            engine: Arc::new(NbgraderEngine::new(
                config.engine_program.clone(),
                config.engine_timeout,
            )),
            fetcher: Arc::new(HttpFetcher::new(config.download.clone())),
        }
    }

    /// Grades one request. The working directory is removed before this returns.
    pub async fn grade(&self, request: &GradingRequest) -> GradingResult {
        match self.try_grade(request).await {
            Ok(result) => result,
            Err(failure) => failure.into_result(),
        }
    }

    pub async fn process(&self, request: &GradingRequest) -> GradeReply {
        GradeReply::from(&self.grade(request).await)
    }

    async fn try_grade(&self, request: &GradingRequest) -> Result<GradingResult, GraderFailure> {
        info!(assignment = %request.assignment, "GRADING START");

        let workspace = GradingWorkspace::prepare(
            &self.work_root,
            &self.assignment_root,
            &request.assignment,
            &self.student_id,
        )
        .map_err(GraderFailure::from_workspace)?;

        acquire_submission(&workspace, &request.submission_url, self.fetcher.as_ref())
            .await
            .map_err(|e| GraderFailure::from_acquisition(e, &request.submission_url))?;

        let marked = AssertUnwindSafe(self.autograde_and_mark(&workspace))
            .catch_unwind()
            .await
            .map_err(GraderFailure::from_grading_panic)??;

        info!(
            assignment = %request.assignment,
            points = marked.score.points,
            max_points = marked.score.max_points,
            "GRADING SUCCESS"
        );
        Ok(marked.result)
    }

    async fn autograde_and_mark(
        &self,
        workspace: &GradingWorkspace,
    ) -> Result<MarkedSubmission, GraderFailure> {
        self.engine
            .autograde(workspace.path(), workspace.assignment())
            .await
            .map_err(GraderFailure::from_engine)?;

        NotebookMarkingJob::new(workspace.path(), workspace.assignment(), &self.student_id)
            .mark()
            .await
            .map_err(GraderFailure::from_marker)
    }
}
