//! # Marker Library
//!
//! This crate turns the output of the external notebook grading engine into student feedback
//! and a final score.
//!
//! ## Key Concepts
//! - **NotebookMarkingJob**: marks one graded submission inside its working directory.
//! - **Reconciliation**: maps the graded notebook back onto the canonical released notebook so
//!   every test is reported once, in authored order, even if the student deleted or reordered
//!   cells.
//! - **Score source**: the `(points, max_points)` pair the engine persisted into the gradebook.
//! - **Report**: the HTML message returned to the caller.

pub mod ansi;
pub mod error;
pub mod feedback;
pub mod gradebook;
pub mod notebook;
pub mod report;
pub mod scorer;
pub mod test_utils;

use crate::error::MarkerError;
use crate::feedback::reconcile::{TestReport, reconcile};
use crate::gradebook::{ScoreSource, SqliteGradebook};
use crate::notebook::Notebook;
use crate::report::GradingResult;
use crate::scorer::CodeScore;

use std::path::PathBuf;
use tracing::info;
use util::paths;

/// Everything produced by marking one submission.
#[derive(Debug, Clone)]
pub struct MarkedSubmission {
    pub report: TestReport,
    pub score: CodeScore,
    pub result: GradingResult,
}

/// Marks one submission that the grading engine has already processed.
///
/// The working directory must contain the canonical notebook under `release/`, the graded
/// notebook under `autograded/<student>/` and the updated gradebook.
pub struct NotebookMarkingJob<'a> {
    workdir: PathBuf,
    assignment: String,
    student: String,
    scores: Box<dyn ScoreSource + 'a>,
}

impl<'a> NotebookMarkingJob<'a> {
    pub fn new(workdir: impl Into<PathBuf>, assignment: &str, student: &str) -> Self {
        Self {
            workdir: workdir.into(),
            assignment: assignment.to_string(),
            student: student.to_string(),
            scores: Box::new(SqliteGradebook),
        }
    }

    /// Read scores from somewhere other than the working directory's gradebook.
    pub fn with_score_source<S: ScoreSource + 'a>(mut self, scores: S) -> Self {
        self.scores = Box::new(scores);
        self
    }

    /// Run reconciliation and score lookup.
    ///
    /// # Errors
    /// * Notebook read/parse failures.
    /// * Gradebook failures, including [`MarkerError::ZeroMaxScore`] for a misconfigured
    ///   assignment.
    pub async fn mark(self) -> Result<MarkedSubmission, MarkerError> {
        let canonical = Notebook::load(&paths::release_notebook(&self.workdir, &self.assignment))?;
        let graded = Notebook::load(&paths::autograded_notebook(
            &self.workdir,
            &self.student,
            &self.assignment,
        ))?;

        let report = reconcile(&canonical, &graded);
        if !report.unexpected.is_empty() {
            info!(
                assignment = %self.assignment,
                count = report.unexpected.len(),
                "Submission contains tests not defined by the assignment"
            );
        }

        let (points, max_points) = self
            .scores
            .code_score(&self.workdir, &self.assignment, &self.student)
            .await?;
        let score = CodeScore::new(&self.assignment, points, max_points)?;
        let result = GradingResult::success(&score, report.to_html());

        Ok(MarkedSubmission {
            report,
            score,
            result,
        })
    }
}
