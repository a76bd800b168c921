//! Failure taxonomy.
//!
//! Every way a request can fail maps to one stable numeric code. Operators correlate logs by the
//! code; students only ever see the public message built here.

use code_runner::acquisition::AcquisitionError;
use code_runner::validate_files::SubmissionFileError;
use code_runner::{EngineError, WorkspaceError};
use marker::error::MarkerError;
use marker::report::GradingResult;
use std::any::Any;
use std::fmt;
use tracing::warn;

use crate::grading::request::RequestError;

const INTERNAL_ERROR: &str = "Internal grader error";
const CORRUPT_FILE: &str = "An error occurred during grading.  You may have submitted the wrong \
                            file or the file is corrupted.";
const GRADING_ERROR: &str = "An error occurred during grading.  You may have submitted the wrong \
                             file or your code may have taken too long to run or used too much \
                             memory.";
const WORKER_TIMEOUT: &str = "An error occurred during grading.  Your code may have taken too \
                              long to run or used too much memory.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureCode {
    MalformedRequest,
    InsecureUrl,
    WorkspaceSetup,
    DownloadExhausted,
    NotUtf8,
    InvalidJson,
    Unreadable,
    GradingFailed,
    ZeroMaxScore,
    WorkerUnreachable,
    WorkerError,
    WorkerTimeout,
}

impl FailureCode {
    pub fn code(self) -> u16 {
        match self {
            FailureCode::MalformedRequest => 323,
            FailureCode::InsecureUrl => 312,
            FailureCode::WorkspaceSetup => 530,
            FailureCode::DownloadExhausted => 950,
            FailureCode::NotUtf8 => 669,
            FailureCode::InvalidJson => 788,
            FailureCode::Unreadable => 370,
            FailureCode::GradingFailed => 383,
            FailureCode::ZeroMaxScore => 461,
            FailureCode::WorkerUnreachable => 903,
            FailureCode::WorkerError => 914,
            FailureCode::WorkerTimeout => 924,
        }
    }

    /// Message shown to the student.
    pub fn public_message(self) -> &'static str {
        match self {
            FailureCode::NotUtf8 | FailureCode::InvalidJson => CORRUPT_FILE,
            FailureCode::GradingFailed => GRADING_ERROR,
            FailureCode::WorkerTimeout => WORKER_TIMEOUT,
            _ => INTERNAL_ERROR,
        }
    }

    /// Whether the student is asked to contact the course administrators.
    ///
    /// Failures a student can plausibly cause themselves do not.
    pub fn contact_admin(self) -> bool {
        !matches!(
            self,
            FailureCode::NotUtf8
                | FailureCode::InvalidJson
                | FailureCode::GradingFailed
                | FailureCode::WorkerTimeout
        )
    }
}

/// Best-effort text of a panic payload.
pub fn panic_text(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panicked with a non-string payload".to_string()
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A classified failure carrying the operator-facing context.
#[derive(Debug, Clone)]
pub struct GraderFailure {
    pub code: FailureCode,
    /// Operator message, logged but never shown to the student.
    pub detail: String,
    /// Debug form of the underlying error, if any.
    pub cause: Option<String>,
}

impl GraderFailure {
    pub fn new(code: FailureCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: &impl fmt::Debug) -> Self {
        self.cause = Some(format!("{cause:?}"));
        self
    }

    /// Student-facing message for this failure at `ctime`.
    pub fn student_message(&self, ctime: &str) -> String {
        let public = self.code.public_message();
        if self.code.contact_admin() {
            format!(
                "Please contact the course administrators to fix the problem, along with the \
                 following information: <pre>{public} ({ctime}, error code {})</pre>",
                self.code
            )
        } else {
            public.to_string()
        }
    }

    /// Logs the failure and converts it into a zero-credit result.
    pub fn into_result(self) -> GradingResult {
        warn!(
            "GRADER ERROR {}: {} ({})",
            self.code,
            self.detail,
            self.cause.as_deref().unwrap_or("None")
        );
        let ctime = chrono::Local::now().format("%a %b %e %H:%M:%S %Y").to_string();
        GradingResult::failed(self.student_message(&ctime))
    }

    pub fn from_request(err: RequestError) -> Self {
        GraderFailure::new(
            FailureCode::MalformedRequest,
            "incorrect grader content from the queue",
        )
        .with_cause(&err)
    }

    pub fn from_workspace(err: WorkspaceError) -> Self {
        GraderFailure::new(
            FailureCode::WorkspaceSetup,
            "cannot prepare the working directory",
        )
        .with_cause(&err)
    }

    pub fn from_acquisition(err: AcquisitionError, url: &str) -> Self {
        let (code, detail) = match &err {
            AcquisitionError::InsecureUrl(_) => (
                FailureCode::InsecureUrl,
                format!("invalid submitted file download URL ({url})"),
            ),
            AcquisitionError::Download(_) => (
                FailureCode::DownloadExhausted,
                format!("cannot download submitted file from the queue ({url})"),
            ),
            AcquisitionError::File(SubmissionFileError::NotUtf8) => (
                FailureCode::NotUtf8,
                format!("cannot decode submitted file as text ({url})"),
            ),
            AcquisitionError::File(SubmissionFileError::InvalidJson { preview, .. }) => (
                FailureCode::InvalidJson,
                format!("cannot parse JSON of submitted file ({url}, {preview:?})"),
            ),
            AcquisitionError::File(SubmissionFileError::Unreadable(_)) => (
                FailureCode::Unreadable,
                format!("cannot read submitted file from disk ({url})"),
            ),
        };
        GraderFailure::new(code, detail).with_cause(&err)
    }

    pub fn from_engine(err: EngineError) -> Self {
        GraderFailure::new(
            FailureCode::GradingFailed,
            "error during auto-grading, feedback generation, or grade output",
        )
        .with_cause(&err)
    }

    /// A panic raised while the engine ran or while the result was marked.
    pub fn from_grading_panic(payload: Box<dyn Any + Send>) -> Self {
        GraderFailure::new(
            FailureCode::GradingFailed,
            "error during auto-grading, feedback generation, or grade output",
        )
        .with_cause(&panic_text(payload.as_ref()))
    }

    pub fn from_marker(err: MarkerError) -> Self {
        let failure = match &err {
            MarkerError::ZeroMaxScore(_) => GraderFailure::new(
                FailureCode::ZeroMaxScore,
                "assignment has a zero maximum score",
            ),
            _ => GraderFailure::new(
                FailureCode::GradingFailed,
                "error during auto-grading, feedback generation, or grade output",
            ),
        };
        failure.with_cause(&err)
    }
}
