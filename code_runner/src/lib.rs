//! Preparing, acquiring and executing one notebook submission.
//!
//! A request flows through [`workspace::GradingWorkspace::prepare`],
//! [`acquisition::acquire_submission`] and finally a [`engine::GradingEngine`], after which the
//! working directory holds everything the marker needs.

pub mod acquisition;
pub mod engine;
pub mod execution_config;
pub mod validate_files;
pub mod workspace;

pub use acquisition::{AcquisitionError, HttpFetcher, SubmissionFetcher};
pub use engine::{EngineError, GradingEngine, NbgraderEngine};
pub use execution_config::ExecutionConfig;
pub use workspace::{GradingWorkspace, WORKDIR_PREFIX, WorkspaceError};
