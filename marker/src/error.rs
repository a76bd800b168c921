//! Marker Error Types
//!
//! This module defines the [`MarkerError`] enum, which covers everything that can go wrong while
//! turning the grading engine's output into feedback and a score: reading notebooks, decoding
//! them, and looking the score up in the per-request gradebook.
//!
//! # Example
//!
//! ```rust
//! use marker::error::MarkerError;
//!
//! fn check_max(assignment: &str, max_points: f64) -> Result<(), MarkerError> {
//!     if max_points <= 0.0 {
//!         return Err(MarkerError::ZeroMaxScore(assignment.to_string()));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Represents all error types that can occur in the marker system.
#[derive(Debug, Error)]
pub enum MarkerError {
    /// A notebook file could not be read from disk.
    #[error("cannot read notebook: {0}")]
    IoError(String),
    /// A notebook file is not valid nbformat JSON.
    #[error("invalid notebook JSON: {0}")]
    InvalidJson(String),
    /// The gradebook database could not be opened or queried.
    #[error("gradebook error: {0}")]
    Gradebook(String),
    /// The gradebook holds no submission for the assignment/student pair.
    #[error("no submission for assignment '{assignment}' and student '{student}' in gradebook")]
    MissingSubmission { assignment: String, student: String },
    /// The assignment's maximum code score is zero, so no ratio can be computed.
    #[error("assignment '{0}' has a maximum code score of zero")]
    ZeroMaxScore(String),
}
