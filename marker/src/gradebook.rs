//! # Gradebook
//!
//! Reads the code score the grading engine persisted into the per-request SQLite gradebook.
//!
//! The score of one grade is its manual score when set, otherwise its automatic score,
//! otherwise zero. Only grades of code cells count; the maximum is the sum of the max scores of
//! those same cells.

use crate::error::MarkerError;
use async_trait::async_trait;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbBackend, Statement};
use std::path::Path;
use tracing::debug;

/// Source of the persisted `(points, max_points)` pair for a graded submission.
#[async_trait]
pub trait ScoreSource: Send + Sync {
    async fn code_score(
        &self,
        workdir: &Path,
        assignment: &str,
        student: &str,
    ) -> Result<(f64, f64), MarkerError>;
}

/// Reads `gradebook.db` inside the working directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteGradebook;

const SUBMISSION_SQL: &str = "\
SELECT sa.id AS id
FROM submitted_assignment sa
JOIN assignment a ON sa.assignment_id = a.id
WHERE a.name = ? AND sa.student_id = ?";

const CODE_SCORE_SQL: &str = "\
SELECT CAST(COALESCE(SUM(COALESCE(g.manual_score, g.auto_score, 0.0)), 0.0) AS REAL) AS score,
       CAST(COALESCE(SUM(gc.max_score), 0.0) AS REAL) AS max_score
FROM grade g
JOIN grade_cells gc ON g.cell_id = gc.id
JOIN submitted_notebook sn ON g.notebook_id = sn.id
WHERE sn.assignment_id = ? AND gc.cell_type = 'code'";

fn db_error(e: impl std::fmt::Display) -> MarkerError {
    MarkerError::Gradebook(e.to_string())
}

async fn connect(path: &Path) -> Result<DatabaseConnection, MarkerError> {
    if !path.is_file() {
        return Err(MarkerError::Gradebook(format!(
            "gradebook not found at {}",
            path.display()
        )));
    }
    Database::connect(format!("sqlite://{}?mode=ro", path.display()))
        .await
        .map_err(db_error)
}

/// Looks up the code score of `(assignment, student)` in the gradebook at `path`.
pub async fn read_code_score(
    path: &Path,
    assignment: &str,
    student: &str,
) -> Result<(f64, f64), MarkerError> {
    let db = connect(path).await?;

    let submission = db
        .query_one(Statement::from_sql_and_values(
            DbBackend::Sqlite,
            SUBMISSION_SQL,
            [assignment.into(), student.into()],
        ))
        .await
        .map_err(db_error)?
        .ok_or_else(|| MarkerError::MissingSubmission {
            assignment: assignment.to_string(),
            student: student.to_string(),
        })?;
    let submission_id: String = submission.try_get("", "id").map_err(db_error)?;

    let row = db
        .query_one(Statement::from_sql_and_values(
            DbBackend::Sqlite,
            CODE_SCORE_SQL,
            [submission_id.into()],
        ))
        .await
        .map_err(db_error)?
        .ok_or_else(|| MarkerError::Gradebook("empty score query result".to_string()))?;

    let score: f64 = row.try_get("", "score").map_err(db_error)?;
    let max_score: f64 = row.try_get("", "max_score").map_err(db_error)?;
    debug!(assignment, student, score, max_score, "Read code score from gradebook");

    if let Err(e) = db.close().await {
        debug!(error = %e, "Failed to close gradebook connection");
    }
    Ok((score, max_score))
}

#[async_trait]
impl ScoreSource for SqliteGradebook {
    async fn code_score(
        &self,
        workdir: &Path,
        assignment: &str,
        student: &str,
    ) -> Result<(f64, f64), MarkerError> {
        read_code_score(&util::paths::gradebook(workdir), assignment, student).await
    }
}
