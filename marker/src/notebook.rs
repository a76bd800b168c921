//! # Notebook Model
//!
//! A minimal, lenient view of an nbformat v4 notebook: just the parts reconciliation needs.
//! Unknown fields are ignored. The `nbgrader` metadata block is read loosely because the
//! submitted notebook is untrusted and its metadata may have been edited by hand; a field with
//! the wrong type is treated as absent rather than failing the whole file.

use crate::error::MarkerError;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Notebook {
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub cell_type: String,
    #[serde(default)]
    pub metadata: CellMetadata,
    #[serde(default)]
    pub outputs: Vec<Output>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CellMetadata {
    #[serde(default)]
    pub nbgrader: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Output {
    #[serde(default)]
    pub output_type: String,
    #[serde(default)]
    pub traceback: Option<Vec<String>>,
}

/// The `nbgrader` flags of one cell, with absent or mistyped fields defaulted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradeInfo {
    pub grade: bool,
    pub grade_id: Option<String>,
    pub points: f64,
    pub solution: bool,
    pub task: bool,
}

impl GradeInfo {
    /// A graded test that carries weight. Zero-point cells are never treated as tests.
    pub fn is_weighted_test(&self) -> bool {
        self.grade && self.points > 0.0
    }

    /// Provided solution or task cells are displayed but never award points.
    pub fn is_placeholder(&self) -> bool {
        self.solution || self.task
    }
}

impl Notebook {
    pub fn from_json(raw: &str) -> Result<Self, MarkerError> {
        serde_json::from_str(raw).map_err(|e| MarkerError::InvalidJson(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, MarkerError> {
        let raw = fs::read_to_string(path)
            .map_err(|e| MarkerError::IoError(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| MarkerError::InvalidJson(format!("{}: {e}", path.display())))
    }
}

impl Cell {
    pub fn grade_info(&self) -> GradeInfo {
        let Some(Value::Object(meta)) = &self.metadata.nbgrader else {
            return GradeInfo::default();
        };
        let flag = |key: &str| meta.get(key).and_then(Value::as_bool).unwrap_or(false);
        GradeInfo {
            grade: flag("grade"),
            grade_id: meta
                .get("grade_id")
                .and_then(Value::as_str)
                .map(str::to_string),
            points: meta.get("points").and_then(Value::as_f64).unwrap_or(0.0),
            solution: flag("solution"),
            task: flag("task"),
        }
    }

    /// Traceback lines of the last error output, if the cell raised.
    ///
    /// An error output without a usable traceback reads as `Unknown error`.
    pub fn last_error(&self) -> Option<Vec<String>> {
        self.outputs
            .iter()
            .rev()
            .find(|o| o.output_type == "error")
            .map(|o| match &o.traceback {
                Some(lines) if !lines.is_empty() => lines.clone(),
                _ => vec!["Unknown error".to_string()],
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_info_reads_nbgrader_block() {
        let nb = Notebook::from_json(
            r#"{"cells": [{"cell_type": "code", "metadata": {"nbgrader": {
                "grade": true, "grade_id": "q1-test", "points": 2, "solution": false}},
                "outputs": [], "source": "assert True"}]}"#,
        )
        .unwrap();
        let info = nb.cells[0].grade_info();
        assert!(info.grade);
        assert_eq!(info.grade_id.as_deref(), Some("q1-test"));
        assert_eq!(info.points, 2.0);
        assert!(info.is_weighted_test());
        assert!(!info.is_placeholder());
    }

    #[test]
    fn test_mistyped_metadata_is_defaulted() {
        let nb = Notebook::from_json(
            r#"{"cells": [{"metadata": {"nbgrader": {"grade": "yes", "points": "many"}}}]}"#,
        )
        .unwrap();
        assert_eq!(nb.cells[0].grade_info(), GradeInfo::default());
    }

    #[test]
    fn test_zero_point_test_is_not_weighted() {
        let info = GradeInfo {
            grade: true,
            points: 0.0,
            ..GradeInfo::default()
        };
        assert!(!info.is_weighted_test());
    }

    #[test]
    fn test_last_error_prefers_latest_output() {
        let nb = Notebook::from_json(
            r#"{"cells": [{"outputs": [
                {"output_type": "error", "traceback": ["first"]},
                {"output_type": "stream", "text": "hi"},
                {"output_type": "error", "traceback": ["a", "second"]}]}]}"#,
        )
        .unwrap();
        assert_eq!(nb.cells[0].last_error(), Some(vec!["a".into(), "second".into()]));
    }

    #[test]
    fn test_error_without_traceback_is_unknown() {
        let nb = Notebook::from_json(r#"{"cells": [{"outputs": [{"output_type": "error"}]}]}"#)
            .unwrap();
        assert_eq!(nb.cells[0].last_error(), Some(vec!["Unknown error".into()]));
    }

    #[test]
    fn test_missing_cells_is_invalid() {
        assert!(matches!(
            Notebook::from_json(r#"{"metadata": {}}"#),
            Err(MarkerError::InvalidJson(_))
        ));
    }
}
