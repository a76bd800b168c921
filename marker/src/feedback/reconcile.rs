//! # Reconciliation
//!
//! Maps the cells of a graded (possibly tampered) notebook back onto the tests defined by the
//! canonical released notebook.
//!
//! ## Rules
//!
//! - Every weighted test of the canonical notebook appears exactly once in the report, in the
//!   canonical cell order. Tests the submission no longer has are reported as missing.
//! - Cells of the submission are matched by `grade_id`. Tests with an id the canonical notebook
//!   does not define are kept in [`TestReport::unexpected`] and never rendered.
//! - Errors raised by ungraded cells are buffered and shown under "Other Errors" in front of the
//!   next test. Errors after the last test are dropped.
//! - Cells flagged as tests with zero points are not tests: they are treated like any other
//!   ungraded cell in both notebooks.
//! - Point values shown for a matched test come from the canonical notebook, so editing the
//!   metadata of a submitted cell cannot change what the report claims.

use super::fragments;
use crate::notebook::Notebook;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    /// Ran without raising; full points.
    Passed,
    /// Raised an error; zero points.
    Failed,
    /// A provided solution/task cell; shown as correct, zero points.
    NotGraded,
    /// Absent from the submission.
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestEntry {
    pub test_id: String,
    pub status: TestStatus,
    pub awarded: f64,
    pub max_points: f64,
    pub html: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestReport {
    /// One entry per canonical test, in canonical order.
    pub entries: Vec<TestEntry>,
    /// Submitted tests with no canonical counterpart (not rendered).
    pub unexpected: Vec<TestEntry>,
}

impl TestReport {
    /// The rendered report: canonical entries concatenated in order.
    pub fn to_html(&self) -> String {
        self.entries.iter().map(|e| e.html.as_str()).collect()
    }

    pub fn get(&self, test_id: &str) -> Option<&TestEntry> {
        self.entries.iter().find(|e| e.test_id == test_id)
    }

    /// Sum of points shown as awarded in the report.
    pub fn awarded(&self) -> f64 {
        self.entries.iter().map(|e| e.awarded).sum()
    }
}

/// Builds the per-test report of `submitted` against the layout of `canonical`.
pub fn reconcile(canonical: &Notebook, submitted: &Notebook) -> TestReport {
    let mut entries: Vec<TestEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for cell in &canonical.cells {
        let info = cell.grade_info();
        if !info.is_weighted_test() {
            continue;
        }
        let Some(test_id) = info.grade_id.filter(|id| !id.is_empty()) else {
            continue;
        };
        if index.contains_key(&test_id) {
            continue;
        }
        index.insert(test_id.clone(), entries.len());
        entries.push(TestEntry {
            html: fragments::missing(&test_id),
            test_id,
            status: TestStatus::Missing,
            awarded: 0.0,
            max_points: info.points,
        });
    }

    let mut unexpected = Vec::new();
    let mut pending_prefix = String::new();

    for cell in &submitted.cells {
        let info = cell.grade_info();
        if !info.is_weighted_test() {
            if let Some(traceback) = cell.last_error() {
                pending_prefix.push_str(&fragments::error_block(&traceback, true));
                pending_prefix.push('\n');
            }
            continue;
        }

        let test_id = info
            .grade_id
            .clone()
            .unwrap_or_else(|| "unknown".to_string());
        let slot = index.get(&test_id).copied();
        let max_points = slot.map_or(info.points, |i| entries[i].max_points);

        let (status, awarded, body) = match cell.last_error() {
            Some(traceback) => (
                TestStatus::Failed,
                0.0,
                fragments::failed(&test_id, max_points, &traceback),
            ),
            None if info.is_placeholder() => (
                TestStatus::NotGraded,
                0.0,
                fragments::placeholder(&test_id, max_points),
            ),
            None => (
                TestStatus::Passed,
                max_points,
                fragments::passed(&test_id, max_points),
            ),
        };

        let entry = TestEntry {
            html: format!("{}{}", fragments::other_errors(&pending_prefix), body),
            test_id,
            status,
            awarded,
            max_points,
        };
        pending_prefix.clear();

        match slot {
            Some(i) => entries[i] = entry,
            None => {
                debug!(test_id = %entry.test_id, "Ignoring test not defined by the assignment");
                unexpected.push(entry);
            }
        }
    }

    TestReport {
        entries,
        unexpected,
    }
}
