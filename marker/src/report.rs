//! # Grading Report Module
//!
//! This module defines the [`GradingResult`] produced for every request, successful or not,
//! and renders it into the HTML message returned to the queue.
//!
//! ## Overview
//!
//! - A successful result carries the code score and the per-test feedback HTML. When the
//!   submission did not earn full marks, a fixed block of debugging tips is appended.
//! - A failed result carries zero points out of a fixed denominator of 100 and an error
//!   message already safe to show to the student.
//! - [`GradingResult::render`] wraps either kind in the outer result template.

use crate::scorer::{CodeScore, format_percent, format_points};
use serde::Serialize;

/// Denominator reported for failed gradings.
pub const FAILED_POSSIBLE: f64 = 100.0;

/// Appended to the feedback whenever the submission lost points.
pub const DEBUGGING_TIPS: &str = r#"
<h4>Tips</h4>
<ul>
<li>Before you submit, make sure everything runs as expected.  From the Jupyter menu bar select <b>Kernel > Restart &amp; Run All</b>.</li>
<li>Remember to save the notebook before uploading the file.</li>
<li>Check that your installed version of each Python package is the correct version.  Run <pre>!pip show package_name
!pip install package_name==1.2.3</pre></li>
<li>If many tests in a row fail, an error while executing the solution right before may prevent all these tests from completing.  Check for typos or mistakes in the solution.</li>
</ul>
"#;

/// Outcome of grading one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradingResult {
    pub grader_failed: bool,
    /// Student-facing error message (HTML); empty on success.
    pub error_msg: String,
    pub points: f64,
    pub possible: f64,
    /// Ratio in `[0, 1]`.
    pub score: f64,
    pub feedback_html: String,
}

impl GradingResult {
    /// A completed grading. Tips are appended when the score is below full marks.
    pub fn success(score: &CodeScore, feedback_html: String) -> Self {
        let feedback_html = if score.is_correct() {
            feedback_html
        } else {
            format!("{feedback_html}{DEBUGGING_TIPS}")
        };
        Self {
            grader_failed: false,
            error_msg: String::new(),
            points: score.points,
            possible: score.max_points,
            score: score.ratio(),
            feedback_html,
        }
    }

    /// A grading that could not complete.
    pub fn failed(error_msg: impl Into<String>) -> Self {
        Self {
            grader_failed: true,
            error_msg: error_msg.into(),
            points: 0.0,
            possible: FAILED_POSSIBLE,
            score: 0.0,
            feedback_html: String::new(),
        }
    }

    pub fn is_correct(&self) -> bool {
        self.points >= self.possible
    }

    fn label(&self) -> &'static str {
        if self.is_correct() {
            "Correct"
        } else if self.points > 0.0 {
            "Partially correct"
        } else {
            "Incorrect"
        }
    }

    /// Renders the final HTML message.
    pub fn render(&self) -> String {
        if self.grader_failed {
            return format!(
                r#"
<div class="test">
<h3>Error during grading:</h3>
  <section>
    <div class="shortform">
      <br>
      {errors}
    </div>
    <div class="longform">
      {results}
      <br>
    </div>
  </section>
</div>
"#,
                errors = self.error_msg,
                results = self.feedback_html,
            );
        }

        let status = format!(
            "<b>{}<br />Total score: {} ({}/{})</b>",
            self.label(),
            format_percent(self.score),
            format_points(self.points),
            format_points(self.possible)
        );
        format!(
            r#"
<div class="test">
<h3>Notebook output and hidden test results:</h3>
  <section>
    <div class="shortform">
      <br>
      {status}
    </div>
    <div class="longform">
      {errors}
      {results}
      <br>
    </div>
  </section>
</div>
"#,
            errors = self.error_msg,
            results = self.feedback_html,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_score_renders_label_and_tips() {
        let score = CodeScore::new("lab", 2.0, 5.0).unwrap();
        let result = GradingResult::success(&score, "<p>fb</p>".to_string());
        assert!(!result.is_correct());
        assert!(result.feedback_html.ends_with(DEBUGGING_TIPS));

        let html = result.render();
        assert!(html.contains("<b>Partially correct<br />Total score: 40% (2/5)</b>"));
        assert!(html.contains("<p>fb</p>"));
        assert!(html.contains("Notebook output and hidden test results:"));
    }

    #[test]
    fn test_full_score_has_no_tips() {
        let score = CodeScore::new("lab", 5.0, 5.0).unwrap();
        let result = GradingResult::success(&score, "fb".to_string());
        assert!(result.is_correct());
        assert_eq!(result.feedback_html, "fb");
        assert!(result.render().contains("<b>Correct<br />Total score: 100% (5/5)</b>"));
    }

    #[test]
    fn test_zero_score_is_incorrect() {
        let score = CodeScore::new("lab", 0.0, 4.0).unwrap();
        let html = GradingResult::success(&score, String::new()).render();
        assert!(html.contains("<b>Incorrect<br />Total score: 0% (0/4)</b>"));
    }

    #[test]
    fn test_failed_result_uses_error_template() {
        let result = GradingResult::failed("Something broke");
        assert_eq!(result.points, 0.0);
        assert_eq!(result.possible, FAILED_POSSIBLE);
        assert_eq!(result.score, 0.0);
        assert!(!result.is_correct());

        let html = result.render();
        assert!(html.contains("<h3>Error during grading:</h3>"));
        assert!(html.contains("Something broke"));
        assert!(!html.contains("Total score"));
    }
}
