//! HTML fragments for the per-test feedback report.
//!
//! Every fragment is a pure function of its inputs so the same notebook always renders to
//! byte-identical HTML.

use crate::ansi::{ansi_to_html, escape_html};
use crate::scorer::format_points;

/// Display number of a test: `q2-1-test` → `q2.1`, `test3` → `3`.
pub fn display_number(test_id: &str) -> String {
    test_id.replace("-test", "").replace("test", "").replace('-', ".")
}

/// A colourised `<pre>` block for a traceback.
///
/// With `whole_traceback` every frame is shown, otherwise only the last line (the exception
/// summary).
pub fn error_block(traceback: &[String], whole_traceback: bool) -> String {
    let text = if whole_traceback {
        traceback.join("\n")
    } else {
        traceback.last().cloned().unwrap_or_else(|| "Unknown error".to_string())
    };
    format!("<pre>{}</pre>", ansi_to_html(&text))
}

const CORRECT: &str = r#"<pre><span style="font-weight: bold; color: #00aa00">Correct</span></pre>"#;

fn test_block(test_id: &str, points: f64, max_points: f64, body: &str) -> String {
    format!(
        "\n<h4>Test {} (score: {}/{})</h4>\n{}\n<hr>\n",
        escape_html(&display_number(test_id)),
        format_points(points),
        format_points(max_points),
        body
    )
}

/// A test whose cell ran without raising.
pub fn passed(test_id: &str, max_points: f64) -> String {
    test_block(test_id, max_points, max_points, CORRECT)
}

/// A provided solution/task cell that ran cleanly: marked correct, never scored.
pub fn placeholder(test_id: &str, max_points: f64) -> String {
    test_block(test_id, 0.0, max_points, CORRECT)
}

/// A test whose cell raised; only the exception summary is shown.
pub fn failed(test_id: &str, max_points: f64, traceback: &[String]) -> String {
    test_block(test_id, 0.0, max_points, &error_block(traceback, false))
}

/// A canonical test the submission no longer contains.
pub fn missing(test_id: &str) -> String {
    format!(
        "\n<h4>Test {} (MISSING!)</h4>\n<pre style=\"color: #aa0000\">\n\
         You probably deleted the cell containing this test.\n\
         To fix this, download a fresh copy of the notebook file\n\
         and copy your solutions into the fresh notebook.\n\
         </pre>\n<hr>\n",
        escape_html(&display_number(test_id))
    )
}

/// Errors raised by free code between two tests, shown before the next test.
pub fn other_errors(prefix: &str) -> String {
    if prefix.is_empty() {
        String::new()
    } else {
        format!("\n<h4>Other Errors</h4>\n{prefix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_number_strips_test_markers() {
        assert_eq!(display_number("q2-1-test"), "q2.1");
        assert_eq!(display_number("test3"), "3");
        assert_eq!(display_number("1-2"), "1.2");
        assert_eq!(display_number("t1"), "t1");
    }

    #[test]
    fn test_passed_fragment_awards_full_points() {
        let html = passed("t1", 2.0);
        assert!(html.contains("<h4>Test t1 (score: 2/2)</h4>"));
        assert!(html.contains("Correct"));
    }

    #[test]
    fn test_placeholder_fragment_is_correct_with_no_points() {
        let html = placeholder("q1-test", 4.0);
        assert!(html.contains("<h4>Test q1 (score: 0/4)</h4>"));
        assert!(html.contains(">Correct</span>"));
    }

    #[test]
    fn test_failed_fragment_shows_last_frame_only() {
        let tb = vec!["frame one".to_string(), "AssertionError: nope".to_string()];
        let html = failed("t2", 3.0, &tb);
        assert!(html.contains("<h4>Test t2 (score: 0/3)</h4>"));
        assert!(html.contains("AssertionError: nope"));
        assert!(!html.contains("frame one"));
    }

    #[test]
    fn test_error_block_whole_traceback() {
        let tb = vec!["frame one".to_string(), "NameError: x".to_string()];
        assert_eq!(error_block(&tb, true), "<pre>frame one\nNameError: x</pre>");
    }

    #[test]
    fn test_missing_fragment() {
        let html = missing("q1-test");
        assert!(html.contains("<h4>Test q1 (MISSING!)</h4>"));
        assert!(html.contains("You probably deleted the cell containing this test."));
    }

    #[test]
    fn test_other_errors_label_only_when_non_empty() {
        assert_eq!(other_errors(""), "");
        assert!(other_errors("<pre>x</pre>").starts_with("\n<h4>Other Errors</h4>\n"));
    }
}
