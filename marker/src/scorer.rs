//! # Scorer Module
//!
//! Turns the raw `(points, max_points)` pair read from the gradebook into a validated
//! [`CodeScore`], and formats point values for display.

use crate::error::MarkerError;

/// The code score of one graded submission.
///
/// Construction guarantees `max_points > 0`, so [`CodeScore::ratio`] never divides by zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodeScore {
    pub points: f64,
    pub max_points: f64,
}

impl CodeScore {
    /// Validates the pair read from the gradebook.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError::ZeroMaxScore`] when `max_points` is zero, negative or not a
    /// number: the assignment is misconfigured and no ratio exists.
    pub fn new(assignment: &str, points: f64, max_points: f64) -> Result<Self, MarkerError> {
        if !max_points.is_finite() || max_points <= 0.0 {
            return Err(MarkerError::ZeroMaxScore(assignment.to_string()));
        }
        Ok(Self {
            points: if points.is_finite() { points } else { 0.0 },
            max_points,
        })
    }

    /// Score as a ratio clamped to `[0, 1]`.
    pub fn ratio(&self) -> f64 {
        (self.points / self.max_points).clamp(0.0, 1.0)
    }

    /// Full marks.
    pub fn is_correct(&self) -> bool {
        self.points >= self.max_points
    }
}

/// Formats a point value, dropping the fraction when it is integral (`2.0` → `2`, `2.5` → `2.5`).
pub fn format_points(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Formats a ratio as a whole percentage (`0.4` → `40%`).
pub fn format_percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}
