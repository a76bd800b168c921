//! Grader counters and timings.
//!
//! Each update is emitted as a `tracing` event with target `metrics`, so an
//! external collector can scrape the log stream, and is also kept in memory for
//! the `/stats` endpoint.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

pub const PROCESS_ITEM: &str = "process-item";
pub const PAYLOAD_ERROR: &str = "grader_payload_error";
pub const REPLIES: &str = "replies (non-exception)";
pub const GRADING_TIME: &str = "grading-time";

/// Monotonically increasing counter.
#[derive(Debug, Default)]
struct Counter(AtomicU64);

impl Counter {
    fn inc(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default)]
pub struct GraderMetrics {
    processed: Counter,
    payload_errors: Counter,
    replies: Counter,
    timed: Counter,
    total_micros: AtomicU64,
    max_micros: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub processed: u64,
    pub payload_errors: u64,
    pub replies: u64,
    pub graded: u64,
    pub mean_grading_secs: f64,
    pub max_grading_secs: f64,
}

impl GraderMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_item(&self) {
        let value = self.processed.inc();
        debug!(target: "metrics", metric = PROCESS_ITEM, value);
    }

    pub fn payload_error(&self) {
        let value = self.payload_errors.inc();
        debug!(target: "metrics", metric = PAYLOAD_ERROR, value);
    }

    pub fn reply(&self) {
        let value = self.replies.inc();
        debug!(target: "metrics", metric = REPLIES, value);
    }

    pub fn grading_time(&self, elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.timed.inc();
        self.total_micros.fetch_add(micros, Ordering::Relaxed);
        self.max_micros.fetch_max(micros, Ordering::Relaxed);
        debug!(target: "metrics", metric = GRADING_TIME, seconds = elapsed.as_secs_f64());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let graded = self.timed.get();
        let total = self.total_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0;
        MetricsSnapshot {
            processed: self.processed.get(),
            payload_errors: self.payload_errors.get(),
            replies: self.replies.get(),
            graded,
            mean_grading_secs: if graded == 0 { 0.0 } else { total / graded as f64 },
            max_grading_secs: self.max_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0,
        }
    }
}
