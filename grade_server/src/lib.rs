//! Request supervision for the notebook grader.
//!
//! [`manager::supervisor::Supervisor`] turns queue records into replies, grading each request in
//! an isolated worker. [`grading`] holds the request format, the failure taxonomy and the
//! pipeline a worker runs. [`api`] exposes the supervisor over HTTP.

pub mod api;
pub mod grading;
pub mod manager;
