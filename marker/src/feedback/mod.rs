//! Feedback Module
//!
//! - [`fragments`]: HTML fragments for one test (passed, failed, missing, not graded).
//! - [`reconcile`]: maps the graded notebook back onto the canonical test layout.

pub mod fragments;
pub mod reconcile;
