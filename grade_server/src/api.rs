use crate::grading::pipeline::GradeReply;
use crate::grading::request::XQueueContent;
use crate::manager::queue::SlotStats;
use crate::manager::supervisor::Supervisor;
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use util::metrics::MetricsSnapshot;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub slots: SlotStats,
    pub metrics: MetricsSnapshot,
}

pub fn routes(supervisor: Supervisor) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/grade", post(grade))
        .with_state(supervisor)
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "grade_server is running")
}

pub async fn stats(State(supervisor): State<Supervisor>) -> Json<StatsResponse> {
    Json(StatsResponse {
        slots: supervisor.slots().await,
        metrics: supervisor.metrics(),
    })
}

/// Grading failures are part of the reply body; the status is always 200.
pub async fn grade(
    State(supervisor): State<Supervisor>,
    Json(content): Json<XQueueContent>,
) -> Json<GradeReply> {
    tracing::info!(files = %content.xqueue_files, "Received grading request");
    Json(supervisor.grade(&content).await)
}
