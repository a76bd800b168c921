use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use code_runner::{HttpFetcher, NbgraderEngine};
use grade_server::api::routes;
use grade_server::grading::pipeline::GradingContext;
use grade_server::manager::supervisor::{IsolationMode, Supervisor};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

fn app() -> axum::Router {
    let context = GradingContext {
        assignment_root: "/nonexistent".into(),
        student_id: "student".into(),
        work_root: std::env::temp_dir(),
        engine: Arc::new(NbgraderEngine::new("nbgrader", Duration::from_secs(5))),
        fetcher: Arc::new(HttpFetcher::default()),
    };
    routes(Supervisor::new(
        context,
        IsolationMode::InProcess,
        3,
        Duration::from_secs(30),
    ))
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_grade_malformed_request_still_replies() {
    let body = serde_json::json!({
        "xqueue_body": "{\"grader_payload\": \"nope\"}",
        "xqueue_files": "{}"
    });
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/grade")
                .method("POST")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let reply = json_body(response).await;
    assert_eq!(reply["correct"], false);
    assert_eq!(reply["score"], 0.0);
    assert!(reply["msg"].as_str().unwrap().contains("error code 323"));
}

#[tokio::test]
async fn test_stats_reflect_processed_requests() {
    let app = app();
    let grade = Request::builder()
        .uri("/grade")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"xqueue_body": "{", "xqueue_files": "{}"}"#))
        .unwrap();
    app.clone().oneshot(grade).await.unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/stats")
                .method("GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stats = json_body(response).await;
    assert_eq!(stats["slots"]["max"], 3);
    assert_eq!(stats["slots"]["running"], 0);
    assert_eq!(stats["metrics"]["processed"], 1);
}
