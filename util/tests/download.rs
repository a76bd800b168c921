use axum::{Router, extract::State, http::StatusCode, routing::get};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tempfile::tempdir;
use util::http::{DownloadError, RetryPolicy, download_with_retry};

const NOTEBOOK: &str = r#"{"cells": [], "metadata": {}, "nbformat": 4, "nbformat_minor": 5}"#;

/// Serves `/nb.ipynb`, failing with 503 until `fail_first` requests have been seen.
async fn spawn_server(fail_first: usize) -> (String, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));

    async fn handler(
        State((hits, fail_first)): State<(Arc<AtomicUsize>, usize)>,
    ) -> (StatusCode, &'static str) {
        let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
        if n <= fail_first {
            (StatusCode::SERVICE_UNAVAILABLE, "busy")
        } else {
            (StatusCode::OK, NOTEBOOK)
        }
    }

    let app = Router::new()
        .route("/nb.ipynb", get(handler))
        .with_state((hits.clone(), fail_first));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/nb.ipynb"), hits)
}

#[tokio::test]
async fn test_two_transient_failures_then_success_waits_full_backoff() {
    let (url, hits) = spawn_server(2).await;
    let dir = tempdir().unwrap();
    let dest = dir.path().join("nb.ipynb");

    let start = Instant::now();
    let written = download_with_retry(&url, &dest, &RetryPolicy::default())
        .await
        .expect("third attempt should succeed");
    let elapsed = start.elapsed();

    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert_eq!(written, NOTEBOOK.len() as u64);
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), NOTEBOOK);
    assert!(
        elapsed >= Duration::from_secs(10),
        "expected two 5s backoffs, finished in {:.2}s",
        elapsed.as_secs_f64()
    );
}

#[tokio::test]
async fn test_exhausted_attempts_surface_last_error() {
    let (url, hits) = spawn_server(usize::MAX).await;
    let dir = tempdir().unwrap();
    let dest = dir.path().join("nb.ipynb");
    let policy = RetryPolicy {
        attempts: 3,
        backoff: Duration::from_millis(10),
        timeout: Duration::from_secs(5),
    };

    let err = download_with_retry(&url, &dest, &policy)
        .await
        .expect_err("server never succeeds");

    assert_eq!(hits.load(Ordering::SeqCst), 3);
    match err {
        DownloadError::Exhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert_eq!(last.status(), Some(reqwest::StatusCode::SERVICE_UNAVAILABLE));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_write_failure_is_not_retried() {
    let (url, hits) = spawn_server(0).await;
    let dir = tempdir().unwrap();
    let dest = dir.path().join("missing").join("nb.ipynb");

    let err = download_with_retry(&url, &dest, &RetryPolicy::default())
        .await
        .expect_err("parent directory does not exist");

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(matches!(err, DownloadError::Write { .. }));
}
