//! The worker side of request isolation.
//!
//! A worker grades exactly one request and reports a single [`WorkerMessage`]. Panics inside the
//! pipeline are caught and reported as [`WorkerMessage::Error`] instead of tearing the worker down
//! without a reply.

use crate::grading::failure::panic_text;
use crate::grading::pipeline::{GradeReply, GradingContext};
use crate::grading::request::GradingRequest;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::error;

/// The single message a worker sends back over the isolation channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WorkerMessage {
    Reply { reply: GradeReply },
    Error { message: String },
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if err.is_panic() {
        panic_text(err.into_panic().as_ref())
    } else {
        "worker task was cancelled".to_string()
    }
}

/// Aborts the wrapped task when dropped, so a caller that stops waiting also stops the grading.
struct AbortOnDrop(tokio::task::AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Runs the pipeline on its own task so that a panic the pipeline does not handle becomes an error
/// message.
pub async fn run_guarded(context: GradingContext, request: GradingRequest) -> WorkerMessage {
    let task = tokio::spawn(async move { context.process(&request).await });
    let _guard = AbortOnDrop(task.abort_handle());
    match task.await {
        Ok(reply) => WorkerMessage::Reply { reply },
        Err(err) => {
            let message = panic_message(err);
            error!(%message, "Uncaught error while grading");
            WorkerMessage::Error { message }
        }
    }
}

/// Decodes one request from `input` and grades it.
pub async fn handle_input(context: GradingContext, input: &[u8]) -> WorkerMessage {
    match serde_json::from_slice::<GradingRequest>(input) {
        Ok(request) => run_guarded(context, request).await,
        Err(e) => WorkerMessage::Error {
            message: format!("cannot decode grading request: {e}"),
        },
    }
}

/// Reads one request from stdin and writes one message to stdout.
pub async fn serve_stdio(context: GradingContext) -> std::io::Result<()> {
    let mut input = Vec::new();
    tokio::io::stdin().read_to_end(&mut input).await?;

    let message = handle_input(context, &input).await;
    let mut line = serde_json::to_vec(&message)?;
    line.push(b'\n');

    let mut stdout = tokio::io::stdout();
    stdout.write_all(&line).await?;
    stdout.flush().await
}
