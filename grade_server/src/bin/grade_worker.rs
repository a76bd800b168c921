//! Grades a single request in its own process.
//!
//! Reads one JSON grading request from stdin and writes one JSON worker message to stdout.
//! Logs go to stderr only.

use code_runner::ExecutionConfig;
use grade_server::grading::pipeline::GradingContext;
use grade_server::manager::worker::serve_stdio;
use tracing_subscriber::EnvFilter;
use util::config::AppConfig;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::global();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let context = GradingContext::from_config(&ExecutionConfig::from_app_config(&config));
    serve_stdio(context).await
}
