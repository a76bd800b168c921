//! Downloading a submission into a prepared working directory.
//!
//! The URL scheme is checked before any network activity. Transport failures are retried by the
//! fetcher; once the file is on disk it is read back and validated as a UTF-8 JSON document.

use crate::validate_files::{SubmissionFileError, validate_submission};
use crate::workspace::GradingWorkspace;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;
use util::http::{DownloadError, RetryPolicy, download_with_retry};

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("submission URL is not https: {0}")]
    InsecureUrl(String),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    File(#[from] SubmissionFileError),
}

/// Moves a remote file onto local disk.
#[async_trait]
pub trait SubmissionFetcher: Send + Sync {
    /// Stores the body of `url` at `dest`, returning the number of bytes written.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, DownloadError>;
}

/// Fetches over HTTP with the configured retry policy.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    pub policy: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl SubmissionFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        download_with_retry(url, dest, &self.policy).await
    }
}

/// True when `url` parses and uses the `https` scheme.
pub fn is_secure_url(url: &str) -> bool {
    Url::parse(url).map(|u| u.scheme() == "https").unwrap_or(false)
}

/// Downloads the submission at `url` into `workspace` and validates it.
pub async fn acquire_submission(
    workspace: &GradingWorkspace,
    url: &str,
    fetcher: &dyn SubmissionFetcher,
) -> Result<(), AcquisitionError> {
    if !is_secure_url(url) {
        return Err(AcquisitionError::InsecureUrl(url.to_string()));
    }

    let dest = workspace.submission_path();
    let bytes = fetcher.fetch(url, &dest).await?;
    debug!(bytes, dest = %dest.display(), "Stored submission");

    let text = validate_submission(&dest)?;
    info!(
        assignment = workspace.assignment(),
        chars = text.len(),
        "Submission acquired"
    );
    Ok(())
}
