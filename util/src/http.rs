use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// How often and how patiently a download is attempted.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    /// Pause between two consecutive attempts.
    pub backoff: Duration,
    /// Per-attempt request timeout.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_secs(5),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("download failed after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: reqwest::Error,
    },

    #[error("cannot write downloaded file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

async fn fetch(client: &Client, url: &str) -> Result<Vec<u8>, reqwest::Error> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

/// Downloads `url` into `dest`, retrying transport errors and non-success statuses.
///
///  - Waits `policy.backoff` between attempts.
///  - The last error is returned once `policy.attempts` are used up.
///  - Write failures on `dest` are not retried.
///
/// Returns the number of bytes written.
pub async fn download_with_retry(
    url: &str,
    dest: &Path,
    policy: &RetryPolicy,
) -> Result<u64, DownloadError> {
    let client = Client::builder()
        .timeout(policy.timeout)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(DownloadError::Client)?;

    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    let body = loop {
        match fetch(&client, url).await {
            Ok(body) => break body,
            Err(e) if attempt < attempts => {
                warn!(attempt, "Submitted file download error (retrying): {e:?}");
                attempt += 1;
                tokio::time::sleep(policy.backoff).await;
            }
            Err(e) => return Err(DownloadError::Exhausted { attempts, last: e }),
        }
    };

    tokio::fs::write(dest, &body)
        .await
        .map_err(|source| DownloadError::Write {
            path: dest.to_path_buf(),
            source,
        })?;

    Ok(body.len() as u64)
}
