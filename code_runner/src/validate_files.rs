use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Longest prefix of an invalid document carried in the error for logging.
const PREVIEW_CHARS: usize = 200;

/// Why a downloaded submission cannot be graded.
#[derive(Debug, Error)]
pub enum SubmissionFileError {
    #[error("submission cannot be read back: {0}")]
    Unreadable(#[source] io::Error),

    #[error("submission is not valid UTF-8 text")]
    NotUtf8,

    #[error("submission is not valid JSON: {reason}")]
    InvalidJson { reason: String, preview: String },
}

/// Reads the stored submission and checks it is a UTF-8 JSON document.
///
/// Returns the decoded text so callers can log or reuse it.
pub fn validate_submission(path: &Path) -> Result<String, SubmissionFileError> {
    let bytes = fs::read(path).map_err(SubmissionFileError::Unreadable)?;
    let text = String::from_utf8(bytes).map_err(|_| SubmissionFileError::NotUtf8)?;

    if let Err(e) = serde_json::from_str::<serde_json::Value>(&text) {
        return Err(SubmissionFileError::InvalidJson {
            reason: e.to_string(),
            preview: text.chars().take(PREVIEW_CHARS).collect(),
        });
    }
    Ok(text)
}
