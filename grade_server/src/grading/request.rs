//! Decoding queue-delivered grading requests.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Raw record as delivered by the queue. Both fields hold serialized JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XQueueContent {
    #[serde(default)]
    pub xqueue_body: String,
    #[serde(default)]
    pub xqueue_files: String,
}

#[derive(Debug, Deserialize)]
struct XQueueBody {
    grader_payload: Option<Value>,
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request body is not valid JSON: {0}")]
    Body(#[source] serde_json::Error),

    #[error("request body has no grader_payload")]
    MissingPayload,

    #[error("grader_payload does not decode: {0}")]
    Payload(String),

    #[error("grader_payload has no usable name")]
    MissingName,

    #[error("files mapping is not valid JSON: {0}")]
    Files(#[source] serde_json::Error),

    #[error("no submitted file named {0}")]
    MissingFile(String),
}

impl RequestError {
    /// Whether this should count as a grader payload error.
    pub fn is_payload_error(&self) -> bool {
        matches!(self, RequestError::Payload(_))
    }

    /// Whether the rejection is an ordinary reply rather than a malformed record.
    pub fn counts_as_reply(&self) -> bool {
        matches!(self, RequestError::MissingName | RequestError::MissingFile(_))
    }
}

/// One validated grading request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingRequest {
    /// Sanitised assignment name, safe as a path component.
    pub assignment: String,
    pub submission_url: String,
}

/// Keeps letters, digits, hyphen, underscore and space.
pub fn sanitize_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ' '))
        .collect()
}

fn decode_payload(payload: Value) -> Result<serde_json::Map<String, Value>, RequestError> {
    let decoded = match payload {
        Value::String(text) => {
            serde_json::from_str(&text).map_err(|e| RequestError::Payload(e.to_string()))?
        }
        other => other,
    };
    match decoded {
        Value::Object(map) => Ok(map),
        other => Err(RequestError::Payload(format!("expected an object, got {other}"))),
    }
}

fn name_of(config: &serde_json::Map<String, Value>) -> Result<String, RequestError> {
    match config.get("name") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(RequestError::MissingName),
    }
}

impl GradingRequest {
    pub fn parse(content: &XQueueContent) -> Result<Self, RequestError> {
        let body: XQueueBody =
            serde_json::from_str(&content.xqueue_body).map_err(RequestError::Body)?;
        let payload = body.grader_payload.ok_or(RequestError::MissingPayload)?;
        let config = decode_payload(payload)?;
        let assignment = sanitize_name(&name_of(&config)?);

        let files: HashMap<String, Value> =
            serde_json::from_str(&content.xqueue_files).map_err(RequestError::Files)?;
        let file_name = format!("{assignment}.ipynb");
        let submission_url = match files.get(&file_name) {
            Some(Value::String(url)) => url.clone(),
            _ => return Err(RequestError::MissingFile(file_name)),
        };

        Ok(Self {
            assignment,
            submission_url,
        })
    }
}
