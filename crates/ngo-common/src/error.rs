/// Error types shared by crates that consume the NGO directory.
///
/// These represent failures at the directory boundary (transport, upstream status,
/// malformed payloads). Service crates define their own error enum and wrap
/// `CommonError` via `#[from]`.
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("invalid directory base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("directory request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("directory returned invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("directory returned error: status={status} body={body}")]
    Upstream { status: StatusCode, body: String },

    #[error("directory snapshot unreadable: {0}")]
    Snapshot(#[from] std::io::Error),

    #[error("invalid NGO record: {0}")]
    InvalidRecord(String),
}
