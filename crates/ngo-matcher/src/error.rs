use std::time::Duration;

use ngo_common::error::CommonError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid category pattern configuration: {0}")]
    Patterns(String),

    #[error("{0}")]
    Validation(String),

    #[error("NGO not found: {0}")]
    NotFound(String),

    #[error("NGO directory timed out after {}ms", .0.as_millis())]
    RetrievalTimeout(Duration),

    #[error("NGO directory unavailable: {0}")]
    Retrieval(#[from] CommonError),
}

impl AppError {
    /// True for errors caused by the caller's input rather than by this service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::Validation(_) | AppError::NotFound(_))
    }
}
