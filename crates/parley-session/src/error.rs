//! Session API error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionApiError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Access denied for session: {0}")]
    AccessDenied(String),

    #[error("Session API error: {code} - {body}")]
    Status { code: u16, body: String },

    #[error("Unexpected session API response: {0}")]
    UnexpectedResponse(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
