//! Error types and result aliases for the report tool.
//!
//! [`XrayReportError`] covers the three user-facing failure categories
//! (image decoding, inference, document rendering) plus configuration and
//! shell-state errors. All public APIs that can fail return [`Result<T>`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum XrayReportError {
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl XrayReportError {
    /// Collapse any failure raised while talking to the model into the
    /// single inference category the shell reports.
    pub fn into_inference(self) -> Self {
        match self {
            XrayReportError::Inference(_) => self,
            other => XrayReportError::Inference(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, XrayReportError>;
