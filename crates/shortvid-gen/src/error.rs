//! Generation error types.

use thiserror::Error;

pub type GenResult<T> = Result<T, GenError>;

#[derive(Debug, Error)]
pub enum GenError {
    #[error("Upstream returned {status}: {detail}")]
    Upstream { status: u16, detail: String },

    #[error("No JSON object found in model output")]
    MissingPayload,

    #[error("Malformed model output: {0}")]
    MalformedPayload(String),

    #[error("Invalid script: {0}")]
    InvalidScript(#[from] shortvid_models::ScriptError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image encode error: {0}")]
    ImageEncode(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenError {
    pub fn upstream(status: u16, detail: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            detail: detail.into(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedPayload(msg.into())
    }
}
