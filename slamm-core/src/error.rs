//! Error taxonomy for the segment pipeline and its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// The upload could not be decoded into a non-empty frame sequence.
    #[error("could not decode segment: {0}")]
    Decode(String),

    #[error("classification failed: {0}")]
    Classification(String),

    #[error("summarization failed: {0}")]
    Summarization(String),

    /// Flush requested with no word accumulated for the utterance.
    #[error("utterance is empty: no segment was classified before the final one")]
    EmptyUtterance,

    #[error("bad request: {0}")]
    BadRequest(String),

    /// The upload exceeded the configured body limit.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Map an extractor rejection, keeping 413 for oversized uploads.
    pub fn rejected(status: StatusCode, message: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(message)
        } else {
            Self::BadRequest(message)
        }
    }

    /// Stable identifier clients use to tell error kinds apart.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "DecodeError",
            Self::Classification(_) => "ClassificationError",
            Self::Summarization(_) => "SummarizationError",
            Self::EmptyUtterance => "EmptyUtteranceError",
            Self::BadRequest(_) => "BadRequest",
            Self::PayloadTooLarge(_) => "PayloadTooLarge",
            Self::Io(_) | Self::Internal(_) => "InternalError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Decode(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::EmptyUtterance => StatusCode::CONFLICT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Classification(_) | Self::Summarization(_) => StatusCode::BAD_GATEWAY,
            Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
        } else {
            tracing::warn!(code = self.code(), "{}", self);
        }

        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
