use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Failures of a single video job. Every variant fails the whole request.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Cannot open video {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("Pose estimator is not available: {0}")]
    DependencyUnavailable(String),

    #[error("Processing failed: {0:#}")]
    Processing(anyhow::Error),
}

impl PipelineError {
    pub fn processing(err: impl Into<anyhow::Error>) -> Self {
        Self::Processing(err.into())
    }
}

/// Errors surfaced by the HTTP handlers.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("File must be a video (got content type '{0}')")]
    UploadValidation(String),

    #[error("Missing upload field 'file'")]
    MissingFile,

    #[error("Malformed upload: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("Failed to save file: {0}")]
    Upload(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UploadValidation(_) | ApiError::MissingFile => StatusCode::BAD_REQUEST,
            ApiError::Multipart(e) => e.status(),
            ApiError::Pipeline(PipelineError::DependencyUnavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Upload(_) | ApiError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }
        (status, Json(serde_json::json!({ "detail": self.to_string() }))).into_response()
    }
}
