use crate::services::{object_store::StoreError, upload_service::PipelineError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

/// An HTTP-facing error: a status code plus a short plaintext message.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, msg)
    }

    pub fn not_acceptable(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_ACCEPTABLE, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut body = self.message;
        if !body.ends_with('\n') {
            body.push('\n');
        }
        (self.status, body).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidFileType(_) => AppError::not_acceptable(err.to_string()),
            PipelineError::Forbidden(msg) => AppError::forbidden(msg),
            PipelineError::Store(StoreError::InvalidObjectKey(key)) => {
                AppError::new(StatusCode::BAD_REQUEST, format!("invalid object key `{key}`"))
            }
            PipelineError::Store(store) => {
                tracing::error!("store failure: {}", store);
                AppError::internal("storage backend failure")
            }
            PipelineError::Internal(msg) => AppError::internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn pipeline_errors_map_to_statuses() {
        let cases = [
            (PipelineError::InvalidFileType("gif".into()), StatusCode::NOT_ACCEPTABLE),
            (PipelineError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (
                PipelineError::Store(StoreError::InvalidObjectKey("../x".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                PipelineError::Store(StoreError::Io(io::Error::other("disk"))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }
}
