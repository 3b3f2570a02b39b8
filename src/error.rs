use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::storage::StoreError;

/// Failures surfaced by the upload service handlers.
///
/// Every variant maps to `500` with the display text as the body; callers
/// cannot tell the categories apart.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("no file uploaded in field `image`")]
    MissingImage,

    #[error("invalid multipart request: {0}")]
    Multipart(String),

    #[error("failed to save upload: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        error!(error = %message, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error: message }),
        )
            .into_response()
    }
}
