use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::server::AppState;
use crate::storage::ImageRecord;

const INDEX_HTML: &str = include_str!("../templates/index.html");

pub const UPLOAD_FIELD: &str = "image";
pub const UPLOAD_SUCCESS_MESSAGE: &str = "Image uploaded successfully";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub image_path: String,
}

pub async fn index_page() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn handle_image_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let mut multipart = multipart.map_err(|err| AppError::Multipart(err.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::Multipart(err.body_text()))?
    {
        // Only file parts count; a plain text `image` field is skipped.
        let file_name = match (field.name(), field.file_name()) {
            (Some(UPLOAD_FIELD), Some(file_name)) => file_name.to_string(),
            _ => continue,
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::Multipart(err.body_text()))?;
        upload = Some((file_name, bytes));
        break;
    }
    let (file_name, bytes) = upload.ok_or(AppError::MissingImage)?;

    let stored = state.uploads.save(&file_name, &bytes).await?;
    info!(
        image_path = %stored.image_path,
        size = bytes.len(),
        original = %file_name,
        "stored upload"
    );
    state
        .metadata
        .append(ImageRecord::new(stored.image_path.clone()))
        .await?;

    Ok((
        StatusCode::OK,
        Json(UploadResponse {
            message: UPLOAD_SUCCESS_MESSAGE.to_string(),
            image_path: stored.image_path,
        }),
    )
        .into_response())
}

pub async fn list_images(
    State(state): State<AppState>,
) -> Result<Json<Vec<ImageRecord>>, AppError> {
    let records = state.metadata.list_all().await?;
    Ok(Json(records))
}
