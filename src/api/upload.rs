use axum::Json;
use axum::body::Bytes;
use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;

use super::UploadResponse;
use crate::error::AppError;
use crate::state::AppState;
use crate::upload::{IMAGE_FIELD, UploadError, unique_file_name, validate_image};

/// `POST /api/upload`: one image in the `image` multipart field.
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let limit = state.config.max_upload_bytes;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let ext = validate_image(field.file_name().unwrap_or_default(), field.content_type())?;
        let bytes = read_limited(field, limit).await?;
        let stored = state.images.store(&unique_file_name(&ext), bytes).await?;

        return Ok(Json(UploadResponse {
            success: true,
            image_url: stored.url,
            message: stored.note,
        }));
    }

    Err(UploadError::MissingFile.into())
}

/// Buffers the field, bailing out as soon as it passes `limit` bytes.
async fn read_limited(mut field: Field<'_>, limit: usize) -> Result<Bytes, AppError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(e, limit))? {
        if data.len() + chunk.len() > limit {
            return Err(UploadError::TooLarge { limit }.into());
        }
        data.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(data))
}

fn multipart_error(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge { limit }.into()
    } else {
        AppError::BadRequest(err.body_text())
    }
}
