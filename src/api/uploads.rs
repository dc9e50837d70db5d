//! Image upload endpoints.

use axum::extract::{multipart::MultipartError, Multipart, State};
use serde::Deserialize;
use validator::Validate;

use super::{created, ApiResponse, ApiResult, ValidatedJson};
use crate::auth::AdminCaller;
use crate::errors::AppError;
use crate::storage::{StoredObject, DEFAULT_FOLDER};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct DeleteUploadRequest {
    #[validate(length(min = 1, max = 512))]
    pub key: String,
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::BadRequest(err.body_text())
}

/// POST /api/admin/uploads - multipart `file` plus optional `folder`.
pub async fn upload_image(
    State(state): State<AppState>,
    admin: AdminCaller,
    mut multipart: Multipart,
) -> ApiResult<StoredObject> {
    let mut file: Option<Vec<u8>> = None;
    let mut folder: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                file = Some(field.bytes().await.map_err(multipart_error)?.to_vec());
            }
            Some("folder") => {
                let value = field.text().await.map_err(multipart_error)?;
                let value = value.trim();
                if !value.is_empty() {
                    folder = Some(value.to_string());
                }
            }
            _ => {}
        }
    }

    let bytes = file.ok_or_else(|| {
        AppError::field_validation("No file provided", "file", "A file field is required")
    })?;
    let folder = folder.as_deref().unwrap_or(DEFAULT_FOLDER);

    let stored = state.storage.put_image(folder, &bytes).await?;
    tracing::info!("Admin {} uploaded {}", admin.id(), stored.key);
    created(stored)
}

/// DELETE /api/admin/uploads - `{ key }`
pub async fn delete_upload(
    State(state): State<AppState>,
    admin: AdminCaller,
    ValidatedJson(request): ValidatedJson<DeleteUploadRequest>,
) -> ApiResult<()> {
    state.storage.delete(&request.key).await?;
    tracing::info!("Admin {} deleted upload {}", admin.id(), request.key);
    Ok(ApiResponse::new(()).with_message("File deleted"))
}
