//! Jersey image uploads.
//!
//! Files land under `<data_dir>/uploads/jersey-images/` and are served back
//! at `/uploads/…`; listings store the returned public URLs.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::User;
use crate::AppState;

use super::error::ApiError;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];
const MAX_FILE_BYTES: usize = 5 * 1024 * 1024;
const MAX_FILES_PER_REQUEST: usize = 8;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub urls: Vec<String>,
}

fn extension_for(file_name: &str) -> Result<String, ApiError> {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .ok_or_else(|| ApiError::bad_request("File has no extension"))?;

    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ApiError::bad_request(format!(
            "Unsupported file type '.{}'. Allowed: jpg, jpeg, png, webp",
            ext
        )));
    }

    // The extension must map to an image MIME type, not just be on the list
    let mime = mime_guess::from_ext(&ext).first_or_octet_stream();
    if mime.type_() != mime_guess::mime::IMAGE {
        return Err(ApiError::bad_request("Only image uploads are accepted"));
    }

    Ok(ext)
}

pub async fn upload_images(
    State(state): State<Arc<AppState>>,
    user: User,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let upload_dir = state
        .config
        .server
        .data_dir
        .join("uploads")
        .join("jersey-images");
    crate::utils::ensure_dir(&upload_dir)
        .map_err(|e| ApiError::internal(format!("Failed to prepare upload directory: {}", e)))?;

    let mut urls = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {}", e)))?
    {
        let file_name = field
            .file_name()
            .map(|n| n.to_string())
            .ok_or_else(|| ApiError::bad_request("Each part must be a file"))?;
        let ext = extension_for(&file_name)?;

        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;

        if data.is_empty() {
            return Err(ApiError::bad_request("Empty file upload"));
        }
        if data.len() > MAX_FILE_BYTES {
            return Err(ApiError::bad_request("File too large (max 5 MB)"));
        }
        if urls.len() >= MAX_FILES_PER_REQUEST {
            return Err(ApiError::bad_request("Too many files in one request"));
        }

        let stored_name = format!("{}.{}", Uuid::new_v4(), ext);
        let path = upload_dir.join(&stored_name);
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to store upload: {}", e)))?;

        urls.push(format!(
            "{}/uploads/jersey-images/{}",
            state.config.server.public_url.trim_end_matches('/'),
            stored_name
        ));
    }

    if urls.is_empty() {
        return Err(ApiError::bad_request("No files in request"));
    }

    tracing::info!("Stored {} image(s) for seller {}", urls.len(), user.email);

    Ok((StatusCode::CREATED, Json(UploadResponse { urls })))
}
