//! Upload handler
//!
//! Handles POST /upload requests that add a new image to the catalog.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use lookalike_core::{LookalikeError, NewCatalogEntry};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::multipart::MultipartFields;
use crate::state::AppState;
use crate::validation::sanitize_file_name;

/// Response for an accepted upload
#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    #[schema(example = "Image uploaded successfully")]
    pub message: String,
    /// Catalog entry identifier
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,
    /// Where the stored image is served from
    #[schema(example = "/clientImages/1704067200000-cat.png")]
    pub locator: String,
    /// Perceptual hash (64 hex symbols)
    #[schema(example = "f0f0e0c0c0c08080f0f0e0c0c0c08080f0f0e0c0c0c08080f0f0e0c0c0c08080")]
    pub hash: String,
}

/// Upload an image into the catalog
///
/// Accepts multipart/form-data with a single **image** field. The image is
/// hashed; if an identical hash is already indexed the upload is rejected,
/// otherwise it is stored and becomes matchable immediately.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "Catalog",
    request_body(
        content_type = "multipart/form-data",
        description = "Image file in the `image` field"
    ),
    responses(
        (status = 201, description = "Image stored and indexed", body = UploadResponse),
        (status = 400, description = "Missing image field or unsupported Content-Type"),
        (status = 409, description = "This image already exists"),
        (status = 413, description = "File too large"),
        (status = 422, description = "File is not a decodable image"),
        (status = 503, description = "Catalog unavailable")
    )
)]
pub async fn upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    let image = MultipartFields::parse(&mut multipart, state.max_file_size)
        .await?
        .require_image()?;

    let hash = state.comparer.fingerprint(image.data.clone()).await?;

    if let Some(existing) = state.catalog.find_by_hash(&hash).await? {
        tracing::info!(
            hash = %hash,
            existing = %existing.locator,
            "Rejected duplicate upload"
        );
        return Err(ApiError::conflict("This image already exists"));
    }

    let file_name = format!(
        "{}-{}",
        Utc::now().timestamp_millis(),
        sanitize_file_name(image.file_name.as_deref())
    );
    let path = state.upload_dir.join(&file_name);

    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to prepare upload directory: {}", e)))?;
    tokio::fs::write(&path, &image.data)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to store image: {}", e)))?;

    let locator = format!(
        "{}/{}",
        state.upload_prefix.trim_end_matches('/'),
        file_name
    );

    let entry = match state
        .catalog
        .insert(NewCatalogEntry::new(hash, locator))
        .await
    {
        Ok(entry) => entry,
        Err(e) => {
            // Do not leave an unindexed file behind
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), error = %cleanup, "Failed to remove orphaned upload");
            }
            return Err(match e {
                LookalikeError::DuplicateHash(_) => {
                    ApiError::conflict("This image already exists")
                }
                other => other.into(),
            });
        }
    };

    tracing::info!(
        id = %entry.id,
        locator = %entry.locator,
        hash = %entry.hash,
        size = image.data.len(),
        content_type = image.content_type.as_deref().unwrap_or("unknown"),
        "Image uploaded"
    );

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            message: "Image uploaded successfully".to_string(),
            id: entry.id,
            locator: entry.locator,
            hash: entry.hash.to_string(),
        }),
    ))
}
