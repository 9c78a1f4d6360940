//! Multipart form parsing helpers
//!
//! Both endpoints take a single image under the `image` field.

use axum::extract::Multipart;

use crate::error::ApiError;
use crate::validation::{validate_content_type, validate_file_size};

/// Name of the multipart field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// Represents a file uploaded via multipart form
#[derive(Debug, Clone)]
pub struct FileField {
    /// File data bytes
    pub data: Vec<u8>,
    /// Content-Type from the multipart field (if provided)
    pub content_type: Option<String>,
    /// Original filename from the multipart field (if provided)
    pub file_name: Option<String>,
}

/// Parsed multipart form fields
#[derive(Debug)]
pub struct MultipartFields {
    image: Option<FileField>,
}

impl MultipartFields {
    /// Parse all fields from a multipart request
    ///
    /// The image field is checked for Content-Type and size as it is read.
    /// Other fields are drained and ignored. If the image field appears more
    /// than once, the last one wins.
    pub async fn parse(multipart: &mut Multipart, max_file_size: usize) -> Result<Self, ApiError> {
        let mut image: Option<FileField> = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to parse multipart: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();

            if name != IMAGE_FIELD {
                tracing::debug!(field = %name, "Ignoring multipart field");
                continue;
            }

            let content_type = field.content_type().map(|s| s.to_string());
            let file_name = field.file_name().map(|s| s.to_string());

            validate_content_type(content_type.as_deref())?;

            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read image: {}", e)))?
                .to_vec();

            validate_file_size(data.len(), max_file_size)?;

            image = Some(FileField {
                data,
                content_type,
                file_name,
            });
        }

        Ok(Self { image })
    }

    /// Take the image field (required)
    ///
    /// Returns an error if no image was uploaded.
    pub fn require_image(self) -> Result<FileField, ApiError> {
        self.image.ok_or_else(|| {
            ApiError::bad_request("No image provided. Use 'image' field in multipart form.")
        })
    }
}
