//! Image loading and encoding utilities.
//!
//! The prediction endpoint receives the file bytes untouched (no forced
//! re-compression). The report exporter needs the same bytes inlined as a
//! base64 `data:` URI, which is where format detection matters: the MIME
//! type comes from the file's magic bytes, not its extension.

use crate::error::{AppError, Result};
use crate::model::SelectedImage;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::debug;

/// Image processing utilities for the upload and report workflows.
pub struct ImageProcessor;

impl ImageProcessor {
    /// Reads the selected image's bytes for upload.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unexpected`] if the file cannot be read.
    pub async fn read_bytes(image: &SelectedImage) -> Result<Vec<u8>> {
        let bytes = tokio::fs::read(image.path()).await.map_err(|e| {
            AppError::unexpected(format!("Failed to read {}: {}", image.path().display(), e))
        })?;
        debug!("read {} bytes from {}", bytes.len(), image.path().display());
        Ok(bytes)
    }

    /// Encodes the selected image as a base64 `data:` URI.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Unexpected`] if the file cannot be read or its
    /// contents are not a recognised image format.
    pub fn to_data_uri(image: &SelectedImage) -> Result<String> {
        let bytes = std::fs::read(image.path()).map_err(|e| {
            AppError::unexpected(format!("Failed to read {}: {}", image.path().display(), e))
        })?;
        Self::encode_data_uri(&bytes)
    }

    /// Encodes raw image bytes as a base64 `data:` URI.
    pub fn encode_data_uri(bytes: &[u8]) -> Result<String> {
        let format = image::guess_format(bytes)
            .map_err(|e| AppError::unexpected(format!("Unrecognised image data: {}", e)))?;
        Ok(format!("data:{};base64,{}", format.to_mime_type(), BASE64.encode(bytes)))
    }
}
