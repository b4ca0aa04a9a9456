//! File to inline-payload encoding.
//!
//! Reads a selected image into memory and produces the base64 payload and
//! media type sent to the generation endpoint. The file is read as a data URI
//! and then split back apart, so a file that cannot be expressed as one is a
//! read failure.

use crate::ai::mime;
use crate::models::EncodedImagePart;
use crate::{Error, Result};
use base64::Engine as _;
use std::path::Path;

/// Encode raw bytes as `data:<media_type>;base64,<payload>`.
pub fn bytes_to_data_uri(media_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        media_type,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

impl EncodedImagePart {
    /// Split a `data:<type>;base64,<payload>` URI into its parts.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let invalid = || Error::FileRead("Failed to read file as data URL.".to_string());

        let (header, data) = uri.split_once(',').ok_or_else(invalid)?;
        let mime_type = header
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .filter(|m| !m.is_empty())
            .ok_or_else(invalid)?;

        Ok(Self {
            data: data.to_string(),
            mime_type: mime_type.to_string(),
        })
    }
}

/// Read a file and turn it into an inline image payload.
pub async fn encode_file(path: &Path) -> Result<EncodedImagePart> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        tracing::error!("Failed to read {}: {}", path.display(), e);
        Error::FileRead(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let uri = bytes_to_data_uri(mime::detect_mime_or_octet_stream(&bytes), &bytes);
    let part = EncodedImagePart::from_data_uri(&uri)?;

    tracing::debug!(
        "Encoded {} ({}, {} bytes)",
        path.display(),
        part.mime_type,
        bytes.len()
    );
    Ok(part)
}
