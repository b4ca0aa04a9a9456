//! Data models and structures
//!
//! Defines the image inputs held by the session, the encoded payloads sent
//! to the generation endpoint, the generated result, and runtime
//! configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// A user-selected image: the file on disk plus the preview captured at
/// selection time.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInput {
    pub path: PathBuf,
    pub media_type: String,
    /// Data URI of the file contents when it was selected.
    pub preview: String,
}

impl ImageInput {
    /// Load a file for selection. Rejects files whose content is not a
    /// recognizable image.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Error::FileRead(format!("Failed to read {}: {}", path.display(), e)))?;

        let media_type = crate::ai::mime::detect_image_mime(&bytes)
            .ok_or_else(|| Error::NotAnImage(path.display().to_string()))?;

        Ok(Self {
            path: path.to_path_buf(),
            media_type: media_type.to_string(),
            preview: crate::encoder::bytes_to_data_uri(media_type, &bytes),
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Base64 inline payload for one image in a generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedImagePart {
    pub data: String,
    pub mime_type: String,
}

/// A generated image as a `data:<mediaType>;base64,<data>` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult(String);

impl GenerationResult {
    pub fn from_inline(mime_type: &str, data: &str) -> Self {
        Self(format!("data:{};base64,{}", mime_type, data))
    }

    pub fn as_data_uri(&self) -> &str {
        &self.0
    }

    /// Media type between `data:` and the first `;`, if well formed.
    pub fn media_type(&self) -> Option<&str> {
        let header = self.0.split(';').next()?;
        let media_type = header.split(':').nth(1)?;
        (!media_type.is_empty()).then_some(media_type)
    }

    /// File extension for downloads: the media subtype, `png` when the URI
    /// has none.
    pub fn extension(&self) -> &str {
        self.media_type()
            .and_then(|m| m.split('/').nth(1))
            .filter(|ext| !ext.is_empty())
            .unwrap_or("png")
    }

    pub fn decode(&self) -> Result<Vec<u8>> {
        let part = EncodedImagePart::from_data_uri(&self.0)?;
        use base64::Engine as _;
        Ok(base64::engine::general_purpose::STANDARD.decode(part.data)?)
    }
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub max_trials: Option<u32>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("API_KEY")
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Config("API_KEY environment variable not set".to_string()))?;

        let timeout_secs = match lookup("TRYON_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                Error::Config(format!("TRYON_TIMEOUT_SECS must be a number, got '{}'", raw))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let max_trials = lookup("TRYON_MAX_TRIALS")
            .map(|raw| {
                raw.parse::<u32>().map_err(|_| {
                    Error::Config(format!("TRYON_MAX_TRIALS must be a number, got '{}'", raw))
                })
            })
            .transpose()?;

        Ok(Self {
            api_key,
            model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: lookup("GEMINI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            max_trials,
        })
    }
}
