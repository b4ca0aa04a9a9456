//! Error handling and custom error types
//!
//! Provides unified error handling across the application using thiserror.
//! The try-on variants double as the user-facing messages shown in the
//! result pane, so their `Display` text is part of the behavior.

use thiserror::Error;

pub const VALIDATION_MESSAGE: &str = "Please upload both a person and an outfit image.";
pub const NO_IMAGE_MESSAGE: &str = "No image was generated. This can happen due to safety policies or if the request is unclear. Please try using different images.";
pub const SAFETY_BLOCK_MESSAGE: &str =
    "Image generation was blocked due to safety policies. Please try different images.";
pub const UNKNOWN_MESSAGE: &str = "An unknown error occurred during image generation.";

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport failure talking to the generation endpoint. The display
    /// names the failure kind and walks the source chain.
    #[error("{}", describe_transport(.0))]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A selected file could not be read or turned into an image payload.
    #[error("{0}")]
    FileRead(String),

    #[error("Not an image file: {0}")]
    NotAnImage(String),

    #[error("{}", VALIDATION_MESSAGE)]
    Validation,

    /// Raw failure reported by the generation endpoint, before classification.
    #[error("{0}")]
    Upstream(String),

    #[error("Model refused: {0}")]
    ModelRefused(String),

    #[error("{}", NO_IMAGE_MESSAGE)]
    NoImage,

    #[error("{}", SAFETY_BLOCK_MESSAGE)]
    SafetyBlocked,

    #[error("API Error: {0}")]
    Api(String),

    #[error("{}", UNKNOWN_MESSAGE)]
    Unknown,

    #[error("Generation was cancelled")]
    Cancelled,

    #[error("There is no generated image to download")]
    NothingToDownload,

    #[error("Failed to decode image data: {0}")]
    Decode(#[from] base64::DecodeError),
}

impl Error {
    /// True for errors already shaped by the try-on client's classification.
    pub fn is_classified(&self) -> bool {
        matches!(self, Self::ModelRefused(_) | Self::NoImage)
    }

    /// Whether the message reads like a safety/policy block.
    ///
    /// Plain substring matching on error text; unrelated messages that happen
    /// to contain these words are classified the same way.
    pub fn mentions_safety(message: &str) -> bool {
        message.contains("SAFETY") || message.to_lowercase().contains("policy")
    }

    /// Normalize any failure of a generation request into the user-facing
    /// taxonomy: safety block, pass-through of classified errors, or a
    /// generic API error carrying the original message.
    pub fn classify(self) -> Self {
        let message = self.to_string();
        if Self::mentions_safety(&message) {
            return Self::SafetyBlocked;
        }
        if self.is_classified() || matches!(self, Self::Unknown | Self::Cancelled) {
            return self;
        }
        Self::Api(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// "request timed out: <reqwest message>: <cause>: <cause>..."
fn describe_transport(err: &reqwest::Error) -> String {
    let kind = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "connection failed"
    } else if err.is_decode() {
        "invalid response body"
    } else {
        "request failed"
    };

    let mut message = format!("{}: {}", kind, err);
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.ends_with(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safety_keyword_wins_over_original_text() {
        let err = Error::Upstream("finishReason: SAFETY".to_string()).classify();
        assert!(matches!(err, Error::SafetyBlocked));
        assert_eq!(err.to_string(), SAFETY_BLOCK_MESSAGE);
    }

    #[test]
    fn test_policy_match_is_case_insensitive() {
        let err = Error::Upstream("Violates usage Policy".to_string()).classify();
        assert!(matches!(err, Error::SafetyBlocked));
    }

    #[test]
    fn test_lowercase_safety_is_not_a_block() {
        let err = Error::Upstream("safety check passed, but quota exceeded".to_string()).classify();
        assert_eq!(
            err.to_string(),
            "API Error: safety check passed, but quota exceeded"
        );
    }

    #[test]
    fn test_refusal_passes_through_unwrapped() {
        let err = Error::ModelRefused("Cannot process".to_string()).classify();
        assert_eq!(err.to_string(), "Model refused: Cannot process");
    }

    #[test]
    fn test_refusal_mentioning_policy_becomes_safety_block() {
        let err = Error::ModelRefused("that breaks my content policy".to_string()).classify();
        assert!(matches!(err, Error::SafetyBlocked));
    }

    #[test]
    fn test_no_image_passes_through() {
        // "policies" does not contain "policy"
        let err = Error::NoImage.classify();
        assert!(matches!(err, Error::NoImage));
    }

    #[test]
    fn test_other_errors_wrap_as_api_error() {
        let err = Error::Upstream("got status: 500 Internal Server Error. boom".to_string())
            .classify();
        assert_eq!(
            err.to_string(),
            "API Error: got status: 500 Internal Server Error. boom"
        );
    }

    #[test]
    fn test_unknown_is_kept() {
        assert_eq!(Error::Unknown.classify().to_string(), UNKNOWN_MESSAGE);
    }
}
