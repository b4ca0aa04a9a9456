//! AI service integration for virtual try-on generation
//!
//! Provides the [`TryOnService`] seam, a Gemini `generateContent` client and a
//! scripted mock for tests.

pub mod gemini;
pub mod mime;
pub mod mock;

pub use gemini::GeminiTryOnClient;
pub use mock::MockTryOnClient;

use crate::models::{EncodedImagePart, GenerationResult};
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait TryOnService: Send + Sync {
    /// Send the person image, outfit image and instruction as one request and
    /// return the synthesized image.
    async fn generate_try_on(
        &self,
        person: &EncodedImagePart,
        outfit: &EncodedImagePart,
        prompt: &str,
    ) -> Result<GenerationResult>;
}
