use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part};
use crate::ai::TryOnService;
use crate::models::{Config, EncodedImagePart, GenerationResult};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

pub struct GeminiTryOnClient {
    http: GeminiHttpClient,
}

impl GeminiTryOnClient {
    pub fn new(api_key: String, model: String) -> Self {
        Self::new_with_client(api_key, model, reqwest::Client::new())
    }

    pub fn new_with_client(api_key: String, model: String, client: reqwest::Client) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(
                api_key,
                model,
                Duration::from_secs(crate::models::DEFAULT_TIMEOUT_SECS),
                client,
            ),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            http: GeminiHttpClient::new(
                config.api_key.clone(),
                config.model.clone(),
                config.timeout,
            )
            .with_base_url(config.base_url.clone()),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    pub fn model(&self) -> &str {
        self.http.model()
    }

    fn build_request(
        person: &EncodedImagePart,
        outfit: &EncodedImagePart,
        prompt: &str,
    ) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: None,
                parts: vec![
                    Part::InlineData {
                        inline_data: person.clone(),
                    },
                    Part::InlineData {
                        inline_data: outfit.clone(),
                    },
                    Part::Text {
                        text: prompt.to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_string(), "TEXT".to_string()],
            },
        }
    }

    /// Image first, then the model's explanation, then a generic failure.
    fn interpret(response: &GenerateContentResponse) -> Result<GenerationResult> {
        if let Some(image) = response.first_inline_image() {
            tracing::debug!("Gemini returned image with mime_type: {}", image.mime_type);
            return Ok(GenerationResult::from_inline(&image.mime_type, &image.data));
        }

        if let Some(feedback) = &response.prompt_feedback {
            if let Some(reason) = &feedback.block_reason {
                tracing::warn!("Gemini blocked the prompt: {}", reason);
            }
        }
        if let Some(reason) = response.finish_reason() {
            tracing::warn!("Gemini finished without an image: {}", reason);
        }

        if let Some(text) = response.first_text() {
            return Err(Error::ModelRefused(text.to_string()));
        }

        Err(Error::NoImage)
    }

    async fn request(
        &self,
        person: &EncodedImagePart,
        outfit: &EncodedImagePart,
        prompt: &str,
    ) -> Result<GenerationResult> {
        let request = Self::build_request(person, outfit, prompt);
        let response: GenerateContentResponse = self.http.generate_content(&request).await?;
        Self::interpret(&response)
    }
}

#[async_trait]
impl TryOnService for GeminiTryOnClient {
    async fn generate_try_on(
        &self,
        person: &EncodedImagePart,
        outfit: &EncodedImagePart,
        prompt: &str,
    ) -> Result<GenerationResult> {
        self.request(person, outfit, prompt).await.map_err(|e| {
            tracing::error!("Error calling Gemini API: {}", e);
            e.classify()
        })
    }
}
