use super::TryOnService;
use crate::models::{EncodedImagePart, GenerationResult};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scripted outcome for one mock call.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Image { mime_type: String, data: String },
    Refusal(String),
    NoImage,
    Failure(String),
}

/// Records every request and replays scripted outcomes in order, cycling
/// when the script runs out.
#[derive(Clone)]
pub struct MockTryOnClient {
    outcomes: Arc<Mutex<Vec<MockOutcome>>>,
    requests: Arc<Mutex<Vec<(EncodedImagePart, EncodedImagePart, String)>>>,
    call_count: Arc<Mutex<usize>>,
    delay: Option<Duration>,
}

impl MockTryOnClient {
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            delay: None,
        }
    }

    pub fn with_outcome(self, outcome: MockOutcome) -> Self {
        self.outcomes.lock().unwrap().push(outcome);
        self
    }

    pub fn with_image_response(self, mime_type: &str, data: &str) -> Self {
        self.with_outcome(MockOutcome::Image {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    }

    /// Sleep before answering, to keep a request in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn get_requests(&self) -> Vec<(EncodedImagePart, EncodedImagePart, String)> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockTryOnClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TryOnService for MockTryOnClient {
    async fn generate_try_on(
        &self,
        person: &EncodedImagePart,
        outfit: &EncodedImagePart,
        prompt: &str,
    ) -> Result<GenerationResult> {
        let outcome = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;

            self.requests
                .lock()
                .unwrap()
                .push((person.clone(), outfit.clone(), prompt.to_string()));

            let outcomes = self.outcomes.lock().unwrap();
            if outcomes.is_empty() {
                None
            } else {
                Some(outcomes[(*count - 1) % outcomes.len()].clone())
            }
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = match outcome {
            // Return a tiny PNG signature as default
            None => Ok(GenerationResult::from_inline("image/png", "iVBORw0KGgo=")),
            Some(MockOutcome::Image { mime_type, data }) => {
                Ok(GenerationResult::from_inline(&mime_type, &data))
            }
            Some(MockOutcome::Refusal(text)) => Err(Error::ModelRefused(text)),
            Some(MockOutcome::NoImage) => Err(Error::NoImage),
            Some(MockOutcome::Failure(message)) => Err(Error::Upstream(message)),
        };
        result.map_err(Error::classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part() -> EncodedImagePart {
        EncodedImagePart {
            data: "AAAA".to_string(),
            mime_type: "image/png".to_string(),
        }
    }

    #[tokio::test]
    async fn test_mock_default_response_is_png() {
        let client = MockTryOnClient::new();
        let result = client.generate_try_on(&part(), &part(), "p").await.unwrap();
        assert_eq!(result.media_type(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_mock_cycles_outcomes() {
        let client = MockTryOnClient::new()
            .with_image_response("image/jpeg", "AAAA")
            .with_outcome(MockOutcome::Refusal("nope".to_string()));

        assert!(client.generate_try_on(&part(), &part(), "p").await.is_ok());
        let err = client
            .generate_try_on(&part(), &part(), "p")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Model refused: nope");
        assert!(client.generate_try_on(&part(), &part(), "p").await.is_ok());
        assert_eq!(client.get_call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_failures_are_classified() {
        let client = MockTryOnClient::new().with_outcome(MockOutcome::Failure(
            "candidate blocked: SAFETY".to_string(),
        ));
        let err = client
            .generate_try_on(&part(), &part(), "p")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SafetyBlocked));
    }

    #[tokio::test]
    async fn test_mock_records_requests() {
        let client = MockTryOnClient::new();
        client
            .generate_try_on(&part(), &part(), "instructions")
            .await
            .unwrap();
        let requests = client.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].2, "instructions");
    }
}
