//! Try-on session state.
//!
//! The session owns the two selected images, the current [`Phase`], and the
//! counters that live for the length of one run. Generation is split into
//! [`Session::begin_attempt`], [`Attempt::run`] and [`Session::finish_attempt`]
//! so the request can be awaited without borrowing the session; each attempt
//! carries its own cancellation token, and outcomes of superseded attempts
//! are dropped.

use crate::ai::TryOnService;
use crate::encoder::encode_file;
use crate::models::{GenerationResult, ImageInput};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What the result pane is showing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading {
        attempt: Uuid,
    },
    Success(GenerationResult),
    /// Display text of the classified error.
    Failure(String),
}

/// Which upload slot a selection targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Person,
    Outfit,
}

/// One generation attempt, detached from the session while it runs.
#[derive(Debug)]
pub struct Attempt {
    id: Uuid,
    person: ImageInput,
    outfit: ImageInput,
    token: CancellationToken,
}

impl Attempt {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Encode both images and issue the combined request.
    ///
    /// The two files are read concurrently and both must succeed before the
    /// request goes out. Resolves to [`Error::Cancelled`] as soon as the
    /// attempt is superseded or the session is reset.
    pub async fn run(&self, service: &dyn TryOnService, prompt: &str) -> Result<GenerationResult> {
        let work = async {
            let (person, outfit) = tokio::try_join!(
                encode_file(&self.person.path),
                encode_file(&self.outfit.path)
            )?;
            debug!("Attempt {}: both images encoded", self.id);
            service.generate_try_on(&person, &outfit, prompt).await
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => {
                info!("Attempt {} cancelled", self.id);
                Err(Error::Cancelled)
            }
            outcome = work => outcome,
        }
    }
}

#[derive(Debug)]
pub struct Session {
    person: Option<ImageInput>,
    outfit: Option<ImageInput>,
    phase: Phase,
    current: Option<CancellationToken>,
    download_count: u32,
    usage_count: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            person: None,
            outfit: None,
            phase: Phase::Idle,
            current: None,
            download_count: 1,
            usage_count: 0,
        }
    }

    pub fn person(&self) -> Option<&ImageInput> {
        self.person.as_ref()
    }

    pub fn outfit(&self) -> Option<&ImageInput> {
        self.outfit.as_ref()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading { .. })
    }

    pub fn result(&self) -> Option<&GenerationResult> {
        match &self.phase {
            Phase::Success(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.phase {
            Phase::Failure(message) => Some(message),
            _ => None,
        }
    }

    pub fn has_result(&self) -> bool {
        self.result().is_some()
    }

    pub fn can_generate(&self) -> bool {
        self.person.is_some() && self.outfit.is_some() && !self.is_loading()
    }

    pub fn can_reset(&self) -> bool {
        self.person.is_some() || self.outfit.is_some() || self.has_result()
    }

    /// Number of requests sent to the generation service this session.
    pub fn usage_count(&self) -> u32 {
        self.usage_count
    }

    /// Number the next downloaded file will carry.
    pub fn next_download_number(&self) -> u32 {
        self.download_count
    }

    /// Replace or clear one upload slot. A shown result or error is cleared
    /// so stale output never sits next to new input.
    pub fn select(&mut self, slot: Slot, image: Option<ImageInput>) {
        match slot {
            Slot::Person => self.person = image,
            Slot::Outfit => self.outfit = image,
        }
        if matches!(self.phase, Phase::Success(_) | Phase::Failure(_)) {
            self.phase = Phase::Idle;
        }
    }

    pub fn select_person(&mut self, image: Option<ImageInput>) {
        self.select(Slot::Person, image);
    }

    pub fn select_outfit(&mut self, image: Option<ImageInput>) {
        self.select(Slot::Outfit, image);
    }

    /// Start a generation attempt.
    ///
    /// With an image missing the session shows the validation message and
    /// no attempt is created. Otherwise any in-flight attempt is cancelled
    /// and the session enters [`Phase::Loading`].
    pub fn begin_attempt(&mut self) -> Result<Attempt> {
        let (person, outfit) = match (&self.person, &self.outfit) {
            (Some(person), Some(outfit)) => (person.clone(), outfit.clone()),
            _ => {
                self.cancel_in_flight();
                self.phase = Phase::Failure(Error::Validation.to_string());
                return Err(Error::Validation);
            }
        };

        self.cancel_in_flight();

        let id = Uuid::new_v4();
        let token = CancellationToken::new();
        self.current = Some(token.clone());
        self.phase = Phase::Loading { attempt: id };
        self.usage_count += 1;

        info!(
            "Starting attempt {} ({} + {})",
            id,
            person.file_name(),
            outfit.file_name()
        );

        Ok(Attempt {
            id,
            person,
            outfit,
            token,
        })
    }

    /// Record the outcome of an attempt. Returns `false` when the attempt is
    /// no longer the current one and the outcome was dropped.
    pub fn finish_attempt(&mut self, id: Uuid, outcome: &Result<GenerationResult>) -> bool {
        if self.phase != (Phase::Loading { attempt: id }) {
            warn!("Dropping outcome of superseded attempt {}", id);
            return false;
        }

        self.current = None;
        self.phase = match outcome {
            Ok(result) => {
                info!("Attempt {} produced {}", id, result.media_type().unwrap_or("an image"));
                Phase::Success(result.clone())
            }
            Err(e) => {
                warn!("Attempt {} failed: {}", id, e);
                Phase::Failure(e.to_string())
            }
        };
        true
    }

    /// Run a full attempt against `service` and record its outcome.
    pub async fn generate(
        &mut self,
        service: &dyn TryOnService,
        prompt: &str,
    ) -> Result<GenerationResult> {
        let attempt = self.begin_attempt()?;
        let outcome = attempt.run(service, prompt).await;
        self.finish_attempt(attempt.id(), &outcome);
        outcome
    }

    /// Clear both images and any result or error. An in-flight attempt is
    /// cancelled and its outcome will be ignored.
    pub fn reset(&mut self) {
        self.cancel_in_flight();
        self.person = None;
        self.outfit = None;
        self.phase = Phase::Idle;
        info!("Session reset");
    }

    /// Save the shown result as `virtual-try-on-<n>.<ext>` in `dir`.
    pub async fn download(&mut self, dir: &Path) -> Result<PathBuf> {
        let result = self.result().ok_or(Error::NothingToDownload)?;
        let file_name = format!(
            "virtual-try-on-{}.{}",
            self.download_count,
            result.extension()
        );
        let bytes = result.decode()?;

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(file_name);
        tokio::fs::write(&path, &bytes).await?;

        self.download_count += 1;
        info!("Saved {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    fn cancel_in_flight(&mut self) {
        if let Some(token) = self.current.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::mock::{MockOutcome, MockTryOnClient};
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::TempDir;

    const PNG: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    const JPEG: [u8; 6] = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

    async fn image(dir: &TempDir, name: &str, bytes: &[u8]) -> ImageInput {
        let path = dir.path().join(name);
        std::fs::File::create(&path)
            .unwrap()
            .write_all(bytes)
            .unwrap();
        ImageInput::load(&path).await.unwrap()
    }

    async fn ready_session(dir: &TempDir) -> Session {
        let mut session = Session::new();
        session.select_person(Some(image(dir, "person.jpg", &JPEG).await));
        session.select_outfit(Some(image(dir, "outfit.png", &PNG).await));
        session
    }

    #[tokio::test]
    async fn test_generate_requires_both_images() {
        let dir = TempDir::new().unwrap();
        let service = MockTryOnClient::new();

        let mut session = Session::new();
        session.select_person(Some(image(&dir, "person.jpg", &JPEG).await));

        let err = session.generate(&service, "p").await.unwrap_err();
        assert!(matches!(err, Error::Validation));
        assert_eq!(
            session.error(),
            Some("Please upload both a person and an outfit image.")
        );
        assert_eq!(service.get_call_count(), 0);
        assert_eq!(session.usage_count(), 0);

        let mut empty = Session::new();
        assert!(empty.generate(&service, "p").await.is_err());
        assert_eq!(service.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_generate_sends_person_then_outfit() {
        let dir = TempDir::new().unwrap();
        let service = MockTryOnClient::new().with_image_response("image/png", "AAAA");
        let mut session = ready_session(&dir).await;

        let result = session.generate(&service, "prompt").await.unwrap();
        assert_eq!(result.as_data_uri(), "data:image/png;base64,AAAA");
        assert_eq!(session.phase(), &Phase::Success(result));
        assert_eq!(session.usage_count(), 1);

        let requests = service.get_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].0.mime_type, "image/jpeg");
        assert_eq!(requests[0].1.mime_type, "image/png");
        assert_eq!(requests[0].2, "prompt");
    }

    #[tokio::test]
    async fn test_failure_is_shown_as_message() {
        let dir = TempDir::new().unwrap();
        let service =
            MockTryOnClient::new().with_outcome(MockOutcome::Refusal("Cannot process".to_string()));
        let mut session = ready_session(&dir).await;

        session.generate(&service, "p").await.unwrap_err();
        assert_eq!(session.error(), Some("Model refused: Cannot process"));
        assert!(!session.is_loading());
        assert!(!session.has_result());
    }

    #[tokio::test]
    async fn test_failure_holds_classified_message() {
        let dir = TempDir::new().unwrap();
        let service = MockTryOnClient::new()
            .with_outcome(MockOutcome::Failure("finishReason: SAFETY".to_string()))
            .with_outcome(MockOutcome::NoImage);
        let mut session = ready_session(&dir).await;

        session.generate(&service, "p").await.unwrap_err();
        assert_eq!(
            session.phase(),
            &Phase::Failure(crate::error::SAFETY_BLOCK_MESSAGE.to_string())
        );

        session.generate(&service, "p").await.unwrap_err();
        assert_eq!(
            session.phase(),
            &Phase::Failure(crate::error::NO_IMAGE_MESSAGE.to_string())
        );
    }

    #[tokio::test]
    async fn test_unreadable_file_fails_without_request() {
        let dir = TempDir::new().unwrap();
        let service = MockTryOnClient::new();
        let mut session = ready_session(&dir).await;
        std::fs::remove_file(dir.path().join("outfit.png")).unwrap();

        let err = session.generate(&service, "p").await.unwrap_err();
        assert!(matches!(err, Error::FileRead(_)));
        assert!(session.error().is_some());
        assert_eq!(service.get_call_count(), 0);
    }

    #[tokio::test]
    async fn test_selection_clears_result_and_error() {
        let dir = TempDir::new().unwrap();
        let service = MockTryOnClient::new()
            .with_image_response("image/png", "AAAA")
            .with_outcome(MockOutcome::NoImage);
        let mut session = ready_session(&dir).await;

        session.generate(&service, "p").await.unwrap();
        session.select_person(Some(image(&dir, "other.jpg", &JPEG).await));
        assert_eq!(session.phase(), &Phase::Idle);
        session.select_person(Some(image(&dir, "other.jpg", &JPEG).await));
        assert_eq!(session.phase(), &Phase::Idle);

        session.generate(&service, "p").await.unwrap_err();
        assert!(session.error().is_some());
        session.select_outfit(None);
        assert_eq!(session.phase(), &Phase::Idle);
        assert!(session.outfit().is_none());
        assert!(session.person().is_some());
    }

    #[tokio::test]
    async fn test_selection_while_loading_keeps_loading() {
        let dir = TempDir::new().unwrap();
        let mut session = ready_session(&dir).await;
        let attempt = session.begin_attempt().unwrap();

        session.select_outfit(Some(image(&dir, "new.png", &PNG).await));
        assert_eq!(
            session.phase(),
            &Phase::Loading {
                attempt: attempt.id()
            }
        );
    }

    #[tokio::test]
    async fn test_reset_mid_loading_drops_stale_outcome() {
        let dir = TempDir::new().unwrap();
        let service = MockTryOnClient::new();
        let mut session = ready_session(&dir).await;

        let attempt = session.begin_attempt().unwrap();
        assert!(session.is_loading());
        session.reset();

        assert!(session.person().is_none());
        assert!(session.outfit().is_none());
        assert_eq!(session.phase(), &Phase::Idle);
        assert!(!session.can_reset());

        let outcome = attempt.run(&service, "p").await;
        assert!(matches!(outcome, Err(Error::Cancelled)));
        assert!(!session.finish_attempt(attempt.id(), &outcome));
        assert_eq!(session.phase(), &Phase::Idle);

        let late = Ok(GenerationResult::from_inline("image/png", "AAAA"));
        assert!(!session.finish_attempt(attempt.id(), &late));
        assert!(!session.has_result());
    }

    #[tokio::test]
    async fn test_new_attempt_supersedes_previous() {
        let dir = TempDir::new().unwrap();
        let service = MockTryOnClient::new().with_image_response("image/jpeg", "BBBB");
        let mut session = ready_session(&dir).await;

        let first = session.begin_attempt().unwrap();
        let second = session.begin_attempt().unwrap();
        assert_eq!(session.usage_count(), 2);

        let stale = first.run(&service, "p").await;
        assert!(matches!(stale, Err(Error::Cancelled)));
        assert!(!session.finish_attempt(first.id(), &stale));

        let fresh = second.run(&service, "p").await;
        assert!(session.finish_attempt(second.id(), &fresh));
        assert_eq!(
            session.result().map(|r| r.as_data_uri()),
            Some("data:image/jpeg;base64,BBBB")
        );
    }

    #[tokio::test]
    async fn test_download_names_increment() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let service = MockTryOnClient::new().with_image_response("image/jpeg", "/9j/4A==");
        let mut session = ready_session(&dir).await;
        session.generate(&service, "p").await.unwrap();

        let first = session.download(out.path()).await.unwrap();
        let second = session.download(out.path()).await.unwrap();
        assert_eq!(first, out.path().join("virtual-try-on-1.jpeg"));
        assert_eq!(second, out.path().join("virtual-try-on-2.jpeg"));
        assert_eq!(std::fs::read(&first).unwrap(), vec![0xFF, 0xD8, 0xFF, 0xE0]);

        session.reset();
        assert_eq!(session.next_download_number(), 3);
    }

    #[tokio::test]
    async fn test_download_defaults_extension_to_png() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let service = MockTryOnClient::new().with_image_response("image", "AAAA");
        let mut session = ready_session(&dir).await;
        session.generate(&service, "p").await.unwrap();

        let path = session.download(out.path()).await.unwrap();
        assert_eq!(path, out.path().join("virtual-try-on-1.png"));
    }

    #[tokio::test]
    async fn test_download_without_result() {
        let out = TempDir::new().unwrap();
        let mut session = Session::new();
        let err = session.download(out.path()).await.unwrap_err();
        assert!(matches!(err, Error::NothingToDownload));
        assert_eq!(session.next_download_number(), 1);
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let dir = TempDir::new().unwrap();
        let service = MockTryOnClient::new();
        let mut session = ready_session(&dir).await;
        session.generate(&service, "p").await.unwrap();
        assert!(session.can_reset());

        session.reset();
        assert!(session.person().is_none());
        assert!(session.outfit().is_none());
        assert!(session.result().is_none());
        assert!(session.error().is_none());
        assert!(!session.can_generate());
    }
}
