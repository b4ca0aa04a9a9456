//! Application orchestration: wires the generation service to a session and
//! drives it from CLI arguments or terminal events.

use crate::ai::{GeminiTryOnClient, TryOnService};
use crate::commands::{Action, PathPrompt, PromptOutcome};
use crate::models::{Config, GenerationResult, ImageInput};
use crate::session::{Session, Slot};
use crate::tui::AppEvent;
use crate::view::{self, Chrome};
use crate::{prompts, Error, Result};
use crossterm::event::KeyEvent;
use futures_util::stream::{Stream, StreamExt};
use ratatui::{backend::Backend, Terminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, warn};
use uuid::Uuid;

/// A generation attempt running on its own task.
struct InFlight {
    id: Uuid,
    handle: JoinHandle<Result<GenerationResult>>,
}

/// A task that died without producing an error value has nothing to report.
fn joined_outcome(
    joined: std::result::Result<Result<GenerationResult>, JoinError>,
) -> Result<GenerationResult> {
    match joined {
        Ok(outcome) => outcome,
        Err(e) if e.is_cancelled() => Err(Error::Cancelled),
        Err(e) => {
            error!("Generation task failed: {}", e);
            Err(Error::Unknown)
        }
    }
}

async fn join_in_flight(in_flight: &mut Option<InFlight>) -> (Uuid, Result<GenerationResult>) {
    match in_flight {
        Some(flight) => {
            let joined = (&mut flight.handle).await;
            (flight.id, joined_outcome(joined))
        }
        None => std::future::pending().await,
    }
}

/// Coordinates the session, the generation service and the output directory.
pub struct App {
    service: Arc<dyn TryOnService>,
    session: Session,
    output_dir: PathBuf,
    max_trials: Option<u32>,
    prompt: Option<PathPrompt>,
    status: Option<String>,
}

impl App {
    /// Build an app around any generation service. Primarily useful for tests
    /// that inject a mock.
    pub fn with_service(
        service: Arc<dyn TryOnService>,
        output_dir: PathBuf,
        max_trials: Option<u32>,
    ) -> Self {
        Self {
            service,
            session: Session::new(),
            output_dir,
            max_trials,
            prompt: None,
            status: None,
        }
    }

    /// Construct an app backed by Gemini from environment configuration.
    pub fn from_config(config: &Config, output_dir: PathBuf) -> Self {
        let client = GeminiTryOnClient::from_config(config);
        info!("Try-on provider: Gemini (model: {})", client.model());
        Self::with_service(Arc::new(client), output_dir, config.max_trials)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Last one-line message for the status bar (save location, rejected file).
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn draw<B: Backend>(&self, terminal: &mut Terminal<B>) -> Result<()> {
        let chrome = Chrome {
            max_trials: self.max_trials,
            prompt: self.prompt.as_ref(),
            status: self.status.as_deref(),
        };
        terminal.draw(|frame| view::render(frame, &self.session, &chrome))?;
        Ok(())
    }

    /// Load a file into a slot. A file that is unreadable or not an image
    /// leaves the slot as it was and is reported on the status bar.
    pub async fn select_path(&mut self, slot: Slot, path: &Path) {
        match ImageInput::load(path).await {
            Ok(image) => {
                info!("Selected {} for {:?}", image.file_name(), slot);
                self.session.select(slot, Some(image));
                self.status = None;
            }
            Err(e) => {
                warn!("Rejected {}: {}", path.display(), e);
                self.status = Some(e.to_string());
            }
        }
    }

    /// Generate once from two files, save the result and draw the final
    /// screen.
    pub async fn run_once<B: Backend>(
        &mut self,
        person: &Path,
        outfit: &Path,
        terminal: &mut Terminal<B>,
    ) -> Result<PathBuf> {
        self.session
            .select_person(Some(ImageInput::load(person).await?));
        self.session
            .select_outfit(Some(ImageInput::load(outfit).await?));

        let saved = match self
            .session
            .generate(self.service.as_ref(), prompts::TRY_ON)
            .await
        {
            Ok(_) => match self.session.download(&self.output_dir).await {
                Ok(path) => {
                    self.status = Some(format!("Saved {}", path.display()));
                    Ok(path)
                }
                Err(e) => {
                    self.status = Some(e.to_string());
                    Err(e)
                }
            },
            Err(e) => Err(e),
        };

        self.draw(terminal)?;
        saved
    }

    /// Serve terminal events until quit or the end of the event stream.
    ///
    /// A running generation does not block input: reset or another generate
    /// supersede it and its late outcome is discarded. At the end of the
    /// stream the running generation is awaited; quitting abandons it.
    pub async fn run_interactive<B, S>(
        &mut self,
        terminal: &mut Terminal<B>,
        mut events: S,
    ) -> Result<()>
    where
        B: Backend,
        S: Stream<Item = AppEvent> + Unpin,
    {
        let mut in_flight: Option<InFlight> = None;
        let mut quit = false;
        self.draw(terminal)?;

        while !quit {
            tokio::select! {
                (id, outcome) = join_in_flight(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    if self.session.finish_attempt(id, &outcome) {
                        self.draw(terminal)?;
                    }
                }
                event = events.next() => {
                    let Some(event) = event else {
                        break;
                    };
                    quit = self.on_event(event, &mut in_flight).await;
                    if !quit {
                        self.draw(terminal)?;
                    }
                }
            }
        }

        if let Some(flight) = in_flight.take() {
            if quit {
                info!("Quitting with a generation still running");
                flight.handle.abort();
                return Ok(());
            }
            info!("Waiting for the running generation to finish");
            let outcome = joined_outcome(flight.handle.await);
            if self.session.finish_attempt(flight.id, &outcome) {
                self.draw(terminal)?;
            }
        }
        Ok(())
    }

    /// Returns `true` when the event asks to quit.
    async fn on_event(&mut self, event: AppEvent, in_flight: &mut Option<InFlight>) -> bool {
        match event {
            AppEvent::Key(key) => self.on_key(key, in_flight).await,
            AppEvent::Paste(text) => {
                match &mut self.prompt {
                    Some(prompt) => prompt.paste(&text),
                    None => warn!("Ignoring paste outside the path prompt"),
                }
                false
            }
            AppEvent::Resize(width, height) => {
                tracing::debug!("Terminal resized to {}x{}", width, height);
                false
            }
        }
    }

    async fn on_key(&mut self, key: KeyEvent, in_flight: &mut Option<InFlight>) -> bool {
        if let Some(prompt) = &mut self.prompt {
            match prompt.handle_key(key) {
                PromptOutcome::Editing => {}
                PromptOutcome::Cancelled => self.prompt = None,
                PromptOutcome::Submitted(slot, path) => {
                    self.prompt = None;
                    self.select_path(slot, &path).await;
                }
            }
            return false;
        }

        match Action::from_key(key) {
            Some(Action::Quit) => true,
            Some(action) => {
                self.handle(action, in_flight).await;
                false
            }
            None => false,
        }
    }

    async fn handle(&mut self, action: Action, in_flight: &mut Option<InFlight>) {
        match action {
            Action::Choose(slot) => {
                self.prompt = Some(PathPrompt::new(slot));
            }
            Action::Clear(slot) => {
                self.session.select(slot, None);
                self.status = None;
            }
            Action::Generate => {
                self.status = None;
                match self.session.begin_attempt() {
                    Ok(attempt) => {
                        let service = Arc::clone(&self.service);
                        let id = attempt.id();
                        let handle = tokio::spawn(async move {
                            attempt.run(service.as_ref(), prompts::TRY_ON).await
                        });
                        *in_flight = Some(InFlight { id, handle });
                    }
                    Err(e) => warn!("Not generating: {}", e),
                }
            }
            Action::Download => {
                self.status = Some(match self.session.download(&self.output_dir).await {
                    Ok(path) => format!("Saved {}", path.display()),
                    Err(e) => e.to_string(),
                });
            }
            Action::Reset => {
                if self.session.is_loading() {
                    info!("Reset while a generation is running; its result will be discarded");
                }
                self.session.reset();
                self.status = None;
                *in_flight = None;
            }
            Action::Quit => {}
        }
    }
}
