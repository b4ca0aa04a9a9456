//! Terminal setup and input events for the interactive front end.

use crate::Result;
use crossterm::{
    event::{
        DisableBracketedPaste, EnableBracketedPaste, Event, EventStream, KeyEvent, KeyEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::stream::{BoxStream, StreamExt};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stderr};

pub type Tui = Terminal<CrosstermBackend<Stderr>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Key(KeyEvent),
    /// Bracketed paste. Terminals deliver a dropped file's path this way.
    Paste(String),
    Resize(u16, u16),
}

/// Terminal input as [`AppEvent`]s. Only key presses are kept, not releases
/// or repeats.
pub fn events() -> BoxStream<'static, AppEvent> {
    EventStream::new()
        .filter_map(|event| {
            let app_event = match event {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
                Ok(Event::Paste(text)) => Some(AppEvent::Paste(text)),
                Ok(Event::Resize(w, h)) => Some(AppEvent::Resize(w, h)),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("Failed to read terminal event: {}", e);
                    None
                }
            };
            futures_util::future::ready(app_event)
        })
        .boxed()
}

pub fn init() -> Result<Tui> {
    enable_raw_mode()?;
    execute!(io::stderr(), EnterAlternateScreen, EnableBracketedPaste)?;

    let backend = CrosstermBackend::new(io::stderr());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

pub fn restore() -> Result<()> {
    execute!(io::stderr(), DisableBracketedPaste, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

/// Put the terminal back before the default hook prints the panic.
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = restore();
        original_hook(panic_info);
    }));
}
