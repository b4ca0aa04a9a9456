//! Keyboard commands and the path prompt used to pick photos.

use crate::session::Slot;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;

/// Key hints shown in the footer, as (key, action).
pub const KEY_HINTS: [(&str, &str); 6] = [
    ("p/o", "choose photo"),
    ("P/O", "remove"),
    ("g", "try on"),
    ("s", "download"),
    ("r", "reset"),
    ("q", "quit"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Open the path prompt for a slot.
    Choose(Slot),
    Clear(Slot),
    Generate,
    Download,
    Reset,
    Quit,
}

impl Action {
    pub fn from_key(key: KeyEvent) -> Option<Self> {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => Some(Self::Quit),
                _ => None,
            };
        }

        match key.code {
            KeyCode::Char('p') | KeyCode::Char('1') => Some(Self::Choose(Slot::Person)),
            KeyCode::Char('o') | KeyCode::Char('2') => Some(Self::Choose(Slot::Outfit)),
            KeyCode::Char('P') => Some(Self::Clear(Slot::Person)),
            KeyCode::Char('O') => Some(Self::Clear(Slot::Outfit)),
            KeyCode::Char('g') | KeyCode::Enter => Some(Self::Generate),
            KeyCode::Char('s') | KeyCode::Char('d') => Some(Self::Download),
            KeyCode::Char('r') => Some(Self::Reset),
            KeyCode::Char('q') | KeyCode::Esc => Some(Self::Quit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    Editing,
    Submitted(Slot, PathBuf),
    Cancelled,
}

/// A file path being typed (or dropped) for one upload slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrompt {
    pub slot: Slot,
    pub input: String,
}

impl PathPrompt {
    pub fn new(slot: Slot) -> Self {
        Self {
            slot,
            input: String::new(),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PromptOutcome {
        let control = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Enter => self.submit(),
            KeyCode::Esc => PromptOutcome::Cancelled,
            KeyCode::Char('c') if control => PromptOutcome::Cancelled,
            KeyCode::Char('u') if control => {
                self.input.clear();
                PromptOutcome::Editing
            }
            KeyCode::Char(c) if !control => {
                self.input.push(c);
                PromptOutcome::Editing
            }
            KeyCode::Backspace => {
                self.input.pop();
                PromptOutcome::Editing
            }
            _ => PromptOutcome::Editing,
        }
    }

    pub fn paste(&mut self, text: &str) {
        self.input.push_str(text.trim_end_matches(&['\r', '\n'][..]));
    }

    /// Dropped files arrive quoted when the path has spaces.
    fn submit(&self) -> PromptOutcome {
        let raw = self.input.trim();
        let unquoted = ['\'', '"']
            .iter()
            .find_map(|q| raw.strip_prefix(*q).and_then(|r| r.strip_suffix(*q)))
            .unwrap_or(raw);

        if unquoted.is_empty() {
            PromptOutcome::Cancelled
        } else {
            PromptOutcome::Submitted(self.slot, PathBuf::from(unquoted))
        }
    }
}
