//! Virtual outfit try-on.
//!
//! Takes a photo of a person and a photo of an outfit, sends both to a
//! generative image model with a fixed instruction, and shows or saves the
//! synthesized picture of the person wearing the outfit.

pub mod ai;
pub mod app;
pub mod commands;
pub mod encoder;
pub mod error;
pub mod models;
pub mod prompts;
pub mod session;
pub mod tui;
pub mod view;

pub use error::{Error, Result};
