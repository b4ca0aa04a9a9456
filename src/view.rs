//! Screen rendering for the terminal front end.
//!
//! Everything here draws from session state into a ratatui [`Frame`];
//! nothing reads input or touches the network.

use crate::commands::{PathPrompt, KEY_HINTS};
use crate::models::ImageInput;
use crate::session::{Phase, Session, Slot};
use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Gauge, Paragraph, Wrap},
    Frame,
};

pub const TITLE: &str = "Outfit Trial";
pub const SAFETY_HINT: &str = "This can happen if the images violate content policies. Please try using different person or outfit images.";

/// Rows the full screen needs; used for the inline viewport of one-shot runs.
pub const SCREEN_HEIGHT: u16 = 24;

const UPLOADER_HEIGHT: u16 = 5;

/// State of the generate button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trigger {
    pub label: &'static str,
    pub disabled: bool,
}

pub fn trigger(session: &Session) -> Trigger {
    let label = if session.is_loading() {
        "Generating..."
    } else if session.has_result() {
        "Regenerate"
    } else {
        "Try On"
    };
    Trigger {
        label,
        disabled: !session.can_generate(),
    }
}

/// Whether an error message should carry the content-policy hint.
pub fn needs_safety_hint(message: &str) -> bool {
    message.to_lowercase().contains("safety policies")
}

/// Fraction of the trial allowance used, clamped to the gauge's range.
pub fn usage_ratio(usage: u32, max_trials: u32) -> f64 {
    if max_trials == 0 {
        return 0.0;
    }
    (f64::from(usage) / f64::from(max_trials)).min(1.0)
}

/// Screen state that lives outside the session.
#[derive(Debug, Default, Clone, Copy)]
pub struct Chrome<'a> {
    pub max_trials: Option<u32>,
    pub prompt: Option<&'a PathPrompt>,
    pub status: Option<&'a str>,
}

pub fn render(frame: &mut Frame, session: &Session, chrome: &Chrome) {
    let meter_height = if chrome.max_trials.is_some() { 1 } else { 0 };
    let [header, meter, uploads, result, controls, input, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(meter_height),
        Constraint::Length(UPLOADER_HEIGHT),
        Constraint::Min(6),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(frame, header);
    if let Some(max_trials) = chrome.max_trials {
        render_usage_meter(frame, meter, session.usage_count(), max_trials);
    }

    let [person, outfit] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(uploads);
    let editing = chrome.prompt.map(|p| p.slot);
    render_uploader(frame, person, Slot::Person, session.person(), editing);
    render_uploader(frame, outfit, Slot::Outfit, session.outfit(), editing);

    render_result(frame, result, session.phase());
    render_controls(frame, controls, session);
    render_input(frame, input, chrome);
    render_footer(frame, footer);
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(
            format!(" {} ", TITLE),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            "dress a person photo in an outfit photo",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(title), area);
}

fn render_usage_meter(frame: &mut Frame, area: Rect, usage: u32, max_trials: u32) {
    let ratio = usage_ratio(usage, max_trials);
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Cyan).bg(Color::Black))
        .ratio(ratio)
        .label(format!(
            "Free Trial Usage  {} / {}  ({:.0}%)",
            usage,
            max_trials,
            ratio * 100.0
        ));
    frame.render_widget(gauge, area);
}

fn slot_title(slot: Slot) -> &'static str {
    match slot {
        Slot::Person => "1. Upload Person",
        Slot::Outfit => "2. Upload Outfit",
    }
}

fn slot_keys(slot: Slot) -> (char, char) {
    match slot {
        Slot::Person => ('p', 'P'),
        Slot::Outfit => ('o', 'O'),
    }
}

pub fn uploader_lines(slot: Slot, image: Option<&ImageInput>) -> Vec<Line<'static>> {
    let (choose, remove) = slot_keys(slot);
    match image {
        Some(image) => vec![
            Line::from(image.file_name()).bold(),
            Line::from(format!(
                "{}, {} byte preview",
                image.media_type,
                image.preview.len()
            ))
            .fg(Color::DarkGray),
            Line::from(format!("[{}] remove  [{}] replace", remove, choose)),
        ],
        None => vec![
            Line::from(format!("Drop a file or press {} to choose one", choose)),
            Line::from("PNG, JPG, WEBP").fg(Color::DarkGray),
        ],
    }
}

fn render_uploader(
    frame: &mut Frame,
    area: Rect,
    slot: Slot,
    image: Option<&ImageInput>,
    editing: Option<Slot>,
) {
    let border = if editing == Some(slot) {
        Style::default().fg(Color::Yellow)
    } else if image.is_some() {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::bordered()
        .title(slot_title(slot))
        .border_style(border);
    let body = Paragraph::new(uploader_lines(slot, image))
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(body, area);
}

/// Body of the result pane for a phase.
pub fn result_lines(phase: &Phase) -> Vec<Line<'static>> {
    match phase {
        Phase::Idle => vec![Line::from("Your result will appear here").fg(Color::DarkGray)],
        Phase::Loading { .. } => vec![
            Line::from("Generating your new look...").bold(),
            Line::from("This may take a moment.").fg(Color::DarkGray),
        ],
        Phase::Failure(message) => {
            let mut lines = vec![
                Line::from("An error occurred").fg(Color::Red).bold(),
                Line::from(message.clone()),
            ];
            if needs_safety_hint(message) {
                lines.push(Line::from(SAFETY_HINT).italic().fg(Color::DarkGray));
            }
            lines.push(Line::default());
            lines.push(Line::from("[g] Try Again"));
            lines
        }
        Phase::Success(result) => vec![
            Line::from(format!(
                "Try-on ready ({})",
                result.media_type().unwrap_or("image")
            ))
            .fg(Color::Green)
            .bold(),
            Line::default(),
            Line::from("[s] Download"),
        ],
    }
}

fn render_result(frame: &mut Frame, area: Rect, phase: &Phase) {
    let border = match phase {
        Phase::Failure(_) => Style::default().fg(Color::Red),
        Phase::Success(_) => Style::default().fg(Color::Green),
        _ => Style::default(),
    };
    let body = Paragraph::new(Text::from(result_lines(phase)))
        .block(Block::bordered().title("3. Result").border_style(border))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(body, area);
}

fn button(label: &str, disabled: bool) -> Span<'static> {
    let style = if disabled {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    };
    Span::styled(format!(" {} ", label), style)
}

fn render_controls(frame: &mut Frame, area: Rect, session: &Session) {
    let trigger = trigger(session);
    let mut spans = vec![button(trigger.label, trigger.disabled)];
    if session.can_reset() {
        spans.push(Span::raw("  "));
        spans.push(button("Reset", session.is_loading()));
    }
    let controls = Paragraph::new(Line::from(spans))
        .block(Block::bordered())
        .alignment(Alignment::Center);
    frame.render_widget(controls, area);
}

fn render_input(frame: &mut Frame, area: Rect, chrome: &Chrome) {
    if let Some(prompt) = chrome.prompt {
        let title = format!(
            "{} path (Enter to select, Esc to cancel)",
            match prompt.slot {
                Slot::Person => "Person photo",
                Slot::Outfit => "Outfit photo",
            }
        );
        let input = Paragraph::new(prompt.input.as_str())
            .block(Block::bordered().title(title).border_style(Style::default().fg(Color::Yellow)));
        frame.render_widget(input, area);

        let cursor_x = area.x + 1 + prompt.input.chars().count() as u16;
        frame.set_cursor_position((cursor_x.min(area.right().saturating_sub(2)), area.y + 1));
        return;
    }

    let message = chrome.status.unwrap_or("Press p or o to choose photos, g to try on.");
    let status = Paragraph::new(message)
        .block(Block::bordered().border_style(Style::default().fg(Color::DarkGray)));
    frame.render_widget(status, area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let key_style = Style::default()
        .fg(Color::White)
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD);

    let mut spans = Vec::new();
    for (key, action) in KEY_HINTS {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::raw(format!(" {}  ", action)));
    }
    spans.push(Span::styled(
        "Powered by Generative AI.",
        Style::default().fg(Color::DarkGray),
    ));
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
