//! Color palette and shared styles.
//!
//! Centralizing these keeps the tabs visually consistent and makes a
//! future theme swap a one-file change.
#![allow(dead_code)]

use ratatui::style::{Color, Modifier, Style};

// Palette. Amber for chrome, green/red for price movement, dark-terminal
// friendly throughout.
pub const PRIMARY: Color = Color::Rgb(208, 160, 48);
pub const SECONDARY: Color = Color::Rgb(88, 168, 120);
pub const ACCENT: Color = Color::Rgb(96, 144, 200);
pub const ERROR: Color = Color::Rgb(200, 80, 96);
pub const MUTED: Color = Color::Rgb(128, 128, 128);
pub const HIGHLIGHT: Color = Color::Rgb(48, 48, 56);

pub fn title_style() -> Style {
    Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
}

pub fn selected_style() -> Style {
    Style::default().bg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

pub fn list_item_style() -> Style {
    Style::default().fg(Color::Gray)
}

pub fn muted_style() -> Style {
    Style::default().fg(MUTED)
}

pub fn highlight_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

/// Positive price movement and other good news.
pub fn success_style() -> Style {
    Style::default().fg(SECONDARY)
}

/// Negative price movement and error text.
pub fn error_style() -> Style {
    Style::default().fg(ERROR)
}

pub fn tab_style(selected: bool) -> Style {
    if selected {
        Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(MUTED)
    }
}

pub fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(PRIMARY)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

pub fn status_bar_style() -> Style {
    Style::default().bg(Color::Rgb(32, 32, 40)).fg(Color::Gray)
}

pub fn help_key_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn help_desc_style() -> Style {
    Style::default().fg(Color::Gray)
}
