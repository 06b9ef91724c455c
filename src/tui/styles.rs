//! Colour palette and preset styles.

use ratatui::style::{Color, Modifier, Style};

use crate::domain::RiskLevel;

/// CardioPredict theme.
pub struct CardioTheme;

impl CardioTheme {
    /// Cardiac red, primary accent
    pub const PRIMARY: Color = Color::Rgb(225, 29, 72); // #E11D48

    /// Lighter red for highlights and focus
    pub const PRIMARY_LIGHT: Color = Color::Rgb(251, 113, 133); // #FB7185

    /// Darker red for the header bar
    pub const PRIMARY_DARK: Color = Color::Rgb(159, 18, 57); // #9F1239

    pub const BORDER: Color = Color::Rgb(148, 163, 184); // #94A3B8

    pub const INFO: Color = Color::Rgb(59, 130, 246); // #3B82F6

    pub const BG_DARK: Color = Color::Rgb(15, 23, 42); // #0F172A

    pub const TEXT_PRIMARY: Color = Color::Rgb(248, 250, 252); // #F8FAFC
    pub const TEXT_SECONDARY: Color = Color::Rgb(148, 163, 184); // #94A3B8
    pub const TEXT_MUTED: Color = Color::Rgb(100, 116, 139); // #64748B

    #[must_use]
    pub fn title() -> Style {
        Style::default()
            .fg(Self::TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn subtitle() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn text() -> Style {
        Style::default().fg(Self::TEXT_PRIMARY)
    }

    /// Bold body text (narrative `<strong>`)
    #[must_use]
    pub fn text_bold() -> Style {
        Self::text().add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn text_secondary() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    #[must_use]
    pub fn text_muted() -> Style {
        Style::default().fg(Self::TEXT_MUTED)
    }

    #[must_use]
    pub fn success() -> Style {
        Self::risk_level(RiskLevel::Low)
    }

    #[must_use]
    pub fn warning() -> Style {
        Self::risk_level(RiskLevel::Moderate)
    }

    #[must_use]
    pub fn danger() -> Style {
        Self::risk_level(RiskLevel::High)
    }

    #[must_use]
    pub fn info() -> Style {
        Style::default().fg(Self::INFO)
    }

    /// Highlighted row in lists
    #[must_use]
    pub fn selected() -> Style {
        Style::default()
            .fg(Self::BG_DARK)
            .bg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn focused() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn cursor() -> Style {
        Style::default().fg(Self::PRIMARY_LIGHT)
    }

    #[must_use]
    pub fn border() -> Style {
        Style::default().fg(Self::BORDER)
    }

    #[must_use]
    pub fn border_focused() -> Style {
        Style::default().fg(Self::PRIMARY)
    }

    #[must_use]
    pub fn header() -> Style {
        Style::default()
            .fg(Self::TEXT_PRIMARY)
            .bg(Self::PRIMARY_DARK)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn key_hint() -> Style {
        Style::default()
            .fg(Self::PRIMARY_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn key_desc() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    /// Key hint for an action that is currently unavailable
    #[must_use]
    pub fn key_disabled() -> Style {
        Style::default()
            .fg(Self::TEXT_MUTED)
            .add_modifier(Modifier::DIM)
    }

    /// Foreground colour of a risk level.
    #[must_use]
    pub fn risk_color(level: RiskLevel) -> Color {
        let (r, g, b) = level.color();
        Color::Rgb(r, g, b)
    }

    #[must_use]
    pub fn risk_level(level: RiskLevel) -> Style {
        Style::default().fg(Self::risk_color(level))
    }

    /// Full-screen transition: risk colour background.
    #[must_use]
    pub fn overlay(level: RiskLevel) -> Style {
        Style::default()
            .fg(Self::BG_DARK)
            .bg(Self::risk_color(level))
            .add_modifier(Modifier::BOLD)
    }

    /// Transition while it fades out.
    #[must_use]
    pub fn overlay_exit(level: RiskLevel) -> Style {
        Style::default()
            .fg(Self::risk_color(level))
            .bg(Self::BG_DARK)
            .add_modifier(Modifier::DIM)
    }
}

pub const LOGO_SMALL: &str = "CardioPredict";
