//! UI module: View components for the TUI.

pub mod form;
pub mod history;
pub mod markup;
pub mod result;

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::tui::styles::CardioTheme;

/// Severity of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Warning,
    Error,
}

pub fn render_disclaimer(f: &mut Frame, area: Rect, status: Option<(&str, StatusKind)>) {
    let first = match status {
        Some((message, kind)) => {
            let style = match kind {
                StatusKind::Info => CardioTheme::info(),
                StatusKind::Success => CardioTheme::success(),
                StatusKind::Warning => CardioTheme::warning(),
                StatusKind::Error => CardioTheme::danger(),
            };
            Line::from(vec![Span::styled(message.to_string(), style)])
        }
        None => Line::from(""),
    };

    let text = vec![
        first,
        Line::from(vec![Span::styled(
            "DISCLAIMER: Indicative heuristic estimate only. Not a validated clinical tool and no substitute for professional medical evaluation.",
            CardioTheme::text_muted(),
        )]),
    ];

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(CardioTheme::border());

    let p = Paragraph::new(text).block(block).wrap(Wrap { trim: true });

    f.render_widget(p, area);
}
