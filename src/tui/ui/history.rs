//! History view: aggregates, saved evaluations and entry details.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::application::HISTORY_CAPACITY;
use crate::domain::{format_percentage, HistoryEntry};
use crate::tui::styles::CardioTheme;

/// History view state
#[derive(Debug, Default)]
pub struct HistoryViewState {
    pub selected: usize,
}

impl HistoryViewState {
    pub fn next(&mut self, len: usize) {
        if len > 0 {
            self.selected = (self.selected + 1).min(len - 1);
        }
    }

    pub fn prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Keep the selection inside a list of `len` entries.
    pub fn clamp(&mut self, len: usize) {
        self.selected = self.selected.min(len.saturating_sub(1));
    }
}

/// Aggregates shown above the list
#[derive(Debug, Clone, Copy)]
pub struct HistoryStats {
    pub total_evaluations: u64,
    pub average_risk: f64,
}

/// Render the history view
pub fn render_history(
    f: &mut Frame,
    area: Rect,
    entries: &[HistoryEntry],
    stats: HistoryStats,
    state: &HistoryViewState,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(4), // Stats
            Constraint::Min(0),    // List + details
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_header(f, chunks[0], entries.len());
    render_stats(f, chunks[1], stats);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[2]);

    render_list(f, body[0], entries, state);
    render_details(f, body[1], entries.get(state.selected));
    render_footer(f, chunks[3], !entries.is_empty());
}

fn render_header(f: &mut Frame, area: Rect, count: usize) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", CardioTheme::text()),
        Span::styled("Evaluation History", CardioTheme::title()),
        Span::styled(
            format!(" │ {count}/{HISTORY_CAPACITY} saved"),
            CardioTheme::text_secondary(),
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(CardioTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_stats(f: &mut Frame, area: Rect, stats: HistoryStats) {
    let lines = vec![
        Line::from(vec![
            Span::styled("  Total evaluations: ", CardioTheme::text_secondary()),
            Span::styled(stats.total_evaluations.to_string(), CardioTheme::text()),
        ]),
        Line::from(vec![
            Span::styled("  Average risk: ", CardioTheme::text_secondary()),
            Span::styled(
                format!("{}%", format_percentage(stats.average_risk)),
                CardioTheme::text(),
            ),
        ]),
    ];

    let block = Block::default()
        .title(Span::styled(" Statistics ", CardioTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(CardioTheme::border());

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_list(f: &mut Frame, area: Rect, entries: &[HistoryEntry], state: &HistoryViewState) {
    let block = Block::default()
        .title(Span::styled(" Saved Evaluations ", CardioTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(CardioTheme::border());

    if entries.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            "No saved evaluations. Press [S] on a result to save it.",
            CardioTheme::text_muted(),
        )))
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = entries
        .iter()
        .map(|entry| {
            let level = entry.risk_level;
            ListItem::new(Line::from(vec![
                Span::styled(
                    entry
                        .created_at
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M  ")
                        .to_string(),
                    CardioTheme::text_secondary(),
                ),
                Span::styled(
                    format!("{:>6}%  ", entry.percentage()),
                    CardioTheme::risk_level(level),
                ),
                Span::styled(level.label(), CardioTheme::risk_level(level)),
                Span::styled(
                    format!(
                        "  · {} y, {}",
                        crate::domain::format_number(entry.record.age),
                        entry.record.sex_label()
                    ),
                    CardioTheme::text_muted(),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(CardioTheme::selected())
        .highlight_symbol("▶ ");

    let mut list_state = ListState::default();
    list_state.select(Some(state.selected));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn render_details(f: &mut Frame, area: Rect, entry: Option<&HistoryEntry>) {
    let block = Block::default()
        .title(Span::styled(" Details ", CardioTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(CardioTheme::border());

    let Some(entry) = entry else {
        f.render_widget(block, area);
        return;
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!("{} {} ", entry.risk_level.symbol(), entry.risk_level.title()),
                CardioTheme::risk_level(entry.risk_level),
            ),
            Span::styled(format!("{}%", entry.percentage()), CardioTheme::text()),
        ]),
        Line::from(""),
    ];
    lines.extend(entry.record.describe().into_iter().map(|(label, value)| {
        Line::from(vec![
            Span::styled(format!("{label}: "), CardioTheme::text_secondary()),
            Span::styled(value, CardioTheme::text()),
        ])
    }));

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_footer(f: &mut Frame, area: Rect, has_entries: bool) {
    let entry_key = if has_entries {
        CardioTheme::key_hint()
    } else {
        CardioTheme::key_disabled()
    };

    let content = Line::from(vec![
        Span::styled("[↑↓] ", CardioTheme::key_hint()),
        Span::styled("Select ", CardioTheme::key_desc()),
        Span::styled("[Enter] ", entry_key),
        Span::styled("Load into Form ", CardioTheme::key_desc()),
        Span::styled("[D] ", entry_key),
        Span::styled("Delete ", CardioTheme::key_desc()),
        Span::styled("[E] ", entry_key),
        Span::styled("Export JSON ", CardioTheme::key_desc()),
        Span::styled("[Esc] ", CardioTheme::key_hint()),
        Span::styled("Back", CardioTheme::key_desc()),
    ]);

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(CardioTheme::border()),
    );

    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_bounds() {
        let mut state = HistoryViewState::default();
        state.prev();
        assert_eq!(state.selected, 0);

        state.next(3);
        state.next(3);
        state.next(3);
        assert_eq!(state.selected, 2);

        state.clamp(1);
        assert_eq!(state.selected, 0);

        state.next(0);
        assert_eq!(state.selected, 0);
    }
}
