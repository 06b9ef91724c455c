//! Evaluation view: progress, risk transition, result card and error card.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::application::Stage;
use crate::domain::{ClinicalRecord, EvaluationResult};
use crate::tui::styles::CardioTheme;

use super::markup;

/// What the evaluation screen shows.
#[derive(Debug, Clone, Copy)]
pub enum EvaluationView<'a> {
    /// Nothing evaluated yet
    Empty,
    /// Worker running
    Progress {
        stage: Stage,
        progress: f64,
        remote: bool,
    },
    /// Full-screen risk transition; `exiting` once the result is delivered
    Transition {
        record: &'a ClinicalRecord,
        result: &'a EvaluationResult,
        exiting: bool,
    },
    /// Result card
    Result {
        record: &'a ClinicalRecord,
        result: &'a EvaluationResult,
    },
    /// Evaluation failed
    Error { message: &'a str },
}

/// Render the evaluation screen
pub fn render_evaluation(f: &mut Frame, area: Rect, view: EvaluationView<'_>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_header(f, chunks[0]);

    match view {
        EvaluationView::Empty => render_empty(f, chunks[1]),
        EvaluationView::Progress {
            stage,
            progress,
            remote,
        } => render_progress(f, chunks[1], stage, progress, remote),
        EvaluationView::Transition {
            record,
            result,
            exiting,
        } => {
            if exiting {
                render_result(f, chunks[1], record, result);
            }
            render_transition(f, area, result, exiting);
        }
        EvaluationView::Result { record, result } => render_result(f, chunks[1], record, result),
        EvaluationView::Error { message } => render_error(f, chunks[1], message),
    }

    render_footer(f, chunks[2], view);
}

fn render_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", CardioTheme::text()),
        Span::styled("Risk Evaluation", CardioTheme::title()),
        Span::styled(" │ Heart Disease Estimate", CardioTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(CardioTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_empty(f: &mut Frame, area: Rect) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(
            "No evaluation yet",
            CardioTheme::text_secondary(),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Fill in all 13 fields and press [Enter] on the form",
            CardioTheme::text_muted(),
        )),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(CardioTheme::border()),
    );

    f.render_widget(content, area);
}

fn render_progress(f: &mut Frame, area: Rect, stage: Stage, progress: f64, remote: bool) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(0),
        ])
        .margin(2)
        .split(area);

    let (label, description) = match stage {
        Stage::Scoring => ("Scoring", "Computing risk probability..."),
        Stage::Narrating if remote => ("Narrating", "Requesting clinical narrative..."),
        Stage::Narrating => ("Narrating", "Composing clinical narrative..."),
    };

    let stage_text = Paragraph::new(Line::from(vec![
        Span::styled("Stage: ", CardioTheme::text_secondary()),
        Span::styled(label, CardioTheme::focused()),
    ]))
    .alignment(Alignment::Center);
    f.render_widget(stage_text, chunks[0]);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(CardioTheme::border()),
        )
        .gauge_style(CardioTheme::info())
        .percent(percent(progress))
        .label(format!("{:.0}%", progress * 100.0));
    f.render_widget(gauge, chunks[1]);

    let desc = Paragraph::new(Line::from(Span::styled(
        description,
        CardioTheme::text_muted(),
    )))
    .alignment(Alignment::Center);
    f.render_widget(desc, chunks[2]);
}

fn render_transition(f: &mut Frame, area: Rect, result: &EvaluationResult, exiting: bool) {
    let level = result.risk_level;

    // Shrinks to a centred card while exiting
    let target = if exiting {
        centered(area, 50, 30)
    } else {
        area
    };
    let style = if exiting {
        CardioTheme::overlay_exit(level)
    } else {
        CardioTheme::overlay(level)
    };

    let height = target.height.saturating_sub(4) / 2;
    let mut lines: Vec<Line> = (0..height).map(|_| Line::from("")).collect();
    lines.push(Line::from(Span::styled(level.overlay_symbol(), style)));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(level.title(), style)));
    lines.push(Line::from(Span::styled(
        format!("{}%", result.percentage()),
        style,
    )));

    let overlay = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(style)
        .block(Block::default().borders(Borders::ALL).border_style(style));

    f.render_widget(Clear, target);
    f.render_widget(overlay, target);
}

fn render_result(f: &mut Frame, area: Rect, record: &ClinicalRecord, result: &EvaluationResult) {
    let level = result.risk_level;
    let risk_style = CardioTheme::risk_level(level);

    let block = Block::default()
        .title(Span::styled(
            format!(" {} {} ", level.symbol(), level.title()),
            risk_style.add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(risk_style);

    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Probability
            Constraint::Min(0),    // Narrative + record
        ])
        .margin(1)
        .split(inner);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(Span::styled(
                    " Estimated Probability ",
                    CardioTheme::text_secondary(),
                ))
                .borders(Borders::ALL)
                .border_style(CardioTheme::border()),
        )
        .gauge_style(risk_style)
        .percent(percent(result.probability))
        .label(format!("{}% · {}", result.percentage(), level.label()));
    f.render_widget(gauge, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(chunks[1]);

    let narrative = Paragraph::new(markup::to_lines(
        &result.narrative.text,
        CardioTheme::text(),
        CardioTheme::text_bold(),
    ))
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .title(Span::styled(" Clinical Narrative ", CardioTheme::subtitle()))
            .borders(Borders::ALL)
            .border_style(CardioTheme::border()),
    );
    f.render_widget(narrative, body[0]);

    let summary: Vec<Line> = record
        .describe()
        .into_iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(format!("{label}: "), CardioTheme::text_secondary()),
                Span::styled(value, CardioTheme::text()),
            ])
        })
        .collect();
    let summary = Paragraph::new(summary)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(Span::styled(" Parameters ", CardioTheme::subtitle()))
                .borders(Borders::ALL)
                .border_style(CardioTheme::border()),
        );
    f.render_widget(summary, body[1]);
}

fn render_error(f: &mut Frame, area: Rect, message: &str) {
    let content = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled("! Evaluation failed", CardioTheme::danger())),
        Line::from(""),
        Line::from(Span::styled(message, CardioTheme::text())),
    ])
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(CardioTheme::danger()),
    );

    f.render_widget(content, area);
}

fn render_footer(f: &mut Frame, area: Rect, view: EvaluationView<'_>) {
    let content = match view {
        EvaluationView::Result { .. } => Line::from(vec![
            Span::styled("[S] ", CardioTheme::key_hint()),
            Span::styled("Save to History ", CardioTheme::key_desc()),
            Span::styled("[R] ", CardioTheme::key_hint()),
            Span::styled("Reset ", CardioTheme::key_desc()),
            Span::styled("[H] ", CardioTheme::key_hint()),
            Span::styled("History ", CardioTheme::key_desc()),
            Span::styled("[Esc] ", CardioTheme::key_hint()),
            Span::styled("Back to Form", CardioTheme::key_desc()),
        ]),
        EvaluationView::Error { .. } => Line::from(vec![
            Span::styled("[Any key] ", CardioTheme::key_hint()),
            Span::styled("Back to Form", CardioTheme::key_desc()),
        ]),
        EvaluationView::Empty => Line::from(vec![
            Span::styled("[Esc] ", CardioTheme::key_hint()),
            Span::styled("Back to Form", CardioTheme::key_desc()),
        ]),
        EvaluationView::Progress { .. } | EvaluationView::Transition { .. } => {
            Line::from(vec![
                Span::styled("Processing... ", CardioTheme::text_muted()),
                Span::styled("[R] ", CardioTheme::key_hint()),
                Span::styled("Reset", CardioTheme::key_desc()),
            ])
        }
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(CardioTheme::border()),
    );

    f.render_widget(footer, area);
}

fn percent(fraction: f64) -> u16 {
    (fraction.clamp(0.0, 1.0) * 100.0).round() as u16
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Narrative, NarrativeOrigin, RiskLevel};
    use ratatui::{backend::TestBackend, Terminal};

    fn result() -> EvaluationResult {
        EvaluationResult {
            probability: 0.774,
            risk_level: RiskLevel::High,
            narrative: Narrative {
                text: "<p><strong>RISK ANALYSIS:</strong> elevated.</p>".to_string(),
                origin: NarrativeOrigin::Template,
            },
        }
    }

    fn rendered(view: EvaluationView<'_>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).expect("Should create terminal");
        terminal
            .draw(|f| render_evaluation(f, f.area(), view))
            .expect("Should draw");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_percent_clamps() {
        assert_eq!(percent(0.774), 77);
        assert_eq!(percent(1.5), 100);
        assert_eq!(percent(-0.1), 0);
    }

    #[test]
    fn test_result_card_shows_level_and_narrative() {
        let record = crate::domain::record_tests::sample_record();
        let result = result();
        let screen = rendered(EvaluationView::Result {
            record: &record,
            result: &result,
        });
        assert!(screen.contains("HIGH RISK DETECTED"));
        assert!(screen.contains("RISK ANALYSIS:"));
        assert!(screen.contains("Save to History"));
    }

    #[test]
    fn test_transition_shows_title() {
        let record = crate::domain::record_tests::sample_record();
        let result = result();
        let screen = rendered(EvaluationView::Transition {
            record: &record,
            result: &result,
            exiting: false,
        });
        assert!(screen.contains("HIGH RISK DETECTED"));
        assert!(screen.contains("77.4%"));
    }

    #[test]
    fn test_error_card() {
        let screen = rendered(EvaluationView::Error { message: "boom" });
        assert!(screen.contains("Evaluation failed"));
        assert!(screen.contains("boom"));
    }
}
