//! Clinical record input form.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::domain::{format_number, ClinicalRecord, FIELD_NAMES};
use crate::tui::styles::CardioTheme;

/// Form field definition
#[derive(Debug, Clone)]
pub struct FormField {
    pub label: &'static str,
    pub hint: &'static str,
    pub value: String,
}

impl FormField {
    fn parsed(&self) -> Option<f64> {
        self.value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

/// Labels and hints, in [`FIELD_NAMES`] order.
const FIELDS: [(&str, &str); 13] = [
    ("Age", "years (1-120)"),
    ("Sex", "1=male, 0=female"),
    ("Chest Pain Type", "0=asympt. 1=atypical 2=non-anginal 3=typical"),
    ("Resting BP", "mm Hg (50-250)"),
    ("Cholesterol", "mg/dl (100-600)"),
    ("Fasting Sugar > 120", "1=yes, 0=no"),
    ("Resting ECG", "0=normal 1=ST-T 2=LVH"),
    ("Max Heart Rate", "bpm (60-220)"),
    ("Exercise Angina", "1=yes, 0=no"),
    ("ST Depression", "mm (0-10)"),
    ("ST Slope", "0=down 1=flat 2=up"),
    ("Major Vessels", "0-4"),
    ("Thalassemia", "3=normal 6=fixed 7=reversible"),
];

/// Form state
pub struct FormState {
    pub fields: Vec<FormField>,
    pub selected_field: usize,
    pub error_message: Option<String>,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            fields: FIELDS
                .iter()
                .map(|&(label, hint)| FormField {
                    label,
                    hint,
                    value: String::new(),
                })
                .collect(),
            selected_field: 0,
            error_message: None,
        }
    }
}

impl FormState {
    pub fn next_field(&mut self) {
        self.selected_field = (self.selected_field + 1) % self.fields.len();
    }

    pub fn prev_field(&mut self) {
        if self.selected_field == 0 {
            self.selected_field = self.fields.len() - 1;
        } else {
            self.selected_field -= 1;
        }
    }

    /// Add a character to the current field
    pub fn input_char(&mut self, c: char) {
        if c.is_ascii_digit() || c == '.' {
            self.fields[self.selected_field].value.push(c);
            self.error_message = None;
        }
    }

    pub fn delete_char(&mut self) {
        self.fields[self.selected_field].value.pop();
        self.error_message = None;
    }

    pub fn clear_field(&mut self) {
        self.fields[self.selected_field].value.clear();
    }

    /// Empty every field.
    pub fn clear(&mut self) {
        for field in &mut self.fields {
            field.value.clear();
        }
        self.selected_field = 0;
        self.error_message = None;
    }

    /// Number of fields holding a valid number.
    #[must_use]
    pub fn filled_count(&self) -> usize {
        self.fields.iter().filter(|f| f.parsed().is_some()).count()
    }

    /// Whether every field holds a valid number.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.filled_count() == self.fields.len()
    }

    /// Current values as a record. Empty or invalid fields become NaN, so the
    /// record reports itself incomplete.
    pub fn to_record(&self) -> Result<ClinicalRecord, String> {
        let values: Vec<f64> = self
            .fields
            .iter()
            .map(|f| f.parsed().unwrap_or(f64::NAN))
            .collect();
        ClinicalRecord::from_vec(&values)
    }

    /// Fill the form from a saved record.
    pub fn load_record(&mut self, record: &ClinicalRecord) {
        for (field, value) in self.fields.iter_mut().zip(record.to_vec()) {
            field.value = format_number(value);
        }
        self.selected_field = 0;
        self.error_message = None;
    }

    /// Load sample data (Cleveland dataset, first row)
    pub fn load_sample_data(&mut self) {
        let sample = [
            "63",  // age
            "1",   // sex (male)
            "3",   // typical angina
            "145", // resting BP
            "233", // cholesterol
            "1",   // fasting sugar > 120
            "0",   // resting ECG normal
            "150", // max heart rate
            "0",   // no exercise angina
            "2.3", // ST depression
            "0",   // downsloping
            "0",   // major vessels
            "6",   // fixed defect
        ];
        for (field, value) in self.fields.iter_mut().zip(sample) {
            field.value = value.to_string();
        }
        self.error_message = None;
    }
}

/// Render the input form
pub fn render_form(f: &mut Frame, area: Rect, state: &FormState, can_submit: bool) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Form
            Constraint::Length(3), // Footer/error
        ])
        .split(area);

    render_form_header(f, chunks[0], state);
    render_form_fields(f, chunks[1], state);
    render_form_footer(f, chunks[2], state, can_submit);
}

fn render_form_header(f: &mut Frame, area: Rect, state: &FormState) {
    let filled = state.filled_count();
    let progress_style = if filled == FIELD_NAMES.len() {
        CardioTheme::success()
    } else {
        CardioTheme::text_muted()
    };

    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", CardioTheme::text()),
        Span::styled(crate::tui::styles::LOGO_SMALL, CardioTheme::title()),
        Span::styled(" │ Clinical Parameters", CardioTheme::text_secondary()),
        Span::styled(
            format!("  {filled}/{} fields", FIELD_NAMES.len()),
            progress_style,
        ),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(CardioTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_form_fields(f: &mut Frame, area: Rect, state: &FormState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .margin(1)
        .split(area);

    let mid = (state.fields.len() + 1) / 2;

    render_field_column(f, columns[0], &state.fields[..mid], 0, state.selected_field);
    render_field_column(
        f,
        columns[1],
        &state.fields[mid..],
        mid,
        state.selected_field,
    );
}

fn render_field_column(
    f: &mut Frame,
    area: Rect,
    fields: &[FormField],
    offset: usize,
    selected: usize,
) {
    let field_height = 3;
    let constraints: Vec<Constraint> = fields
        .iter()
        .map(|_| Constraint::Length(field_height))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, field) in fields.iter().enumerate() {
        let is_selected = offset + i == selected;
        let border_style = if is_selected {
            CardioTheme::border_focused()
        } else {
            CardioTheme::border()
        };
        let title_style = if is_selected {
            CardioTheme::focused()
        } else {
            CardioTheme::text_secondary()
        };

        let block = Block::default()
            .title(Span::styled(format!(" {} ", field.label), title_style))
            .borders(Borders::ALL)
            .border_style(border_style);

        let value_display = if field.value.is_empty() {
            Span::styled(field.hint, CardioTheme::text_muted())
        } else if field.parsed().is_none() {
            Span::styled(field.value.as_str(), CardioTheme::danger())
        } else {
            Span::styled(field.value.as_str(), CardioTheme::text())
        };

        let content = Paragraph::new(Line::from(vec![
            Span::raw(" "),
            value_display,
            if is_selected {
                Span::styled("▌", CardioTheme::cursor())
            } else {
                Span::raw("")
            },
        ]))
        .block(block);

        f.render_widget(content, chunks[i]);
    }
}

fn render_form_footer(f: &mut Frame, area: Rect, state: &FormState, can_submit: bool) {
    let content = if let Some(err) = &state.error_message {
        Line::from(vec![
            Span::styled("! ", CardioTheme::danger()),
            Span::styled(err.clone(), CardioTheme::danger()),
        ])
    } else {
        let (submit_key, submit_desc) = if can_submit {
            (CardioTheme::key_hint(), CardioTheme::key_desc())
        } else {
            (CardioTheme::key_disabled(), CardioTheme::key_disabled())
        };
        Line::from(vec![
            Span::styled("[↑↓] ", CardioTheme::key_hint()),
            Span::styled("Navigate ", CardioTheme::key_desc()),
            Span::styled("[Enter] ", submit_key),
            Span::styled("Evaluate ", submit_desc),
            Span::styled("[S] ", CardioTheme::key_hint()),
            Span::styled("Sample ", CardioTheme::key_desc()),
            Span::styled("[R] ", CardioTheme::key_hint()),
            Span::styled("Reset ", CardioTheme::key_desc()),
            Span::styled("[H] ", CardioTheme::key_hint()),
            Span::styled("History ", CardioTheme::key_desc()),
            Span::styled("[V] ", CardioTheme::key_hint()),
            Span::styled("Last Result ", CardioTheme::key_desc()),
            Span::styled("[Q] ", CardioTheme::key_hint()),
            Span::styled("Quit", CardioTheme::key_desc()),
        ])
    };

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
    fn test_empty_form_incomplete() {
        let state = FormState::default();
        assert_eq!(state.fields.len(), 13);
        assert_eq!(state.filled_count(), 0);
        assert!(!state.is_complete());

        let record = state.to_record().expect("Should build record");
        assert!(!record.is_complete());
    }

    #[test]
    fn test_sample_data_complete() {
        let mut state = FormState::default();
        state.load_sample_data();
        assert!(state.is_complete());

        let record = state.to_record().expect("Should build record");
        assert_eq!(record, crate::domain::record_tests::sample_record());
    }

    #[test]
    fn test_invalid_entry_counts_as_missing() {
        let mut state = FormState::default();
        state.load_sample_data();
        state.fields[9].value = "2..3".to_string();
        assert_eq!(state.filled_count(), 12);
        assert!(!state.is_complete());
    }

    #[test]
    fn test_input_filters_characters() {
        let mut state = FormState::default();
        for c in "6a3-".chars() {
            state.input_char(c);
        }
        assert_eq!(state.fields[0].value, "63");
        state.delete_char();
        assert_eq!(state.fields[0].value, "6");
    }

    #[test]
    fn test_navigation_wraps() {
        let mut state = FormState::default();
        state.prev_field();
        assert_eq!(state.selected_field, 12);
        state.next_field();
        assert_eq!(state.selected_field, 0);
    }

    #[test]
    fn test_load_record() {
        let record = ClinicalRecord {
            oldpeak: 1.5,
            ..crate::domain::record_tests::sample_record()
        };
        let mut state = FormState::default();
        state.load_record(&record);
        assert_eq!(state.fields[0].value, "63");
        assert_eq!(state.fields[9].value, "1.5");
        assert_eq!(state.to_record().expect("Should build record"), record);

        state.clear();
        assert_eq!(state.filled_count(), 0);
    }
}
