//! Main TUI application state machine.
//!
//! Handles:
//! - Screen navigation
//! - Input event handling
//! - Background evaluation via the worker
//! - The timed risk transition after each result

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};

use crate::adapters::gemini::GeminiNarrative;
use crate::adapters::sqlite::SqliteStorage;
use crate::application::{
    Completion, EvaluationService, Evaluator, NarrativeProvider, Phase, Stage,
};
use crate::config::AppConfig;
use crate::domain::{ClinicalRecord, EvaluationResult};
use crate::CardioError;

use super::ui::{
    form::{render_form, FormState},
    history::{render_history, HistoryStats, HistoryViewState},
    render_disclaimer,
    result::{render_evaluation, EvaluationView},
    StatusKind,
};
use super::worker::{EvaluationProgress, EvaluationWorker, EvaluationWorkerHandle};

/// Full-screen transition before the result is delivered.
pub const OVERLAY_ENTRY: Duration = Duration::from_millis(1500);

/// Transition fade-out after the result is delivered.
pub const OVERLAY_EXIT: Duration = Duration::from_millis(500);

const STATUS_TTL: Duration = Duration::from_secs(5);

/// Current screen/view in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Form,
    Evaluation,
    History,
}

struct ProgressAnimation {
    stage: Stage,
    value: f64,
    started_at: Instant,
}

struct Presentation {
    started_at: Instant,
    exiting: bool,
}

struct StatusLine {
    message: String,
    kind: StatusKind,
    shown_at: Instant,
}

/// Main application state
pub struct App {
    screen: Screen,
    should_quit: bool,
    service: EvaluationService<SqliteStorage>,
    remote_enabled: bool,
    export_dir: PathBuf,
    form_state: FormState,
    history_state: HistoryViewState,

    /// Running evaluation (if any)
    pending_worker: Option<EvaluationWorkerHandle>,

    /// Fake progress bar for the running evaluation
    progress: Option<ProgressAnimation>,

    /// Risk transition in progress
    presentation: Option<Presentation>,

    status: Option<StatusLine>,
}

impl App {
    /// Create the application from configuration.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let storage = Arc::new(SqliteStorage::new(&config.db_path)?);

        let narrative = match &config.gemini {
            Some(gemini) => match GeminiNarrative::new(gemini) {
                Ok(remote) => {
                    tracing::info!("Remote narratives enabled (model: {})", remote.model());
                    NarrativeProvider::with_remote(Box::new(remote))
                }
                Err(e) => {
                    tracing::warn!("Remote narrative unavailable, using template: {}", e);
                    NarrativeProvider::local()
                }
            },
            None => {
                tracing::info!("No API key configured, narratives use the local template");
                NarrativeProvider::local()
            }
        };

        let service = EvaluationService::new(Arc::new(Evaluator::new(narrative)), storage);
        Ok(Self::with_dependencies(service, config.export_dir.clone()))
    }

    /// Create the application around an existing service.
    #[must_use]
    pub fn with_dependencies(service: EvaluationService<SqliteStorage>, export_dir: PathBuf) -> Self {
        Self {
            screen: Screen::Form,
            should_quit: false,
            remote_enabled: service.evaluator().has_remote(),
            service,
            export_dir,
            form_state: FormState::default(),
            history_state: HistoryViewState::default(),
            pending_worker: None,
            progress: None,
            presentation: None,
            status: None,
        }
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            self.poll_worker();

            let now = Instant::now();
            self.tick_progress(now);
            self.tick_presentation(now);
            self.tick_status(now);

            terminal.draw(|f| self.render(f))?;

            // Short poll to keep animations moving
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn render(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(f.area());

        match self.screen {
            Screen::Form => render_form(f, chunks[0], &self.form_state, self.can_submit()),
            Screen::Evaluation => render_evaluation(f, chunks[0], self.evaluation_view()),
            Screen::History => {
                let history = self.service.history();
                render_history(
                    f,
                    chunks[0],
                    history.entries(),
                    HistoryStats {
                        total_evaluations: history.total_evaluations(),
                        average_risk: history.average_risk(),
                    },
                    &self.history_state,
                );
            }
        }

        render_disclaimer(
            f,
            chunks[1],
            self.status.as_ref().map(|s| (s.message.as_str(), s.kind)),
        );
    }

    fn evaluation_view(&self) -> EvaluationView<'_> {
        match self.service.phase() {
            Phase::Scoring | Phase::Narrating => {
                let (stage, progress) = self
                    .progress
                    .as_ref()
                    .map_or((Stage::Scoring, 0.0), |p| (p.stage, p.value));
                EvaluationView::Progress {
                    stage,
                    progress,
                    remote: self.remote_enabled,
                }
            }
            Phase::Error(message) => EvaluationView::Error { message },
            Phase::Presenting | Phase::Idle => match (self.service.current(), &self.presentation) {
                (Some(current), Some(presentation)) => EvaluationView::Transition {
                    record: &current.record,
                    result: &current.result,
                    exiting: presentation.exiting,
                },
                (Some(current), None) => EvaluationView::Result {
                    record: &current.record,
                    result: &current.result,
                },
                (None, _) => EvaluationView::Empty,
            },
        }
    }

    fn can_submit(&self) -> bool {
        !self.service.phase().is_busy() && self.form_state.is_complete()
    }

    /// Poll the background worker for progress updates.
    fn poll_worker(&mut self) {
        loop {
            let Some(worker) = self.pending_worker.as_ref() else {
                return;
            };
            let generation = worker.generation;
            let record = worker.record;
            let Some(progress) = worker.try_recv() else {
                return;
            };

            match progress {
                EvaluationProgress::Stage(stage) => {
                    self.service.note_stage(generation, stage);
                    if generation == self.service.generation() {
                        self.set_stage(stage, Instant::now());
                    }
                }
                EvaluationProgress::Complete(outcome) => {
                    self.pending_worker = None;
                    self.progress = None;
                    self.apply_completion(generation, record, outcome, Instant::now());
                    return;
                }
            }
        }
    }

    fn apply_completion(
        &mut self,
        generation: u64,
        record: ClinicalRecord,
        outcome: std::result::Result<EvaluationResult, CardioError>,
        now: Instant,
    ) {
        match self.service.complete(generation, record, outcome) {
            Completion::Ready { persisted, .. } => {
                self.presentation = Some(Presentation {
                    started_at: now,
                    exiting: false,
                });
                if !persisted {
                    self.set_status(
                        "Result ready, but statistics could not be saved",
                        StatusKind::Warning,
                    );
                }
            }
            Completion::Failed(_) => {
                self.presentation = None;
            }
            Completion::Superseded => {}
        }
    }

    fn set_stage(&mut self, stage: Stage, now: Instant) {
        let current = self.progress.as_ref().map_or(0.0, |p| p.value);
        let floor = match stage {
            Stage::Scoring => 0.0,
            Stage::Narrating => 0.30,
        };

        self.progress = Some(ProgressAnimation {
            stage,
            value: current.max(floor),
            started_at: now,
        });
    }

    fn tick_progress(&mut self, now: Instant) {
        let Some(progress) = self.progress.as_mut() else {
            return;
        };

        let elapsed = now.saturating_duration_since(progress.started_at).as_secs_f64();
        let (start_floor, target, tau): (f64, f64, f64) = match progress.stage {
            Stage::Scoring => (0.02, 0.30, 0.4),
            Stage::Narrating => (0.30, 0.95, 4.0),
        };

        // Monotonic fake progress approaching the stage target
        let k = 1.0 - (-elapsed / tau).exp();
        let desired = (start_floor + (target - start_floor) * k).clamp(0.0, target);
        progress.value = desired.max(progress.value).min(target);
    }

    fn tick_presentation(&mut self, now: Instant) {
        let Some(presentation) = self.presentation.as_mut() else {
            return;
        };

        let elapsed = now.saturating_duration_since(presentation.started_at);
        if elapsed >= OVERLAY_ENTRY + OVERLAY_EXIT {
            self.presentation = None;
            self.service.finish_presentation();
        } else if elapsed >= OVERLAY_ENTRY {
            presentation.exiting = true;
        }
    }

    fn tick_status(&mut self, now: Instant) {
        if self
            .status
            .as_ref()
            .is_some_and(|s| now.saturating_duration_since(s.shown_at) >= STATUS_TTL)
        {
            self.status = None;
        }
    }

    fn set_status(&mut self, message: impl Into<String>, kind: StatusKind) {
        self.status = Some(StatusLine {
            message: message.into(),
            kind,
            shown_at: Instant::now(),
        });
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        if modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key, KeyCode::Char('q') | KeyCode::Char('c'))
        {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Form => self.handle_form_key(key),
            Screen::Evaluation => self.handle_evaluation_key(key),
            Screen::History => self.handle_history_key(key),
        }
    }

    fn handle_form_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Up | KeyCode::BackTab => self.form_state.prev_field(),
            KeyCode::Down | KeyCode::Tab => self.form_state.next_field(),
            KeyCode::Char('s') | KeyCode::Char('S') => self.form_state.load_sample_data(),
            KeyCode::Char('r') | KeyCode::Char('R') => self.reset(),
            KeyCode::Char('h') | KeyCode::Char('H') => self.open_history(),
            KeyCode::Char('v') | KeyCode::Char('V') => self.screen = Screen::Evaluation,
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            KeyCode::Char(c) => self.form_state.input_char(c),
            KeyCode::Backspace => self.form_state.delete_char(),
            KeyCode::Delete => self.form_state.clear_field(),
            KeyCode::Enter => self.submit_form(),
            _ => {}
        }
    }

    fn handle_evaluation_key(&mut self, key: KeyCode) {
        if matches!(self.service.phase(), Phase::Error(_)) {
            self.service.dismiss_error();
            self.screen = Screen::Form;
            return;
        }

        if self.service.phase().is_busy() {
            if matches!(key, KeyCode::Char('r') | KeyCode::Char('R')) {
                self.reset();
            }
            return;
        }

        match key {
            KeyCode::Char('s') | KeyCode::Char('S') => self.save_current(),
            KeyCode::Char('r') | KeyCode::Char('R') => self.reset(),
            KeyCode::Char('h') | KeyCode::Char('H') => self.open_history(),
            KeyCode::Esc | KeyCode::Enter => self.screen = Screen::Form,
            _ => {}
        }
    }

    fn handle_history_key(&mut self, key: KeyCode) {
        let len = self.service.history().len();
        match key {
            KeyCode::Up => self.history_state.prev(),
            KeyCode::Down => self.history_state.next(len),
            KeyCode::Enter => self.recall_selected(),
            KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Delete => self.delete_selected(),
            KeyCode::Char('e') | KeyCode::Char('E') => self.export_history(),
            KeyCode::Esc | KeyCode::Char('h') | KeyCode::Char('H') => self.screen = Screen::Form,
            _ => {}
        }
    }

    fn submit_form(&mut self) {
        // Trigger stays disabled while an evaluation is running or presented
        if self.service.phase().is_busy() {
            return;
        }

        if !self.form_state.is_complete() {
            self.form_state.error_message = Some(format!(
                "Fill in every field before evaluating ({}/{} complete)",
                self.form_state.filled_count(),
                self.form_state.fields.len()
            ));
            return;
        }

        let record = match self.form_state.to_record() {
            Ok(record) => record,
            Err(e) => {
                self.form_state.error_message = Some(e);
                return;
            }
        };

        if let Err(errors) = record.validate() {
            self.form_state.error_message = Some(errors.join(", "));
            return;
        }

        match self.service.begin(record) {
            Ok(ticket) => {
                self.presentation = None;
                self.progress = None;
                self.set_stage(Stage::Scoring, Instant::now());
                self.pending_worker = Some(EvaluationWorker::spawn(self.service.evaluator(), ticket));
                self.screen = Screen::Evaluation;
            }
            Err(e) => {
                self.form_state.error_message = Some(e.to_string());
            }
        }
    }

    fn reset(&mut self) {
        // An in-flight worker keeps running; its completion is discarded.
        self.service.reset();
        self.form_state.clear();
        self.progress = None;
        self.presentation = None;
        self.screen = Screen::Form;
        self.set_status("Form reset", StatusKind::Info);
    }

    fn save_current(&mut self) {
        match self.service.save_current() {
            Ok(Some(entry)) => {
                self.history_state.selected = 0;
                self.set_status(
                    format!("Saved to history ({}%)", entry.percentage()),
                    StatusKind::Success,
                );
            }
            Ok(None) => self.set_status("No result to save", StatusKind::Info),
            Err(e) => {
                tracing::error!("Failed to save evaluation: {}", e);
                self.set_status(format!("Could not save: {e}"), StatusKind::Error);
            }
        }
    }

    fn open_history(&mut self) {
        self.history_state.clamp(self.service.history().len());
        self.screen = Screen::History;
    }

    fn selected_entry_id(&self) -> Option<i64> {
        self.service
            .history()
            .entries()
            .get(self.history_state.selected)
            .map(|e| e.id)
    }

    fn recall_selected(&mut self) {
        let Some(record) = self.selected_entry_id().and_then(|id| self.service.recall(id)) else {
            return;
        };
        self.form_state.load_record(&record);
        self.screen = Screen::Form;
        self.set_status("Saved evaluation loaded into the form", StatusKind::Info);
    }

    fn delete_selected(&mut self) {
        let Some(id) = self.selected_entry_id() else {
            return;
        };
        match self.service.delete_entry(id) {
            Ok(true) => self.set_status("Entry deleted", StatusKind::Info),
            Ok(false) => {}
            Err(e) => {
                tracing::error!("Failed to delete history entry: {}", e);
                self.set_status(format!("Could not delete: {e}"), StatusKind::Error);
            }
        }
        self.history_state.clamp(self.service.history().len());
    }

    fn export_history(&mut self) {
        match self.service.export(&self.export_dir) {
            Ok(path) => self.set_status(
                format!("History exported to {}", path.display()),
                StatusKind::Success,
            ),
            Err(CardioError::NothingToExport) => {
                self.set_status("No data to export", StatusKind::Warning);
            }
            Err(e) => {
                tracing::error!("Export failed: {}", e);
                self.set_status(format!("Export failed: {e}"), StatusKind::Error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(export_dir: PathBuf) -> App {
        let storage = Arc::new(SqliteStorage::in_memory().expect("Should create db"));
        let service = EvaluationService::new(
            Arc::new(Evaluator::new(NarrativeProvider::local())),
            storage,
        );
        App::with_dependencies(service, export_dir)
    }

    fn press(app: &mut App, key: KeyCode) {
        app.handle_key(key, KeyModifiers::NONE);
    }

    fn wait_for_worker(app: &mut App) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while app.pending_worker.is_some() {
            assert!(Instant::now() < deadline, "Worker timed out");
            std::thread::sleep(Duration::from_millis(5));
            app.poll_worker();
        }
    }

    #[test]
    fn test_incomplete_form_does_not_submit() {
        let mut app = app(PathBuf::from("."));
        assert!(!app.can_submit());

        press(&mut app, KeyCode::Enter);
        assert!(app.pending_worker.is_none());
        assert_eq!(app.screen, Screen::Form);
        assert!(app.form_state.error_message.is_some());
        assert_eq!(app.service.phase(), &Phase::Idle);
    }

    #[test]
    fn test_evaluation_flow_and_transition() {
        let mut app = app(PathBuf::from("."));
        press(&mut app, KeyCode::Char('s'));
        assert!(app.can_submit());

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen, Screen::Evaluation);
        assert!(app.pending_worker.is_some());
        assert!(!app.can_submit());

        wait_for_worker(&mut app);
        assert_eq!(app.service.phase(), &Phase::Presenting);
        assert!(matches!(
            app.evaluation_view(),
            EvaluationView::Transition { exiting: false, .. }
        ));

        let started = app
            .presentation
            .as_ref()
            .map(|p| p.started_at)
            .expect("Should be presenting");

        app.tick_presentation(started + OVERLAY_ENTRY);
        assert!(matches!(
            app.evaluation_view(),
            EvaluationView::Transition { exiting: true, .. }
        ));
        assert_eq!(app.service.phase(), &Phase::Presenting);

        app.tick_presentation(started + OVERLAY_ENTRY + OVERLAY_EXIT);
        assert!(app.presentation.is_none());
        assert_eq!(app.service.phase(), &Phase::Idle);
        assert!(matches!(app.evaluation_view(), EvaluationView::Result { .. }));
        assert_eq!(app.service.history().total_evaluations(), 1);
    }

    #[test]
    fn test_reset_discards_in_flight_result() {
        let mut app = app(PathBuf::from("."));
        press(&mut app, KeyCode::Char('s'));
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('r'));

        assert_eq!(app.screen, Screen::Form);
        assert_eq!(app.form_state.filled_count(), 0);

        wait_for_worker(&mut app);
        assert!(app.service.current().is_none());
        assert!(app.presentation.is_none());
        assert_eq!(app.service.phase(), &Phase::Idle);
        assert_eq!(app.service.history().total_evaluations(), 0);
    }

    #[test]
    fn test_save_recall_delete_export() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let mut app = app(dir.path().to_path_buf());

        press(&mut app, KeyCode::Char('h'));
        press(&mut app, KeyCode::Char('e'));
        assert_eq!(
            app.status.as_ref().map(|s| s.kind),
            Some(StatusKind::Warning)
        );
        press(&mut app, KeyCode::Esc);

        press(&mut app, KeyCode::Char('s'));
        press(&mut app, KeyCode::Enter);
        wait_for_worker(&mut app);
        let started = app
            .presentation
            .as_ref()
            .map(|p| p.started_at)
            .expect("Should be presenting");
        app.tick_presentation(started + OVERLAY_ENTRY + OVERLAY_EXIT);

        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.service.history().len(), 1);

        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.form_state.filled_count(), 0);

        press(&mut app, KeyCode::Char('h'));
        assert_eq!(app.screen, Screen::History);
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen, Screen::Form);
        assert!(app.form_state.is_complete());

        press(&mut app, KeyCode::Char('h'));
        press(&mut app, KeyCode::Char('e'));
        assert_eq!(
            app.status.as_ref().map(|s| s.kind),
            Some(StatusKind::Success)
        );
        let exported = std::fs::read_dir(dir.path())
            .expect("Should list dir")
            .count();
        assert_eq!(exported, 1);

        press(&mut app, KeyCode::Char('d'));
        assert!(app.service.history().is_empty());
    }
}
