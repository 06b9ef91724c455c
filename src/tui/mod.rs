//! TUI module: Terminal User Interface using Ratatui.
//!
//! Provides a clinical-themed interface for:
//! - Entering the 13 clinical parameters
//! - Watching an evaluation run and its risk transition
//! - Browsing, recalling and exporting saved evaluations

mod app;
mod styles;
mod ui;
mod worker;

pub use app::App;
pub use styles::CardioTheme;
pub use worker::{EvaluationProgress, EvaluationWorker, EvaluationWorkerHandle};
