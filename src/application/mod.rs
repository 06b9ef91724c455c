//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the application.

mod evaluation;
mod history;
pub(crate) mod narrative;

pub use evaluation::{
    Completion, CurrentEvaluation, EvaluationService, EvaluationTicket, Evaluator, Phase, Stage,
};
pub use history::{HistorySnapshot, HistoryStore, HISTORY_CAPACITY};
pub use narrative::NarrativeProvider;
