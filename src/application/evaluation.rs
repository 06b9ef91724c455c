//! Evaluation service: sequences scoring, narration and bookkeeping.
//!
//! The flow for one request is `Idle → Scoring → Narrating → Presenting →
//! Idle`, with `Error` reachable from Scoring and Narrating. The slow part
//! ([`Evaluator::run`]) is meant to run off the UI thread; the service only
//! hands out tickets and applies completions.
//!
//! Each [`begin`](EvaluationService::begin) and
//! [`reset`](EvaluationService::reset) advances a generation counter. A
//! completion carrying an older generation is discarded without touching the
//! current result or the aggregates.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapters::StorageError;
use crate::application::{HistoryStore, NarrativeProvider};
use crate::domain::{scorer, ClinicalRecord, EvaluationResult, HistoryEntry};
use crate::ports::KeyValueStore;
use crate::CardioError;

/// Where the current request is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Scoring,
    Narrating,
    /// Result ready, presentation transition running
    Presenting,
    /// Evaluation failed with the given message
    Error(String),
}

impl Phase {
    /// Whether an evaluation is in flight or being presented.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Scoring | Self::Narrating | Self::Presenting)
    }
}

/// Stage reported by [`Evaluator::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scoring,
    Narrating,
}

/// Handle for one started evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationTicket {
    pub generation: u64,
    pub record: ClinicalRecord,
}

/// What applying a completion did.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Result accepted; presentation should start
    Ready {
        result: EvaluationResult,
        /// False if the aggregates could not be written to storage
        persisted: bool,
    },
    /// Evaluation failed; the message is shown as is
    Failed(String),
    /// A newer request or a reset happened in between; nothing changed
    Superseded,
}

/// The current record and its result.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentEvaluation {
    pub record: ClinicalRecord,
    pub result: EvaluationResult,
}

/// Scoring plus narrative generation. Safe to share with a worker thread.
pub struct Evaluator {
    narrative: NarrativeProvider,
}

impl Evaluator {
    #[must_use]
    pub fn new(narrative: NarrativeProvider) -> Self {
        Self { narrative }
    }

    /// Whether narratives are requested from a remote service first.
    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.narrative.has_remote()
    }

    /// Score `record` and attach a narrative, reporting each stage.
    ///
    /// # Errors
    /// Returns `CardioError::Internal` if the record is incomplete or the
    /// score is not a number.
    pub fn run<F>(&self, record: &ClinicalRecord, mut on_stage: F) -> Result<EvaluationResult, CardioError>
    where
        F: FnMut(Stage),
    {
        on_stage(Stage::Scoring);
        if !record.is_complete() {
            return Err(CardioError::Internal(
                "Record reached scoring with missing fields".to_string(),
            ));
        }

        let probability = scorer::score(record);
        if !probability.is_finite() {
            return Err(CardioError::Internal(format!(
                "Scorer produced an invalid probability: {probability}"
            )));
        }
        tracing::debug!("Scored record: probability={:.3}", probability);

        on_stage(Stage::Narrating);
        Ok(self.narrative.explain(record, probability))
    }
}

/// Owns the lifecycle state, the current result and the history store.
pub struct EvaluationService<S>
where
    S: KeyValueStore,
{
    evaluator: Arc<Evaluator>,
    history: HistoryStore<S>,
    phase: Phase,
    generation: u64,
    current: Option<CurrentEvaluation>,
}

impl<S> EvaluationService<S>
where
    S: KeyValueStore,
    S::Error: Into<StorageError>,
{
    /// Create the service and load history from `storage`.
    pub fn new(evaluator: Arc<Evaluator>, storage: Arc<S>) -> Self {
        Self {
            evaluator,
            history: HistoryStore::load(storage),
            phase: Phase::Idle,
            generation: 0,
            current: None,
        }
    }

    /// Shared evaluator for running tickets off-thread.
    #[must_use]
    pub fn evaluator(&self) -> Arc<Evaluator> {
        Arc::clone(&self.evaluator)
    }

    #[must_use]
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn current(&self) -> Option<&CurrentEvaluation> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn history(&self) -> &HistoryStore<S> {
        &self.history
    }

    /// Start an evaluation (Idle → Scoring).
    ///
    /// # Errors
    /// Returns `CardioError::Validation` if any field is missing; state is
    /// left unchanged.
    pub fn begin(&mut self, record: ClinicalRecord) -> Result<EvaluationTicket, CardioError> {
        if !record.is_complete() {
            return Err(CardioError::Validation(
                "All 13 fields must be filled in before evaluating".to_string(),
            ));
        }

        self.generation += 1;
        self.current = None;
        self.phase = Phase::Scoring;

        tracing::info!("Evaluation {} started", self.generation);
        Ok(EvaluationTicket {
            generation: self.generation,
            record,
        })
    }

    /// Track a stage reported by the worker. Ignored for stale generations.
    pub fn note_stage(&mut self, generation: u64, stage: Stage) {
        if generation != self.generation || !matches!(self.phase, Phase::Scoring | Phase::Narrating) {
            return;
        }
        self.phase = match stage {
            Stage::Scoring => Phase::Scoring,
            Stage::Narrating => Phase::Narrating,
        };
    }

    /// Apply the outcome of [`Evaluator::run`] for `generation`.
    pub fn complete(
        &mut self,
        generation: u64,
        record: ClinicalRecord,
        outcome: Result<EvaluationResult, CardioError>,
    ) -> Completion {
        if generation != self.generation || !matches!(self.phase, Phase::Scoring | Phase::Narrating) {
            tracing::debug!(
                "Discarding completion {} (current generation {})",
                generation,
                self.generation
            );
            return Completion::Superseded;
        }

        match outcome {
            Ok(result) => {
                let persisted = match self.history.record_evaluation(result.probability) {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!("Failed to persist aggregates: {}", e);
                        false
                    }
                };

                tracing::info!(
                    "Evaluation {} complete: probability={}%, risk={}, narrative={}",
                    generation,
                    result.percentage(),
                    result.risk_level,
                    result.narrative.origin
                );

                self.current = Some(CurrentEvaluation {
                    record,
                    result: result.clone(),
                });
                self.phase = Phase::Presenting;
                Completion::Ready { result, persisted }
            }
            Err(e) => {
                let message = match e {
                    CardioError::Internal(message) => message,
                    other => other.to_string(),
                };
                tracing::error!("Evaluation {} failed: {}", generation, message);
                self.current = None;
                self.phase = Phase::Error(message.clone());
                Completion::Failed(message)
            }
        }
    }

    /// Presentation delivered (Presenting → Idle).
    pub fn finish_presentation(&mut self) {
        if self.phase == Phase::Presenting {
            self.phase = Phase::Idle;
        }
    }

    /// Leave the error state (Error → Idle).
    pub fn dismiss_error(&mut self) {
        if matches!(self.phase, Phase::Error(_)) {
            self.phase = Phase::Idle;
        }
    }

    /// Drop the current result and return to Idle from any phase.
    ///
    /// History and aggregates are untouched; an in-flight evaluation is
    /// superseded.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.current = None;
        self.phase = Phase::Idle;
        tracing::info!("Evaluation state reset");
    }

    /// Run a full evaluation on the calling thread.
    ///
    /// # Errors
    /// Returns the validation or evaluation error.
    pub fn evaluate(&mut self, record: ClinicalRecord) -> Result<EvaluationResult, CardioError> {
        let ticket = self.begin(record)?;
        let evaluator = Arc::clone(&self.evaluator);
        let outcome = evaluator.run(&ticket.record, |stage| {
            self.note_stage(ticket.generation, stage);
        });

        match self.complete(ticket.generation, ticket.record, outcome) {
            Completion::Ready { result, .. } => {
                self.finish_presentation();
                Ok(result)
            }
            Completion::Failed(message) => {
                self.dismiss_error();
                Err(CardioError::Internal(message))
            }
            Completion::Superseded => Err(CardioError::Internal(
                "Evaluation was superseded".to_string(),
            )),
        }
    }

    /// Save the current result to history. No-op without one.
    ///
    /// # Errors
    /// Returns error if persisting fails.
    pub fn save_current(&mut self) -> Result<Option<HistoryEntry>, CardioError> {
        let Some(current) = self.current.as_ref() else {
            tracing::debug!("Nothing to save");
            return Ok(None);
        };
        let entry = self.history.commit(current.record, &current.result)?;
        Ok(Some(entry))
    }

    /// Delete a history entry. Missing ids are a no-op.
    ///
    /// # Errors
    /// Returns error if persisting fails.
    pub fn delete_entry(&mut self, id: i64) -> Result<bool, CardioError> {
        self.history.delete(id)
    }

    /// The record saved under `id`, for reloading into the form.
    #[must_use]
    pub fn recall(&self, id: i64) -> Option<ClinicalRecord> {
        self.history.find(id).map(|e| e.record)
    }

    /// Export the history into `dir`.
    ///
    /// # Errors
    /// Returns `NothingToExport` if there is no history, or an I/O error.
    pub fn export(&self, dir: &Path) -> Result<PathBuf, CardioError> {
        self.history.export_to_dir(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::SqliteStorage;
    use crate::adapters::template::matching_factors;
    use crate::application::narrative::tests::StubRemote;
    use crate::domain::{NarrativeOrigin, RiskLevel};
    use crate::ports::NarrativeError;

    fn service() -> EvaluationService<SqliteStorage> {
        let storage = Arc::new(SqliteStorage::in_memory().expect("Should create db"));
        EvaluationService::new(Arc::new(Evaluator::new(NarrativeProvider::local())), storage)
    }

    fn record() -> ClinicalRecord {
        crate::domain::record_tests::sample_record()
    }

    fn high_risk_record() -> ClinicalRecord {
        ClinicalRecord {
            age: 60.0,
            sex: 1.0,
            cp: 3.0,
            trestbps: 140.0,
            chol: 260.0,
            fbs: 0.0,
            restecg: 1.0,
            thalach: 110.0,
            exang: 1.0,
            oldpeak: 2.5,
            slope: 1.0,
            ca: 3.0,
            thal: 7.0,
        }
    }

    #[test]
    fn test_incomplete_record_rejected() {
        let mut service = service();
        let incomplete = ClinicalRecord {
            thalach: f64::NAN,
            ..record()
        };

        let err = service.begin(incomplete).expect_err("Should reject");
        assert!(matches!(err, CardioError::Validation(_)));
        assert_eq!(service.phase(), &Phase::Idle);
        assert_eq!(service.generation(), 0);
        assert_eq!(service.history().total_evaluations(), 0);
    }

    #[test]
    fn test_phase_sequence() {
        let mut service = service();
        let ticket = service.begin(record()).expect("Should begin");
        assert_eq!(service.phase(), &Phase::Scoring);
        assert!(service.phase().is_busy());

        let mut stages = Vec::new();
        let evaluator = service.evaluator();
        let outcome = evaluator.run(&ticket.record, |stage| {
            stages.push(stage);
            service.note_stage(ticket.generation, stage);
        });
        assert_eq!(stages, vec![Stage::Scoring, Stage::Narrating]);
        assert_eq!(service.phase(), &Phase::Narrating);

        let completion = service.complete(ticket.generation, ticket.record, outcome);
        assert!(matches!(completion, Completion::Ready { persisted: true, .. }));
        assert_eq!(service.phase(), &Phase::Presenting);
        assert!(service.current().is_some());
        assert_eq!(service.history().total_evaluations(), 1);

        service.finish_presentation();
        assert_eq!(service.phase(), &Phase::Idle);
        assert!(service.current().is_some());
    }

    #[test]
    fn test_end_to_end_high_risk() {
        let mut service = service();
        let record = high_risk_record();
        let result = service.evaluate(record).expect("Should evaluate");

        assert_eq!(result.risk_level, RiskLevel::High);
        assert!(result.probability >= 0.65);
        assert_eq!(result.narrative.origin, NarrativeOrigin::Template);

        let factors = matching_factors(&record);
        assert_eq!(factors[0], "3 major vessels affected");
        assert_eq!(factors[1], "Severe ST depression (2.5 mm)");
        assert!(result.narrative.text.contains(
            "3 major vessels affected; Severe ST depression (2.5 mm); Exercise-induced angina (ischemia)."
        ));
        assert!(!result.narrative.text.contains("Typical anginal chest pain"));
    }

    #[test]
    fn test_remote_failure_is_not_an_error() {
        let storage = Arc::new(SqliteStorage::in_memory().expect("Should create db"));
        let provider = NarrativeProvider::with_remote(Box::new(StubRemote::failing(
            NarrativeError::Status {
                status: 500,
                body: String::new(),
            },
        )));
        let mut service = EvaluationService::new(Arc::new(Evaluator::new(provider)), storage);

        let result = service.evaluate(record()).expect("Should evaluate");
        assert_eq!(result.narrative.origin, NarrativeOrigin::Template);
        assert_eq!(service.phase(), &Phase::Idle);
    }

    #[test]
    fn test_reset_supersedes_in_flight() {
        let mut service = service();
        let ticket = service.begin(record()).expect("Should begin");
        let outcome = service.evaluator().run(&ticket.record, |_| {});

        service.reset();
        assert_eq!(service.phase(), &Phase::Idle);

        let completion = service.complete(ticket.generation, ticket.record, outcome);
        assert_eq!(completion, Completion::Superseded);
        assert!(service.current().is_none());
        assert_eq!(service.history().total_evaluations(), 0);
        assert_eq!(service.phase(), &Phase::Idle);
    }

    #[test]
    fn test_newer_request_supersedes_older() {
        let mut service = service();
        let first = service.begin(record()).expect("Should begin");
        let second = service.begin(high_risk_record()).expect("Should begin");

        let stale = service.evaluator().run(&first.record, |_| {});
        assert_eq!(
            service.complete(first.generation, first.record, stale),
            Completion::Superseded
        );

        let fresh = service.evaluator().run(&second.record, |_| {});
        assert!(matches!(
            service.complete(second.generation, second.record, fresh),
            Completion::Ready { .. }
        ));
        assert_eq!(
            service.current().map(|c| c.record),
            Some(high_risk_record())
        );
        assert_eq!(service.history().total_evaluations(), 1);
    }

    #[test]
    fn test_internal_failure_enters_error_state() {
        let mut service = service();
        let ticket = service.begin(record()).expect("Should begin");

        let completion = service.complete(
            ticket.generation,
            ticket.record,
            Err(CardioError::Internal("boom".to_string())),
        );
        assert_eq!(completion, Completion::Failed("boom".to_string()));
        assert_eq!(service.phase(), &Phase::Error("boom".to_string()));
        assert!(service.current().is_none());
        assert_eq!(service.history().total_evaluations(), 0);

        service.dismiss_error();
        assert_eq!(service.phase(), &Phase::Idle);
    }

    #[test]
    fn test_save_delete_recall() {
        let mut service = service();
        assert!(service.save_current().expect("Should no-op").is_none());

        service.evaluate(record()).expect("Should evaluate");
        let entry = service
            .save_current()
            .expect("Should save")
            .expect("Should have entry");
        assert_eq!(service.history().len(), 1);
        assert_eq!(service.recall(entry.id), Some(record()));

        let total = service.history().total_evaluations();
        assert!(!service.delete_entry(entry.id + 1).expect("Should no-op"));
        assert!(service.delete_entry(entry.id).expect("Should delete"));
        assert!(service.recall(entry.id).is_none());
        assert_eq!(service.history().total_evaluations(), total);
    }

    #[test]
    fn test_reset_keeps_history() {
        let mut service = service();
        service.evaluate(record()).expect("Should evaluate");
        service.save_current().expect("Should save");
        let before = service.history().snapshot();

        service.reset();
        assert!(service.current().is_none());
        assert!(service.save_current().expect("Should no-op").is_none());
        assert_eq!(service.history().snapshot(), before);
    }

    #[test]
    fn test_export() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let mut service = service();
        assert!(matches!(
            service.export(dir.path()),
            Err(CardioError::NothingToExport)
        ));

        service.evaluate(record()).expect("Should evaluate");
        service.save_current().expect("Should save");
        let path = service.export(dir.path()).expect("Should export");
        assert!(path.exists());
    }
}
