//! Background evaluation worker.
//!
//! Runs scoring and narrative generation (which may wait on the network)
//! without blocking the TUI main loop. Every message carries the generation of
//! the ticket it belongs to so the service can discard stale ones.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::application::{EvaluationTicket, Evaluator, Stage};
use crate::domain::{ClinicalRecord, EvaluationResult};
use crate::CardioError;

/// Progress updates from the evaluation worker.
#[derive(Debug)]
pub enum EvaluationProgress {
    /// A stage started
    Stage(Stage),
    /// Evaluation finished, successfully or not
    Complete(Result<EvaluationResult, CardioError>),
}

/// Handle to a running evaluation worker.
pub struct EvaluationWorkerHandle {
    /// Generation of the ticket being evaluated
    pub generation: u64,
    /// Record being evaluated
    pub record: ClinicalRecord,
    progress_rx: Receiver<EvaluationProgress>,
    _handle: JoinHandle<()>,
}

impl EvaluationWorkerHandle {
    /// Try to receive the next progress update (non-blocking).
    ///
    /// A worker that exited without reporting completion is reported as an
    /// internal failure.
    #[must_use]
    pub fn try_recv(&self) -> Option<EvaluationProgress> {
        match self.progress_rx.try_recv() {
            Ok(progress) => Some(progress),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(EvaluationProgress::Complete(Err(
                CardioError::Internal("Evaluation worker stopped unexpectedly".to_string()),
            ))),
        }
    }
}

/// Worker that evaluates one ticket in the background.
pub struct EvaluationWorker;

impl EvaluationWorker {
    /// Spawn a background evaluation.
    ///
    /// Returns a handle to receive progress updates.
    pub fn spawn(evaluator: Arc<Evaluator>, ticket: EvaluationTicket) -> EvaluationWorkerHandle {
        let (tx, rx) = mpsc::channel();
        let record = ticket.record;

        let handle = thread::spawn(move || {
            Self::run_with_progress(&evaluator, &record, &tx);
        });

        EvaluationWorkerHandle {
            generation: ticket.generation,
            record: ticket.record,
            progress_rx: rx,
            _handle: handle,
        }
    }

    fn run_with_progress(
        evaluator: &Evaluator,
        record: &ClinicalRecord,
        tx: &Sender<EvaluationProgress>,
    ) {
        let outcome = evaluator.run(record, |stage| {
            let _ = tx.send(EvaluationProgress::Stage(stage));
        });

        // The receiver may be gone after a reset; nothing to do then.
        let _ = tx.send(EvaluationProgress::Complete(outcome));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::NarrativeProvider;
    use std::time::{Duration, Instant};

    #[test]
    fn test_worker_reports_stages_then_result() {
        let evaluator = Arc::new(Evaluator::new(NarrativeProvider::local()));
        let ticket = EvaluationTicket {
            generation: 7,
            record: crate::domain::record_tests::sample_record(),
        };
        let handle = EvaluationWorker::spawn(evaluator, ticket);
        assert_eq!(handle.generation, 7);

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut stages = Vec::new();
        let result = loop {
            match handle.try_recv() {
                Some(EvaluationProgress::Stage(stage)) => stages.push(stage),
                Some(EvaluationProgress::Complete(outcome)) => break outcome,
                None => {
                    assert!(Instant::now() < deadline, "Worker timed out");
                    thread::sleep(Duration::from_millis(5));
                }
            }
        };

        assert_eq!(stages, vec![Stage::Scoring, Stage::Narrating]);
        let result = result.expect("Should evaluate");
        assert!((0.01..=0.99).contains(&result.probability));
    }
}
