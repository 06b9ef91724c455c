//! Narrative provider: classify a probability and explain it.
//!
//! Tries the remote source when one is configured and falls back to the local
//! template on any failure. Callers never see a narrative error.

use crate::adapters::template::LocalTemplate;
use crate::domain::{ClinicalRecord, EvaluationResult, Narrative, RiskLevel};
use crate::ports::{NarrativeRequest, NarrativeSource};

/// Produces an [`EvaluationResult`] for a scored record.
pub struct NarrativeProvider {
    remote: Option<Box<dyn NarrativeSource>>,
    template: LocalTemplate,
}

impl NarrativeProvider {
    /// Provider that only uses the local template.
    #[must_use]
    pub fn local() -> Self {
        Self {
            remote: None,
            template: LocalTemplate::new(),
        }
    }

    /// Provider that tries `remote` first.
    #[must_use]
    pub fn with_remote(remote: Box<dyn NarrativeSource>) -> Self {
        Self {
            remote: Some(remote),
            template: LocalTemplate::new(),
        }
    }

    #[must_use]
    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Classify `probability` and attach a narrative.
    #[must_use]
    pub fn explain(&self, record: &ClinicalRecord, probability: f64) -> EvaluationResult {
        let risk_level = RiskLevel::from_probability(probability);
        let request = NarrativeRequest {
            record,
            probability,
            risk_level,
        };

        let narrative = self
            .remote
            .as_deref()
            .and_then(|remote| match remote.generate(&request) {
                Ok(text) => Some(Narrative {
                    text,
                    origin: remote.origin(),
                }),
                Err(e) => {
                    tracing::warn!("Remote narrative failed, using template: {}", e);
                    None
                }
            })
            .unwrap_or_else(|| Narrative {
                text: self.template.compose(&request),
                origin: self.template.origin(),
            });

        EvaluationResult {
            probability,
            risk_level,
            narrative,
        }
    }
}

impl Default for NarrativeProvider {
    fn default() -> Self {
        Self::local()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::NarrativeOrigin;
    use crate::ports::NarrativeError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Remote stand-in with a fixed outcome.
    pub(crate) struct StubRemote {
        pub outcome: Result<String, NarrativeError>,
        pub calls: Arc<AtomicUsize>,
    }

    impl StubRemote {
        pub(crate) fn ok(text: &str) -> Self {
            Self {
                outcome: Ok(text.to_string()),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub(crate) fn failing(error: NarrativeError) -> Self {
            Self {
                outcome: Err(error),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl NarrativeSource for StubRemote {
        fn origin(&self) -> NarrativeOrigin {
            NarrativeOrigin::Remote
        }

        fn generate(&self, _request: &NarrativeRequest<'_>) -> Result<String, NarrativeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone()
        }
    }

    fn record() -> ClinicalRecord {
        crate::domain::record_tests::sample_record()
    }

    #[test]
    fn test_local_only() {
        let provider = NarrativeProvider::local();
        assert!(!provider.has_remote());

        let result = provider.explain(&record(), 0.5);
        assert_eq!(result.risk_level, RiskLevel::Moderate);
        assert_eq!(result.narrative.origin, NarrativeOrigin::Template);
        assert!(result.narrative.text.contains("moderate risk of 50.0%"));
    }

    #[test]
    fn test_remote_success() {
        let provider = NarrativeProvider::with_remote(Box::new(StubRemote::ok("<p>remote</p>")));
        let result = provider.explain(&record(), 0.8);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.narrative.origin, NarrativeOrigin::Remote);
        assert_eq!(result.narrative.text, "<p>remote</p>");
    }

    #[test]
    fn test_every_remote_failure_falls_back() {
        let failures = [
            NarrativeError::Transport("connection refused".to_string()),
            NarrativeError::Status {
                status: 503,
                body: "unavailable".to_string(),
            },
            NarrativeError::MalformedResponse("empty".to_string()),
        ];

        let expected = NarrativeProvider::local().explain(&record(), 0.2);
        for failure in failures {
            let stub = StubRemote::failing(failure);
            let calls = Arc::clone(&stub.calls);
            let provider = NarrativeProvider::with_remote(Box::new(stub));

            let result = provider.explain(&record(), 0.2);
            assert_eq!(calls.load(Ordering::SeqCst), 1);
            assert_eq!(result, expected);
        }
    }
}
