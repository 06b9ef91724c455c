//! History store: bounded evaluation log plus running aggregates.
//!
//! The store owns the in-memory state and writes it through to a
//! [`KeyValueStore`] after every mutation. Three entries are kept:
//! - `cardiopredict.history`: JSON array of entries, newest first
//! - `cardiopredict.total_evaluations`: completed evaluations, saved or not
//! - `cardiopredict.average_risk`: running average (see [`HistoryStore::record_evaluation`])

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::adapters::StorageError;
use crate::domain::{ClinicalRecord, EvaluationResult, HistoryEntry};
use crate::ports::KeyValueStore;
use crate::CardioError;

/// Maximum number of entries kept.
pub const HISTORY_CAPACITY: usize = 10;

pub const HISTORY_KEY: &str = "cardiopredict.history";
pub const TOTAL_KEY: &str = "cardiopredict.total_evaluations";
pub const AVERAGE_KEY: &str = "cardiopredict.average_risk";

/// Serializable view of the whole store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub entries: Vec<HistoryEntry>,
    pub total_evaluations: u64,
    pub average_risk: f64,
}

/// Bounded, persisted history of saved evaluations.
pub struct HistoryStore<S>
where
    S: KeyValueStore,
{
    storage: Arc<S>,
    entries: Vec<HistoryEntry>,
    total_evaluations: u64,
    average_risk: f64,
}

impl<S> HistoryStore<S>
where
    S: KeyValueStore,
    S::Error: Into<StorageError>,
{
    /// Load the store from `storage`.
    ///
    /// Each entry is read independently; a missing or unreadable value falls
    /// back to its default (empty history, zero total, zero average).
    pub fn load(storage: Arc<S>) -> Self {
        let entries: Vec<HistoryEntry> = read_entry(&*storage, HISTORY_KEY, |raw| {
            serde_json::from_str(raw).map_err(|e| e.to_string())
        })
        .unwrap_or_default();

        let total_evaluations = read_entry(&*storage, TOTAL_KEY, |raw| {
            raw.trim().parse::<u64>().map_err(|e| e.to_string())
        })
        .unwrap_or(0);

        let average_risk = read_entry(&*storage, AVERAGE_KEY, |raw| {
            raw.trim()
                .parse::<f64>()
                .map_err(|e| e.to_string())
                .and_then(|v| {
                    if v.is_finite() {
                        Ok(v)
                    } else {
                        Err("not a finite number".to_string())
                    }
                })
        })
        .unwrap_or(0.0);

        let mut store = Self {
            storage,
            entries,
            total_evaluations,
            average_risk,
        };
        store.entries.truncate(HISTORY_CAPACITY);

        tracing::info!(
            "Loaded history: {} entries, {} evaluations",
            store.entries.len(),
            store.total_evaluations
        );
        store
    }

    /// Saved entries, newest first.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Completed evaluations since the store was created.
    #[must_use]
    pub fn total_evaluations(&self) -> u64 {
        self.total_evaluations
    }

    /// Running average risk probability.
    #[must_use]
    pub fn average_risk(&self) -> f64 {
        self.average_risk
    }

    /// Look up a saved entry.
    #[must_use]
    pub fn find(&self, id: i64) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            entries: self.entries.clone(),
            total_evaluations: self.total_evaluations,
            average_risk: self.average_risk,
        }
    }

    /// Account for a completed evaluation and persist.
    ///
    /// The average is taken over the entries saved so far plus the new
    /// probability, before that evaluation is (optionally) saved. It therefore
    /// differs from the plain mean of saved entries.
    ///
    /// # Errors
    /// Returns error if persisting fails. In-memory state is updated anyway.
    pub fn record_evaluation(&mut self, probability: f64) -> Result<(), CardioError> {
        self.total_evaluations += 1;

        let saved: f64 = self.entries.iter().map(|e| e.probability).sum();
        self.average_risk = (saved + probability) / (self.entries.len() + 1) as f64;

        tracing::debug!(
            "Aggregates updated: total={}, average={:.3}",
            self.total_evaluations,
            self.average_risk
        );
        self.persist()
    }

    /// Save an evaluation at the front, evicting the oldest beyond capacity.
    ///
    /// # Errors
    /// Returns error if persisting fails. In-memory state is updated anyway.
    pub fn commit(
        &mut self,
        record: ClinicalRecord,
        result: &EvaluationResult,
    ) -> Result<HistoryEntry, CardioError> {
        let created_at = Utc::now();
        let newest = self.entries.iter().map(|e| e.id).max();
        let id = match newest {
            Some(newest) if newest >= created_at.timestamp_millis() => newest + 1,
            _ => created_at.timestamp_millis(),
        };

        let entry = HistoryEntry {
            id,
            created_at,
            probability: result.probability,
            risk_level: result.risk_level,
            record,
        };

        self.entries.insert(0, entry.clone());
        if self.entries.len() > HISTORY_CAPACITY {
            let evicted = self.entries.len() - HISTORY_CAPACITY;
            self.entries.truncate(HISTORY_CAPACITY);
            tracing::debug!("Evicted {} oldest history entries", evicted);
        }

        tracing::info!("Saved evaluation {} to history", entry.id);
        self.persist()?;
        Ok(entry)
    }

    /// Remove an entry. Returns whether one was removed; aggregates are left
    /// alone either way.
    ///
    /// # Errors
    /// Returns error if persisting fails.
    pub fn delete(&mut self, id: i64) -> Result<bool, CardioError> {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        let removed = self.entries.len() != before;

        if removed {
            tracing::info!("Deleted history entry {}", id);
        } else {
            tracing::debug!("History entry {} not found", id);
        }

        self.persist()?;
        Ok(removed)
    }

    /// Pretty JSON array of saved entries.
    ///
    /// # Errors
    /// Returns `NothingToExport` if the history is empty.
    pub fn export_json(&self) -> Result<String, CardioError> {
        if self.entries.is_empty() {
            return Err(CardioError::NothingToExport);
        }
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    /// Write the export to `dir/cardiopredict-history-{millis}.json`.
    ///
    /// # Errors
    /// Returns `NothingToExport` if the history is empty, or an I/O error.
    pub fn export_to_dir(&self, dir: &Path) -> Result<PathBuf, CardioError> {
        let json = self.export_json()?;
        std::fs::create_dir_all(dir)?;

        let path = dir.join(format!(
            "cardiopredict-history-{}.json",
            Utc::now().timestamp_millis()
        ));
        std::fs::write(&path, json)?;

        tracing::info!(
            "Exported {} history entries to {}",
            self.entries.len(),
            path.display()
        );
        Ok(path)
    }

    fn persist(&self) -> Result<(), CardioError> {
        let history = serde_json::to_string(&self.entries)?;

        self.write(HISTORY_KEY, &history)?;
        self.write(TOTAL_KEY, &self.total_evaluations.to_string())?;
        self.write(AVERAGE_KEY, &self.average_risk.to_string())?;
        Ok(())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), CardioError> {
        self.storage
            .set(key, value)
            .map_err(|e| CardioError::Storage(e.into()))
    }
}

fn read_entry<S, T, F>(storage: &S, key: &str, parse: F) -> Option<T>
where
    S: KeyValueStore,
    F: FnOnce(&str) -> Result<T, String>,
{
    match storage.get(key) {
        Ok(Some(raw)) => match parse(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring unreadable {}: {}", key, e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", key, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::SqliteStorage;
    use crate::domain::{Narrative, NarrativeOrigin, RiskLevel};

    fn storage() -> Arc<SqliteStorage> {
        Arc::new(SqliteStorage::in_memory().expect("Should create db"))
    }

    fn result(probability: f64) -> EvaluationResult {
        EvaluationResult {
            probability,
            risk_level: RiskLevel::from_probability(probability),
            narrative: Narrative {
                text: "<p>text</p>".to_string(),
                origin: NarrativeOrigin::Template,
            },
        }
    }

    fn record(age: f64) -> ClinicalRecord {
        ClinicalRecord {
            age,
            ..crate::domain::record_tests::sample_record()
        }
    }

    #[test]
    fn test_empty_store() {
        let store = HistoryStore::load(storage());
        assert!(store.is_empty());
        assert_eq!(store.total_evaluations(), 0);
        assert_eq!(store.average_risk(), 0.0);
        assert!(matches!(
            store.export_json(),
            Err(CardioError::NothingToExport)
        ));
    }

    #[test]
    fn test_capacity_keeps_newest() {
        let mut store = HistoryStore::load(storage());
        for i in 0..11 {
            store
                .commit(record(30.0 + f64::from(i)), &result(0.5))
                .expect("Should commit");
        }

        assert_eq!(store.len(), HISTORY_CAPACITY);
        assert_eq!(store.entries()[0].record.age, 40.0);
        assert_eq!(store.entries()[9].record.age, 31.0);
        assert!(store.entries().iter().all(|e| e.record.age != 30.0));
    }

    #[test]
    fn test_ids_strictly_increase() {
        let mut store = HistoryStore::load(storage());
        let mut previous = None;
        for _ in 0..5 {
            let entry = store
                .commit(record(50.0), &result(0.2))
                .expect("Should commit");
            if let Some(prev) = previous {
                assert!(entry.id > prev);
            }
            previous = Some(entry.id);
        }
    }

    #[test]
    fn test_average_counts_only_saved_entries() {
        let mut store = HistoryStore::load(storage());

        store.record_evaluation(0.40).expect("Should record");
        assert_eq!(store.total_evaluations(), 1);
        assert!((store.average_risk() - 0.40).abs() < 1e-12);

        // The first result was never saved, so it does not count.
        store.record_evaluation(0.60).expect("Should record");
        assert_eq!(store.total_evaluations(), 2);
        assert!((store.average_risk() - 0.60).abs() < 1e-12);

        store.commit(record(50.0), &result(0.60)).expect("Should commit");
        store.record_evaluation(0.20).expect("Should record");
        assert_eq!(store.total_evaluations(), 3);
        assert!((store.average_risk() - 0.40).abs() < 1e-12);
    }

    #[test]
    fn test_delete() {
        let mut store = HistoryStore::load(storage());
        store.record_evaluation(0.3).expect("Should record");
        let entry = store.commit(record(50.0), &result(0.3)).expect("Should commit");
        let before = store.snapshot();

        assert!(!store.delete(entry.id + 999).expect("Should handle missing id"));
        assert_eq!(store.snapshot(), before);

        assert!(store.delete(entry.id).expect("Should delete"));
        assert!(store.is_empty());
        assert_eq!(store.total_evaluations(), before.total_evaluations);
        assert_eq!(store.average_risk(), before.average_risk);
    }

    #[test]
    fn test_reload_roundtrip() {
        let storage = storage();
        let mut store = HistoryStore::load(Arc::clone(&storage));
        store.record_evaluation(0.72).expect("Should record");
        store.commit(record(61.0), &result(0.72)).expect("Should commit");
        store.record_evaluation(0.18).expect("Should record");
        store.commit(record(42.0), &result(0.18)).expect("Should commit");

        let reloaded = HistoryStore::load(storage);
        assert_eq!(reloaded.snapshot(), store.snapshot());
        assert_eq!(reloaded.entries()[0].record.age, 42.0);
        assert!(reloaded.find(store.entries()[1].id).is_some());
    }

    #[test]
    fn test_corrupt_entries_default_independently() {
        let storage = storage();
        storage.set(HISTORY_KEY, "not json").expect("Should write");
        storage.set(TOTAL_KEY, "7").expect("Should write");
        storage.set(AVERAGE_KEY, "NaN").expect("Should write");

        let store = HistoryStore::load(storage);
        assert!(store.is_empty());
        assert_eq!(store.total_evaluations(), 7);
        assert_eq!(store.average_risk(), 0.0);
    }

    #[test]
    fn test_export_to_dir() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let mut store = HistoryStore::load(storage());
        store.commit(record(55.0), &result(0.5)).expect("Should commit");

        let path = store.export_to_dir(dir.path()).expect("Should export");
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .expect("Should have file name");
        assert!(name.starts_with("cardiopredict-history-"));
        assert!(name.ends_with(".json"));

        let contents = std::fs::read_to_string(&path).expect("Should read export");
        let parsed: Vec<HistoryEntry> =
            serde_json::from_str(&contents).expect("Should parse export");
        assert_eq!(parsed, store.entries());
        assert!(contents.contains("\"risk_level\": \"moderate\""));
    }
}
