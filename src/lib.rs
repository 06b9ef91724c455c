//! # CardioPredict
//!
//! Heart-disease risk estimation from the 13 Cleveland clinical features.
//!
//! This crate provides:
//! - A fixed-weight logistic heuristic producing a risk probability
//! - Narrative explanations from a remote text-generation service, with a
//!   deterministic local template as fallback
//! - A bounded, persisted history of evaluations with running aggregates
//! - Terminal UI for local use
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (ClinicalRecord, RiskLevel, HistoryEntry) and the scorer
//! - `ports`: Trait definitions for external collaborators
//! - `adapters`: Concrete implementations (Gemini, local template, SQLite)
//! - `application`: Use cases orchestrating domain and ports
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{ClinicalRecord, EvaluationResult, HistoryEntry, RiskLevel};

/// Result type for CardioPredict operations
pub type Result<T> = std::result::Result<T, CardioError>;

/// Main error type for CardioPredict
#[derive(Debug, thiserror::Error)]
pub enum CardioError {
    #[error("Invalid clinical record: {0}")]
    Validation(String),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),

    #[error("Evaluation failed: {0}")]
    Internal(String),

    #[error("No saved evaluations to export")]
    NothingToExport,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
