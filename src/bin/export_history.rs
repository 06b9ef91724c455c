//! Export saved evaluations to a JSON file without starting the TUI.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin export_history -- [--db <path>] [--out <dir>]
//! ```
//!
//! Defaults come from the same environment variables the application reads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cardiopredict::adapters::sqlite::SqliteStorage;
use cardiopredict::adapters::StorageError;
use cardiopredict::application::HistoryStore;
use cardiopredict::config::AppConfig;
use cardiopredict::CardioError;

const USAGE: &str = "Usage: export_history [--db <path>] [--out <dir>]";

#[derive(Debug)]
enum ExportFailure {
    MissingDatabase(PathBuf),
    Open(StorageError),
    Export(CardioError),
}

/// Export the history stored in `db_path` into `out_dir`.
///
/// Returns the number of exported entries and the written file.
fn export(db_path: &Path, out_dir: &Path) -> Result<(usize, PathBuf), ExportFailure> {
    // Opening a missing path would create an empty database.
    if !db_path.is_file() {
        return Err(ExportFailure::MissingDatabase(db_path.to_path_buf()));
    }

    let storage = SqliteStorage::new(db_path).map_err(ExportFailure::Open)?;
    let history = HistoryStore::load(Arc::new(storage));
    let path = history
        .export_to_dir(out_dir)
        .map_err(ExportFailure::Export)?;

    Ok((history.len(), path))
}

fn main() {
    let config = AppConfig::from_env();
    for warning in &config.warnings {
        eprintln!("Warning: {warning}");
    }
    let mut db_path = config.db_path;
    let mut out_dir = config.export_dir;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" | "--out" => {
                let value = args.next().unwrap_or_default();
                if value.is_empty() {
                    eprintln!("{USAGE}");
                    std::process::exit(2);
                }
                if arg == "--db" {
                    db_path = PathBuf::from(value);
                } else {
                    out_dir = PathBuf::from(value);
                }
            }
            "-h" | "--help" => {
                println!(
                    "{USAGE}\n\nWrites the saved evaluation history as pretty-printed JSON into <dir>."
                );
                return;
            }
            _ => {
                eprintln!("Unknown arg: {arg}\n{USAGE}");
                std::process::exit(2);
            }
        }
    }

    match export(&db_path, &out_dir) {
        Ok((count, path)) => {
            println!("Exported {count} evaluation(s) to {}", path.display());
        }
        Err(ExportFailure::MissingDatabase(path)) => {
            eprintln!("Database not found: {}", path.display());
            std::process::exit(1);
        }
        Err(ExportFailure::Open(e)) => {
            eprintln!("Failed to open {}: {e}", db_path.display());
            std::process::exit(1);
        }
        Err(ExportFailure::Export(CardioError::NothingToExport)) => {
            eprintln!("No data to export");
            std::process::exit(1);
        }
        Err(ExportFailure::Export(e)) => {
            eprintln!("Export failed: {e}");
            std::process::exit(1);
        }
    }
}
