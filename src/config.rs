//! Runtime configuration from environment variables.
//!
//! Every setting has a default; only the remote narrative service needs a
//! credential, and without one the local template is used.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DB_PATH: &str = "cardiopredict.db";
pub const DEFAULT_LOG_FILE: &str = "cardiopredict.log";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_NARRATIVE_TIMEOUT_SECS: u64 = 20;

/// Sampling temperature sent with every generation request.
pub const GENERATION_TEMPERATURE: f64 = 0.4;

/// Output token cap sent with every generation request.
pub const GENERATION_MAX_OUTPUT_TOKENS: u32 = 500;

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// File when stdout is a terminal (the TUI owns it), stdout otherwise
    Auto,
    File,
    Stdout,
}

impl LogMode {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Self::File,
            "stdout" => Self::Stdout,
            _ => Self::Auto,
        }
    }

    /// Resolve `Auto` against whether stdout is interactive.
    #[must_use]
    pub fn use_file(self, interactive: bool) -> bool {
        match self {
            Self::File => true,
            Self::Stdout => false,
            Self::Auto => interactive,
        }
    }
}

/// Settings for the remote text-generation service.
#[derive(Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// Base URL, or a full `...:generateContent` URL
    pub endpoint: String,
    pub timeout: Duration,
}

// Keep the credential out of Debug output.
impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub export_dir: PathBuf,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    /// `None` when no credential is configured
    pub gemini: Option<GeminiConfig>,
    /// Settings that were ignored in favour of a default; logged once
    /// logging is set up
    pub warnings: Vec<String>,
}

impl AppConfig {
    /// Read configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut warnings = Vec::new();

        let api_key = get("CARDIOPREDICT_GEMINI_API_KEY").or_else(|| get("GEMINI_API_KEY"));

        let timeout_secs = match get("CARDIOPREDICT_NARRATIVE_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    warnings.push(format!(
                        "Ignoring invalid CARDIOPREDICT_NARRATIVE_TIMEOUT_SECS={raw:?}, using {DEFAULT_NARRATIVE_TIMEOUT_SECS}s"
                    ));
                    DEFAULT_NARRATIVE_TIMEOUT_SECS
                }
            },
            None => DEFAULT_NARRATIVE_TIMEOUT_SECS,
        };

        let gemini = api_key.map(|api_key| GeminiConfig {
            api_key: api_key.trim().to_string(),
            model: get("CARDIOPREDICT_GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            endpoint: get("CARDIOPREDICT_GEMINI_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_GEMINI_ENDPOINT.to_string()),
            timeout: Duration::from_secs(timeout_secs),
        });

        Self {
            db_path: get("CARDIOPREDICT_DB_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from),
            export_dir: get("CARDIOPREDICT_EXPORT_DIR")
                .map_or_else(|| PathBuf::from("."), PathBuf::from),
            log_mode: get("CARDIOPREDICT_LOG_MODE").map_or(LogMode::Auto, |v| LogMode::parse(&v)),
            log_file: get("CARDIOPREDICT_LOG_FILE")
                .map_or_else(|| PathBuf::from(DEFAULT_LOG_FILE), PathBuf::from),
            gemini,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.export_dir, PathBuf::from("."));
        assert_eq!(config.log_mode, LogMode::Auto);
        assert!(config.gemini.is_none());
    }

    #[test]
    fn test_blank_key_disables_remote() {
        let config = config_from(&[("GEMINI_API_KEY", "   ")]);
        assert!(config.gemini.is_none());
    }

    #[test]
    fn test_remote_settings() {
        let config = config_from(&[
            ("GEMINI_API_KEY", "fallback-key"),
            ("CARDIOPREDICT_GEMINI_API_KEY", "primary-key"),
            ("CARDIOPREDICT_GEMINI_MODEL", "gemini-1.5-flash"),
            ("CARDIOPREDICT_NARRATIVE_TIMEOUT_SECS", "5"),
        ]);
        let gemini = config.gemini.expect("Should be configured");
        assert_eq!(gemini.api_key, "primary-key");
        assert_eq!(gemini.model, "gemini-1.5-flash");
        assert_eq!(gemini.endpoint, DEFAULT_GEMINI_ENDPOINT);
        assert_eq!(gemini.timeout, Duration::from_secs(5));
        assert!(!format!("{gemini:?}").contains("primary-key"));
    }

    #[test]
    fn test_invalid_timeout_falls_back() {
        for raw in ["abc", "0"] {
            let config = config_from(&[
                ("GEMINI_API_KEY", "k"),
                ("CARDIOPREDICT_NARRATIVE_TIMEOUT_SECS", raw),
            ]);
            assert_eq!(config.warnings.len(), 1);
            assert!(config.warnings[0].contains("CARDIOPREDICT_NARRATIVE_TIMEOUT_SECS"));
            assert!(config.warnings[0].contains(raw));

            let gemini = config.gemini.expect("Should be configured");
            assert_eq!(
                gemini.timeout,
                Duration::from_secs(DEFAULT_NARRATIVE_TIMEOUT_SECS)
            );
        }
    }

    #[test]
    fn test_valid_settings_record_no_warnings() {
        let config = config_from(&[("CARDIOPREDICT_NARRATIVE_TIMEOUT_SECS", "30")]);
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn test_log_mode() {
        assert_eq!(config_from(&[("CARDIOPREDICT_LOG_MODE", "FILE")]).log_mode, LogMode::File);
        assert!(LogMode::Auto.use_file(true));
        assert!(!LogMode::Auto.use_file(false));
        assert!(!LogMode::Stdout.use_file(true));
    }
}
