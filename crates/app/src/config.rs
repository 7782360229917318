//! Runtime configuration loaded from the environment at startup.
//!
//! A `.env` file in the working directory is honoured for local use.
//! Command-line flags override these values afterwards.

use std::path::PathBuf;

use tracing_subscriber::EnvFilter;

pub const DEFAULT_DB_URL: &str = "sqlite:quizquest.db";
pub const DEFAULT_QUESTIONS_DIR: &str = "questions";
pub const DEFAULT_REPORTS_DIR: &str = "reports";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub db_url: String,
    pub questions_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub log_filter: String,
}

impl Config {
    /// Loads configuration from environment variables, reading `.env` first.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a malformed value.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a malformed value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_url = non_empty("QUIZ_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.to_owned());
        let questions_dir = non_empty("QUIZ_QUESTIONS_DIR")
            .map_or_else(|| PathBuf::from(DEFAULT_QUESTIONS_DIR), PathBuf::from);
        let reports_dir = non_empty("QUIZ_REPORTS_DIR")
            .map_or_else(|| PathBuf::from(DEFAULT_REPORTS_DIR), PathBuf::from);

        let log_filter = non_empty("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_owned());
        EnvFilter::try_new(&log_filter)
            .map_err(|e| ConfigError::InvalidValue("RUST_LOG".to_owned(), e.to_string()))?;

        Ok(Self {
            db_url,
            questions_dir,
            reports_dir,
            log_filter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db_url, DEFAULT_DB_URL);
        assert_eq!(config.questions_dir, PathBuf::from("questions"));
        assert_eq!(config.reports_dir, PathBuf::from("reports"));
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn variables_override_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("QUIZ_DB_URL", "sqlite:other.db"),
            ("QUIZ_QUESTIONS_DIR", "/srv/soal"),
            ("QUIZ_REPORTS_DIR", " "),
            ("RUST_LOG", "services=debug,info"),
        ]))
        .unwrap();
        assert_eq!(config.db_url, "sqlite:other.db");
        assert_eq!(config.questions_dir, PathBuf::from("/srv/soal"));
        assert_eq!(config.reports_dir, PathBuf::from("reports"));
        assert_eq!(config.log_filter, "services=debug,info");
    }
}
