//! Runtime configuration for the `vetclinic` binary.
//!
//! Each setting resolves from its flag first, then its environment variable,
//! then a built-in default.

use std::path::{Path, PathBuf};

pub const DB_PATH_ENV: &str = "VETCLINIC_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "VETCLINIC_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "VETCLINIC_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "vet.db";
const DEFAULT_LOG_DIR_NAME: &str = "vetclinic-logs";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Always absolute.
    pub log_dir: PathBuf,
}

impl Config {
    pub fn resolve(
        db: Option<PathBuf>,
        log_level: Option<String>,
        log_dir: Option<PathBuf>,
    ) -> Self {
        Self::resolve_with(db, log_level, log_dir, |key| std::env::var(key).ok())
    }

    fn resolve_with(
        db: Option<PathBuf>,
        log_level: Option<String>,
        log_dir: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let db_path = db
            .or_else(|| non_empty(env(DB_PATH_ENV)).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE_NAME));
        let log_level = log_level
            .or_else(|| non_empty(env(LOG_LEVEL_ENV)))
            .unwrap_or_else(|| vetclinic_core::default_log_level().to_string());
        let log_dir = log_dir
            .or_else(|| non_empty(env(LOG_DIR_ENV)).map(PathBuf::from))
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_LOG_DIR_NAME));

        Self {
            db_path,
            log_level,
            log_dir: absolutize(&log_dir),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

// The logging backend only accepts absolute directories.
fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| std::env::temp_dir().join(path))
}
