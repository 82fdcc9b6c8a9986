// ⚙️ Configuration - Where the database and the CSV export live

use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "expenses.db";
pub const DEFAULT_EXPORT_PATH: &str = "expenses.csv";

/// Default tracing filter when RUST_LOG is unset (keeps the menu output clean)
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    /// Rewritten after every expense recorded from the menu
    pub export_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            export_path: PathBuf::from(DEFAULT_EXPORT_PATH),
        }
    }
}

impl Config {
    pub fn new(db_path: impl Into<PathBuf>, export_path: impl Into<PathBuf>) -> Self {
        Config {
            db_path: db_path.into(),
            export_path: export_path.into(),
        }
    }
}
