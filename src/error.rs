// ⚠️ Tracker Errors
// Domain failures are recoverable per action; infrastructure failures wrap the source error

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Error, Debug)]
pub enum TrackerError {
    /// Category name already taken (case-insensitive). Nothing was written.
    #[error("Category '{name}' already exists!")]
    DuplicateCategory { name: String },

    /// Expense referenced a category that does not exist
    #[error("Invalid category '{name}'!")]
    CategoryNotFound { name: String },

    /// Unparseable user input (amount, date, month, year, name)
    #[error("Invalid {field} format: '{value}'")]
    InvalidFormat { field: &'static str, value: String },

    /// Report query matched no rows
    #[error("No expenses found for {scope}")]
    EmptyReport { scope: String },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl TrackerError {
    pub fn invalid_format(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidFormat {
            field,
            value: value.into(),
        }
    }

    pub fn category_not_found(name: impl Into<String>) -> Self {
        Self::CategoryNotFound { name: name.into() }
    }

    /// True for errors caused by user input rather than the environment.
    /// The menu reports these and keeps going.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateCategory { .. }
                | Self::CategoryNotFound { .. }
                | Self::InvalidFormat { .. }
                | Self::EmptyReport { .. }
        )
    }
}
