// Expense Tracker - Core Library
// Exposes all modules for use in the CLI and tests

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod menu;
pub mod reports;
pub mod tracker;

// Re-export commonly used types
pub use db::{Category, Expense, ExpenseRow, setup_database};
pub use error::{Result, TrackerError};
pub use export::{export_csv, export_csv_to_path};
pub use menu::{Choice, Menu};
pub use reports::{
    AverageReport, CategoryAverage, CategoryShare, Comparison, MonthlyReport, Outcome,
};
pub use tracker::{CategoryDecision, ExpenseTracker, PendingCategory};
