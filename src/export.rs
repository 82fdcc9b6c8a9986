// 📤 CSV Export - One row per expense, joined to its category name
// Columns: id, category, amount, date (header row included)

use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::tracker::ExpenseTracker;

/// Write every expense as CSV. Returns the number of data rows.
pub fn export_csv<W: Write>(tracker: &ExpenseTracker, writer: W) -> Result<usize> {
    let rows = tracker.expense_rows()?;

    let mut wtr = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        // serialize() only emits the header alongside the first record
        wtr.write_record(["id", "category", "amount", "date"])?;
    }
    for row in &rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    Ok(rows.len())
}

/// Overwrite `path` with the current export
pub fn export_csv_to_path(tracker: &ExpenseTracker, path: &Path) -> Result<usize> {
    let file = File::create(path)?;
    let count = export_csv(tracker, file)?;
    info!(path = %path.display(), rows = count, "expenses exported");
    Ok(count)
}
