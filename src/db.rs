use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::Result;

/// A user-defined expense label. Names are unique case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A single dated amount attributed to one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub category_id: i64,
    pub amount: f64,
    pub date: NaiveDate,
}

/// Expense joined to its category name (export + listing shape)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseRow {
    pub id: i64,
    pub category: String,
    pub amount: f64,
    pub date: NaiveDate,
}

/// Open (or create) the database file and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    setup_database(&conn)?;
    debug!(path = %path.display(), "database opened");
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery (in-memory databases keep "memory")
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // SQLite leaves REFERENCES unenforced unless asked, per connection
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Schema (kept exactly as existing databases have it)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY,
            name TEXT UNIQUE COLLATE NOCASE NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS expenses (
            id INTEGER PRIMARY KEY,
            category_id INTEGER NOT NULL REFERENCES categories(id),
            amount REAL NOT NULL,
            date DATE NOT NULL
        )",
        [],
    )?;

    Ok(())
}

// ============================================================================
// CATEGORIES
// ============================================================================

/// Insert a category unless the name is taken.
/// Returns the new row id, or None when a case-insensitive match already exists.
pub fn insert_category(conn: &Connection, name: &str) -> Result<Option<i64>> {
    let result = conn.execute("INSERT INTO categories (name) VALUES (?1)", params![name]);

    match result {
        Ok(_) => Ok(Some(conn.last_insert_rowid())),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

/// Delete a category by id. Returns whether a row was removed.
pub fn delete_category(conn: &Connection, id: i64) -> Result<bool> {
    let removed = conn.execute("DELETE FROM categories WHERE id = ?1", params![id])?;
    Ok(removed > 0)
}

/// Look up a category id by name (the column collation makes this case-insensitive)
pub fn find_category_id(conn: &Connection, name: &str) -> Result<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM categories WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

pub fn get_all_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name")?;

    let categories = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(categories)
}

pub fn count_categories(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
    Ok(count)
}

// ============================================================================
// EXPENSES
// ============================================================================

pub fn insert_expense(
    conn: &Connection,
    category_id: i64,
    amount: f64,
    date: NaiveDate,
) -> Result<Expense> {
    conn.execute(
        "INSERT INTO expenses (category_id, amount, date) VALUES (?1, ?2, ?3)",
        params![category_id, amount, date],
    )?;

    Ok(Expense {
        id: conn.last_insert_rowid(),
        category_id,
        amount,
        date,
    })
}

pub fn count_expenses(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM expenses", [], |row| row.get(0))?;
    Ok(count)
}

/// All expenses joined to their category name, in insertion order
pub fn get_expense_rows(conn: &Connection) -> Result<Vec<ExpenseRow>> {
    let mut stmt = conn.prepare(
        "SELECT expenses.id, categories.name, expenses.amount, expenses.date
         FROM expenses INNER JOIN categories
         ON expenses.category_id = categories.id
         ORDER BY expenses.id",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(ExpenseRow {
                id: row.get(0)?,
                category: row.get(1)?,
                amount: row.get(2)?,
                date: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

// ============================================================================
// AGGREGATES
// month is two digits ("01"), year four ("2024"), matching strftime output
// ============================================================================

/// Per-category sum of amounts for one month
pub fn monthly_category_totals(
    conn: &Connection,
    month: &str,
    year: &str,
) -> Result<Vec<(String, f64)>> {
    let mut stmt = conn.prepare(
        "SELECT categories.name, SUM(expenses.amount)
         FROM expenses INNER JOIN categories
         ON expenses.category_id = categories.id
         WHERE strftime('%m', expenses.date) = ?1 AND strftime('%Y', expenses.date) = ?2
         GROUP BY categories.id
         ORDER BY categories.name",
    )?;

    let totals = stmt
        .query_map(params![month, year], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    debug!(month, year, groups = totals.len(), "monthly totals");
    Ok(totals)
}

/// Per-category mean amount over all time
pub fn category_averages(conn: &Connection) -> Result<Vec<(String, f64)>> {
    let mut stmt = conn.prepare(
        "SELECT categories.name, AVG(expenses.amount)
         FROM expenses INNER JOIN categories
         ON expenses.category_id = categories.id
         GROUP BY categories.id
         ORDER BY categories.name",
    )?;

    let averages = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(averages)
}

/// Number of expenses and their total for one month
pub fn month_summary(conn: &Connection, month: &str, year: &str) -> Result<(i64, f64)> {
    let summary = conn.query_row(
        "SELECT COUNT(*), TOTAL(amount) FROM expenses
         WHERE strftime('%m', date) = ?1 AND strftime('%Y', date) = ?2",
        params![month, year],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(summary)
}

/// Yearly total and the number of distinct dates that carry any expense
pub fn year_total_and_active_days(conn: &Connection, year: &str) -> Result<(f64, i64)> {
    let summary = conn.query_row(
        "SELECT TOTAL(amount), COUNT(DISTINCT date) FROM expenses
         WHERE strftime('%Y', date) = ?1",
        params![year],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(summary)
}
