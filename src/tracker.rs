// 💰 Expense Tracker - Category management, expense recording, reporting
//
// Owns the single SQLite connection for the life of the process.
// Every mutation is one auto-committed statement; a failed call leaves no partial write.

use chrono::NaiveDate;
use rusqlite::Connection;
use std::cell::RefCell;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::db::{self, Category, Expense, ExpenseRow};
use crate::error::{Result, TrackerError};
use crate::reports::{AverageReport, Comparison, MonthlyReport};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ============================================================================
// TWO-PHASE CATEGORY ADD
// ============================================================================

/// A category row that exists but still awaits the caller's yes/no.
/// Consumed by `ExpenseTracker::confirm_category`, so it is decided once.
#[derive(Debug, PartialEq)]
#[must_use = "a pending category stays stored until it is confirmed or discarded"]
pub struct PendingCategory {
    id: i64,
    name: String,
}

impl PendingCategory {
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CategoryDecision {
    Kept(Category),
    /// Row removed again; holds the discarded name
    Discarded { name: String },
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct ExpenseTracker {
    conn: Connection,
    /// Ids proposed but not yet confirmed; hidden from lookups and listings
    pending: RefCell<HashSet<i64>>,
}

impl ExpenseTracker {
    /// Open the database file, creating the schema if needed
    pub fn open(path: &Path) -> Result<Self> {
        Ok(ExpenseTracker {
            conn: db::open_database(path)?,
            pending: RefCell::new(HashSet::new()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        db::setup_database(&conn)?;
        Ok(ExpenseTracker {
            conn,
            pending: RefCell::new(HashSet::new()),
        })
    }

    /// Release the connection, surfacing any error SQLite reports on close
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| TrackerError::from(e))?;
        debug!("database closed");
        Ok(())
    }

    // ========================================================================
    // CATEGORY MANAGER
    // ========================================================================

    /// Store a category tentatively. Fails with DuplicateCategory if the
    /// name is already taken (case-insensitive), leaving the store untouched.
    pub fn propose_category(&self, name: &str) -> Result<PendingCategory> {
        let name = normalize_category_name(name)?;

        match db::insert_category(&self.conn, &name)? {
            Some(id) => {
                self.pending.borrow_mut().insert(id);
                debug!(id, name = %name, "category proposed");
                Ok(PendingCategory { id, name })
            }
            None => {
                warn!(name = %name, "duplicate category rejected");
                Err(TrackerError::DuplicateCategory { name })
            }
        }
    }

    /// Make a proposed category permanent, or delete it again
    pub fn confirm_category(
        &self,
        pending: PendingCategory,
        approve: bool,
    ) -> Result<CategoryDecision> {
        let PendingCategory { id, name } = pending;
        self.pending.borrow_mut().remove(&id);

        if approve {
            info!(id, name = %name, "category added");
            return Ok(CategoryDecision::Kept(Category { id, name }));
        }

        if !db::delete_category(&self.conn, id)? {
            warn!(id, name = %name, "discarded category was already gone");
        }
        info!(id, name = %name, "category discarded");
        Ok(CategoryDecision::Discarded { name })
    }

    /// Propose then immediately decide using `confirm`
    pub fn add_category<F>(&self, name: &str, confirm: F) -> Result<CategoryDecision>
    where
        F: FnOnce(&PendingCategory) -> bool,
    {
        let pending = self.propose_category(name)?;
        let approve = confirm(&pending);
        self.confirm_category(pending, approve)
    }

    /// Confirmed categories only; a pending one is reported as not found
    pub fn get_category_id(&self, name: &str) -> Result<i64> {
        let normalized = name.trim().to_lowercase();
        db::find_category_id(&self.conn, &normalized)?
            .filter(|id| !self.pending.borrow().contains(id))
            .ok_or_else(|| TrackerError::category_not_found(name.trim()))
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let pending = self.pending.borrow();
        Ok(db::get_all_categories(&self.conn)?
            .into_iter()
            .filter(|c| !pending.contains(&c.id))
            .collect())
    }

    // ========================================================================
    // EXPENSE RECORDER
    // ========================================================================

    /// Record an expense from raw user input.
    /// The category is resolved before amount and date are parsed.
    pub fn add_expense(&self, category: &str, amount: &str, date: &str) -> Result<Expense> {
        let category_id = self.get_category_id(category)?;
        let amount = parse_amount(amount)?;
        let date = parse_date(date)?;
        self.insert_expense(category, category_id, amount, date)
    }

    pub fn record_expense(&self, category: &str, amount: f64, date: NaiveDate) -> Result<Expense> {
        let category_id = self.get_category_id(category)?;
        if !amount.is_finite() {
            return Err(TrackerError::invalid_format("amount", amount.to_string()));
        }
        self.insert_expense(category, category_id, amount, date)
    }

    fn insert_expense(
        &self,
        category: &str,
        category_id: i64,
        amount: f64,
        date: NaiveDate,
    ) -> Result<Expense> {
        let expense = db::insert_expense(&self.conn, category_id, amount, date)?;
        info!(
            id = expense.id,
            category = category.trim(),
            amount,
            date = %date,
            "expense recorded"
        );
        Ok(expense)
    }

    pub fn expense_count(&self) -> Result<i64> {
        db::count_expenses(&self.conn)
    }

    pub fn expense_rows(&self) -> Result<Vec<ExpenseRow>> {
        db::get_expense_rows(&self.conn)
    }

    // ========================================================================
    // REPORTING ENGINE
    // ========================================================================

    /// Per-category totals and percentage share for one month
    pub fn monthly_expenses(&self, month: &str, year: &str) -> Result<MonthlyReport> {
        let (month, year) = normalize_period(month, year)?;
        let totals = db::monthly_category_totals(&self.conn, &month, &year)?;

        if totals.is_empty() {
            return Err(TrackerError::EmptyReport {
                scope: format!("{}/{}", month, year),
            });
        }

        Ok(MonthlyReport::from_totals(&month, &year, totals))
    }

    /// All-time mean amount per category
    pub fn average_expenses(&self) -> Result<AverageReport> {
        let averages = db::category_averages(&self.conn)?;

        if averages.is_empty() {
            return Err(TrackerError::EmptyReport {
                scope: "any category".to_string(),
            });
        }

        Ok(AverageReport::from_averages(averages))
    }

    /// Compare a month's total with the year's total divided by the number
    /// of distinct dates that have an expense that year.
    pub fn compare_monthly_to_average(&self, month: &str, year: &str) -> Result<Comparison> {
        let (month, year) = normalize_period(month, year)?;

        let (count, monthly_total) = db::month_summary(&self.conn, &month, &year)?;
        if count == 0 {
            return Err(TrackerError::EmptyReport {
                scope: format!("{}/{}", month, year),
            });
        }

        let (year_total, active_days) = db::year_total_and_active_days(&self.conn, &year)?;
        let average = if active_days > 0 {
            year_total / active_days as f64
        } else {
            0.0
        };

        debug!(monthly_total, year_total, active_days, average, "comparison inputs");
        Ok(Comparison::new(&month, &year, monthly_total, average))
    }
}

// ============================================================================
// INPUT PARSING
// ============================================================================

fn normalize_category_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::invalid_format("category name", name));
    }
    Ok(trimmed.to_lowercase())
}

/// Any finite real number; the sign is not checked
pub fn parse_amount(input: &str) -> Result<f64> {
    match input.trim().parse::<f64>() {
        Ok(amount) if amount.is_finite() => Ok(amount),
        _ => Err(TrackerError::invalid_format("amount", input.trim())),
    }
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .map_err(|_| TrackerError::invalid_format("date", input.trim()))
}

/// Month as two digits ("1" and "01" both become "01"), year as four
pub fn normalize_period(month: &str, year: &str) -> Result<(String, String)> {
    let m = month
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|m| (1..=12).contains(m))
        .ok_or_else(|| TrackerError::invalid_format("month", month.trim()))?;

    let y = year.trim();
    if y.len() != 4 || !y.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TrackerError::invalid_format("year", y));
    }

    Ok((format!("{:02}", m), y.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_with(categories: &[&str]) -> ExpenseTracker {
        let tracker = ExpenseTracker::open_in_memory().unwrap();
        for name in categories {
            tracker.add_category(name, |_| true).unwrap();
        }
        tracker
    }

    /// food/50/2024-01-05, transport/30/2024-01-10, food/20/2024-02-01
    fn scenario_tracker() -> ExpenseTracker {
        let tracker = tracker_with(&["food", "transport"]);
        tracker.add_expense("food", "50", "2024-01-05").unwrap();
        tracker.add_expense("transport", "30", "2024-01-10").unwrap();
        tracker.add_expense("food", "20", "2024-02-01").unwrap();
        tracker
    }

    // ------------------------------------------------------------------------
    // Categories
    // ------------------------------------------------------------------------

    #[test]
    fn test_duplicate_category_case_insensitive() {
        for name in ["food", "Groceries", "café", "x"] {
            let tracker = tracker_with(&[name]);

            let result = tracker.add_category(&name.to_uppercase(), |_| true);

            assert!(
                matches!(result, Err(TrackerError::DuplicateCategory { .. })),
                "{} should be a duplicate",
                name.to_uppercase()
            );
            assert_eq!(tracker.list_categories().unwrap().len(), 1);
        }
    }

    #[test]
    fn test_duplicate_does_not_ask_for_confirmation() {
        let tracker = tracker_with(&["food"]);
        let mut asked = false;

        let result = tracker.add_category("FOOD", |_| {
            asked = true;
            true
        });

        assert!(result.is_err());
        assert!(!asked);
    }

    #[test]
    fn test_rejected_confirmation_restores_state() {
        let tracker = tracker_with(&["food", "rent"]);
        let before = tracker.list_categories().unwrap();

        let decision = tracker.add_category("Travel", |_| false).unwrap();

        assert_eq!(
            decision,
            CategoryDecision::Discarded {
                name: "travel".to_string()
            }
        );
        assert_eq!(tracker.list_categories().unwrap(), before);

        // Name is free again
        assert!(tracker.add_category("travel", |_| true).is_ok());
    }

    #[test]
    fn test_two_phase_api() {
        let tracker = tracker_with(&[]);

        let pending = tracker.propose_category("  Utilities ").unwrap();
        assert_eq!(pending.name(), "utilities");

        // Not usable until confirmed
        assert!(matches!(
            tracker.get_category_id("utilities"),
            Err(TrackerError::CategoryNotFound { .. })
        ));
        assert!(tracker.list_categories().unwrap().is_empty());

        let id = pending.id();
        let decision = tracker.confirm_category(pending, true).unwrap();
        assert_eq!(
            decision,
            CategoryDecision::Kept(Category {
                id,
                name: "utilities".to_string()
            })
        );
        assert_eq!(tracker.get_category_id("UTILITIES").unwrap(), id);
    }

    #[test]
    fn test_pending_category_rejects_expenses_then_discards_cleanly() {
        let tracker = tracker_with(&["food"]);
        let before = tracker.list_categories().unwrap();

        let pending = tracker.propose_category("gifts").unwrap();
        let result = tracker.add_expense("gifts", "10", "2024-01-01");
        assert!(matches!(result, Err(TrackerError::CategoryNotFound { .. })));

        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(tracker.record_expense("gifts", 10.0, date).is_err());
        assert_eq!(tracker.expense_count().unwrap(), 0);

        let decision = tracker.confirm_category(pending, false).unwrap();
        assert_eq!(
            decision,
            CategoryDecision::Discarded {
                name: "gifts".to_string()
            }
        );
        assert_eq!(tracker.list_categories().unwrap(), before);
        assert_eq!(db::count_categories(&tracker.conn).unwrap(), 1);
    }

    #[test]
    fn test_blank_category_name_rejected() {
        let tracker = tracker_with(&[]);
        let result = tracker.propose_category("   ");
        assert!(matches!(result, Err(TrackerError::InvalidFormat { .. })));
    }

    #[test]
    fn test_get_category_id_not_found() {
        let tracker = tracker_with(&["food"]);
        let result = tracker.get_category_id("rent");
        assert!(matches!(
            result,
            Err(TrackerError::CategoryNotFound { ref name }) if name == "rent"
        ));
    }

    // ------------------------------------------------------------------------
    // Expenses
    // ------------------------------------------------------------------------

    #[test]
    fn test_expense_unknown_category_writes_nothing() {
        let tracker = scenario_tracker();
        let before = tracker.expense_count().unwrap();

        let result = tracker.add_expense("entertainment", "12.00", "2024-01-01");

        assert!(matches!(result, Err(TrackerError::CategoryNotFound { .. })));
        assert_eq!(tracker.expense_count().unwrap(), before);
    }

    #[test]
    fn test_expense_invalid_format() {
        let tracker = tracker_with(&["food"]);

        for (amount, date) in [
            ("abc", "2024-01-01"),
            ("NaN", "2024-01-01"),
            ("inf", "2024-01-01"),
            ("10", "01/05/2024"),
            ("10", "2024-02-30"),
            ("10", ""),
        ] {
            let result = tracker.add_expense("food", amount, date);
            assert!(
                matches!(result, Err(TrackerError::InvalidFormat { .. })),
                "{} / {} should be rejected",
                amount,
                date
            );
        }
        assert_eq!(tracker.expense_count().unwrap(), 0);
    }

    #[test]
    fn test_unknown_category_reported_before_bad_amount() {
        let tracker = tracker_with(&[]);
        let result = tracker.add_expense("food", "abc", "nope");
        assert!(matches!(result, Err(TrackerError::CategoryNotFound { .. })));
    }

    #[test]
    fn test_negative_and_zero_amounts_accepted() {
        let tracker = tracker_with(&["refunds"]);
        tracker.add_expense("refunds", "-15.50", "2024-01-01").unwrap();
        tracker.add_expense("refunds", "0", "2024-01-02").unwrap();
        assert_eq!(tracker.expense_count().unwrap(), 2);
    }

    #[test]
    fn test_record_expense_typed() {
        let tracker = tracker_with(&["food"]);
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();

        let expense = tracker.record_expense("Food", 9.99, date).unwrap();

        assert_eq!(expense.amount, 9.99);
        assert_eq!(expense.date, date);
        assert!(tracker.record_expense("food", f64::NAN, date).is_err());
        assert_eq!(tracker.expense_count().unwrap(), 1);
    }

    // ------------------------------------------------------------------------
    // Reports
    // ------------------------------------------------------------------------

    #[test]
    fn test_monthly_scenario() {
        let tracker = scenario_tracker();

        let report = tracker.monthly_expenses("01", "2024").unwrap();

        assert_eq!(report.total, 80.0);
        assert_eq!(report.categories.len(), 2);

        let food = report.share_of("food").unwrap();
        assert_eq!(food.total, 50.0);
        assert!((food.percentage - 62.5).abs() < 1e-9);

        let transport = report.share_of("transport").unwrap();
        assert_eq!(transport.total, 30.0);
        assert!((transport.percentage - 37.5).abs() < 1e-9);
    }

    #[test]
    fn test_monthly_accepts_unpadded_month() {
        let tracker = scenario_tracker();
        let report = tracker.monthly_expenses("1", "2024").unwrap();
        assert_eq!(report.month, "01");
        assert_eq!(report.total, 80.0);
    }

    #[test]
    fn test_monthly_percentages_sum_to_hundred() {
        let tracker = tracker_with(&["a", "b", "c"]);
        for (cat, amount, date) in [
            ("a", "13.37", "2024-07-01"),
            ("b", "0.01", "2024-07-15"),
            ("c", "999.99", "2024-07-31"),
            ("a", "7.77", "2024-07-31"),
        ] {
            tracker.add_expense(cat, amount, date).unwrap();
        }

        let report = tracker.monthly_expenses("07", "2024").unwrap();
        let sum: f64 = report.categories.iter().map(|c| c.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_monthly_empty() {
        let tracker = scenario_tracker();
        let result = tracker.monthly_expenses("03", "2024");
        assert!(matches!(result, Err(TrackerError::EmptyReport { ref scope }) if scope == "03/2024"));
    }

    #[test]
    fn test_invalid_period() {
        let tracker = scenario_tracker();
        for (month, year) in [("13", "2024"), ("0", "2024"), ("jan", "2024"), ("01", "24")] {
            assert!(matches!(
                tracker.monthly_expenses(month, year),
                Err(TrackerError::InvalidFormat { .. })
            ));
        }
    }

    #[test]
    fn test_average_scenario() {
        let tracker = scenario_tracker();
        let report = tracker.average_expenses().unwrap();
        assert_eq!(report.average_of("food"), Some(35.0));
        assert_eq!(report.average_of("transport"), Some(30.0));
    }

    #[test]
    fn test_average_of_ten_twenty_thirty() {
        let tracker = tracker_with(&["books"]);
        for amount in ["10", "20", "30"] {
            tracker.add_expense("books", amount, "2023-11-11").unwrap();
        }

        let report = tracker.average_expenses().unwrap();
        assert_eq!(format!("{:.2}", report.average_of("books").unwrap()), "20.00");
    }

    #[test]
    fn test_average_empty() {
        let tracker = tracker_with(&["food"]);
        assert!(matches!(
            tracker.average_expenses(),
            Err(TrackerError::EmptyReport { .. })
        ));
    }

    #[test]
    fn test_compare_uses_distinct_days() {
        let tracker = scenario_tracker();

        // 2024 total 100 over 3 distinct dates
        let comparison = tracker.compare_monthly_to_average("01", "2024").unwrap();

        assert_eq!(comparison.monthly_total, 80.0);
        assert!((comparison.average - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(comparison.outcome, crate::reports::Outcome::Above);
    }

    #[test]
    fn test_compare_same_day_expenses() {
        let tracker = tracker_with(&["food"]);
        tracker.add_expense("food", "10", "2024-05-05").unwrap();
        tracker.add_expense("food", "30", "2024-05-05").unwrap();

        // One distinct date: average equals the month total
        let comparison = tracker.compare_monthly_to_average("05", "2024").unwrap();
        assert_eq!(comparison.average, 40.0);
        assert_eq!(comparison.outcome, crate::reports::Outcome::Equal);
    }

    #[test]
    fn test_compare_empty_month() {
        let tracker = scenario_tracker();
        let result = tracker.compare_monthly_to_average("12", "2024");
        assert!(matches!(result, Err(TrackerError::EmptyReport { .. })));
    }

    #[test]
    fn test_tracker_usable_after_errors() {
        let tracker = scenario_tracker();

        assert!(tracker.add_category("FOOD", |_| true).is_err());
        assert!(tracker.add_expense("nope", "1", "2024-01-01").is_err());
        assert!(tracker.monthly_expenses("06", "2024").is_err());

        tracker.add_expense("food", "5", "2024-06-01").unwrap();
        assert_eq!(tracker.monthly_expenses("06", "2024").unwrap().total, 5.0);
    }

    #[test]
    fn test_reopen_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("expenses.db");

        let tracker = ExpenseTracker::open(&path).unwrap();
        tracker.add_category("food", |_| true).unwrap();
        tracker.add_expense("food", "12.5", "2024-01-01").unwrap();
        tracker.close().unwrap();

        let tracker = ExpenseTracker::open(&path).unwrap();
        assert_eq!(tracker.expense_count().unwrap(), 1);
        assert_eq!(tracker.list_categories().unwrap()[0].name, "food");
        tracker.close().unwrap();
    }

    // ------------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------------

    use proptest::prelude::*;
    use std::collections::BTreeSet;

    /// Category names as a user would type them (mixed case, padded)
    fn name_strategy() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9_-]{0,15}( {0,2})"
    }

    fn lowercase_name_strategy() -> impl Strategy<Value = String> {
        "[a-z][a-z0-9]{0,11}"
    }

    /// (category index, amount in cents, day of month)
    fn expense_strategy() -> impl Strategy<Value = (usize, i64, u32)> {
        (0usize..4, 1i64..1_000_000, 1u32..=28)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_uppercase_name_is_duplicate(name in name_strategy()) {
            let tracker = tracker_with(&[name.as_str()]);

            let result = tracker.add_category(&name.to_uppercase(), |_| true);

            prop_assert!(
                matches!(result, Err(TrackerError::DuplicateCategory { .. })),
                "expected duplicate for {:?}",
                name
            );
            prop_assert_eq!(tracker.list_categories().unwrap().len(), 1);
        }

        #[test]
        fn prop_monthly_percentages_sum_to_hundred(
            expenses in prop::collection::vec(expense_strategy(), 1..30),
        ) {
            let names = ["food", "rent", "travel", "misc"];
            let tracker = tracker_with(&names);

            for (idx, cents, day) in &expenses {
                let date = NaiveDate::from_ymd_opt(2024, 9, *day).unwrap();
                tracker
                    .record_expense(names[*idx], *cents as f64 / 100.0, date)
                    .unwrap();
            }

            let report = tracker.monthly_expenses("09", "2024").unwrap();
            let sum: f64 = report.categories.iter().map(|c| c.percentage).sum();
            prop_assert!((sum - 100.0).abs() < 1e-6, "percentages summed to {}", sum);
        }

        #[test]
        fn prop_rejected_add_leaves_categories_unchanged(
            existing in prop::collection::btree_set(lowercase_name_strategy(), 0..6),
            candidate in lowercase_name_strategy(),
        ) {
            prop_assume!(!existing.contains(&candidate));

            let names: Vec<&str> = existing.iter().map(String::as_str).collect();
            let tracker = tracker_with(&names);
            let before = tracker.list_categories().unwrap();

            tracker.add_category(&candidate, |_| false).unwrap();

            prop_assert_eq!(tracker.list_categories().unwrap(), before);
            let stored: BTreeSet<String> = db::get_all_categories(&tracker.conn)
                .unwrap()
                .into_iter()
                .map(|c| c.name)
                .collect();
            prop_assert_eq!(stored, existing);
        }
    }
}
