// 📋 Interactive Menu - Numbered choices over any line-based input/output
//
// Domain failures are printed and the loop continues.
// Only I/O failures on the terminal itself end the session.

use std::fmt::Display;
use std::io::{self, BufRead, Write};
use tracing::warn;

use crate::config::Config;
use crate::error::TrackerError;
use crate::export::export_csv_to_path;
use crate::tracker::{parse_amount, CategoryDecision, ExpenseTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    AddCategory,
    AddExpense,
    MonthlyReport,
    AverageReport,
    CompareReport,
    Quit,
}

impl Choice {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Choice::AddCategory),
            "2" => Some(Choice::AddExpense),
            "3" => Some(Choice::MonthlyReport),
            "4" => Some(Choice::AverageReport),
            "5" => Some(Choice::CompareReport),
            "6" => Some(Choice::Quit),
            _ => None,
        }
    }
}

pub struct Menu<'a, R, W> {
    tracker: &'a ExpenseTracker,
    config: &'a Config,
    input: R,
    output: W,
}

impl<'a, R: BufRead, W: Write> Menu<'a, R, W> {
    pub fn new(tracker: &'a ExpenseTracker, config: &'a Config, input: R, output: W) -> Self {
        Menu {
            tracker,
            config,
            input,
            output,
        }
    }

    /// Loop until Quit or end of input
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            writeln!(self.output)?;
            writeln!(self.output, "--------- Expense Tracker Menu ---------")?;
            writeln!(self.output, "1. Add Category")?;
            writeln!(self.output, "2. Add Expense")?;
            writeln!(self.output, "3. Monthly Expenses Report")?;
            writeln!(self.output, "4. Average Monthly Expenses Report")?;
            writeln!(self.output, "5. Compare Monthly Expense with Average")?;
            writeln!(self.output, "6. Quit")?;

            let Some(line) = self.prompt("Enter your choice (1-6): ")? else {
                writeln!(self.output)?;
                return Ok(());
            };
            writeln!(self.output)?;

            match Choice::parse(&line) {
                Some(Choice::AddCategory) => self.add_category()?,
                Some(Choice::AddExpense) => self.add_expense()?,
                Some(Choice::MonthlyReport) => self.monthly_report()?,
                Some(Choice::AverageReport) => self.average_report()?,
                Some(Choice::CompareReport) => self.compare_report()?,
                Some(Choice::Quit) => {
                    writeln!(self.output, "Exiting...")?;
                    return Ok(());
                }
                None => writeln!(self.output, "Invalid choice! Please enter a valid choice.")?,
            }
        }
    }

    // ========================================================================
    // ACTIONS
    // ========================================================================

    fn add_category(&mut self) -> io::Result<()> {
        writeln!(self.output, "----------- Add new Category -----------")?;
        let Some(name) = self.prompt("Enter category name: ")? else {
            return Ok(());
        };

        let pending = match self.tracker.propose_category(&name) {
            Ok(pending) => pending,
            Err(e) => return self.show_error(&e),
        };

        let question = format!(
            "Category '{}' added successfully! Do you want to confirm (y/n)? ",
            pending.name()
        );
        let approve = self
            .prompt(&question)?
            .is_some_and(|answer| answer.trim().eq_ignore_ascii_case("y"));

        match self.tracker.confirm_category(pending, approve) {
            Ok(CategoryDecision::Kept(_)) => writeln!(self.output, "Category added."),
            Ok(CategoryDecision::Discarded { .. }) => writeln!(self.output, "Category removed."),
            Err(e) => self.show_error(&e),
        }
    }

    fn add_expense(&mut self) -> io::Result<()> {
        writeln!(self.output, "-------------- Add Expense -------------")?;
        writeln!(self.output, "Categories:")?;

        let categories = match self.tracker.list_categories() {
            Ok(categories) => categories,
            Err(e) => return self.show_error(&e),
        };
        if categories.is_empty() {
            return writeln!(
                self.output,
                "Category doesn't exist. Please add a category first."
            );
        }
        for (i, category) in categories.iter().enumerate() {
            writeln!(self.output, "{}. {}", i + 1, category.name)?;
        }

        let question = format!("Please choose a category (1-{}): ", categories.len());
        let Some(choice) = self.prompt(&question)? else {
            return Ok(());
        };
        let Some(category) = choice
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| categories.get(i))
        else {
            return writeln!(self.output, "Invalid choice.");
        };

        let Some(amount) = self.prompt("Enter expense amount: ")? else {
            return Ok(());
        };
        if let Err(e) = parse_amount(&amount) {
            return self.show_error(&e);
        }
        let Some(date) = self.prompt("Enter the date (YYYY-MM-DD): ")? else {
            return Ok(());
        };

        let expense = match self.tracker.add_expense(&category.name, &amount, &date) {
            Ok(expense) => expense,
            Err(e) => return self.show_error(&e),
        };
        writeln!(
            self.output,
            "${:.2} expense for '{}' on {} added successfully!",
            expense.amount, category.name, expense.date
        )?;

        match export_csv_to_path(self.tracker, &self.config.export_path) {
            Ok(_) => writeln!(
                self.output,
                "Expenses saved to {}!",
                self.config.export_path.display()
            ),
            Err(e) => self.show_error(&e),
        }
    }

    fn monthly_report(&mut self) -> io::Result<()> {
        let Some((month, year)) = self.prompt_period()? else {
            return Ok(());
        };
        let result = self.tracker.monthly_expenses(&month, &year);
        self.show(result)
    }

    fn average_report(&mut self) -> io::Result<()> {
        let result = self.tracker.average_expenses();
        self.show(result)
    }

    fn compare_report(&mut self) -> io::Result<()> {
        let Some((month, year)) = self.prompt_period()? else {
            return Ok(());
        };
        let result = self.tracker.compare_monthly_to_average(&month, &year);
        self.show(result)
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    /// Print a prompt and read one line. None at end of input.
    fn prompt(&mut self, message: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", message)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn prompt_period(&mut self) -> io::Result<Option<(String, String)>> {
        let Some(month) = self.prompt("Enter month (MM): ")? else {
            return Ok(None);
        };
        let Some(year) = self.prompt("Enter year (YYYY): ")? else {
            return Ok(None);
        };
        Ok(Some((month, year)))
    }

    fn show<T: Display>(&mut self, result: crate::error::Result<T>) -> io::Result<()> {
        match result {
            Ok(report) => {
                writeln!(self.output)?;
                writeln!(self.output, "{}", report)
            }
            Err(e) => self.show_error(&e),
        }
    }

    fn show_error(&mut self, err: &TrackerError) -> io::Result<()> {
        if !err.is_user_error() {
            warn!(error = %err, "menu action failed");
        }
        writeln!(self.output, "{}", err)
    }
}
