// 📊 Reports - Monthly breakdown, per-category averages, month vs. yearly average
//
// Values here are plain data computed from query results.
// Display renders the terminal layout; Serialize backs --json output.

use serde::Serialize;
use std::fmt;

// ============================================================================
// MONTHLY REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub total: f64,
    /// Share of the month's total, 0-100
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyReport {
    pub month: String,
    pub year: String,
    pub categories: Vec<CategoryShare>,
    pub total: f64,
}

impl MonthlyReport {
    /// Build from per-category sums. Callers guarantee at least one row,
    /// so the total is only zero when every amount nets to zero.
    pub fn from_totals(month: &str, year: &str, totals: Vec<(String, f64)>) -> Self {
        let total: f64 = totals.iter().map(|(_, sum)| sum).sum();

        let categories = totals
            .into_iter()
            .map(|(category, sum)| CategoryShare {
                percentage: if total == 0.0 { 0.0 } else { sum / total * 100.0 },
                category,
                total: sum,
            })
            .collect();

        MonthlyReport {
            month: month.to_string(),
            year: year.to_string(),
            categories,
            total,
        }
    }

    pub fn share_of(&self, category: &str) -> Option<&CategoryShare> {
        self.categories.iter().find(|c| c.category == category)
    }
}

impl fmt::Display for MonthlyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Monthly Expenses for {}/{}:", self.month, self.year)?;
        for share in &self.categories {
            writeln!(
                f,
                "{:<15} ${:>10.2} ({:>5.1}%)",
                share.category, share.total, share.percentage
            )?;
        }
        writeln!(f)?;
        write!(f, "Total Monthly Expense: ${:.2}", self.total)
    }
}

// ============================================================================
// AVERAGE REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAverage {
    pub category: String,
    pub average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AverageReport {
    pub categories: Vec<CategoryAverage>,
}

impl AverageReport {
    pub fn from_averages(averages: Vec<(String, f64)>) -> Self {
        AverageReport {
            categories: averages
                .into_iter()
                .map(|(category, average)| CategoryAverage { category, average })
                .collect(),
        }
    }

    pub fn average_of(&self, category: &str) -> Option<f64> {
        self.categories
            .iter()
            .find(|c| c.category == category)
            .map(|c| c.average)
    }
}

impl fmt::Display for AverageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Average Monthly Expenses for Each Category:")?;
        for avg in &self.categories {
            write!(f, "\n{:<15} ${:>10.2}", avg.category, avg.average)?;
        }
        Ok(())
    }
}

// ============================================================================
// COMPARISON
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Above,
    Below,
    Equal,
}

/// Month total against the year's total per distinct expense date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub month: String,
    pub year: String,
    pub monthly_total: f64,
    pub average: f64,
    /// monthly_total - average
    pub difference: f64,
    pub outcome: Outcome,
}

impl Comparison {
    pub fn new(month: &str, year: &str, monthly_total: f64, average: f64) -> Self {
        let difference = monthly_total - average;
        let outcome = if difference > 0.0 {
            Outcome::Above
        } else if difference < 0.0 {
            Outcome::Below
        } else {
            Outcome::Equal
        };

        Comparison {
            month: month.to_string(),
            year: year.to_string(),
            monthly_total,
            average,
            difference,
            outcome,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.outcome {
            Outcome::Above => write!(
                f,
                "You spent {:.2} more than the monthly average of {:.2} for {}",
                self.difference, self.average, self.year
            ),
            Outcome::Below => write!(
                f,
                "You spent {:.2} less than the monthly average of {:.2} for {}",
                self.difference.abs(),
                self.average,
                self.year
            ),
            Outcome::Equal => write!(f, "You spent exactly the monthly average for {}", self.year),
        }
    }
}
