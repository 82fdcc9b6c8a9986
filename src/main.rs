use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fmt::Display;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use expense_tracker::config::{Config, DEFAULT_DB_PATH, DEFAULT_EXPORT_PATH, DEFAULT_LOG_FILTER};
use expense_tracker::{export_csv_to_path, CategoryDecision, ExpenseTracker, Menu};

#[derive(Parser)]
#[command(
    name = "expense-tracker",
    version,
    about = "Record categorized expenses and report on them"
)]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "EXPENSE_TRACKER_DB", default_value = DEFAULT_DB_PATH)]
    db: PathBuf,

    /// CSV file rewritten after each expense added from the menu
    #[arg(long, global = true, env = "EXPENSE_TRACKER_CSV", default_value = DEFAULT_EXPORT_PATH)]
    export: PathBuf,

    /// Without a subcommand the interactive menu starts
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Category management
    #[command(subcommand)]
    Category(CategoryCommands),

    /// Expense recording
    #[command(subcommand)]
    Expense(ExpenseCommands),

    /// Reports
    #[command(subcommand)]
    Report(ReportCommands),

    /// Write all expenses as CSV
    Export {
        /// Output file (defaults to --export)
        path: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// Add a category; asks for confirmation unless --yes
    Add {
        name: String,
        #[arg(short, long)]
        yes: bool,
    },
    /// List categories
    List,
}

#[derive(Subcommand)]
enum ExpenseCommands {
    /// Add an expense
    Add {
        /// Category name
        category: String,
        /// Amount (any real number)
        #[arg(allow_negative_numbers = true)]
        amount: String,
        /// Date (YYYY-MM-DD)
        date: String,
    },
}

#[derive(Subcommand)]
enum ReportCommands {
    /// Per-category totals and shares for one month
    Monthly {
        month: String,
        year: String,
        #[arg(long)]
        json: bool,
    },
    /// Mean amount per category over all time
    Average {
        #[arg(long)]
        json: bool,
    },
    /// Month total against the year's per-day average
    Compare {
        month: String,
        year: String,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so report output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(io::stderr)
        .init();

    let config = Config::new(cli.db, cli.export);

    // Connection lives exactly as long as this scope and is closed explicitly
    let tracker = ExpenseTracker::open(&config.db_path)
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;

    let outcome = match cli.command {
        None => run_menu(&tracker, &config),
        Some(command) => run_command(&tracker, &config, command),
    };

    tracker.close().context("Failed to close database")?;
    outcome
}

fn run_menu(tracker: &ExpenseTracker, config: &Config) -> Result<()> {
    let stdin = io::stdin();
    let mut menu = Menu::new(tracker, config, stdin.lock(), io::stdout());
    menu.run().context("Terminal I/O failed")?;
    Ok(())
}

fn run_command(tracker: &ExpenseTracker, config: &Config, command: Commands) -> Result<()> {
    match command {
        Commands::Category(CategoryCommands::Add { name, yes }) => {
            let decision = tracker.add_category(&name, |pending| {
                yes || confirm(&format!(
                    "Category '{}' added successfully! Do you want to confirm (y/n)? ",
                    pending.name()
                ))
            })?;
            match decision {
                CategoryDecision::Kept(category) => println!("Category '{}' added.", category.name),
                CategoryDecision::Discarded { name } => println!("Category '{}' removed.", name),
            }
        }
        Commands::Category(CategoryCommands::List) => {
            for category in tracker.list_categories()? {
                println!("{:>4}  {}", category.id, category.name);
            }
        }
        Commands::Expense(ExpenseCommands::Add {
            category,
            amount,
            date,
        }) => {
            let expense = tracker.add_expense(&category, &amount, &date)?;
            println!(
                "${:.2} expense for '{}' on {} added successfully!",
                expense.amount,
                category.trim(),
                expense.date
            );
        }
        Commands::Report(ReportCommands::Monthly { month, year, json }) => {
            print_report(&tracker.monthly_expenses(&month, &year)?, json)?;
        }
        Commands::Report(ReportCommands::Average { json }) => {
            print_report(&tracker.average_expenses()?, json)?;
        }
        Commands::Report(ReportCommands::Compare { month, year, json }) => {
            print_report(&tracker.compare_monthly_to_average(&month, &year)?, json)?;
        }
        Commands::Export { path } => {
            let path = path.unwrap_or_else(|| config.export_path.clone());
            let count = export_csv_to_path(tracker, &path)?;
            println!("Expenses saved to {}! ({} rows)", path.display(), count);
        }
    }

    Ok(())
}

fn print_report<T: Display + Serialize>(report: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", report);
    }
    Ok(())
}

/// Ask a yes/no question on stdin; anything but "y" is a no
fn confirm(question: &str) -> bool {
    use std::io::Write;

    print!("{}", question);
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().read_line(&mut answer) {
        Ok(_) => answer.trim().eq_ignore_ascii_case("y"),
        Err(_) => false,
    }
}
