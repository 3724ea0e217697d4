mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{fmt, EnvFilter};

use commands::loan::{LoanArgs, ScheduleArgs};
use commands::summary::{SummaryArgs, ValidateArgs};
use loan_payoff_core::LoanPayoffError;

const GENERIC_FAILURE: &str =
    "An unexpected error occurred. Please double-check your inputs and try again.";

/// Student loan repayment estimates
#[derive(Parser)]
#[command(
    name = "payoff",
    version,
    about = "Student loan repayment estimates",
    long_about = "Estimate monthly payments, capitalised interest, total cost and payoff \
                  dates for one or more student loans. Interest accrues daily until \
                  payments begin (subsidized loans pause accrual until graduation)."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log calculation details to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate repayment summary across every loan in a submission
    Summary(SummaryArgs),
    /// Repayment summary for a single loan
    Loan(LoanArgs),
    /// Month-by-month amortization schedule for a single loan
    Schedule(ScheduleArgs),
    /// Check a submission and list every field error
    Validate(ValidateArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report_error(e: &(dyn std::error::Error + 'static)) {
    match e.downcast_ref::<LoanPayoffError>() {
        Some(LoanPayoffError::Validation(errors)) => {
            for field_error in errors {
                eprintln!("{}: {}", "invalid".red().bold(), field_error);
            }
        }
        Some(invalid @ LoanPayoffError::InvalidInput { .. }) => {
            eprintln!("{}: {}", "error".red().bold(), invalid);
        }
        Some(other) => {
            tracing::debug!(error = %other, "calculation failed");
            eprintln!("{}: {}", "error".red().bold(), GENERIC_FAILURE);
        }
        None => eprintln!("{}: {}", "error".red().bold(), e),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Summary(args) => commands::summary::run_summary(args),
        Commands::Loan(args) => commands::loan::run_loan(args),
        Commands::Schedule(args) => commands::loan::run_schedule(args),
        Commands::Validate(args) => commands::summary::run_validate(args),
        Commands::Version => {
            println!("payoff {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            report_error(e.as_ref());
            process::exit(1);
        }
    }
}
