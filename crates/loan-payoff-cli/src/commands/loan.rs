use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use loan_payoff_core::summary::loan::{calculate_loan_schedule, calculate_loan_summary, LoanRequest};
use loan_payoff_core::validation::{LoanSubmission, RawLoanEntry};

use crate::commands::apply_date_defaults;
use crate::input;

/// Loan fields shared by `loan` and `schedule`
#[derive(Args)]
pub struct LoanFlags {
    /// Path to a JSON or YAML submission holding exactly one loan (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Current principal balance
    #[arg(long)]
    pub balance: Option<Decimal>,

    /// Annual percentage rate as a percentage (e.g. 5.5)
    #[arg(long)]
    pub apr: Option<Decimal>,

    /// Repayment term in years
    #[arg(long)]
    pub term_years: Option<Decimal>,

    /// Months of grace after graduation before payments begin
    #[arg(long, default_value_t = 6, allow_hyphen_values = true)]
    pub grace_months: i64,

    /// Disbursement date (YYYY-MM-DD)
    #[arg(long)]
    pub origination_date: Option<String>,

    /// Graduation date (YYYY-MM-DD); defaults to June 1 of this year
    #[arg(long)]
    pub graduation_date: Option<String>,

    /// Today's date (YYYY-MM-DD); defaults to the local clock
    #[arg(long)]
    pub today: Option<String>,

    /// Subsidized loans accrue no interest before graduation
    #[arg(long)]
    pub subsidized: bool,
}

/// Arguments for a single-loan summary
#[derive(Args)]
pub struct LoanArgs {
    #[command(flatten)]
    pub loan: LoanFlags,
}

/// Arguments for a single-loan amortization schedule
#[derive(Args)]
pub struct ScheduleArgs {
    #[command(flatten)]
    pub loan: LoanFlags,
}

fn loan_request(flags: LoanFlags) -> Result<LoanRequest, Box<dyn std::error::Error>> {
    let mut submission: LoanSubmission = if let Some(ref path) = flags.input {
        input::file::read_input(path)?
    } else if let Some(submission) = input::stdin::read_stdin()? {
        submission
    } else {
        let balance = flags
            .balance
            .ok_or("--balance is required (or provide --input)")?;
        let apr = flags.apr.ok_or("--apr is required (or provide --input)")?;
        let term_years = flags
            .term_years
            .ok_or("--term-years is required (or provide --input)")?;
        let origination_date = flags
            .origination_date
            .ok_or("--origination-date is required (or provide --input)")?;

        LoanSubmission {
            today: flags.today,
            graduation_date: flags.graduation_date,
            loans: vec![RawLoanEntry {
                balance: Some(balance),
                apr: Some(apr),
                term_years: Some(term_years),
                grace_months: Some(flags.grace_months),
                origination_date: Some(origination_date),
                subsidized: flags.subsidized,
            }],
        }
    };

    if submission.loans.len() != 1 {
        return Err(format!(
            "expected exactly one loan, found {}",
            submission.loans.len()
        )
        .into());
    }
    apply_date_defaults(&mut submission);

    let mut request = submission.into_request()?;
    let loan = request.loans.remove(0);
    Ok(LoanRequest {
        graduation_date: request.graduation_date,
        loan,
    })
}

pub fn run_loan(args: LoanArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = loan_request(args.loan)?;
    let result = calculate_loan_summary(&request)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = loan_request(args.loan)?;
    let result = calculate_loan_schedule(&request)?;
    Ok(serde_json::to_value(result)?)
}
