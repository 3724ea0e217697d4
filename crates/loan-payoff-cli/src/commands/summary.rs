use clap::Args;
use serde_json::{json, Value};

use loan_payoff_core::summary::aggregate::calculate_repayment_summary;
use loan_payoff_core::validation::{validate_submission, LoanSubmission};

use crate::commands::apply_date_defaults;
use crate::input;

/// Arguments for the aggregate summary
#[derive(Args)]
pub struct SummaryArgs {
    /// Path to a JSON or YAML submission (today, graduation_date, loans)
    #[arg(long)]
    pub input: Option<String>,

    /// Override the submission's graduation date (YYYY-MM-DD)
    #[arg(long)]
    pub graduation_date: Option<String>,

    /// Override the submission's today date (YYYY-MM-DD)
    #[arg(long)]
    pub today: Option<String>,
}

/// Arguments for validation only
#[derive(Args)]
pub struct ValidateArgs {
    /// Path to a JSON or YAML submission
    #[arg(long)]
    pub input: Option<String>,
}

fn read_submission(path: Option<&str>) -> Result<LoanSubmission, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        input::file::read_input(path)
    } else if let Some(submission) = input::stdin::read_stdin()? {
        Ok(submission)
    } else {
        Err("--input <file> or a submission on stdin is required".into())
    }
}

pub fn run_summary(args: SummaryArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut submission = read_submission(args.input.as_deref())?;
    if args.graduation_date.is_some() {
        submission.graduation_date = args.graduation_date;
    }
    if args.today.is_some() {
        submission.today = args.today;
    }
    apply_date_defaults(&mut submission);

    if submission.loans.is_empty() {
        return Err("submission contains no loans".into());
    }

    let request = submission.into_request()?;
    let result = calculate_repayment_summary(&request)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_validate(args: ValidateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut submission = read_submission(args.input.as_deref())?;
    apply_date_defaults(&mut submission);

    let errors = validate_submission(&submission);
    Ok(json!({
        "valid": errors.is_empty(),
        "errors": errors,
    }))
}
