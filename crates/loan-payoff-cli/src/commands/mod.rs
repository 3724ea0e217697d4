pub mod loan;
pub mod summary;

use chrono::{Local, NaiveDate};
use loan_payoff_core::dates::{default_graduation_date, format_iso, parse_date};
use loan_payoff_core::validation::LoanSubmission;

/// Fill in the caller-side defaults: today from the local clock, graduation
/// on June 1 of today's year.
pub fn apply_date_defaults(submission: &mut LoanSubmission) {
    let clock_today = Local::now().date_naive();
    if submission.today.is_none() {
        submission.today = Some(format_iso(clock_today));
    }
    if submission.graduation_date.is_none() {
        let today: NaiveDate = submission
            .today
            .as_deref()
            .and_then(parse_date)
            .unwrap_or(clock_today);
        submission.graduation_date = Some(format_iso(default_graduation_date(today)));
    }
}
