use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::dates::format_iso;
use crate::summary::loan::{compute_loan_summary, LoanInput, LoanSummary, RepaymentStatus};
use crate::types::*;
use crate::LoanPayoffResult;

/// A validated multi-loan calculation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepaymentRequest {
    /// Collected from the caller for display; the engine never reads it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub today: Option<NaiveDate>,
    pub graduation_date: NaiveDate,
    pub loans: Vec<LoanInput>,
}

/// Totals across every loan, plus the per-loan summaries in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSummary {
    pub total_monthly_payment: Money,
    pub total_principal: Money,
    /// Absent if any loan failed to reach a payoff
    pub total_interest: Option<Money>,
    pub total_paid: Option<Money>,
    /// Latest payoff date among loans that have one
    pub final_payoff_date: Option<NaiveDate>,
    /// Zero-based indices of loans whose payment never retires the balance
    pub non_convergent_loans: Vec<usize>,
    pub loans: Vec<LoanSummary>,
}

/// Combine per-loan summaries. Sums are not re-rounded beyond the per-loan
/// rounding.
pub fn aggregate_loan_summaries(loans: Vec<LoanSummary>) -> AggregateSummary {
    let total_monthly_payment: Money = loans.iter().map(|l| l.monthly_payment).sum();
    let total_principal: Money = loans.iter().map(|l| l.principal).sum();
    let total_interest: Option<Money> = loans.iter().map(|l| l.total_interest).sum();
    let total_paid = total_interest.map(|interest| total_principal + interest);
    let final_payoff_date = loans.iter().filter_map(|l| l.payoff_date).max();

    let non_convergent_loans = loans
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.is_paid_off())
        .map(|(i, _)| i)
        .collect();

    AggregateSummary {
        total_monthly_payment,
        total_principal,
        total_interest,
        total_paid,
        final_payoff_date,
        non_convergent_loans,
        loans,
    }
}

/// Run every loan against the shared graduation date and aggregate.
///
/// Invalid loans abort the run; non-convergent loans do not.
pub fn compute_aggregate_summary(
    loans: &[LoanInput],
    graduation_date: NaiveDate,
) -> LoanPayoffResult<AggregateSummary> {
    let summaries = loans
        .iter()
        .map(|loan| compute_loan_summary(loan, graduation_date))
        .collect::<LoanPayoffResult<Vec<_>>>()?;

    let aggregate = aggregate_loan_summaries(summaries);
    debug!(
        loans = aggregate.loans.len(),
        total_monthly_payment = %aggregate.total_monthly_payment,
        final_payoff = ?aggregate.final_payoff_date.map(format_iso),
        "aggregated repayment summary"
    );
    Ok(aggregate)
}

/// Aggregate estimate wrapped in the standard computation envelope.
pub fn calculate_repayment_summary(
    request: &RepaymentRequest,
) -> LoanPayoffResult<ComputationOutput<AggregateSummary>> {
    let start = Instant::now();
    let aggregate = compute_aggregate_summary(&request.loans, request.graduation_date)?;

    let warnings: Vec<String> = aggregate
        .loans
        .iter()
        .enumerate()
        .filter_map(|(i, loan)| match &loan.status {
            RepaymentStatus::NonConvergent {
                months_simulated,
                remaining_balance,
            } => Some(format!(
                "Loan #{}: payment of {} does not retire the balance; {} remains after {} months",
                i + 1,
                loan.monthly_payment,
                remaining_balance,
                months_simulated
            )),
            RepaymentStatus::PaidOff { .. } => None,
        })
        .collect();

    let total_balance: Decimal = request.loans.iter().map(|l| l.balance).sum();
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Per-loan daily-compounded accrual and amortization, summed across loans",
        &serde_json::json!({
            "graduation_date": format_iso(request.graduation_date),
            "loan_count": request.loans.len(),
            "total_balance": total_balance.to_string(),
        }),
        warnings,
        elapsed,
        aggregate,
    ))
}
