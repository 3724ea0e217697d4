use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::accrual::{accrual_start, capitalize_interest, AccrualOutput};
use crate::amortization::{level_payment, simulate_repayment, term_months};
use crate::dates::{add_months, format_iso};
use crate::error::LoanPayoffError;
use crate::types::*;
use crate::LoanPayoffResult;

/// One loan as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanInput {
    /// Principal at the time of calculation
    pub balance: Money,
    /// Annual percentage rate as a percentage (5 = 5%)
    pub apr_pct: Decimal,
    /// Nominal term; rounded to the nearest whole month
    pub term_years: Decimal,
    pub grace_months: u32,
    pub origination_date: NaiveDate,
    #[serde(default)]
    pub subsidized: bool,
}

/// A single loan together with the shared graduation date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanRequest {
    pub graduation_date: NaiveDate,
    #[serde(flatten)]
    pub loan: LoanInput,
}

/// How the repayment simulation ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RepaymentStatus {
    PaidOff { months: u32 },
    /// The payment never retired the balance within the safety bound.
    NonConvergent {
        months_simulated: u32,
        remaining_balance: Money,
    },
}

/// Per-loan repayment estimate. Monetary fields are rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSummary {
    pub principal: Money,
    pub capitalized_interest: Money,
    pub starting_balance: Money,
    pub monthly_payment: Money,
    /// Realised interest from the simulation; absent when no payoff was reached
    pub total_interest: Option<Money>,
    pub total_paid: Option<Money>,
    pub payoff_date: Option<NaiveDate>,
    pub payment_start_date: NaiveDate,
    pub term_months: u32,
    pub status: RepaymentStatus,
}

impl LoanSummary {
    pub fn is_paid_off(&self) -> bool {
        matches!(self.status, RepaymentStatus::PaidOff { .. })
    }
}

/// Reject inputs that violate the loan preconditions.
pub fn check_loan_input(input: &LoanInput, graduation_date: NaiveDate) -> LoanPayoffResult<()> {
    if input.balance <= Decimal::ZERO {
        return Err(LoanPayoffError::InvalidInput {
            field: "balance".into(),
            reason: "Balance must be greater than 0".into(),
        });
    }
    if input.apr_pct < Decimal::ZERO {
        return Err(LoanPayoffError::InvalidInput {
            field: "apr_pct".into(),
            reason: "APR must be 0 or greater".into(),
        });
    }
    if input.term_years <= Decimal::ZERO {
        return Err(LoanPayoffError::InvalidInput {
            field: "term_years".into(),
            reason: "Term must be greater than 0".into(),
        });
    }
    if input.origination_date > graduation_date {
        return Err(LoanPayoffError::InvalidInput {
            field: "origination_date".into(),
            reason: format!(
                "Origination {} must be on or before graduation {}",
                format_iso(input.origination_date),
                format_iso(graduation_date)
            ),
        });
    }
    Ok(())
}

/// First payment date: graduation plus the grace period.
pub fn payment_start_date(graduation_date: NaiveDate, grace_months: u32) -> LoanPayoffResult<NaiveDate> {
    let grace = i32::try_from(grace_months).map_err(|_| LoanPayoffError::InvalidInput {
        field: "grace_months".into(),
        reason: "Grace period is too long".into(),
    })?;
    add_months(graduation_date, grace)
}

/// Capitalised balance for a loan at the start of repayment.
pub fn starting_position(
    input: &LoanInput,
    graduation_date: NaiveDate,
) -> LoanPayoffResult<AccrualOutput> {
    check_loan_input(input, graduation_date)?;

    let apr = input.apr_pct / dec!(100);
    let payment_start = payment_start_date(graduation_date, input.grace_months)?;
    let start = accrual_start(input.subsidized, graduation_date, input.origination_date);

    capitalize_interest(input.balance, apr, start, payment_start)
}

/// Build the repayment estimate for a single loan.
///
/// A payment that cannot retire the balance is reported through
/// `RepaymentStatus::NonConvergent` rather than an error, so aggregate
/// callers can carry on with the remaining loans.
pub fn compute_loan_summary(
    input: &LoanInput,
    graduation_date: NaiveDate,
) -> LoanPayoffResult<LoanSummary> {
    let accrual = starting_position(input, graduation_date)?;
    let apr = input.apr_pct / dec!(100);
    let n_months = term_months(input.term_years)?;

    let monthly_payment = round_cents(level_payment(accrual.starting_balance, apr, n_months)?);
    debug!(
        payment_start = %format_iso(accrual.payment_start),
        n_months,
        %monthly_payment,
        "amortising loan"
    );

    let principal = input.balance;
    let (total_interest, total_paid, payoff_date, status) = match simulate_repayment(
        accrual.starting_balance,
        apr,
        monthly_payment,
        n_months,
        accrual.payment_start,
    ) {
        Ok(sim) => (
            Some(round_cents(sim.total_interest)),
            Some(round_cents(principal + sim.total_interest)),
            Some(sim.payoff_date),
            RepaymentStatus::PaidOff {
                months: sim.months_elapsed,
            },
        ),
        Err(LoanPayoffError::ConvergenceFailure {
            iterations,
            last_delta,
            ..
        }) => {
            warn!(
                %principal,
                %monthly_payment,
                iterations,
                "no payoff reached for loan"
            );
            (
                None,
                None,
                None,
                RepaymentStatus::NonConvergent {
                    months_simulated: iterations,
                    remaining_balance: round_cents(last_delta),
                },
            )
        }
        Err(e) => return Err(e),
    };

    Ok(LoanSummary {
        principal: round_cents(principal),
        capitalized_interest: round_cents(accrual.capitalized_interest),
        starting_balance: round_cents(accrual.starting_balance),
        monthly_payment,
        total_interest,
        total_paid,
        payoff_date,
        payment_start_date: accrual.payment_start,
        term_months: n_months,
        status,
    })
}

/// Single-loan estimate wrapped in the standard computation envelope.
pub fn calculate_loan_summary(
    request: &LoanRequest,
) -> LoanPayoffResult<ComputationOutput<LoanSummary>> {
    let start = Instant::now();
    let summary = compute_loan_summary(&request.loan, request.graduation_date)?;

    let mut warnings = Vec::new();
    if let RepaymentStatus::NonConvergent {
        months_simulated,
        remaining_balance,
    } = &summary.status
    {
        warnings.push(format!(
            "Payment of {} does not retire the balance; {} remains after {} months",
            summary.monthly_payment, remaining_balance, months_simulated
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Daily-compounded accrual, level annuity payment, monthly repayment simulation",
        &serde_json::json!({
            "graduation_date": format_iso(request.graduation_date),
            "balance": request.loan.balance.to_string(),
            "apr_pct": request.loan.apr_pct.to_string(),
            "term_years": request.loan.term_years.to_string(),
            "grace_months": request.loan.grace_months,
            "subsidized": request.loan.subsidized,
        }),
        warnings,
        elapsed,
        summary,
    ))
}

/// Amortization table for a single loan, starting from its capitalised balance.
#[cfg(feature = "schedule")]
pub fn calculate_loan_schedule(
    request: &LoanRequest,
) -> LoanPayoffResult<ComputationOutput<crate::amortization::AmortizationSchedule>> {
    let start = Instant::now();
    let accrual = starting_position(&request.loan, request.graduation_date)?;
    let apr = request.loan.apr_pct / dec!(100);
    let n_months = term_months(request.loan.term_years)?;

    let mut schedule =
        crate::amortization::build_schedule(accrual.starting_balance, apr, n_months, accrual.payment_start)?;
    for row in &mut schedule.rows {
        row.payment = round_cents(row.payment);
        row.interest = round_cents(row.interest);
        row.principal = round_cents(row.principal);
        row.remaining_balance = round_cents(row.remaining_balance);
    }
    schedule.total_interest = round_cents(schedule.total_interest);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Monthly amortization schedule at the cent-rounded level payment",
        &serde_json::json!({
            "starting_balance": round_cents(accrual.starting_balance).to_string(),
            "apr": apr.to_string(),
            "n_months": n_months,
            "payment_start": format_iso(accrual.payment_start),
        }),
        Vec::new(),
        elapsed,
        schedule,
    ))
}
