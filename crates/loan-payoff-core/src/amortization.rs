use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::dates::add_months;
use crate::error::LoanPayoffError;
use crate::types::{Money, Rate};
use crate::LoanPayoffResult;

/// A balance at or below this is treated as fully repaid.
const PAID_OFF_EPSILON: Decimal = dec!(0.01);

/// Months simulated beyond the nominal term before giving up.
const SAFETY_MONTHS: u32 = 360;

const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Outcome of simulating repayment month by month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentSimulation {
    pub months_elapsed: u32,
    /// Unrounded sum of monthly interest charges.
    pub total_interest: Money,
    pub payoff_date: NaiveDate,
}

/// One month of the amortization schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub period: u32,
    pub due_date: NaiveDate,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub remaining_balance: Money,
}

/// Full month-by-month amortization table for one loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub monthly_payment: Money,
    pub rows: Vec<ScheduleRow>,
    pub total_interest: Money,
    pub payoff_date: NaiveDate,
}

struct MonthStep {
    period: u32,
    interest: Money,
    principal: Money,
    remaining: Money,
}

/// Convert a nominal term in years to whole months, rounding to the nearest
/// month.
pub fn term_months(term_years: Decimal) -> LoanPayoffResult<u32> {
    let rounded = term_years
        .checked_mul(MONTHS_PER_YEAR)
        .map(|m| m.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero));

    match rounded {
        Some(m) if m <= Decimal::ZERO => Err(LoanPayoffError::InvalidInput {
            field: "term_years".into(),
            reason: "Term must round to at least one month".into(),
        }),
        Some(m) => m.to_u32().ok_or_else(|| LoanPayoffError::InvalidInput {
            field: "term_years".into(),
            reason: "Term is too long".into(),
        }),
        None => Err(LoanPayoffError::InvalidInput {
            field: "term_years".into(),
            reason: "Term is too long".into(),
        }),
    }
}

/// Closed-form level monthly payment (standard annuity formula), unrounded.
pub fn level_payment(starting_balance: Money, apr: Rate, n_months: u32) -> LoanPayoffResult<Money> {
    if n_months == 0 {
        return Err(LoanPayoffError::InvalidInput {
            field: "n_months".into(),
            reason: "Number of months must be > 0".into(),
        });
    }

    let monthly_rate = apr / MONTHS_PER_YEAR;
    if apr.is_zero() || monthly_rate.is_zero() {
        return Ok(starting_balance / Decimal::from(n_months));
    }

    let factor = (Decimal::ONE + monthly_rate)
        .checked_powi(i64::from(n_months))
        .ok_or_else(|| {
            LoanPayoffError::FinancialImpossibility(format!(
                "annuity factor overflows over {n_months} months at {apr}"
            ))
        })?;
    let denominator = Decimal::ONE - Decimal::ONE / factor;

    starting_balance
        .checked_mul(monthly_rate)
        .and_then(|scaled| scaled.checked_div(denominator))
        .ok_or_else(|| {
            LoanPayoffError::FinancialImpossibility(format!(
                "annuity payment is out of range over {n_months} months at {apr}"
            ))
        })
}

/// Simulate repayment of `starting_balance` at a fixed `payment`.
///
/// The final installment is shortened to clear the balance exactly. Fails
/// with `ConvergenceFailure` after `n_months + 360` months if the balance has
/// not been retired.
pub fn simulate_repayment(
    starting_balance: Money,
    apr: Rate,
    payment: Money,
    n_months: u32,
    payment_start: NaiveDate,
) -> LoanPayoffResult<RepaymentSimulation> {
    let (months_elapsed, total_interest) =
        run_months(starting_balance, apr, payment, n_months, |_| Ok(()))?;

    Ok(RepaymentSimulation {
        months_elapsed,
        total_interest,
        payoff_date: offset_months(payment_start, months_elapsed)?,
    })
}

/// Month-by-month schedule at the cent-rounded level payment.
#[cfg(feature = "schedule")]
pub fn build_schedule(
    starting_balance: Money,
    apr: Rate,
    n_months: u32,
    payment_start: NaiveDate,
) -> LoanPayoffResult<AmortizationSchedule> {
    let monthly_payment = crate::types::round_cents(level_payment(starting_balance, apr, n_months)?);
    let mut rows = Vec::with_capacity(n_months as usize);

    let (months_elapsed, total_interest) =
        run_months(starting_balance, apr, monthly_payment, n_months, |step| {
            rows.push(ScheduleRow {
                period: step.period,
                due_date: offset_months(payment_start, step.period - 1)?,
                payment: step.interest + step.principal,
                interest: step.interest,
                principal: step.principal,
                remaining_balance: step.remaining,
            });
            Ok(())
        })?;

    Ok(AmortizationSchedule {
        monthly_payment,
        rows,
        total_interest,
        payoff_date: offset_months(payment_start, months_elapsed)?,
    })
}

fn run_months(
    starting_balance: Money,
    apr: Rate,
    payment: Money,
    n_months: u32,
    mut on_month: impl FnMut(&MonthStep) -> LoanPayoffResult<()>,
) -> LoanPayoffResult<(u32, Money)> {
    let monthly_rate = apr / MONTHS_PER_YEAR;
    let bound = n_months.saturating_add(SAFETY_MONTHS);

    let mut remaining = starting_balance;
    let mut total_interest = Decimal::ZERO;
    let mut months: u32 = 0;

    while remaining > Decimal::ZERO && months < bound {
        // A balance that grows until it leaves the decimal range never pays off
        let Some((interest, principal, next_remaining, next_total)) =
            next_month(remaining, total_interest, apr, monthly_rate, payment)
        else {
            warn!(
                months,
                %remaining,
                %payment,
                "repayment simulation overflowed on a growing balance"
            );
            return Err(non_convergent(months, remaining));
        };

        total_interest = next_total;
        remaining = next_remaining;
        months += 1;

        if remaining <= PAID_OFF_EPSILON {
            remaining = Decimal::ZERO;
        }

        on_month(&MonthStep {
            period: months,
            interest,
            principal,
            remaining,
        })?;
    }

    if remaining > Decimal::ZERO {
        warn!(
            months,
            %remaining,
            %payment,
            "repayment simulation hit the safety bound without paying off"
        );
        return Err(non_convergent(months, remaining));
    }

    Ok((months, total_interest))
}

/// One month of interest and repayment; `None` if any amount overflows.
fn next_month(
    remaining: Money,
    total_interest: Money,
    apr: Rate,
    monthly_rate: Rate,
    payment: Money,
) -> Option<(Money, Money, Money, Money)> {
    let interest = if apr.is_zero() {
        Decimal::ZERO
    } else {
        remaining.checked_mul(monthly_rate)?
    };
    // Final installment only clears what is left
    let principal = payment.checked_sub(interest)?.min(remaining);
    let next_remaining = remaining.checked_sub(principal)?;
    let next_total = total_interest.checked_add(interest)?;
    Some((interest, principal, next_remaining, next_total))
}

fn non_convergent(months: u32, remaining: Money) -> LoanPayoffError {
    LoanPayoffError::ConvergenceFailure {
        function: "Repayment simulation".into(),
        iterations: months,
        last_delta: remaining,
    }
}

fn offset_months(start: NaiveDate, months: u32) -> LoanPayoffResult<NaiveDate> {
    let months = i32::try_from(months).map_err(|_| {
        LoanPayoffError::DateError(format!("{months} months is outside the supported calendar"))
    })?;
    add_months(start, months)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::round_cents;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_term_months_rounds_to_nearest() {
        assert_eq!(term_months(dec!(10)).unwrap(), 120);
        assert_eq!(term_months(dec!(2.5)).unwrap(), 30);
        assert_eq!(term_months(dec!(0.125)).unwrap(), 2); // 1.5 rounds up
        assert!(term_months(dec!(0.04)).is_err());
        assert!(term_months(dec!(0)).is_err());
        assert!(term_months(dec!(-1)).is_err());
    }

    #[test]
    fn test_term_months_rejects_overlong_term() {
        match term_months(dec!(1_000_000_000)) {
            Err(LoanPayoffError::InvalidInput { field, reason }) => {
                assert_eq!(field, "term_years");
                assert_eq!(reason, "Term is too long");
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
        match term_months(dec!(0.01)) {
            Err(LoanPayoffError::InvalidInput { reason, .. }) => {
                assert_eq!(reason, "Term must round to at least one month")
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_simulation_growing_balance_overflow_is_non_convergent() {
        // 1000% APR with no payment compounds past the decimal range well
        // before the safety bound
        let err = simulate_repayment(dec!(0.0058), dec!(10), dec!(0), 12, d(2024, 6, 1))
            .unwrap_err();
        match err {
            LoanPayoffError::ConvergenceFailure { iterations, last_delta, .. } => {
                assert!(iterations < 372);
                assert!(last_delta > dec!(1_000_000_000_000_000_000));
            }
            other => panic!("expected ConvergenceFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_level_payment_zero_rate() {
        assert_eq!(level_payment(dec!(1200), dec!(0), 12).unwrap(), dec!(100));
    }

    #[test]
    fn test_level_payment_annuity_known_answer() {
        // 10,000 at 5% over 120 months: standard table value 106.07
        let pmt = level_payment(dec!(10000), dec!(0.05), 120).unwrap();
        assert_eq!(round_cents(pmt), dec!(106.07));
    }

    #[test]
    fn test_level_payment_rejects_zero_months() {
        assert!(matches!(
            level_payment(dec!(1000), dec!(0.05), 0),
            Err(LoanPayoffError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_simulation_zero_rate_pays_off_on_term() {
        let sim = simulate_repayment(dec!(1200), dec!(0), dec!(100), 12, d(2024, 12, 1)).unwrap();
        assert_eq!(sim.months_elapsed, 12);
        assert_eq!(sim.total_interest, Decimal::ZERO);
        assert_eq!(sim.payoff_date, d(2025, 12, 1));
    }

    #[test]
    fn test_simulation_caps_final_installment() {
        // 250 at 100/month: 100, 100, then a shortened 50
        let sim = simulate_repayment(dec!(250), dec!(0), dec!(100), 3, d(2024, 1, 31)).unwrap();
        assert_eq!(sim.months_elapsed, 3);
        assert_eq!(sim.payoff_date, d(2024, 4, 30));
    }

    #[test]
    fn test_simulation_interest_close_to_closed_form() {
        let pmt = round_cents(level_payment(dec!(10000), dec!(0.05), 120).unwrap());
        let sim = simulate_repayment(dec!(10000), dec!(0.05), pmt, 120, d(2024, 12, 1)).unwrap();
        let closed_form = pmt * dec!(120) - dec!(10000);
        assert!(sim.months_elapsed == 120 || sim.months_elapsed == 121);
        assert!((sim.total_interest - closed_form).abs() < dec!(1));
    }

    #[test]
    fn test_simulation_payment_equal_to_interest_hits_bound() {
        // First month's interest on 12,000 at 6% is exactly 60
        let err = simulate_repayment(dec!(12000), dec!(0.06), dec!(60), 120, d(2024, 12, 1))
            .unwrap_err();
        match err {
            LoanPayoffError::ConvergenceFailure {
                iterations,
                last_delta,
                ..
            } => {
                assert_eq!(iterations, 480);
                assert_eq!(last_delta, dec!(12000));
            }
            other => panic!("expected ConvergenceFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_simulation_negative_amortization_hits_bound() {
        let err = simulate_repayment(dec!(12000), dec!(0.06), dec!(10), 12, d(2024, 12, 1));
        assert!(matches!(
            err,
            Err(LoanPayoffError::ConvergenceFailure { iterations: 372, .. })
        ));
    }

    #[cfg(feature = "schedule")]
    #[test]
    fn test_schedule_matches_simulation() {
        let start = d(2024, 12, 1);
        let schedule = build_schedule(dec!(10000), dec!(0.05), 120, start).unwrap();
        let sim =
            simulate_repayment(dec!(10000), dec!(0.05), schedule.monthly_payment, 120, start)
                .unwrap();

        assert_eq!(schedule.rows.len() as u32, sim.months_elapsed);
        assert_eq!(schedule.total_interest, sim.total_interest);
        assert_eq!(schedule.payoff_date, sim.payoff_date);
        assert_eq!(schedule.rows[0].due_date, start);
        assert_eq!(schedule.rows[0].payment, dec!(106.07));
        assert_eq!(schedule.rows.last().unwrap().remaining_balance, Decimal::ZERO);

        let summed: Decimal = schedule.rows.iter().map(|r| r.interest).sum();
        assert_eq!(summed, schedule.total_interest);
    }

    #[cfg(feature = "schedule")]
    #[test]
    fn test_schedule_final_row_is_shortened() {
        // 1000 / 6 rounds up to 166.67, so the sixth payment only needs 166.65
        let schedule = build_schedule(dec!(1000), dec!(0), 6, d(2024, 1, 1)).unwrap();
        assert_eq!(schedule.monthly_payment, dec!(166.67));
        assert_eq!(schedule.rows.len(), 6);
        assert_eq!(schedule.rows[5].payment, dec!(166.65));
        assert_eq!(schedule.rows[5].due_date, d(2024, 6, 1));
        assert_eq!(schedule.payoff_date, d(2024, 7, 1));
    }
}
