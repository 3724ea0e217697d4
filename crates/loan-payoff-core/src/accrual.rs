use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dates::{diff_days, format_iso};
use crate::error::LoanPayoffError;
use crate::types::{Money, Rate};
use crate::LoanPayoffResult;

const DAYS_PER_YEAR: Decimal = dec!(365);

/// Interest accrued before repayment, capitalised into the balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualOutput {
    pub accrual_start: NaiveDate,
    pub payment_start: NaiveDate,
    pub accrual_days: i64,
    pub capitalized_interest: Money,
    pub starting_balance: Money,
}

/// The date interest starts accruing. Subsidized loans accrue nothing before
/// graduation; unsubsidized loans accrue from disbursement.
pub fn accrual_start(
    subsidized: bool,
    graduation_date: NaiveDate,
    origination_date: NaiveDate,
) -> NaiveDate {
    if subsidized {
        graduation_date
    } else {
        origination_date
    }
}

/// Compound `principal` daily at `apr / 365` from `accrual_start` to
/// `payment_start` and capitalise the accrued interest.
///
/// A non-positive rate, or an accrual window that starts after payments
/// begin, capitalises nothing. Amounts are left unrounded.
pub fn capitalize_interest(
    principal: Money,
    apr: Rate,
    accrual_start: NaiveDate,
    payment_start: NaiveDate,
) -> LoanPayoffResult<AccrualOutput> {
    let accrual_days = diff_days(accrual_start, payment_start);

    let capitalized_interest = if apr <= Decimal::ZERO || accrual_start > payment_start {
        Decimal::ZERO
    } else {
        let daily_rate = apr / DAYS_PER_YEAR;
        let factor = (Decimal::ONE + daily_rate)
            .checked_powi(accrual_days)
            .ok_or_else(|| {
                LoanPayoffError::FinancialImpossibility(format!(
                    "daily compounding factor overflows over {accrual_days} days at {apr}"
                ))
            })?;
        let accrued = principal
            .checked_mul(factor)
            .and_then(|grown| grown.checked_sub(principal))
            .ok_or_else(|| {
                LoanPayoffError::FinancialImpossibility(format!(
                    "accrued balance overflows over {accrual_days} days at {apr}"
                ))
            })?;
        accrued.max(Decimal::ZERO)
    };

    debug!(
        accrual_start = %format_iso(accrual_start),
        payment_start = %format_iso(payment_start),
        accrual_days,
        %capitalized_interest,
        "capitalised pre-repayment interest"
    );

    Ok(AccrualOutput {
        accrual_start,
        payment_start,
        accrual_days,
        capitalized_interest,
        starting_balance: principal + capitalized_interest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::round_cents;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_accrual_start_by_subsidy() {
        let grad = d(2024, 6, 1);
        let orig = d(2023, 9, 1);
        assert_eq!(accrual_start(true, grad, orig), grad);
        assert_eq!(accrual_start(false, grad, orig), orig);
    }

    #[test]
    fn test_zero_rate_capitalises_nothing() {
        let out = capitalize_interest(dec!(10000), dec!(0), d(2023, 9, 1), d(2024, 12, 1)).unwrap();
        assert_eq!(out.capitalized_interest, Decimal::ZERO);
        assert_eq!(out.starting_balance, dec!(10000));
        assert_eq!(out.accrual_days, 457);
    }

    #[test]
    fn test_window_after_payment_start_capitalises_nothing() {
        let out =
            capitalize_interest(dec!(5000), dec!(0.05), d(2025, 1, 1), d(2024, 12, 1)).unwrap();
        assert_eq!(out.capitalized_interest, Decimal::ZERO);
        assert_eq!(out.accrual_days, 0);
    }

    #[test]
    fn test_same_day_window_capitalises_nothing() {
        let out =
            capitalize_interest(dec!(5000), dec!(0.05), d(2024, 12, 1), d(2024, 12, 1)).unwrap();
        assert_eq!(out.capitalized_interest, Decimal::ZERO);
    }

    #[test]
    fn test_daily_compounding_exceeds_simple_interest() {
        // 10,000 at 5% for 365 days: simple = 500.00, daily compound ~ 512.67
        let out =
            capitalize_interest(dec!(10000), dec!(0.05), d(2023, 1, 1), d(2024, 1, 1)).unwrap();
        assert_eq!(out.accrual_days, 365);
        assert!(out.capitalized_interest > dec!(500));
        assert_eq!(round_cents(out.capitalized_interest), dec!(512.67));
        assert_eq!(
            out.starting_balance,
            dec!(10000) + out.capitalized_interest
        );
    }

    #[test]
    fn test_overflowing_factor_is_rejected() {
        let err = capitalize_interest(dec!(1000), dec!(500), d(1900, 1, 1), d(2024, 1, 1));
        assert!(matches!(
            err,
            Err(LoanPayoffError::FinancialImpossibility(_))
        ));
    }
}
