//! Field-level checks for raw, caller-supplied submissions.
//!
//! Every problem in a submission is collected so it can be reported at once.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::dates::parse_date;
use crate::error::LoanPayoffError;
use crate::summary::aggregate::RepaymentRequest;
use crate::summary::loan::LoanInput;
use crate::LoanPayoffResult;

/// Where a field error belongs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ErrorScope {
    Global,
    /// Zero-based position in the submitted loan list
    Loan { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(flatten)]
    pub scope: ErrorScope,
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            ErrorScope::Global => write!(f, "global {}: {}", self.field, self.message),
            ErrorScope::Loan { index } => {
                write!(f, "loan #{} {}: {}", index + 1, self.field, self.message)
            }
        }
    }
}

/// One loan entry as typed by the user, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLoanEntry {
    pub balance: Option<Decimal>,
    /// APR as a percentage
    pub apr: Option<Decimal>,
    pub term_years: Option<Decimal>,
    pub grace_months: Option<i64>,
    pub origination_date: Option<String>,
    #[serde(default)]
    pub subsidized: bool,
}

/// A whole form submission: shared dates plus the ordered loan entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoanSubmission {
    pub today: Option<String>,
    pub graduation_date: Option<String>,
    #[serde(default)]
    pub loans: Vec<RawLoanEntry>,
}

fn global(field: &str, message: &str) -> FieldError {
    FieldError {
        scope: ErrorScope::Global,
        field: field.into(),
        message: message.into(),
    }
}

fn for_loan(index: usize, field: &str, message: &str) -> FieldError {
    FieldError {
        scope: ErrorScope::Loan { index },
        field: field.into(),
        message: message.into(),
    }
}

fn parse_opt(raw: Option<&str>) -> Option<NaiveDate> {
    raw.and_then(parse_date)
}

/// Check every field of a submission and return all errors found.
pub fn validate_submission(submission: &LoanSubmission) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if parse_opt(submission.today.as_deref()).is_none() {
        errors.push(global("today", "Please enter a valid today's date."));
    }

    let graduation = parse_opt(submission.graduation_date.as_deref());
    if graduation.is_none() {
        errors.push(global(
            "graduation_date",
            "Please enter a valid graduation date.",
        ));
    }

    for (i, entry) in submission.loans.iter().enumerate() {
        if !entry.balance.is_some_and(|b| b > Decimal::ZERO) {
            errors.push(for_loan(i, "balance", "Balance must be greater than 0."));
        }
        if !entry.apr.is_some_and(|a| a >= Decimal::ZERO) {
            errors.push(for_loan(i, "apr", "APR must be 0 or greater."));
        }
        if !entry.term_years.is_some_and(|t| t > Decimal::ZERO) {
            errors.push(for_loan(i, "term_years", "Term must be at least 1 year."));
        }
        match entry.grace_months {
            Some(g) if g < 0 => {
                errors.push(for_loan(i, "grace_months", "Grace period cannot be negative."))
            }
            Some(g) if u32::try_from(g).is_err() => {
                errors.push(for_loan(i, "grace_months", "Grace period is too long."))
            }
            Some(_) => {}
            None => errors.push(for_loan(i, "grace_months", "Grace period cannot be negative.")),
        }

        match (parse_opt(entry.origination_date.as_deref()), graduation) {
            (None, _) => errors.push(for_loan(
                i,
                "origination_date",
                "Enter a valid origination date.",
            )),
            (Some(orig), Some(grad)) if grad < orig => errors.push(for_loan(
                i,
                "origination_date",
                "Origination must be on or before graduation.",
            )),
            _ => {}
        }
    }

    errors
}

impl LoanSubmission {
    /// Validate and convert into a calculation request.
    pub fn into_request(self) -> LoanPayoffResult<RepaymentRequest> {
        let errors = validate_submission(&self);
        if !errors.is_empty() {
            return Err(LoanPayoffError::Validation(errors));
        }

        let graduation_date = parse_opt(self.graduation_date.as_deref())
            .ok_or_else(|| LoanPayoffError::DateError("graduation date missing".into()))?;
        let today = parse_opt(self.today.as_deref());

        let loans = self
            .loans
            .into_iter()
            .map(|entry| {
                let origination_date = parse_opt(entry.origination_date.as_deref())
                    .ok_or_else(|| LoanPayoffError::DateError("origination date missing".into()))?;
                Ok(LoanInput {
                    balance: entry.balance.unwrap_or_default(),
                    apr_pct: entry.apr.unwrap_or_default(),
                    term_years: entry.term_years.unwrap_or_default(),
                    grace_months: entry
                        .grace_months
                        .and_then(|g| u32::try_from(g).ok())
                        .unwrap_or_default(),
                    origination_date,
                    subsidized: entry.subsidized,
                })
            })
            .collect::<LoanPayoffResult<Vec<_>>>()?;

        Ok(RepaymentRequest {
            today,
            graduation_date,
            loans,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry() -> RawLoanEntry {
        RawLoanEntry {
            balance: Some(dec!(10000)),
            apr: Some(dec!(5)),
            term_years: Some(dec!(10)),
            grace_months: Some(6),
            origination_date: Some("2023-09-01".into()),
            subsidized: false,
        }
    }

    fn submission(loans: Vec<RawLoanEntry>) -> LoanSubmission {
        LoanSubmission {
            today: Some("2024-03-15".into()),
            graduation_date: Some("2024-06-01".into()),
            loans,
        }
    }

    #[test]
    fn test_valid_submission_has_no_errors() {
        assert!(validate_submission(&submission(vec![entry(), entry()])).is_empty());
    }

    #[test]
    fn test_collects_every_error() {
        let bad = RawLoanEntry {
            balance: Some(dec!(0)),
            apr: Some(dec!(-1)),
            term_years: None,
            grace_months: Some(-2),
            origination_date: Some("not-a-date".into()),
            subsidized: false,
        };
        let errors = validate_submission(&submission(vec![entry(), bad]));
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();

        assert_eq!(
            fields,
            vec!["balance", "apr", "term_years", "grace_months", "origination_date"]
        );
        assert!(errors
            .iter()
            .all(|e| e.scope == ErrorScope::Loan { index: 1 }));
        assert_eq!(errors[4].message, "Enter a valid origination date.");
    }

    #[test]
    fn test_origination_after_graduation() {
        let late = RawLoanEntry {
            origination_date: Some("2024-07-01".into()),
            ..entry()
        };
        let errors = validate_submission(&submission(vec![late]));
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].message,
            "Origination must be on or before graduation."
        );
        assert_eq!(errors[0].to_string(), "loan #1 origination_date: Origination must be on or before graduation.");
    }

    #[test]
    fn test_global_date_errors() {
        let sub = LoanSubmission {
            today: Some("2024-13-01".into()),
            graduation_date: None,
            loans: vec![entry()],
        };
        let errors = validate_submission(&sub);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].scope, ErrorScope::Global);
        assert_eq!(errors[0].field, "today");
        assert_eq!(errors[1].field, "graduation_date");
    }

    #[test]
    fn test_missing_today_is_rejected() {
        let sub = LoanSubmission {
            today: None,
            ..submission(vec![entry()])
        };
        let errors = validate_submission(&sub);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].scope, ErrorScope::Global);
        assert_eq!(errors[0].field, "today");
        assert_eq!(errors[0].message, "Please enter a valid today's date.");
    }

    #[test]
    fn test_into_request_converts_valid_submission() {
        let request = submission(vec![entry()]).into_request().unwrap();
        assert_eq!(
            request.graduation_date,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
        assert_eq!(request.today, NaiveDate::from_ymd_opt(2024, 3, 15));
        assert_eq!(request.loans[0].apr_pct, dec!(5));
        assert_eq!(request.loans[0].grace_months, 6);
    }

    #[test]
    fn test_into_request_reports_validation_errors() {
        let bad = RawLoanEntry {
            balance: None,
            ..entry()
        };
        match submission(vec![bad]).into_request() {
            Err(LoanPayoffError::Validation(errors)) => assert_eq!(errors.len(), 1),
            other => panic!("expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_field_error_serialises_flat() {
        let err = for_loan(2, "apr", "APR must be 0 or greater.");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["scope"], "loan");
        assert_eq!(json["index"], 2);
        assert_eq!(json["field"], "apr");
    }
}
