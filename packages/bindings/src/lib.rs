use napi::Result as NapiResult;
use napi_derive::napi;

use loan_payoff_core::validation::{validate_submission as validate, LoanSubmission};
use loan_payoff_core::LoanRequest;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Input: a submission (`today`, `graduation_date`, `loans`). Field errors
/// are thrown as one JS error joining every collected message.
#[napi]
pub fn calculate_aggregate_summary(input_json: String) -> NapiResult<String> {
    let submission: LoanSubmission = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let request = submission.into_request().map_err(|e| match e {
        loan_payoff_core::LoanPayoffError::Validation(errors) => to_napi_error(
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        ),
        other => to_napi_error(other),
    })?;
    let output =
        loan_payoff_core::calculate_repayment_summary(&request).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn calculate_loan_summary(input_json: String) -> NapiResult<String> {
    let input: LoanRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = loan_payoff_core::calculate_loan_summary(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn build_amortization_schedule(input_json: String) -> NapiResult<String> {
    let input: LoanRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = loan_payoff_core::summary::loan::calculate_loan_schedule(&input)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Returns the collected field errors as a JSON array (empty when valid).
#[napi]
pub fn validate_submission(input_json: String) -> NapiResult<String> {
    let submission: LoanSubmission = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    serde_json::to_string(&validate(&submission)).map_err(to_napi_error)
}
