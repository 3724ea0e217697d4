pub mod accrual;
pub mod amortization;
pub mod dates;
pub mod error;
pub mod summary;
pub mod types;
pub mod validation;

pub use error::LoanPayoffError;
pub use summary::aggregate::{
    calculate_repayment_summary, compute_aggregate_summary, AggregateSummary, RepaymentRequest,
};
pub use summary::loan::{
    calculate_loan_summary, compute_loan_summary, LoanInput, LoanRequest, LoanSummary,
    RepaymentStatus,
};
pub use types::*;

/// Standard result type for all loan-payoff operations
pub type LoanPayoffResult<T> = Result<T, LoanPayoffError>;
