pub mod aggregate;
pub mod loan;
