pub mod amortization;
pub mod engine;
pub mod loan;

pub use amortization::{AmortizationSchedule, Installment};
pub use engine::{LoanPostingReport, LoanScheduleEngine, LoanTermsUpdate, SettlementReceipt};
pub use loan::{Loan, LoanBuilder};
