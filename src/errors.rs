use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use crate::decimal::Money;

#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("invalid month key: {value}")]
    InvalidMonthKey {
        value: String,
    },

    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("loan {loan_id} is already settled")]
    LoanSettled {
        loan_id: Uuid,
    },

    #[error("account not found: {account_id}")]
    AccountNotFound {
        account_id: Uuid,
    },

    #[error("ledger write failed for {date}: {message}")]
    LedgerWrite {
        date: NaiveDate,
        message: String,
    },

    #[error("store error: {message}")]
    Store {
        message: String,
    },

    #[error("migration error at schema v{version}: {message}")]
    Migration {
        version: u32,
        message: String,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScheduleError>;
