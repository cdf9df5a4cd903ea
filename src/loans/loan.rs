use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dates::MonthKey;
use crate::decimal::{Money, Rate};
use crate::errors::{Result, ScheduleError};
use crate::types::{AccountId, CategoryId, LoanId, RepaymentType};

use super::amortization::initial_payment;

/// a loan with its aggregate repayment state
///
/// Installments are never stored individually; `paid_months`,
/// `remaining_principal` and `next_due_date` are the whole state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: LoanId,
    pub name: String,
    pub principal: Money,
    pub annual_rate: Rate,
    pub term_months: u32,
    pub start_date: NaiveDate,
    /// day of month the installment is due, clamped per month
    pub due_day: u32,
    pub account_id: AccountId,
    pub category_id: Option<CategoryId>,
    pub repayment_type: RepaymentType,

    // state
    pub remaining_principal: Money,
    pub monthly_payment: Money,
    pub paid_months: u32,
    /// None once the loan is settled or matured
    pub next_due_date: Option<NaiveDate>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl Loan {
    pub fn builder() -> LoanBuilder {
        LoanBuilder::new()
    }

    pub fn monthly_rate(&self) -> Rate {
        self.annual_rate.monthly_rate()
    }

    pub fn is_settled(&self) -> bool {
        self.next_due_date.is_none()
    }

    pub fn remaining_months(&self) -> u32 {
        self.term_months.saturating_sub(self.paid_months)
    }

    /// due date of installment `period` (1-based), clamped to the due day
    pub fn due_date_for_period(&self, period: u32) -> NaiveDate {
        MonthKey::of(self.start_date)
            .plus_months(period as i32)
            .day_clamped(self.due_day)
    }

    /// check the state invariants, used after loading persisted loans
    pub fn check_invariants(&self) -> Result<()> {
        if self.paid_months > self.term_months {
            return Err(ScheduleError::InvalidConfiguration {
                message: format!(
                    "paid months {} exceed term of {}",
                    self.paid_months, self.term_months
                ),
            });
        }
        if self.remaining_principal.is_negative() {
            return Err(ScheduleError::InvalidAmount {
                amount: self.remaining_principal,
            });
        }

        let terminal = self.remaining_principal.is_zero() || self.paid_months == self.term_months;
        if terminal != self.next_due_date.is_none() {
            return Err(ScheduleError::InvalidConfiguration {
                message: "next due date must be cleared exactly when the loan is settled".to_string(),
            });
        }
        Ok(())
    }
}

/// builder for loans, validates terms and computes the first installment
#[derive(Debug, Default)]
pub struct LoanBuilder {
    id: Option<LoanId>,
    name: Option<String>,
    principal: Option<Money>,
    annual_rate: Option<Rate>,
    term_months: Option<u32>,
    start_date: Option<NaiveDate>,
    due_day: Option<u32>,
    account_id: Option<AccountId>,
    category_id: Option<CategoryId>,
    repayment_type: Option<RepaymentType>,
}

impl LoanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: LoanId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn principal(mut self, principal: Money) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn annual_rate(mut self, rate: Rate) -> Self {
        self.annual_rate = Some(rate);
        self
    }

    pub fn term_months(mut self, months: u32) -> Self {
        self.term_months = Some(months);
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn due_day(mut self, day: u32) -> Self {
        self.due_day = Some(day);
        self
    }

    pub fn account(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn repayment_type(mut self, repayment_type: RepaymentType) -> Self {
        self.repayment_type = Some(repayment_type);
        self
    }

    pub fn build(self) -> Result<Loan> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or(ScheduleError::InvalidConfiguration {
                message: "Name required".to_string(),
            })?;

        let principal = self.principal.ok_or(ScheduleError::InvalidConfiguration {
            message: "Principal required".to_string(),
        })?;
        if !principal.is_positive() {
            return Err(ScheduleError::InvalidAmount { amount: principal });
        }

        let annual_rate = self.annual_rate.unwrap_or(Rate::ZERO);
        if annual_rate.as_decimal().is_sign_negative() {
            return Err(ScheduleError::InvalidConfiguration {
                message: format!("annual rate {annual_rate} must not be negative"),
            });
        }

        let term_months = self.term_months.ok_or(ScheduleError::InvalidConfiguration {
            message: "Term required".to_string(),
        })?;
        if term_months == 0 {
            return Err(ScheduleError::InvalidConfiguration {
                message: "term must be at least one month".to_string(),
            });
        }

        let start_date = self.start_date.ok_or(ScheduleError::InvalidConfiguration {
            message: "Start date required".to_string(),
        })?;

        let due_day = self.due_day.unwrap_or_else(|| start_date.day());
        if !(1..=31).contains(&due_day) {
            return Err(ScheduleError::InvalidDate {
                message: format!("due day {due_day} outside 1-31"),
            });
        }

        let account_id = self.account_id.ok_or(ScheduleError::InvalidConfiguration {
            message: "Paying account required".to_string(),
        })?;

        let repayment_type = self.repayment_type.unwrap_or(RepaymentType::Amortized);
        let monthly_payment = initial_payment(
            repayment_type,
            principal,
            annual_rate.monthly_rate(),
            term_months,
        );

        let mut loan = Loan {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            name,
            principal,
            annual_rate,
            term_months,
            start_date,
            due_day,
            account_id,
            category_id: self.category_id,
            repayment_type,
            remaining_principal: principal,
            monthly_payment,
            paid_months: 0,
            next_due_date: None,
            settled_at: None,
        };
        loan.next_due_date = Some(loan.due_date_for_period(1));
        Ok(loan)
    }
}
