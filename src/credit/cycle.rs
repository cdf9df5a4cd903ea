use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{DateRange, MonthKey};
use crate::decimal::Money;
use crate::errors::{Result, ScheduleError};
use crate::stores::LedgerStore;
use crate::types::{AccountId, TransactionKind};

/// billing cycle settings of a credit card account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditCardCycleMeta {
    pub payment_due_day: u32,
    pub cycle_start_day: u32,
    pub cycle_end_day: u32,
    #[serde(default)]
    pub credit_limit: Option<Money>,
}

impl CreditCardCycleMeta {
    pub fn new(payment_due_day: u32, cycle_start_day: u32, cycle_end_day: u32) -> Result<Self> {
        let meta = Self {
            payment_due_day,
            cycle_start_day,
            cycle_end_day,
            credit_limit: None,
        };
        meta.validate()?;
        Ok(meta)
    }

    pub fn with_credit_limit(mut self, limit: Money) -> Self {
        self.credit_limit = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (field, day) in [
            ("payment due day", self.payment_due_day),
            ("cycle start day", self.cycle_start_day),
            ("cycle end day", self.cycle_end_day),
        ] {
            if !(1..=31).contains(&day) {
                return Err(ScheduleError::InvalidDate {
                    message: format!("{field} {day} outside 1-31"),
                });
            }
        }
        if let Some(limit) = self.credit_limit {
            if limit.is_negative() {
                return Err(ScheduleError::InvalidAmount { amount: limit });
            }
        }
        Ok(())
    }

    /// credit left after `used`, floored at zero; None without a limit
    pub fn available_after(&self, used: Money) -> Option<Money> {
        self.credit_limit.map(|limit| (limit - used).max(Money::ZERO))
    }

    /// cycle starts in the month before it ends
    pub fn wraps_month(&self) -> bool {
        self.cycle_start_day > self.cycle_end_day
    }
}

/// resolves statement windows of credit card accounts
#[derive(Debug, Clone, Copy, Default)]
pub struct CreditCycleResolver;

impl CreditCycleResolver {
    pub fn new() -> Self {
        Self
    }

    /// purchase window billed on the payment due in `due_month`
    pub fn cycle_range_for_due_month(&self, due_month: MonthKey, meta: &CreditCardCycleMeta) -> DateRange {
        let start_month = if meta.wraps_month() {
            due_month.previous()
        } else {
            due_month
        };

        DateRange {
            start: start_month.day_clamped(meta.cycle_start_day),
            end: due_month.day_clamped(meta.cycle_end_day),
        }
    }

    pub fn due_date_for_month(&self, due_month: MonthKey, meta: &CreditCardCycleMeta) -> NaiveDate {
        due_month.day_clamped(meta.payment_due_day)
    }

    /// expenses charged to the card inside the cycle window
    pub fn statement_total(
        &self,
        ledger: &(impl LedgerStore + ?Sized),
        account_id: AccountId,
        due_month: MonthKey,
        meta: &CreditCardCycleMeta,
    ) -> Result<Money> {
        let window = self.cycle_range_for_due_month(due_month, meta);
        let total = ledger
            .list_transactions(Some(account_id), Some(window))?
            .iter()
            .filter(|t| t.kind == TransactionKind::Expense)
            .map(|t| t.amount)
            .sum();

        tracing::debug!(
            account = %account_id,
            %due_month,
            start = %window.start,
            end = %window.end,
            total = %total,
            "statement total"
        );
        Ok(total)
    }

    /// credit left after the statement total of `due_month`
    pub fn available_credit(
        &self,
        ledger: &(impl LedgerStore + ?Sized),
        account_id: AccountId,
        due_month: MonthKey,
        meta: &CreditCardCycleMeta,
    ) -> Result<Option<Money>> {
        if meta.credit_limit.is_none() {
            return Ok(None);
        }
        let used = self.statement_total(ledger, account_id, due_month, meta)?;
        Ok(meta.available_after(used))
    }
}
