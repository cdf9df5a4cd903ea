use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{Result, ScheduleError};
use crate::types::{AccountId, Cadence, CategoryId, ObligationGroup, ObligationId, OccurrenceStatus};

/// a user-defined recurring bill
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringObligation {
    pub id: ObligationId,
    pub name: String,
    pub group: ObligationGroup,
    pub amount: Money,
    pub cadence: Cadence,
    /// first occurrence, never moves
    pub first_payment_date: NaiveDate,
    pub account_id: AccountId,
    /// expense category, linked lazily on first posting
    pub category_id: Option<CategoryId>,
}

impl RecurringObligation {
    pub fn builder() -> ObligationBuilder {
        ObligationBuilder::new()
    }

    pub fn link_category(&mut self, category_id: CategoryId) {
        self.category_id = Some(category_id);
    }
}

/// one projected instance of an obligation, recomputed on every query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObligationOccurrence {
    pub obligation_id: ObligationId,
    pub name: String,
    pub due_date: NaiveDate,
    pub amount: Money,
    pub status: OccurrenceStatus,
    /// None when the paying account no longer exists
    pub account_name: Option<String>,
}

/// builder for obligations, enforces the cadence and group invariants
#[derive(Debug, Default)]
pub struct ObligationBuilder {
    id: Option<ObligationId>,
    name: Option<String>,
    group: Option<ObligationGroup>,
    amount: Option<Money>,
    cadence: Option<Cadence>,
    first_payment_date: Option<NaiveDate>,
    account_id: Option<AccountId>,
    category_id: Option<CategoryId>,
}

impl ObligationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: ObligationId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn group(mut self, group: ObligationGroup) -> Self {
        self.group = Some(group);
        self
    }

    pub fn amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = Some(cadence);
        self
    }

    pub fn first_payment_date(mut self, date: NaiveDate) -> Self {
        self.first_payment_date = Some(date);
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

    pub fn build(self) -> Result<RecurringObligation> {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or(ScheduleError::InvalidConfiguration {
                message: "Name required".to_string(),
            })?;

        let amount = self.amount.ok_or(ScheduleError::InvalidConfiguration {
            message: "Amount required".to_string(),
        })?;
        if !amount.is_positive() {
            return Err(ScheduleError::InvalidAmount { amount });
        }

        let cadence = self.cadence.unwrap_or(Cadence::Monthly);
        if !cadence.is_valid() {
            return Err(ScheduleError::InvalidConfiguration {
                message: "custom_days cadence requires a positive interval".to_string(),
            });
        }

        let group = self.group.unwrap_or(ObligationGroup::Living);
        if let ObligationGroup::Custom(label) = &group {
            if label.trim().is_empty() {
                return Err(ScheduleError::InvalidConfiguration {
                    message: "custom group requires a label".to_string(),
                });
            }
        }

        let first_payment_date =
            self.first_payment_date
                .ok_or(ScheduleError::InvalidConfiguration {
                    message: "First payment date required".to_string(),
                })?;

        let account_id = self.account_id.ok_or(ScheduleError::InvalidConfiguration {
            message: "Paying account required".to_string(),
        })?;

        Ok(RecurringObligation {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            name,
            group,
            amount,
            cadence,
            first_payment_date,
            account_id,
            category_id: self.category_id,
        })
    }
}
