/// serializable views for the ui layer
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::credit::{CreditCardCycleMeta, CreditCycleResolver};
use crate::dates::{DateRange, MonthKey};
use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::loans::{Installment, Loan, LoanScheduleEngine};
use crate::stores::LedgerStore;
use crate::types::{AccountId, LoanId, RepaymentType};

/// serializable view of a loan's state
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanView {
    pub id: LoanId,
    pub name: String,
    pub settled: bool,
    pub financial: LoanFinancialView,
    pub schedule: LoanScheduleView,
    pub metadata: LoanMetadataView,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanFinancialView {
    pub principal: Money,
    pub remaining_principal: Money,
    pub principal_paid: Money,
    pub annual_rate: Rate,
    pub monthly_payment: Money,
    /// interest still ahead on the current schedule
    pub projected_interest: Money,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanScheduleView {
    pub term_months: u32,
    pub paid_months: u32,
    pub remaining_months: u32,
    pub next_due_date: Option<NaiveDate>,
    pub next_payment_amount: Option<Money>,
    pub settled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanMetadataView {
    pub repayment_type: RepaymentType,
    pub start_date: NaiveDate,
    pub due_day: u32,
    pub account_id: AccountId,
}

impl LoanView {
    pub fn from_loan(loan: &Loan, engine: &LoanScheduleEngine) -> Self {
        let schedule = engine.project_schedule(loan);
        let next: Option<&Installment> = schedule.installments.first();

        LoanView {
            id: loan.id,
            name: loan.name.clone(),
            settled: loan.is_settled(),
            financial: LoanFinancialView {
                principal: loan.principal,
                remaining_principal: loan.remaining_principal,
                principal_paid: loan.principal - loan.remaining_principal,
                annual_rate: loan.annual_rate,
                monthly_payment: loan.monthly_payment,
                projected_interest: schedule.total_interest,
            },
            schedule: LoanScheduleView {
                term_months: loan.term_months,
                paid_months: loan.paid_months,
                remaining_months: loan.remaining_months(),
                next_due_date: loan.next_due_date,
                next_payment_amount: next.map(|i| i.payment),
                settled_at: loan.settled_at,
            },
            metadata: LoanMetadataView {
                repayment_type: loan.repayment_type,
                start_date: loan.start_date,
                due_day: loan.due_day,
                account_id: loan.account_id,
            },
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// one credit card statement
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardStatementView {
    pub account_id: AccountId,
    pub due_month: MonthKey,
    pub cycle: DateRange,
    pub due_date: NaiveDate,
    pub statement_total: Money,
    pub credit_limit: Option<Money>,
    pub available_credit: Option<Money>,
}

impl CardStatementView {
    pub fn build(
        resolver: &CreditCycleResolver,
        ledger: &(impl LedgerStore + ?Sized),
        account_id: AccountId,
        due_month: MonthKey,
        meta: &CreditCardCycleMeta,
    ) -> Result<Self> {
        let statement_total = resolver.statement_total(ledger, account_id, due_month, meta)?;
        let available_credit = meta.available_after(statement_total);

        Ok(CardStatementView {
            account_id,
            due_month,
            cycle: resolver.cycle_range_for_due_month(due_month, meta),
            due_date: resolver.due_date_for_month(due_month, meta),
            statement_total,
            credit_limit: meta.credit_limit,
            available_credit,
        })
    }
}
