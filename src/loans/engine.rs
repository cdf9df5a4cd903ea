use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::dates::{DateRange, MonthKey};
use crate::decimal::{Money, Rate};
use crate::errors::{Result, ScheduleError};
use crate::events::{Event, EventStore};
use crate::markers::{occurrence_marker, settlement_marker};
use crate::stores::{LedgerStore, NewTransaction};
use crate::types::{LoanId, RepaymentType, TransactionId, TransactionKind};

use super::amortization::{
    annuity_payment, fixed_principal_portion, next_installment, AmortizationSchedule, Installment,
};
use super::loan::Loan;

/// outcome of a catch-up pass over crossed due dates
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanPostingReport {
    pub loan_id: LoanId,
    pub installments: Vec<Installment>,
    pub transactions: Vec<TransactionId>,
    /// due dates whose marker was already in the ledger
    pub recovered: Vec<NaiveDate>,
    pub matured: bool,
}

/// outcome of a manual settlement
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReceipt {
    pub loan_id: LoanId,
    pub period: u32,
    pub date: NaiveDate,
    pub applied: Money,
    pub remaining_principal: Money,
    pub transaction_id: Option<TransactionId>,
    pub fully_settled: bool,
}

/// edits applied to a live loan
#[derive(Debug, Clone, Default)]
pub struct LoanTermsUpdate {
    pub name: Option<String>,
    pub annual_rate: Option<Rate>,
    pub due_day: Option<u32>,
}

/// advances loan state on crossed due dates and settlements
#[derive(Debug, Clone)]
pub struct LoanScheduleEngine {
    loan_memo_prefix: String,
    settle_memo_prefix: String,
}

impl Default for LoanScheduleEngine {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl LoanScheduleEngine {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            loan_memo_prefix: config.loan_memo_prefix.clone(),
            settle_memo_prefix: config.settle_memo_prefix.clone(),
        }
    }

    pub fn installment_marker(&self, loan: &Loan, due_date: NaiveDate) -> String {
        occurrence_marker(&self.loan_memo_prefix, loan.id, due_date)
    }

    /// marker of a settlement applied against the loan's current state
    pub fn settlement_marker(&self, loan: &Loan, date: NaiveDate) -> String {
        settlement_marker(
            &self.settle_memo_prefix,
            loan.id,
            date,
            loan.paid_months + 1,
            loan.remaining_principal,
        )
    }

    /// installment due next, None once settled
    pub fn next_installment(&self, loan: &Loan) -> Option<Installment> {
        next_installment(loan)
    }

    /// remaining installment table, computed on a copy of the loan
    pub fn project_schedule(&self, loan: &Loan) -> AmortizationSchedule {
        let mut projected = loan.clone();
        let mut installments = Vec::with_capacity(loan.remaining_months() as usize);

        while let Some(installment) = next_installment(&projected) {
            advance(&mut projected, installment.principal_portion, true);
            installments.push(installment);
        }

        AmortizationSchedule::from_installments(installments)
    }

    /// post every installment whose due date is on or before today
    ///
    /// The ledger write happens before the state advances. A marker already
    /// in the ledger advances the state without a second posting, so an
    /// interrupted run resumes where it stopped.
    pub fn post_due_payments<S>(
        &self,
        loan: &mut Loan,
        store: &mut S,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<LoanPostingReport>
    where
        S: LedgerStore + ?Sized,
    {
        let now = time.now();
        let today = now.date_naive();
        let mut report = LoanPostingReport {
            loan_id: loan.id,
            installments: Vec::new(),
            transactions: Vec::new(),
            recovered: Vec::new(),
            matured: false,
        };

        while let Some(installment) = next_installment(loan) {
            if installment.due_date > today {
                break;
            }

            let marker = self.installment_marker(loan, installment.due_date);
            let window = MonthKey::of(installment.due_date).range();
            let transaction_id = if store.has_memo(&marker, Some(window))? {
                tracing::info!(
                    loan = %loan.id,
                    due_date = %installment.due_date,
                    "installment already in ledger, advancing state"
                );
                report.recovered.push(installment.due_date);
                None
            } else {
                let created = store
                    .create_transaction(NewTransaction {
                        kind: TransactionKind::Expense,
                        amount: installment.payment,
                        category_id: loan.category_id,
                        account_id: loan.account_id,
                        date: installment.due_date,
                        memo: marker,
                    })
                    .map_err(|e| {
                        tracing::warn!(
                            loan = %loan.id,
                            due_date = %installment.due_date,
                            error = %e,
                            "installment posting failed"
                        );
                        e
                    })?;
                report.transactions.push(created.id);
                Some(created.id)
            };

            let terminal = advance(loan, installment.principal_portion, true);

            tracing::debug!(
                loan = %loan.id,
                period = installment.period,
                principal = %installment.principal_portion,
                interest = %installment.interest_portion,
                remaining = %loan.remaining_principal,
                "installment applied"
            );

            events.emit(Event::LoanPaymentPosted {
                loan_id: loan.id,
                period: installment.period,
                due_date: installment.due_date,
                principal_portion: installment.principal_portion,
                interest_portion: installment.interest_portion,
                remaining_principal: loan.remaining_principal,
                transaction_id,
            });
            report.installments.push(installment);

            if terminal {
                self.mark_settled(loan, now, events);
                report.matured = true;
            }
        }

        Ok(report)
    }

    /// apply a manual repayment on `date`
    ///
    /// `amount` defaults to the remaining principal and is clamped to it.
    /// The repayment counts as the next period unless it is a partial
    /// payment of the final period, which stays due.
    pub fn settle<S>(
        &self,
        loan: &mut Loan,
        amount: Option<Money>,
        date: NaiveDate,
        store: &mut S,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<SettlementReceipt>
    where
        S: LedgerStore + ?Sized,
    {
        if loan.is_settled() {
            return Err(ScheduleError::LoanSettled { loan_id: loan.id });
        }

        let requested = amount.unwrap_or(loan.remaining_principal);
        if !requested.is_positive() {
            return Err(ScheduleError::InvalidAmount { amount: requested });
        }
        let applied = requested.min(loan.remaining_principal);
        let period = loan.paid_months + 1;

        let marker = self.settlement_marker(loan, date);
        let transaction_id = if store.has_memo(&marker, Some(DateRange::day(date)))? {
            tracing::info!(loan = %loan.id, %date, period, "settlement already in ledger");
            None
        } else {
            let created = store.create_transaction(NewTransaction {
                kind: TransactionKind::Expense,
                amount: applied,
                category_id: loan.category_id,
                account_id: loan.account_id,
                date,
                memo: marker,
            })?;
            Some(created.id)
        };

        let clears_balance = applied == loan.remaining_principal;
        let consumes_period = clears_balance || period < loan.term_months;
        let terminal = advance(loan, applied, consumes_period);
        let now = time.now();

        tracing::info!(
            loan = %loan.id,
            applied = %applied,
            remaining = %loan.remaining_principal,
            "loan settlement applied"
        );

        if terminal {
            self.mark_settled(loan, now, events);
            events.emit(Event::LoanSettled {
                loan_id: loan.id,
                final_amount: applied,
                timestamp: now,
            });
        } else {
            events.emit(Event::LoanPartiallySettled {
                loan_id: loan.id,
                amount: applied,
                remaining_principal: loan.remaining_principal,
                timestamp: now,
            });
        }

        Ok(SettlementReceipt {
            loan_id: loan.id,
            period,
            date,
            applied,
            remaining_principal: loan.remaining_principal,
            transaction_id,
            fully_settled: terminal,
        })
    }

    /// edit a live loan; a rate change reprices the remaining schedule
    pub fn update_terms(&self, loan: &mut Loan, update: LoanTermsUpdate) -> Result<()> {
        if loan.is_settled() {
            return Err(ScheduleError::LoanSettled { loan_id: loan.id });
        }

        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ScheduleError::InvalidConfiguration {
                    message: "Name required".to_string(),
                });
            }
            loan.name = name;
        }

        if let Some(day) = update.due_day {
            if !(1..=31).contains(&day) {
                return Err(ScheduleError::InvalidDate {
                    message: format!("due day {day} outside 1-31"),
                });
            }
            loan.due_day = day;
            loan.next_due_date = Some(loan.due_date_for_period(loan.paid_months + 1));
        }

        if let Some(rate) = update.annual_rate {
            if rate.as_decimal().is_sign_negative() {
                return Err(ScheduleError::InvalidConfiguration {
                    message: format!("annual rate {rate} must not be negative"),
                });
            }
            loan.annual_rate = rate;
            loan.monthly_payment = match loan.repayment_type {
                RepaymentType::Amortized => annuity_payment(
                    loan.remaining_principal,
                    loan.monthly_rate(),
                    loan.remaining_months(),
                ),
                _ => regular_payment(loan),
            };
            tracing::info!(loan = %loan.id, rate = %rate, payment = %loan.monthly_payment, "loan repriced");
        }

        Ok(())
    }

    fn mark_settled(&self, loan: &mut Loan, now: DateTime<Utc>, events: &mut EventStore) {
        loan.settled_at = Some(now);
        tracing::info!(loan = %loan.id, paid_months = loan.paid_months, "loan settled");
        if loan.paid_months == loan.term_months {
            events.emit(Event::LoanMatured {
                loan_id: loan.id,
                paid_months: loan.paid_months,
                timestamp: now,
            });
        }
    }
}

/// regular payment of the variable-payment types at the current balance
fn regular_payment(loan: &Loan) -> Money {
    let interest = loan.remaining_principal.interest_at(loan.monthly_rate());
    match loan.repayment_type {
        RepaymentType::Amortized => loan.monthly_payment,
        RepaymentType::InterestOnly => interest,
        RepaymentType::PrincipalEqual => {
            fixed_principal_portion(loan.principal, loan.term_months).min(loan.remaining_principal)
                + interest
        }
    }
}

/// reduce principal and move to the next period, true once terminal
fn advance(loan: &mut Loan, principal_paid: Money, consumes_period: bool) -> bool {
    loan.remaining_principal = (loan.remaining_principal - principal_paid).max(Money::ZERO);
    if consumes_period {
        loan.paid_months = (loan.paid_months + 1).min(loan.term_months);
    }

    let terminal = loan.remaining_principal.is_zero() || loan.paid_months == loan.term_months;
    if terminal {
        loan.next_due_date = None;
    } else {
        loan.next_due_date = Some(loan.due_date_for_period(loan.paid_months + 1));
    }
    // amortized keeps its fixed payment, which shortens the term
    if loan.repayment_type != RepaymentType::Amortized {
        loan.monthly_payment = if terminal { Money::ZERO } else { regular_payment(loan) };
    }
    terminal
}
