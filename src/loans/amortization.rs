use rust_decimal::Decimal;
use serde::Serialize;

use crate::decimal::{Money, Rate};
use crate::types::RepaymentType;

use super::loan::Loan;

/// one period of a repayment schedule
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    pub period: u32,
    pub due_date: chrono::NaiveDate,
    pub beginning_balance: Money,
    pub principal_portion: Money,
    pub interest_portion: Money,
    pub payment: Money,
    pub ending_balance: Money,
}

/// full remaining schedule of a loan
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationSchedule {
    pub installments: Vec<Installment>,
    pub total_interest: Money,
    pub total_payment: Money,
}

impl AmortizationSchedule {
    pub fn from_installments(installments: Vec<Installment>) -> Self {
        let total_interest = installments.iter().map(|i| i.interest_portion).sum();
        let total_payment = installments.iter().map(|i| i.payment).sum();
        Self {
            installments,
            total_interest,
            total_payment,
        }
    }

    pub fn total_principal(&self) -> Money {
        self.installments.iter().map(|i| i.principal_portion).sum()
    }

    /// get installment for a specific period
    pub fn get(&self, period: u32) -> Option<&Installment> {
        self.installments.iter().find(|i| i.period == period)
    }
}

/// (1 + r)^n, None once it leaves the decimal range
fn compound_factor(rate: Decimal, periods: u32) -> Option<Decimal> {
    let base = Decimal::ONE.checked_add(rate)?;
    let mut factor = Decimal::ONE;
    for _ in 0..periods {
        factor = factor.checked_mul(base)?;
    }
    Some(factor)
}

/// annuity payment P·r / (1 − (1+r)^−n), or P/n when r == 0
///
/// When (1+r)^n is too large to represent the discount term vanishes and
/// the payment converges to the interest-only amount P·r.
pub fn annuity_payment(principal: Money, monthly_rate: Rate, months: u32) -> Money {
    if months == 0 {
        return principal;
    }

    let r = monthly_rate.as_decimal();
    if r.is_zero() {
        return principal / Decimal::from(months);
    }

    let discount = compound_factor(r, months)
        .and_then(|compound| Decimal::ONE.checked_div(compound))
        .map(|inverse| Decimal::ONE - inverse);

    let payment = discount
        .filter(|discount| !discount.is_zero())
        .and_then(|discount| principal.as_decimal().checked_mul(r)?.checked_div(discount));

    match payment {
        Some(payment) => Money::from_decimal(payment),
        None => principal.interest_at(monthly_rate),
    }
}

/// constant principal portion of a principal-equal loan
pub fn fixed_principal_portion(principal: Money, term_months: u32) -> Money {
    if term_months == 0 {
        return principal;
    }
    principal / Decimal::from(term_months)
}

/// payment due for the first period, before any state exists
pub fn initial_payment(
    repayment_type: RepaymentType,
    principal: Money,
    monthly_rate: Rate,
    term_months: u32,
) -> Money {
    match repayment_type {
        RepaymentType::Amortized => annuity_payment(principal, monthly_rate, term_months),
        RepaymentType::InterestOnly => principal.interest_at(monthly_rate),
        RepaymentType::PrincipalEqual => {
            fixed_principal_portion(principal, term_months) + principal.interest_at(monthly_rate)
        }
    }
}

/// installment for the loan's next unpaid period, None once settled
///
/// The final period always takes the whole remaining balance so the loan
/// closes at exactly zero.
pub fn next_installment(loan: &Loan) -> Option<Installment> {
    let due_date = loan.next_due_date?;
    let period = loan.paid_months + 1;
    let balance = loan.remaining_principal;
    let rate = loan.monthly_rate();
    let interest = balance.interest_at(rate);
    let is_final = period >= loan.term_months;

    let principal = if is_final {
        balance
    } else {
        match loan.repayment_type {
            RepaymentType::Amortized => (loan.monthly_payment - interest).max(Money::ZERO).min(balance),
            RepaymentType::InterestOnly => Money::ZERO,
            RepaymentType::PrincipalEqual => {
                fixed_principal_portion(loan.principal, loan.term_months).min(balance)
            }
        }
    };

    Some(Installment {
        period,
        due_date,
        beginning_balance: balance,
        principal_portion: principal,
        interest_portion: interest,
        payment: principal + interest,
        ending_balance: balance - principal,
    })
}
