use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// unique identifier for a recurring obligation
pub type ObligationId = Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// account reference owned by the account store
pub type AccountId = Uuid;

/// category reference owned by the category store
pub type CategoryId = Uuid;

/// transaction reference owned by the ledger store
pub type TransactionId = Uuid;

/// recurrence cadence of an obligation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cadence {
    Weekly,
    Monthly,
    Yearly,
    /// every n days; n == 0 marks a malformed record that is never due
    CustomDays(u32),
}

impl Cadence {
    /// fixed step in days for linear cadences
    pub fn step_days(&self) -> Option<i64> {
        match self {
            Cadence::Weekly => Some(7),
            Cadence::CustomDays(n) if *n > 0 => Some(*n as i64),
            Cadence::CustomDays(_) => None,
            Cadence::Monthly | Cadence::Yearly => None,
        }
    }

    /// cadence can produce at least one occurrence
    pub fn is_valid(&self) -> bool {
        !matches!(self, Cadence::CustomDays(0))
    }

    /// persisted tag
    pub fn as_tag(&self) -> &'static str {
        match self {
            Cadence::Weekly => "weekly",
            Cadence::Monthly => "monthly",
            Cadence::Yearly => "yearly",
            Cadence::CustomDays(_) => "custom_days",
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::CustomDays(n) => write!(f, "every {} days", n),
            other => write!(f, "{}", other.as_tag()),
        }
    }
}

/// grouping tag of an obligation, drives the parent expense category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObligationGroup {
    Living,
    Utility,
    Subscription,
    Custom(String),
}

impl ObligationGroup {
    pub fn as_tag(&self) -> &'static str {
        match self {
            ObligationGroup::Living => "living",
            ObligationGroup::Utility => "utility",
            ObligationGroup::Subscription => "subscription",
            ObligationGroup::Custom(_) => "custom",
        }
    }

    /// display name of the group-level parent category
    pub fn label(&self) -> &str {
        match self {
            ObligationGroup::Living => "Living",
            ObligationGroup::Utility => "Utilities",
            ObligationGroup::Subscription => "Subscriptions",
            ObligationGroup::Custom(label) => label,
        }
    }
}

/// loan repayment structure, fixed for the loan's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepaymentType {
    /// constant annuity payment
    Amortized,
    /// interest each period, principal as a balloon at term end
    InterestOnly,
    /// constant principal portion, declining payment
    PrincipalEqual,
}

/// derived status of one occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceStatus {
    /// due date still ahead
    Scheduled,
    /// posted, historical, or covered by the balance heuristic
    Paid,
    /// balance covers it but nothing is posted yet (strict policy only)
    Pending,
    /// due date passed and the balance cannot cover it
    Overdue,
}

/// ledger transaction direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}
