//! Collaborator contracts owned by the persistence layer.
//!
//! The engine only reads balances, scans the ledger for idempotency markers,
//! creates transactions and asks for obligation categories. Balance mutation
//! is a side effect of `create_transaction`, never invoked directly.

pub mod memory;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::DateRange;
use crate::decimal::Money;
use crate::errors::Result;
use crate::types::{AccountId, CategoryId, ObligationGroup, TransactionId, TransactionKind};

pub use memory::MemoryBook;

/// transaction as stored in the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub amount: Money,
    pub category_id: Option<CategoryId>,
    pub account_id: AccountId,
    pub date: NaiveDate,
    pub memo: String,
}

/// transaction creation request
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub kind: TransactionKind,
    pub amount: Money,
    pub category_id: Option<CategoryId>,
    pub account_id: AccountId,
    pub date: NaiveDate,
    pub memo: String,
}

/// ledger store contract
pub trait LedgerStore {
    fn list_transactions(
        &self,
        account_id: Option<AccountId>,
        range: Option<DateRange>,
    ) -> Result<Vec<LedgerTransaction>>;

    fn create_transaction(&mut self, transaction: NewTransaction) -> Result<LedgerTransaction>;

    /// exact memo match within a date range
    fn has_memo(&self, memo: &str, range: Option<DateRange>) -> Result<bool> {
        Ok(self
            .list_transactions(None, range)?
            .iter()
            .any(|t| t.memo == memo))
    }
}

/// account balance store contract
pub trait AccountStore {
    /// None when the account does not exist
    fn balance(&self, account_id: AccountId) -> Result<Option<Money>>;

    fn account_name(&self, account_id: AccountId) -> Result<Option<String>>;
}

/// category store contract
pub trait CategoryStore {
    /// ensure a leaf expense category named after the obligation exists
    /// under the group-level parent, returning its id
    fn ensure_obligation_category(
        &mut self,
        group: &ObligationGroup,
        obligation_name: &str,
    ) -> Result<CategoryId>;
}

/// all three collaborators behind one persistence facade
pub trait FinanceStore: LedgerStore + AccountStore + CategoryStore {}

impl<T: LedgerStore + AccountStore + CategoryStore + ?Sized> FinanceStore for T {}
