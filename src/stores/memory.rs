use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::dates::DateRange;
use crate::decimal::Money;
use crate::errors::{Result, ScheduleError};
use crate::types::{AccountId, CategoryId, ObligationGroup, TransactionKind};

use super::{AccountStore, CategoryStore, LedgerStore, LedgerTransaction, NewTransaction};

#[derive(Debug, Clone)]
struct AccountEntry {
    name: String,
    balance: Money,
}

/// stored category node
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryEntry {
    pub id: CategoryId,
    pub name: String,
    pub parent_id: Option<CategoryId>,
}

/// in-memory ledger, account and category store
///
/// Balances move as a side effect of transaction creation. Write failures
/// can be injected per transaction date.
#[derive(Debug, Default)]
pub struct MemoryBook {
    accounts: HashMap<AccountId, AccountEntry>,
    transactions: Vec<LedgerTransaction>,
    categories: Vec<CategoryEntry>,
    failing_dates: HashSet<NaiveDate>,
    category_store_down: bool,
}

impl MemoryBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// open an account with an initial balance
    pub fn open_account(&mut self, name: impl Into<String>, balance: Money) -> AccountId {
        let id = Uuid::new_v4();
        self.accounts.insert(
            id,
            AccountEntry {
                name: name.into(),
                balance,
            },
        );
        id
    }

    pub fn close_account(&mut self, account_id: AccountId) {
        self.accounts.remove(&account_id);
    }

    pub fn transactions(&self) -> &[LedgerTransaction] {
        &self.transactions
    }

    pub fn categories(&self) -> &[CategoryEntry] {
        &self.categories
    }

    /// make every write dated `date` fail
    pub fn fail_writes_on(&mut self, date: NaiveDate) {
        self.failing_dates.insert(date);
    }

    pub fn clear_failures(&mut self) {
        self.failing_dates.clear();
        self.category_store_down = false;
    }

    /// make category creation fail
    pub fn fail_categories(&mut self) {
        self.category_store_down = true;
    }

    fn ensure_category(&mut self, name: &str, parent_id: Option<CategoryId>) -> CategoryId {
        if let Some(existing) = self
            .categories
            .iter()
            .find(|c| c.name == name && c.parent_id == parent_id)
        {
            return existing.id;
        }

        let id = Uuid::new_v4();
        self.categories.push(CategoryEntry {
            id,
            name: name.to_string(),
            parent_id,
        });
        id
    }
}

impl LedgerStore for MemoryBook {
    fn list_transactions(
        &self,
        account_id: Option<AccountId>,
        range: Option<DateRange>,
    ) -> Result<Vec<LedgerTransaction>> {
        Ok(self
            .transactions
            .iter()
            .filter(|t| account_id.map_or(true, |id| t.account_id == id))
            .filter(|t| range.map_or(true, |r| r.contains(t.date)))
            .cloned()
            .collect())
    }

    fn create_transaction(&mut self, transaction: NewTransaction) -> Result<LedgerTransaction> {
        if self.failing_dates.contains(&transaction.date) {
            return Err(ScheduleError::LedgerWrite {
                date: transaction.date,
                message: "injected write failure".to_string(),
            });
        }

        let account = self
            .accounts
            .get_mut(&transaction.account_id)
            .ok_or(ScheduleError::AccountNotFound {
                account_id: transaction.account_id,
            })?;

        match transaction.kind {
            TransactionKind::Expense => account.balance -= transaction.amount,
            TransactionKind::Income => account.balance += transaction.amount,
        }

        let stored = LedgerTransaction {
            id: Uuid::new_v4(),
            kind: transaction.kind,
            amount: transaction.amount,
            category_id: transaction.category_id,
            account_id: transaction.account_id,
            date: transaction.date,
            memo: transaction.memo,
        };
        self.transactions.push(stored.clone());
        Ok(stored)
    }
}

impl AccountStore for MemoryBook {
    fn balance(&self, account_id: AccountId) -> Result<Option<Money>> {
        Ok(self.accounts.get(&account_id).map(|a| a.balance))
    }

    fn account_name(&self, account_id: AccountId) -> Result<Option<String>> {
        Ok(self.accounts.get(&account_id).map(|a| a.name.clone()))
    }
}

impl CategoryStore for MemoryBook {
    fn ensure_obligation_category(
        &mut self,
        group: &ObligationGroup,
        obligation_name: &str,
    ) -> Result<CategoryId> {
        if self.category_store_down {
            return Err(ScheduleError::Store {
                message: "category store unavailable".to_string(),
            });
        }

        let parent = self.ensure_category(group.label(), None);
        Ok(self.ensure_category(obligation_name, Some(parent)))
    }
}
