use chrono::NaiveDate;

use crate::config::{EngineConfig, StatusPolicy};
use crate::dates::{DateRange, MonthKey};
use crate::decimal::Money;
use crate::errors::Result;
use crate::markers::occurrence_marker;
use crate::obligation::RecurringObligation;
use crate::stores::LedgerStore;
use crate::types::OccurrenceStatus;

/// derives the display status of a projected occurrence
#[derive(Debug, Clone)]
pub struct StatusResolver {
    policy: StatusPolicy,
    memo_prefix: String,
}

impl Default for StatusResolver {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl StatusResolver {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            policy: config.status_policy,
            memo_prefix: config.bill_memo_prefix.clone(),
        }
    }

    pub fn policy(&self) -> StatusPolicy {
        self.policy
    }

    /// idempotency marker for (obligation, due date)
    pub fn marker(&self, obligation: &RecurringObligation, due_date: NaiveDate) -> String {
        occurrence_marker(&self.memo_prefix, obligation.id, due_date)
    }

    /// resolve one occurrence; the ledger is only read for the current
    /// month once the due date has been reached
    pub fn resolve(
        &self,
        obligation: &RecurringObligation,
        due_date: NaiveDate,
        today: NaiveDate,
        balance: Option<Money>,
        ledger: &(impl LedgerStore + ?Sized),
    ) -> Result<OccurrenceStatus> {
        if let Some(status) = self.resolve_by_calendar(due_date, today) {
            return Ok(status);
        }

        let marker = self.marker(obligation, due_date);
        let posted = ledger.has_memo(&marker, Some(self.scan_range(due_date)))?;
        Ok(self.classify(posted, balance, obligation.amount))
    }

    /// statuses decided by the calendar alone
    pub fn resolve_by_calendar(&self, due_date: NaiveDate, today: NaiveDate) -> Option<OccurrenceStatus> {
        let due_month = MonthKey::of(due_date);
        let current = MonthKey::of(today);

        if due_month < current {
            // historical months are assumed settled
            Some(OccurrenceStatus::Paid)
        } else if due_month > current || today < due_date {
            Some(OccurrenceStatus::Scheduled)
        } else {
            None
        }
    }

    /// status of a reached, current-month occurrence
    pub fn classify(&self, posted: bool, balance: Option<Money>, amount: Money) -> OccurrenceStatus {
        if posted {
            return OccurrenceStatus::Paid;
        }

        // a missing account reads as an empty one
        let covered = balance.unwrap_or(Money::ZERO) >= amount;
        match (covered, self.policy) {
            (true, StatusPolicy::BalanceHeuristic) => OccurrenceStatus::Paid,
            (true, StatusPolicy::LedgerStrict) => OccurrenceStatus::Pending,
            (false, _) => OccurrenceStatus::Overdue,
        }
    }

    /// range scanned for a marker
    pub fn scan_range(&self, due_date: NaiveDate) -> DateRange {
        MonthKey::of(due_date).range()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::{MemoryBook, NewTransaction};
    use crate::types::{Cadence, ObligationGroup, TransactionKind};
    use uuid::Uuid;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn rent(account_id: Uuid) -> RecurringObligation {
        RecurringObligation {
            id: Uuid::new_v4(),
            name: "Rent".to_string(),
            group: ObligationGroup::Living,
            amount: Money::from_major(17_000),
            cadence: Cadence::Monthly,
            first_payment_date: d(2024, 11, 2),
            account_id,
            category_id: None,
        }
    }

    #[test]
    fn test_calendar_resolution() {
        let resolver = StatusResolver::default();
        let today = d(2025, 1, 5);

        assert_eq!(resolver.resolve_by_calendar(d(2024, 12, 2), today), Some(OccurrenceStatus::Paid));
        assert_eq!(resolver.resolve_by_calendar(d(2025, 2, 2), today), Some(OccurrenceStatus::Scheduled));
        assert_eq!(resolver.resolve_by_calendar(d(2025, 1, 20), today), Some(OccurrenceStatus::Scheduled));
        assert_eq!(resolver.resolve_by_calendar(d(2025, 1, 5), today), None);
        assert_eq!(resolver.resolve_by_calendar(d(2025, 1, 2), today), None);
    }

    #[test]
    fn test_balance_heuristic() {
        let mut book = MemoryBook::new();
        let rich = book.open_account("Checking", Money::from_major(20_000));
        let resolver = StatusResolver::default();
        let bill = rent(rich);

        let status = resolver
            .resolve(&bill, d(2025, 1, 2), d(2025, 1, 5), Some(Money::from_major(20_000)), &book)
            .unwrap();
        assert_eq!(status, OccurrenceStatus::Paid);

        let status = resolver
            .resolve(&bill, d(2025, 1, 2), d(2025, 1, 5), Some(Money::from_major(100)), &book)
            .unwrap();
        assert_eq!(status, OccurrenceStatus::Overdue);

        // missing account reads as zero balance
        let status = resolver.resolve(&bill, d(2025, 1, 2), d(2025, 1, 5), None, &book).unwrap();
        assert_eq!(status, OccurrenceStatus::Overdue);
    }

    #[test]
    fn test_posted_marker_is_paid_regardless_of_balance() {
        let mut book = MemoryBook::new();
        let account = book.open_account("Checking", Money::from_major(17_000));
        let resolver = StatusResolver::default();
        let bill = rent(account);

        book.create_transaction(NewTransaction {
            kind: TransactionKind::Expense,
            amount: bill.amount,
            category_id: None,
            account_id: account,
            date: d(2025, 1, 2),
            memo: resolver.marker(&bill, d(2025, 1, 2)),
        })
        .unwrap();

        let status = resolver
            .resolve(&bill, d(2025, 1, 2), d(2025, 1, 5), Some(Money::ZERO), &book)
            .unwrap();
        assert_eq!(status, OccurrenceStatus::Paid);
    }

    #[test]
    fn test_strict_policy_reports_pending() {
        let resolver = StatusResolver::from_config(&EngineConfig::strict());
        let amount = Money::from_major(50);

        assert_eq!(resolver.classify(false, Some(Money::from_major(60)), amount), OccurrenceStatus::Pending);
        assert_eq!(resolver.classify(true, Some(Money::ZERO), amount), OccurrenceStatus::Paid);
        assert_eq!(resolver.classify(false, Some(Money::from_major(10)), amount), OccurrenceStatus::Overdue);
    }
}
