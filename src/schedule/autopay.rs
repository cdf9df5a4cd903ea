use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::dates::{DateRange, MonthKey};
use crate::decimal::Money;
use crate::events::{Event, EventStore};
use crate::obligation::RecurringObligation;
use crate::stores::{FinanceStore, NewTransaction};
use crate::types::{ObligationId, TransactionId, TransactionKind};

use super::cadence::DateCadence;
use super::projector::ObligationProjector;
use super::status::StatusResolver;

/// why an occurrence was not posted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum BlockReason {
    AccountMissing,
    InsufficientBalance { balance: Money, amount: Money },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockedOccurrence {
    pub due_date: NaiveDate,
    pub reason: BlockReason,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostingFailure {
    pub due_date: NaiveDate,
    pub message: String,
}

/// outcome of one autopay pass over an obligation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostingReport {
    pub obligation_id: ObligationId,
    /// transactions created by this pass
    pub posted: Vec<TransactionId>,
    pub already_posted: Vec<NaiveDate>,
    pub blocked: Vec<BlockedOccurrence>,
    pub failures: Vec<PostingFailure>,
}

impl PostingReport {
    fn new(obligation_id: ObligationId) -> Self {
        Self {
            obligation_id,
            posted: Vec::new(),
            already_posted: Vec::new(),
            blocked: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// every attempted posting succeeded
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// posts one ledger transaction per reached due date of the current month
#[derive(Debug, Clone)]
pub struct AutopayPoster {
    projector: ObligationProjector,
    resolver: StatusResolver,
    require_sufficient_balance: bool,
}

impl Default for AutopayPoster {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl AutopayPoster {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            projector: ObligationProjector::new(DateCadence::from_config(config)),
            resolver: StatusResolver::from_config(config),
            require_sufficient_balance: config.require_sufficient_balance,
        }
    }

    /// post every occurrence in `through`'s month dated on or before `through`
    ///
    /// Earlier months are never posted retroactively. Safe to call repeatedly:
    /// an occurrence whose marker is already in the ledger is skipped. A
    /// failure on one occurrence is recorded and the rest are still attempted.
    pub fn post_due_occurrences<S>(
        &self,
        obligation: &mut RecurringObligation,
        through: NaiveDate,
        store: &mut S,
        events: &mut EventStore,
    ) -> PostingReport
    where
        S: FinanceStore + ?Sized,
    {
        let mut report = PostingReport::new(obligation.id);
        let window = DateRange {
            start: MonthKey::of(through).first_day(),
            end: through,
        };
        let due_dates = self.projector.occurrences_between(obligation, window);

        for due_date in due_dates {
            let marker = self.resolver.marker(obligation, due_date);

            match store.has_memo(&marker, Some(self.resolver.scan_range(due_date))) {
                Ok(true) => {
                    report.already_posted.push(due_date);
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    self.record_failure(obligation, due_date, e.to_string(), &mut report, events);
                    continue;
                }
            }

            if self.require_sufficient_balance {
                let reason = match store.balance(obligation.account_id) {
                    Ok(Some(balance)) if balance >= obligation.amount => None,
                    Ok(Some(balance)) => Some(BlockReason::InsufficientBalance {
                        balance,
                        amount: obligation.amount,
                    }),
                    Ok(None) => Some(BlockReason::AccountMissing),
                    Err(e) => {
                        self.record_failure(obligation, due_date, e.to_string(), &mut report, events);
                        continue;
                    }
                };

                if let Some(reason) = reason {
                    tracing::info!(
                        obligation = %obligation.id,
                        %due_date,
                        ?reason,
                        "autopay blocked"
                    );
                    events.emit(Event::OccurrenceBlocked {
                        obligation_id: obligation.id,
                        due_date,
                        reason: reason.clone(),
                    });
                    report.blocked.push(BlockedOccurrence { due_date, reason });
                    continue;
                }
            }

            self.ensure_category(obligation, &mut *store, events);

            let request = NewTransaction {
                kind: TransactionKind::Expense,
                amount: obligation.amount,
                category_id: obligation.category_id,
                account_id: obligation.account_id,
                date: due_date,
                memo: marker,
            };

            match store.create_transaction(request) {
                Ok(transaction) => {
                    tracing::info!(
                        obligation = %obligation.id,
                        %due_date,
                        amount = %obligation.amount,
                        transaction = %transaction.id,
                        "autopay posted"
                    );
                    events.emit(Event::OccurrencePosted {
                        obligation_id: obligation.id,
                        due_date,
                        amount: obligation.amount,
                        transaction_id: transaction.id,
                    });
                    report.posted.push(transaction.id);
                }
                Err(e) => {
                    self.record_failure(obligation, due_date, e.to_string(), &mut report, events);
                }
            }
        }

        report
    }

    /// link the obligation's expense category on first posting
    fn ensure_category<S>(&self, obligation: &mut RecurringObligation, store: &mut S, events: &mut EventStore)
    where
        S: FinanceStore + ?Sized,
    {
        if obligation.category_id.is_some() {
            return;
        }

        match store.ensure_obligation_category(&obligation.group, &obligation.name) {
            Ok(category_id) => {
                obligation.link_category(category_id);
                events.emit(Event::CategoryLinked {
                    obligation_id: obligation.id,
                    category_id,
                });
            }
            Err(e) => {
                tracing::warn!(
                    obligation = %obligation.id,
                    error = %e,
                    "could not ensure obligation category, posting uncategorized"
                );
            }
        }
    }

    fn record_failure(
        &self,
        obligation: &RecurringObligation,
        due_date: NaiveDate,
        message: String,
        report: &mut PostingReport,
        events: &mut EventStore,
    ) {
        tracing::warn!(
            obligation = %obligation.id,
            %due_date,
            error = %message,
            "autopay posting failed, continuing with remaining occurrences"
        );
        events.emit(Event::OccurrencePostingFailed {
            obligation_id: obligation.id,
            due_date,
            message: message.clone(),
        });
        report.failures.push(PostingFailure { due_date, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::{AccountStore, LedgerStore, MemoryBook};
    use crate::types::{Cadence, ObligationGroup};
    use uuid::Uuid;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bill(account_id: Uuid, cadence: Cadence, anchor: NaiveDate, amount: i64) -> RecurringObligation {
        RecurringObligation {
            id: Uuid::new_v4(),
            name: "Streaming".to_string(),
            group: ObligationGroup::Subscription,
            amount: Money::from_major(amount),
            cadence,
            first_payment_date: anchor,
            account_id,
            category_id: None,
        }
    }

    #[test]
    fn test_posts_once_and_is_idempotent() {
        let mut book = MemoryBook::new();
        let account = book.open_account("Checking", Money::from_major(50_000));
        let mut rent = bill(account, Cadence::Monthly, d(2024, 11, 2), 17_000);
        let poster = AutopayPoster::default();
        let mut events = EventStore::new();

        let first = poster.post_due_occurrences(&mut rent, d(2025, 1, 5), &mut book, &mut events);
        assert_eq!(first.posted.len(), 1);
        assert!(first.is_complete());

        let second = poster.post_due_occurrences(&mut rent, d(2025, 1, 5), &mut book, &mut events);
        assert!(second.posted.is_empty());
        assert_eq!(second.already_posted, vec![d(2025, 1, 2)]);

        let transactions = book.transactions();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].memo, format!("AUTO_BILL|{}|2025-01-02", rent.id));
        assert_eq!(transactions[0].date, d(2025, 1, 2));
        assert_eq!(book.balance(account).unwrap(), Some(Money::from_major(33_000)));
    }

    #[test]
    fn test_never_posts_previous_months() {
        let mut book = MemoryBook::new();
        let account = book.open_account("Checking", Money::from_major(1_000));
        let mut gym = bill(account, Cadence::Weekly, d(2024, 6, 3), 10);
        let poster = AutopayPoster::default();
        let mut events = EventStore::new();

        let report = poster.post_due_occurrences(&mut gym, d(2025, 1, 14), &mut book, &mut events);

        // only Jan 6 and Jan 13 of the current month
        assert_eq!(report.posted.len(), 2);
        let dates: Vec<_> = book.transactions().iter().map(|t| t.date).collect();
        assert_eq!(dates, vec![d(2025, 1, 6), d(2025, 1, 13)]);
    }

    #[test]
    fn test_failure_does_not_abort_batch() {
        let mut book = MemoryBook::new();
        let account = book.open_account("Checking", Money::from_major(1_000));
        let mut gym = bill(account, Cadence::Weekly, d(2025, 1, 1), 10);
        book.fail_writes_on(d(2025, 1, 8));
        let poster = AutopayPoster::default();
        let mut events = EventStore::new();

        let report = poster.post_due_occurrences(&mut gym, d(2025, 1, 20), &mut book, &mut events);

        assert_eq!(report.posted.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].due_date, d(2025, 1, 8));
        assert!(!report.is_complete());

        // retry after the store recovers only fills the gap
        book.clear_failures();
        let retry = poster.post_due_occurrences(&mut gym, d(2025, 1, 20), &mut book, &mut events);
        assert_eq!(retry.posted.len(), 1);
        assert_eq!(retry.already_posted.len(), 2);
        assert_eq!(book.transactions().len(), 3);
    }

    #[test]
    fn test_blocked_when_balance_short_or_account_missing() {
        let mut book = MemoryBook::new();
        let poor = book.open_account("Savings", Money::from_major(5));
        let mut short = bill(poor, Cadence::Monthly, d(2025, 1, 3), 10);
        let mut orphan = bill(Uuid::new_v4(), Cadence::Monthly, d(2025, 1, 3), 10);
        let poster = AutopayPoster::default();
        let mut events = EventStore::new();

        let report = poster.post_due_occurrences(&mut short, d(2025, 1, 4), &mut book, &mut events);
        assert!(report.posted.is_empty());
        assert!(matches!(report.blocked[0].reason, BlockReason::InsufficientBalance { .. }));

        let report = poster.post_due_occurrences(&mut orphan, d(2025, 1, 4), &mut book, &mut events);
        assert_eq!(report.blocked[0].reason, BlockReason::AccountMissing);
        assert!(book.transactions().is_empty());

        let reasons: Vec<_> = events
            .events()
            .iter()
            .filter_map(|e| match e {
                Event::OccurrenceBlocked { reason, .. } => Some(reason.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            reasons,
            vec![
                BlockReason::InsufficientBalance {
                    balance: Money::from_major(5),
                    amount: Money::from_major(10),
                },
                BlockReason::AccountMissing,
            ]
        );
    }

    #[test]
    fn test_blocked_event_keeps_structured_reason() {
        let event = Event::OccurrenceBlocked {
            obligation_id: Uuid::new_v4(),
            due_date: d(2025, 1, 3),
            reason: BlockReason::InsufficientBalance {
                balance: Money::from_major(5),
                amount: Money::from_major(10),
            },
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["OccurrenceBlocked"]["reason"]["reason"], "insufficient_balance");

        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_unconditional_autopay_ignores_balance() {
        let mut book = MemoryBook::new();
        let poor = book.open_account("Card", Money::ZERO);
        let mut short = bill(poor, Cadence::Monthly, d(2025, 1, 3), 10);
        let poster = AutopayPoster::from_config(&EngineConfig::unconditional_autopay());
        let mut events = EventStore::new();

        let report = poster.post_due_occurrences(&mut short, d(2025, 1, 4), &mut book, &mut events);
        assert_eq!(report.posted.len(), 1);
        assert_eq!(book.balance(poor).unwrap(), Some(Money::from_major(-10)));
    }

    #[test]
    fn test_links_category_lazily() {
        let mut book = MemoryBook::new();
        let account = book.open_account("Checking", Money::from_major(100));
        let mut stream = bill(account, Cadence::Monthly, d(2025, 1, 3), 10);
        let poster = AutopayPoster::default();
        let mut events = EventStore::new();

        poster.post_due_occurrences(&mut stream, d(2025, 1, 4), &mut book, &mut events);

        let category = stream.category_id.unwrap();
        assert_eq!(book.transactions()[0].category_id, Some(category));
        assert!(events
            .events()
            .iter()
            .any(|e| matches!(e, Event::CategoryLinked { .. })));
    }

    #[test]
    fn test_category_failure_posts_uncategorized() {
        let mut book = MemoryBook::new();
        let account = book.open_account("Checking", Money::from_major(100));
        book.fail_categories();
        let mut stream = bill(account, Cadence::Monthly, d(2025, 1, 3), 10);
        let poster = AutopayPoster::default();
        let mut events = EventStore::new();

        let report = poster.post_due_occurrences(&mut stream, d(2025, 1, 4), &mut book, &mut events);
        assert_eq!(report.posted.len(), 1);
        assert!(stream.category_id.is_none());
        assert_eq!(book.list_transactions(None, None).unwrap()[0].category_id, None);
    }

    #[test]
    fn test_future_due_date_not_posted() {
        let mut book = MemoryBook::new();
        let account = book.open_account("Checking", Money::from_major(100));
        let mut stream = bill(account, Cadence::Monthly, d(2024, 12, 20), 10);
        let poster = AutopayPoster::default();
        let mut events = EventStore::new();

        let report = poster.post_due_occurrences(&mut stream, d(2025, 1, 19), &mut book, &mut events);
        assert!(report.posted.is_empty());
        assert!(events.is_empty());
    }
}
