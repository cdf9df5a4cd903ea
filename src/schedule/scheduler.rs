use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::Serialize;

use crate::config::EngineConfig;
use crate::dates::MonthKey;
use crate::decimal::Money;
use crate::events::EventStore;
use crate::obligation::{ObligationOccurrence, RecurringObligation};
use crate::stores::FinanceStore;
use crate::types::OccurrenceStatus;

use super::autopay::{AutopayPoster, PostingReport};
use super::cadence::DateCadence;
use super::projector::ObligationProjector;
use super::status::StatusResolver;

/// bills of one month as the calendar view renders them
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBills {
    pub month: MonthKey,
    pub occurrences: Vec<ObligationOccurrence>,
    pub postings: Vec<PostingReport>,
}

impl MonthlyBills {
    pub fn total(&self) -> Money {
        self.occurrences.iter().map(|o| o.amount).sum()
    }

    pub fn total_with_status(&self, status: OccurrenceStatus) -> Money {
        self.occurrences
            .iter()
            .filter(|o| o.status == status)
            .map(|o| o.amount)
            .sum()
    }

    /// some autopay attempt failed and should be retried
    pub fn has_failures(&self) -> bool {
        self.postings.iter().any(|p| !p.is_complete())
    }
}

/// project, autopost and resolve the bills of a month in one pass
#[derive(Debug, Clone)]
pub struct ObligationScheduler {
    projector: ObligationProjector,
    resolver: StatusResolver,
    poster: AutopayPoster,
}

impl Default for ObligationScheduler {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl ObligationScheduler {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            projector: ObligationProjector::new(DateCadence::from_config(config)),
            resolver: StatusResolver::from_config(config),
            poster: AutopayPoster::from_config(config),
        }
    }

    pub fn projector(&self) -> &ObligationProjector {
        &self.projector
    }

    pub fn resolver(&self) -> &StatusResolver {
        &self.resolver
    }

    pub fn poster(&self) -> &AutopayPoster {
        &self.poster
    }

    /// bills for `month` with "today" taken from the time provider
    pub fn bills_for_month<S>(
        &self,
        obligations: &mut [RecurringObligation],
        month: MonthKey,
        store: &mut S,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> MonthlyBills
    where
        S: FinanceStore + ?Sized,
    {
        self.bills_for_month_on(obligations, month, store, time.now().date_naive(), events)
    }

    /// bills for `month` as of `today`
    ///
    /// Autopay only runs when `month` is the current month. Statuses are
    /// resolved after posting so they reflect the updated ledger.
    pub fn bills_for_month_on<S>(
        &self,
        obligations: &mut [RecurringObligation],
        month: MonthKey,
        store: &mut S,
        today: NaiveDate,
        events: &mut EventStore,
    ) -> MonthlyBills
    where
        S: FinanceStore + ?Sized,
    {
        let mut postings = Vec::new();
        if month == MonthKey::of(today) {
            for obligation in obligations.iter_mut() {
                let report = self
                    .poster
                    .post_due_occurrences(obligation, today, &mut *store, events);
                postings.push(report);
            }
        }

        let mut occurrences = Vec::new();
        for obligation in obligations.iter() {
            let due_dates = self.projector.occurrences_in_month(obligation, month);
            if due_dates.is_empty() {
                continue;
            }

            let balance = store.balance(obligation.account_id).unwrap_or_else(|e| {
                tracing::warn!(account = %obligation.account_id, error = %e, "balance lookup failed");
                None
            });
            let account_name = store.account_name(obligation.account_id).ok().flatten();

            for due_date in due_dates {
                let status = self
                    .resolver
                    .resolve(obligation, due_date, today, balance, &*store)
                    .unwrap_or_else(|e| {
                        tracing::warn!(
                            obligation = %obligation.id,
                            %due_date,
                            error = %e,
                            "ledger scan failed, resolving without marker"
                        );
                        self.resolver.classify(false, balance, obligation.amount)
                    });

                occurrences.push(ObligationOccurrence {
                    obligation_id: obligation.id,
                    name: obligation.name.clone(),
                    due_date,
                    amount: obligation.amount,
                    status,
                    account_name: account_name.clone(),
                });
            }
        }

        occurrences.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.name.cmp(&b.name)));

        MonthlyBills {
            month,
            occurrences,
            postings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatusPolicy;
    use crate::stores::{AccountStore, MemoryBook};
    use crate::types::{Cadence, ObligationGroup};
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use uuid::Uuid;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn rent(account_id: Uuid) -> RecurringObligation {
        RecurringObligation::builder()
            .name("Rent")
            .group(ObligationGroup::Living)
            .amount(Money::from_major(17_000))
            .cadence(Cadence::Monthly)
            .first_payment_date(d(2024, 11, 2))
            .account(account_id)
            .build()
            .unwrap()
    }

    #[test]
    fn test_rent_scenario() {
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2025, 1, 5, 9, 0, 0).unwrap()
        ));
        let mut book = MemoryBook::new();
        let account = book.open_account("Main checking", Money::from_major(20_000));
        let mut obligations = vec![rent(account)];
        let scheduler = ObligationScheduler::default();
        let mut events = EventStore::new();

        let bills = scheduler.bills_for_month(
            &mut obligations,
            "2025-01".parse().unwrap(),
            &mut book,
            &time,
            &mut events,
        );

        assert_eq!(bills.occurrences.len(), 1);
        let occurrence = &bills.occurrences[0];
        assert_eq!(occurrence.due_date, d(2025, 1, 2));
        assert_eq!(occurrence.status, OccurrenceStatus::Paid);
        assert_eq!(occurrence.account_name.as_deref(), Some("Main checking"));
        assert_eq!(bills.postings[0].posted.len(), 1);

        let memo = format!("AUTO_BILL|{}|2025-01-02", obligations[0].id);
        assert_eq!(book.transactions().len(), 1);
        assert_eq!(book.transactions()[0].memo, memo);

        // page reload does not post again
        let again = scheduler.bills_for_month(
            &mut obligations,
            "2025-01".parse().unwrap(),
            &mut book,
            &time,
            &mut events,
        );
        assert_eq!(again.occurrences[0].status, OccurrenceStatus::Paid);
        assert_eq!(book.transactions().len(), 1);
        assert_eq!(book.balance(account).unwrap(), Some(Money::from_major(3_000)));
    }

    #[test]
    fn test_other_months_do_not_autopost() {
        let mut book = MemoryBook::new();
        let account = book.open_account("Checking", Money::from_major(100_000));
        let mut obligations = vec![rent(account)];
        let scheduler = ObligationScheduler::default();
        let mut events = EventStore::new();
        let today = d(2025, 1, 5);

        let past = scheduler.bills_for_month_on(&mut obligations, "2024-12".parse().unwrap(), &mut book, today, &mut events);
        assert_eq!(past.occurrences[0].status, OccurrenceStatus::Paid);

        let future = scheduler.bills_for_month_on(&mut obligations, "2025-02".parse().unwrap(), &mut book, today, &mut events);
        assert_eq!(future.occurrences[0].status, OccurrenceStatus::Scheduled);

        assert!(past.postings.is_empty());
        assert!(future.postings.is_empty());
        assert!(book.transactions().is_empty());
    }

    #[test]
    fn test_short_balance_is_overdue() {
        let mut book = MemoryBook::new();
        let account = book.open_account("Checking", Money::from_major(100));
        let mut obligations = vec![rent(account)];
        let scheduler = ObligationScheduler::default();
        let mut events = EventStore::new();

        let bills = scheduler.bills_for_month_on(
            &mut obligations,
            "2025-01".parse().unwrap(),
            &mut book,
            d(2025, 1, 5),
            &mut events,
        );

        assert_eq!(bills.occurrences[0].status, OccurrenceStatus::Overdue);
        assert_eq!(bills.total_with_status(OccurrenceStatus::Overdue), Money::from_major(17_000));
        assert!(book.transactions().is_empty());
    }

    #[test]
    fn test_missing_account_does_not_crash() {
        let mut book = MemoryBook::new();
        let mut obligations = vec![rent(Uuid::new_v4())];
        let scheduler = ObligationScheduler::default();
        let mut events = EventStore::new();

        let bills = scheduler.bills_for_month_on(
            &mut obligations,
            "2025-01".parse().unwrap(),
            &mut book,
            d(2025, 1, 5),
            &mut events,
        );

        assert_eq!(bills.occurrences[0].status, OccurrenceStatus::Overdue);
        assert_eq!(bills.occurrences[0].account_name, None);
    }

    #[test]
    fn test_strict_policy_after_posting_reads_paid() {
        let mut book = MemoryBook::new();
        let account = book.open_account("Checking", Money::from_major(20_000));
        let mut obligations = vec![rent(account)];
        let scheduler = ObligationScheduler::from_config(&EngineConfig::strict());
        assert_eq!(scheduler.resolver().policy(), StatusPolicy::LedgerStrict);
        let mut events = EventStore::new();

        let bills = scheduler.bills_for_month_on(
            &mut obligations,
            "2025-01".parse().unwrap(),
            &mut book,
            d(2025, 1, 5),
            &mut events,
        );

        // posted in the same pass, so the ledger marker decides
        assert_eq!(bills.occurrences[0].status, OccurrenceStatus::Paid);
    }

    #[test]
    fn test_occurrences_sorted_across_obligations() {
        let mut book = MemoryBook::new();
        let account = book.open_account("Checking", Money::from_major(100_000));
        let gym = RecurringObligation::builder()
            .name("Gym")
            .group(ObligationGroup::Subscription)
            .amount(Money::from_major(30))
            .cadence(Cadence::Weekly)
            .first_payment_date(d(2024, 12, 30))
            .account(account)
            .build()
            .unwrap();
        let mut obligations = vec![rent(account), gym];
        let scheduler = ObligationScheduler::default();
        let mut events = EventStore::new();

        let bills = scheduler.bills_for_month_on(
            &mut obligations,
            "2025-02".parse().unwrap(),
            &mut book,
            d(2025, 1, 5),
            &mut events,
        );

        let dates: Vec<_> = bills.occurrences.iter().map(|o| o.due_date).collect();
        assert_eq!(dates, vec![d(2025, 2, 2), d(2025, 2, 3), d(2025, 2, 10), d(2025, 2, 17), d(2025, 2, 24)]);
        assert_eq!(bills.total(), Money::from_major(17_120));
    }
}
