/// monthly bills - project, autopay and resolve one month of bills
use chrono::{NaiveDate, TimeZone, Utc};
use recurring_ledger_rs::{
    init_tracing, save_bills, Cadence, EventStore, Money, MonthKey, ObligationGroup,
    ObligationScheduler, RecurringObligation, SafeTimeProvider, TimeSource, MemoryBook,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    println!("=== monthly bills example ===\n");

    // "today" is pinned so the run is reproducible
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2025, 1, 5, 9, 0, 0).unwrap()
    ));

    let mut book = MemoryBook::new();
    let checking = book.open_account("Main checking", Money::from_major(20_000));
    let card = book.open_account("Travel card", Money::from_major(50));

    let mut obligations = vec![
        RecurringObligation::builder()
            .name("Rent")
            .group(ObligationGroup::Living)
            .amount(Money::from_major(17_000))
            .cadence(Cadence::Monthly)
            .first_payment_date(NaiveDate::from_ymd_opt(2024, 11, 2).ok_or("bad date")?)
            .account(checking)
            .build()?,
        RecurringObligation::builder()
            .name("Gym")
            .group(ObligationGroup::Subscription)
            .amount(Money::from_major(30))
            .cadence(Cadence::Weekly)
            .first_payment_date(NaiveDate::from_ymd_opt(2024, 12, 30).ok_or("bad date")?)
            .account(checking)
            .build()?,
        RecurringObligation::builder()
            .name("Cloud storage")
            .group(ObligationGroup::Custom("Software".into()))
            .amount(Money::from_major(120))
            .cadence(Cadence::Yearly)
            .first_payment_date(NaiveDate::from_ymd_opt(2024, 1, 3).ok_or("bad date")?)
            .account(card)
            .build()?,
    ];

    let scheduler = ObligationScheduler::default();
    let mut events = EventStore::new();

    for month in ["2024-12", "2025-01", "2025-02"] {
        let month: MonthKey = month.parse()?;
        let bills = scheduler.bills_for_month(&mut obligations, month, &mut book, &time, &mut events);

        println!("{month}: total {}", bills.total());
        for occurrence in &bills.occurrences {
            println!(
                "  {} {:<14} {:>10} {:?} ({})",
                occurrence.due_date,
                occurrence.name,
                occurrence.amount.to_string(),
                occurrence.status,
                occurrence.account_name.as_deref().unwrap_or("missing account"),
            );
        }
        for report in &bills.postings {
            for blocked in &report.blocked {
                println!("  blocked {}: {:?}", blocked.due_date, blocked.reason);
            }
        }
    }

    println!("\nledger:");
    for transaction in book.transactions() {
        println!("  {} {} {}", transaction.date, transaction.amount, transaction.memo);
    }

    println!("\nevents emitted: {}", events.len());
    println!("\npersisted bills:\n{}", save_bills(&obligations)?);

    Ok(())
}
