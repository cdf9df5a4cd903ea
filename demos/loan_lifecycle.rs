/// loan lifecycle - schedule, catch-up posting and early settlement
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use recurring_ledger_rs::{
    init_tracing, EventStore, Loan, LoanScheduleEngine, LoanView, MemoryBook, Money, Rate,
    RepaymentType, SafeTimeProvider, TimeSource,
};
use rust_decimal_macros::dec;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    println!("=== loan lifecycle example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2025, 1, 15, 8, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    let mut book = MemoryBook::new();
    let checking = book.open_account("Main checking", Money::from_major(30_000_000));

    let mut loan = Loan::builder()
        .name("Car loan")
        .principal(Money::from_major(12_000_000))
        .annual_rate(Rate::from_percentage_decimal(dec!(6)))
        .term_months(12)
        .start_date(time.now().date_naive())
        .due_day(25)
        .account(checking)
        .repayment_type(RepaymentType::Amortized)
        .build()?;

    let engine = LoanScheduleEngine::default();
    let mut events = EventStore::new();

    println!("schedule:");
    for installment in &engine.project_schedule(&loan).installments {
        println!(
            "  {:>2} {} payment {:>12} principal {:>12} interest {:>10} balance {:>12}",
            installment.period,
            installment.due_date,
            installment.payment.to_string(),
            installment.principal_portion.to_string(),
            installment.interest_portion.to_string(),
            installment.ending_balance.to_string(),
        );
    }

    // three due dates pass without the app being opened
    controller.advance(Duration::days(100));
    println!("\nnow {}", time.now().format("%Y-%m-%d"));
    let report = engine.post_due_payments(&mut loan, &mut book, &time, &mut events)?;
    println!("posted {} installments", report.installments.len());

    // pay off half of what is left
    let half = loan.remaining_principal / dec!(2);
    let settle_date = NaiveDate::from_ymd_opt(2025, 4, 30).ok_or("bad date")?;
    let receipt = engine.settle(&mut loan, Some(half), settle_date, &mut book, &time, &mut events)?;
    println!("settled {} as period {}", receipt.applied, receipt.period);

    println!("\n{}", LoanView::from_loan(&loan, &engine).to_json_pretty()?);

    // the rest
    let receipt = engine.settle(&mut loan, None, settle_date, &mut book, &time, &mut events)?;
    println!("\nfully settled: {}", receipt.fully_settled);
    println!("events emitted: {}", events.len());

    Ok(())
}
