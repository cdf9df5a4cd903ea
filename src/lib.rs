pub mod config;
pub mod credit;
pub mod dates;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod loans;
pub mod markers;
pub mod obligation;
pub mod persistence;
pub mod schedule;
pub mod stores;
pub mod types;
pub mod views;

use std::sync::Once;

// re-export key types
pub use config::{EngineConfig, StatusPolicy};
pub use credit::{CreditCardCycleMeta, CreditCycleResolver};
pub use dates::{DateRange, MonthKey};
pub use decimal::{Money, Rate};
pub use errors::{Result, ScheduleError};
pub use events::{Event, EventStore};
pub use loans::{
    AmortizationSchedule, Installment, Loan, LoanBuilder, LoanPostingReport, LoanScheduleEngine,
    LoanTermsUpdate, SettlementReceipt,
};
pub use obligation::{ObligationBuilder, ObligationOccurrence, RecurringObligation};
pub use persistence::{load_bills, load_card_meta, save_bills, save_card_meta, Loaded};
pub use schedule::{
    AutopayPoster, BlockReason, DateCadence, MonthlyBills, ObligationProjector,
    ObligationScheduler, PostingReport, StatusResolver,
};
pub use stores::{
    AccountStore, CategoryStore, FinanceStore, LedgerStore, LedgerTransaction, MemoryBook,
    NewTransaction,
};
pub use types::{
    AccountId, Cadence, CategoryId, LoanId, ObligationGroup, ObligationId, OccurrenceStatus,
    RepaymentType, TransactionId, TransactionKind,
};
pub use views::{CardStatementView, LoanView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;

static TRACING_INIT: Once = Once::new();

/// install a global fmt subscriber; `RUST_LOG` overrides the default filter
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("recurring_ledger_rs=info"));

        // another subscriber may already be installed by the host
        let _ = fmt().with_env_filter(filter).try_init();
    });
}
