use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::schedule::BlockReason;
use crate::types::{LoanId, ObligationId, TransactionId};

/// all events emitted by the scheduler and the loan engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // obligation events
    OccurrencePosted {
        obligation_id: ObligationId,
        due_date: NaiveDate,
        amount: Money,
        transaction_id: TransactionId,
    },
    OccurrenceBlocked {
        obligation_id: ObligationId,
        due_date: NaiveDate,
        reason: BlockReason,
    },
    OccurrencePostingFailed {
        obligation_id: ObligationId,
        due_date: NaiveDate,
        message: String,
    },
    CategoryLinked {
        obligation_id: ObligationId,
        category_id: crate::types::CategoryId,
    },

    // loan events
    LoanPaymentPosted {
        loan_id: LoanId,
        period: u32,
        due_date: NaiveDate,
        principal_portion: Money,
        interest_portion: Money,
        remaining_principal: Money,
        transaction_id: Option<TransactionId>,
    },
    LoanPartiallySettled {
        loan_id: LoanId,
        amount: Money,
        remaining_principal: Money,
        timestamp: DateTime<Utc>,
    },
    LoanSettled {
        loan_id: LoanId,
        final_amount: Money,
        timestamp: DateTime<Utc>,
    },
    LoanMatured {
        loan_id: LoanId,
        paid_months: u32,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
