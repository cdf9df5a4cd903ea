pub mod autopay;
pub mod cadence;
pub mod projector;
pub mod scheduler;
pub mod status;

pub use autopay::{AutopayPoster, BlockReason, BlockedOccurrence, PostingFailure, PostingReport};
pub use cadence::DateCadence;
pub use projector::ObligationProjector;
pub use scheduler::{MonthlyBills, ObligationScheduler};
pub use status::StatusResolver;
