pub mod cycle;

pub use cycle::{CreditCardCycleMeta, CreditCycleResolver};
