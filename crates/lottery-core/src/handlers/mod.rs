pub mod bet;

pub use bet::{interpret_receipt, BetAttempt, SkipReason, TransactionCoordinator};
