//! Common types for the lottery client.
//!
//! This crate defines the data shared between the wallet capability, the
//! session state machine and the presentation layer. It carries no behavior
//! beyond formatting and input validation so every other crate can depend on it.

/// Bet requests, contract events, receipts and outcomes.
pub mod bet;
/// Classified errors surfaced to the user.
pub mod errors;
/// Notifications pushed by the wallet provider.
pub mod events;
/// The session snapshot owned by the state machine.
pub mod session;
/// Display helpers for addresses, hashes and amounts.
pub mod utils;

pub use alloy_primitives::{Address, TxHash, U256};
pub use bet::{BetReceipt, BetRequest, BetRequestError, LotteryEvent, TransactionOutcome};
pub use errors::ClassifiedError;
pub use events::WalletNotification;
pub use session::{Session, SessionPhase};
pub use utils::{format_token_amount, truncate_id};
