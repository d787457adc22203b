//! Bet submission and outcome types.
//!
//! A bet travels through three shapes: the [`BetRequest`] built by the caller,
//! the [`BetReceipt`] returned once the transaction is mined, and the
//! [`TransactionOutcome`] derived from that receipt's events.

use alloy_primitives::{TxHash, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Largest number a player may pick.
pub const MAX_CHOSEN_NUMBER: u32 = 9999;

/// Maximum number of digits accepted from user input.
const MAX_CHOSEN_DIGITS: usize = 4;

/// Reason a raw chosen number was refused before submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BetRequestError {
	#[error("Please enter a number")]
	Empty,
	#[error("Please enter a four digit number, got '{0}'")]
	NotANumber(String),
	#[error("Please enter a four digit number between 1 and {MAX_CHOSEN_NUMBER}")]
	OutOfRange,
}

/// A single wager on a chosen lot number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetRequest {
	/// The number the player bets on.
	pub chosen_number: u32,
	/// Value sent with the transaction, in wei.
	pub wager: U256,
}

impl BetRequest {
	/// Builds a request without validating the number.
	///
	/// Callers taking user input should go through [`BetRequest::parse`].
	pub fn new(chosen_number: u32, wager: U256) -> Self {
		Self {
			chosen_number,
			wager,
		}
	}

	/// Parses user input into a request.
	///
	/// Accepts one to four ASCII digits whose value is between 1 and
	/// [`MAX_CHOSEN_NUMBER`]. Surrounding whitespace is ignored.
	pub fn parse(input: &str, wager: U256) -> Result<Self, BetRequestError> {
		let trimmed = input.trim();
		if trimmed.is_empty() {
			return Err(BetRequestError::Empty);
		}
		if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
			return Err(BetRequestError::NotANumber(trimmed.to_string()));
		}
		if trimmed.len() > MAX_CHOSEN_DIGITS {
			return Err(BetRequestError::OutOfRange);
		}

		let chosen_number: u32 = trimmed
			.parse()
			.map_err(|_| BetRequestError::NotANumber(trimmed.to_string()))?;
		if chosen_number == 0 || chosen_number > MAX_CHOSEN_NUMBER {
			return Err(BetRequestError::OutOfRange);
		}

		Ok(Self::new(chosen_number, wager))
	}

	/// Whether this request would carry no bet at all.
	pub fn is_empty(&self) -> bool {
		self.chosen_number == 0 || self.wager.is_zero()
	}
}

/// Events emitted by the lottery contract during `bet`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LotteryEvent {
	/// The bet won a prize.
	Win {
		lot_number: U256,
		level: String,
		amount: U256,
	},
	/// The bet lost.
	Lost { lot_number: U256 },
}

/// Mined receipt of a bet transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetReceipt {
	/// The hash of the transaction.
	pub tx_hash: TxHash,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
	/// Lottery events decoded from the receipt logs, in log order.
	pub events: Vec<LotteryEvent>,
}

/// Result of a mined bet, as shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionOutcome {
	Win {
		lot_number: U256,
		level: String,
		amount: U256,
	},
	Lost {
		lot_number: U256,
	},
	Failed(String),
}

impl fmt::Display for TransactionOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TransactionOutcome::Win {
				lot_number,
				level,
				amount,
			} => write!(
				f,
				"Bingo!!! You win {} prize, total amount is {}. Lot number is: {}",
				level, amount, lot_number
			),
			TransactionOutcome::Lost { lot_number } => {
				write!(f, "Sorry!!! You lost. Lot number is: {}", lot_number)
			}
			TransactionOutcome::Failed(reason) => f.write_str(reason),
		}
	}
}
