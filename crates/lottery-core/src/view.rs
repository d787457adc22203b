//! Projection of the session onto what the user sees.

use lottery_types::{Address, ClassifiedError, Session, SessionPhase, TxHash, U256};

/// Everything shown while betting is possible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveScreen {
	pub address: Address,
	pub balance: U256,
	pub jackpot: Option<U256>,
	pub pending_tx: Option<TxHash>,
	pub transaction_error: Option<ClassifiedError>,
	pub bet_result: Option<String>,
}

/// The screens the client can show. Exactly one applies at any time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
	/// No wallet provider is available.
	NoWallet,
	/// Waiting for the user to connect, with the last network warning.
	ConnectPrompt { network_error: Option<String> },
	/// Connected, balance not known yet.
	Loading,
	/// The balance does not cover one wager.
	InsufficientFunds { address: Address },
	Active(ActiveScreen),
}

#[derive(Debug, Clone, Copy)]
pub struct SessionView {
	wager: U256,
}

impl SessionView {
	pub fn new(wager: U256) -> Self {
		Self { wager }
	}

	/// Picks the screen for `session`. Reads the session only.
	pub fn project(&self, wallet_available: bool, session: &Session) -> Screen {
		if !wallet_available {
			return Screen::NoWallet;
		}

		match (session.phase(), session.address, session.native_balance) {
			(SessionPhase::Disconnected, _, _) => Screen::ConnectPrompt {
				network_error: session.network_error.clone(),
			},
			(SessionPhase::AwaitingBalance, _, _) => Screen::Loading,
			(SessionPhase::Ready, Some(address), Some(balance)) => {
				if balance < self.wager {
					Screen::InsufficientFunds { address }
				} else {
					Screen::Active(ActiveScreen {
						address,
						balance,
						jackpot: session.jackpot_total,
						pending_tx: session.pending_tx,
						transaction_error: session.transaction_error.clone(),
						bet_result: session.bet_result.clone(),
					})
				}
			}
			(SessionPhase::Ready, _, _) => Screen::Loading,
		}
	}
}
