//! The session snapshot.
//!
//! A [`Session`] is replaced as a whole on every state change, never mutated
//! in place by readers. `Session::default()` is the empty initial value that a
//! reset returns to.

use crate::errors::ClassifiedError;
use alloy_primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	/// Connected account, set only once the network check passed.
	pub address: Option<Address>,
	/// Native balance of `address` in wei, from the latest successful poll.
	pub native_balance: Option<U256>,
	/// Prize pool reported by the contract when the session started.
	pub jackpot_total: Option<U256>,
	/// Warning shown on the connect prompt.
	pub network_error: Option<String>,
	/// Bet transaction waiting to be mined.
	pub pending_tx: Option<TxHash>,
	/// Failure of the last bet attempt.
	pub transaction_error: Option<ClassifiedError>,
	/// Outcome message of the last bet attempt.
	pub bet_result: Option<String>,
}

/// Connection progress derived from a session.
///
/// Exactly one phase holds for any session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
	/// No account is connected.
	Disconnected,
	/// An account is connected but its balance is not known yet.
	AwaitingBalance,
	/// An account is connected and its balance is known.
	Ready,
}

impl Session {
	pub fn phase(&self) -> SessionPhase {
		match (self.address, self.native_balance) {
			(None, _) => SessionPhase::Disconnected,
			(Some(_), None) => SessionPhase::AwaitingBalance,
			(Some(_), Some(_)) => SessionPhase::Ready,
		}
	}

	/// Whether a bet transaction is in flight.
	pub fn has_pending_tx(&self) -> bool {
		self.pending_tx.is_some()
	}
}
