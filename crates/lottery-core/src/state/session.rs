//! Session state transitions.
//!
//! Every change to the session goes through [`apply`], which builds the next
//! snapshot from the current one. [`SessionStore`] publishes each snapshot
//! whole through a watch channel, so readers never observe a partial update.

use lottery_types::{
	Address, ClassifiedError, Session, TransactionOutcome, TxHash, U256,
};
use std::sync::Arc;
use tokio::sync::watch;

/// How a bet attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BetResolution {
	/// A receipt was mined and interpreted.
	Settled(TransactionOutcome),
	/// A request failed before an outcome existed.
	Failed(ClassifiedError),
}

/// A single change to the session.
///
/// Transitions carrying an `address` belong to the session of that address
/// and are dropped once the session has moved on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTransition {
	/// Back to the empty initial session.
	Reset,
	/// The wallet is on the wrong network. No address is kept.
	NetworkMismatch(String),
	/// A fresh session for `address`, with nothing else known yet.
	Connected(Address),
	JackpotLoaded { address: Address, total: U256 },
	BalanceUpdated { address: Address, balance: U256 },
	/// A bet attempt begins, clearing the previous attempt's error and result.
	BetStarted { address: Address },
	BetSubmitted { address: Address, tx_hash: TxHash },
	/// A bet attempt ends. Clears the pending transaction and records the
	/// resolution in the same step.
	BetFinished {
		address: Address,
		resolution: BetResolution,
	},
	DismissNetworkError,
	DismissTransactionError,
	DismissBetResult,
}

impl SessionTransition {
	/// The session this transition is scoped to, if any.
	fn scope(&self) -> Option<Address> {
		match self {
			SessionTransition::JackpotLoaded { address, .. }
			| SessionTransition::BalanceUpdated { address, .. }
			| SessionTransition::BetStarted { address }
			| SessionTransition::BetSubmitted { address, .. }
			| SessionTransition::BetFinished { address, .. } => Some(*address),
			_ => None,
		}
	}
}

/// Computes the session that follows `session` under `transition`.
pub fn apply(session: &Session, transition: SessionTransition) -> Session {
	if let Some(address) = transition.scope() {
		if session.address != Some(address) {
			return session.clone();
		}
	}

	match transition {
		SessionTransition::Reset => Session::default(),
		SessionTransition::NetworkMismatch(message) => Session {
			network_error: Some(message),
			..Session::default()
		},
		SessionTransition::Connected(address) => Session {
			address: Some(address),
			..Session::default()
		},
		SessionTransition::JackpotLoaded { total, .. } => Session {
			jackpot_total: Some(total),
			..session.clone()
		},
		SessionTransition::BalanceUpdated { balance, .. } => Session {
			native_balance: Some(balance),
			..session.clone()
		},
		SessionTransition::BetStarted { .. } => Session {
			transaction_error: None,
			bet_result: None,
			..session.clone()
		},
		SessionTransition::BetSubmitted { tx_hash, .. } => Session {
			pending_tx: Some(tx_hash),
			..session.clone()
		},
		SessionTransition::BetFinished { resolution, .. } => {
			let mut next = Session {
				pending_tx: None,
				..session.clone()
			};
			match resolution {
				BetResolution::Settled(TransactionOutcome::Failed(reason)) => {
					next.transaction_error = Some(ClassifiedError::RpcFailure(reason));
				}
				BetResolution::Settled(outcome) => {
					next.bet_result = Some(outcome.to_string());
				}
				BetResolution::Failed(error) if error.is_silent() => {}
				BetResolution::Failed(error) => {
					next.transaction_error = Some(error);
				}
			}
			next
		}
		SessionTransition::DismissNetworkError => Session {
			network_error: None,
			..session.clone()
		},
		SessionTransition::DismissTransactionError => Session {
			transaction_error: None,
			..session.clone()
		},
		SessionTransition::DismissBetResult => Session {
			bet_result: None,
			..session.clone()
		},
	}
}

/// Shared holder of the current session snapshot.
#[derive(Clone)]
pub struct SessionStore {
	sender: Arc<watch::Sender<Session>>,
}

impl SessionStore {
	pub fn new() -> Self {
		let (sender, _) = watch::channel(Session::default());
		Self {
			sender: Arc::new(sender),
		}
	}

	/// Returns a copy of the current session.
	pub fn snapshot(&self) -> Session {
		self.sender.borrow().clone()
	}

	/// Subscribes to session snapshots. The receiver starts at the current one.
	pub fn subscribe(&self) -> watch::Receiver<Session> {
		self.sender.subscribe()
	}

	/// Applies a transition and notifies subscribers if anything changed.
	///
	/// Returns whether the session changed.
	pub fn apply(&self, transition: SessionTransition) -> bool {
		self.sender.send_if_modified(|session| {
			let next = apply(session, transition);
			if next == *session {
				return false;
			}
			*session = next;
			true
		})
	}
}

impl Default for SessionStore {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn full_session() -> Session {
		Session {
			address: Some(Address::repeat_byte(0x01)),
			native_balance: Some(U256::from(10u64)),
			jackpot_total: Some(U256::from(20u64)),
			network_error: Some("wrong network".into()),
			pending_tx: Some(TxHash::repeat_byte(0x02)),
			transaction_error: Some(ClassifiedError::RpcFailure("boom".into())),
			bet_result: Some("Sorry!!! You lost. Lot number is: 3".into()),
		}
	}

	#[test]
	fn test_reset_clears_every_field() {
		assert_eq!(apply(&full_session(), SessionTransition::Reset), Session::default());
	}

	#[test]
	fn test_network_mismatch_drops_address() {
		let next = apply(
			&full_session(),
			SessionTransition::NetworkMismatch("switch to 1337".into()),
		);
		assert_eq!(next.address, None);
		assert_eq!(next.native_balance, None);
		assert_eq!(next.network_error.as_deref(), Some("switch to 1337"));
	}

	#[test]
	fn test_stale_balance_ignored() {
		let session = Session {
			address: Some(Address::repeat_byte(0x01)),
			..Default::default()
		};
		let stale = apply(
			&session,
			SessionTransition::BalanceUpdated {
				address: Address::repeat_byte(0x09),
				balance: U256::from(1u64),
			},
		);
		assert_eq!(stale, session);

		let fresh = apply(
			&session,
			SessionTransition::BalanceUpdated {
				address: Address::repeat_byte(0x01),
				balance: U256::from(1u64),
			},
		);
		assert_eq!(fresh.native_balance, Some(U256::from(1u64)));
	}

	#[test]
	fn test_bet_finished_clears_pending_with_result() {
		let session = Session {
			address: Some(Address::repeat_byte(0x01)),
			pending_tx: Some(TxHash::repeat_byte(0x02)),
			..Default::default()
		};

		let lost = apply(
			&session,
			SessionTransition::BetFinished {
				address: Address::repeat_byte(0x01),
				resolution: BetResolution::Settled(TransactionOutcome::Lost {
					lot_number: U256::from(17u64),
				}),
			},
		);
		assert_eq!(lost.pending_tx, None);
		assert!(lost.bet_result.unwrap().contains("17"));
		assert_eq!(lost.transaction_error, None);

		let failed = apply(
			&session,
			SessionTransition::BetFinished {
				address: Address::repeat_byte(0x01),
				resolution: BetResolution::Settled(TransactionOutcome::Failed(
					"Transaction failed".into(),
				)),
			},
		);
		assert_eq!(failed.pending_tx, None);
		assert_eq!(failed.bet_result, None);
		assert_eq!(
			failed.transaction_error,
			Some(ClassifiedError::RpcFailure("Transaction failed".into()))
		);
	}

	#[test]
	fn test_cancelled_bet_writes_nothing() {
		let session = Session {
			address: Some(Address::repeat_byte(0x01)),
			pending_tx: Some(TxHash::repeat_byte(0x02)),
			..Default::default()
		};
		let next = apply(
			&session,
			SessionTransition::BetFinished {
				address: Address::repeat_byte(0x01),
				resolution: BetResolution::Failed(ClassifiedError::UserCancelled),
			},
		);
		assert_eq!(next.transaction_error, None);
		assert_eq!(next.bet_result, None);
		assert_eq!(next.pending_tx, None);
	}

	#[test]
	fn test_bet_transitions_for_previous_address_dropped() {
		let previous = Address::repeat_byte(0x01);
		let session = Session {
			address: Some(Address::repeat_byte(0x02)),
			native_balance: Some(U256::from(10u64)),
			..Default::default()
		};

		let transitions = [
			SessionTransition::BetStarted { address: previous },
			SessionTransition::BetSubmitted {
				address: previous,
				tx_hash: TxHash::repeat_byte(0x03),
			},
			SessionTransition::BetFinished {
				address: previous,
				resolution: BetResolution::Settled(TransactionOutcome::Lost {
					lot_number: U256::from(17u64),
				}),
			},
			SessionTransition::JackpotLoaded {
				address: previous,
				total: U256::from(500u64),
			},
		];
		for transition in transitions {
			assert_eq!(apply(&session, transition), session);
		}

		let disconnected = Session::default();
		let next = apply(
			&disconnected,
			SessionTransition::BetSubmitted {
				address: previous,
				tx_hash: TxHash::repeat_byte(0x03),
			},
		);
		assert_eq!(next, disconnected);
	}

	#[test]
	fn test_dismissals_touch_one_field() {
		let session = full_session();

		let next = apply(&session, SessionTransition::DismissTransactionError);
		assert_eq!(next.transaction_error, None);
		assert_eq!(next.bet_result, session.bet_result);

		let next = apply(&session, SessionTransition::DismissBetResult);
		assert_eq!(next.bet_result, None);
		assert_eq!(next.network_error, session.network_error);

		let next = apply(&session, SessionTransition::DismissNetworkError);
		assert_eq!(next.network_error, None);
		assert_eq!(next.address, session.address);
	}

	#[tokio::test]
	async fn test_store_notifies_on_change_only() {
		let store = SessionStore::new();
		let mut receiver = store.subscribe();

		assert!(!store.apply(SessionTransition::Reset));
		assert!(!receiver.has_changed().unwrap());

		assert!(store.apply(SessionTransition::Connected(Address::repeat_byte(0x05))));
		assert!(receiver.has_changed().unwrap());
		assert_eq!(
			receiver.borrow_and_update().address,
			Some(Address::repeat_byte(0x05))
		);
	}
}
