//! Bet submission handler.
//!
//! Drives one bet at a time from submission to a mined receipt, then turns the
//! receipt's events into an outcome for the session. Failures at any step are
//! classified and recorded in the session instead of being returned.

use crate::classifier::ErrorClassifier;
use crate::state::{BetResolution, SessionStore, SessionTransition};
use lottery_types::{
	truncate_id, Address, BetReceipt, BetRequest, LotteryEvent, TransactionOutcome,
};
use lottery_wallet::{BetSubmission, LotteryContract, WalletError, WalletProvider};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;

/// Why a bet was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
	NotConnected,
	EmptyBet,
	/// Another bet is still in flight.
	InFlight,
}

/// What [`TransactionCoordinator::place_bet`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BetAttempt {
	Skipped(SkipReason),
	Finished(BetResolution),
}

/// Reads the outcome of a mined bet from its receipt.
///
/// A reverted transaction is a failure whatever it logged. Otherwise a `Lost`
/// event takes precedence over a `Win` event.
pub fn interpret_receipt(receipt: &BetReceipt) -> TransactionOutcome {
	if !receipt.success {
		return TransactionOutcome::Failed("Transaction failed".to_string());
	}

	let lost = receipt.events.iter().find_map(|event| match event {
		LotteryEvent::Lost { lot_number } => Some(TransactionOutcome::Lost {
			lot_number: *lot_number,
		}),
		_ => None,
	});
	let win = || {
		receipt.events.iter().find_map(|event| match event {
			LotteryEvent::Win {
				lot_number,
				level,
				amount,
			} => Some(TransactionOutcome::Win {
				lot_number: *lot_number,
				level: level.clone(),
				amount: *amount,
			}),
			_ => None,
		})
	};

	lost.or_else(win)
		.unwrap_or_else(|| TransactionOutcome::Failed("unrecognized outcome".to_string()))
}

pub struct TransactionCoordinator {
	wallet: Arc<dyn WalletProvider>,
	contract: Arc<dyn LotteryContract>,
	store: SessionStore,
	nonce_offset: u64,
	/// Held for the whole of an attempt.
	in_flight: Mutex<()>,
}

impl TransactionCoordinator {
	pub fn new(
		wallet: Arc<dyn WalletProvider>,
		contract: Arc<dyn LotteryContract>,
		store: SessionStore,
		nonce_offset: u64,
	) -> Self {
		Self {
			wallet,
			contract,
			store,
			nonce_offset,
			in_flight: Mutex::new(()),
		}
	}

	/// Places a bet for the connected account.
	///
	/// Skipped without touching the session when no account is connected,
	/// when the bet is empty, or while another bet is in flight.
	#[instrument(skip_all, fields(chosen_number = request.chosen_number))]
	pub async fn place_bet(&self, request: BetRequest) -> BetAttempt {
		let Ok(_guard) = self.in_flight.try_lock() else {
			tracing::warn!("Bet already in flight, ignoring");
			return BetAttempt::Skipped(SkipReason::InFlight);
		};

		let session = self.store.snapshot();
		let Some(address) = session.address else {
			tracing::debug!("No connected account, ignoring bet");
			return BetAttempt::Skipped(SkipReason::NotConnected);
		};
		if session.has_pending_tx() {
			tracing::warn!("Bet already pending, ignoring");
			return BetAttempt::Skipped(SkipReason::InFlight);
		}
		if request.is_empty() {
			return BetAttempt::Skipped(SkipReason::EmptyBet);
		}

		self.store.apply(SessionTransition::BetStarted { address });

		let resolution = match self.execute(address, request).await {
			Ok(outcome) => {
				tracing::info!(outcome = %outcome, "Bet settled");
				BetResolution::Settled(outcome)
			}
			Err(e) => {
				let classified = ErrorClassifier::classify(&e);
				if !classified.is_silent() {
					tracing::warn!(error = %e, "Bet failed");
				}
				BetResolution::Failed(classified)
			}
		};

		// Dropped by the store if the session moved to another account meanwhile.
		self.store.apply(SessionTransition::BetFinished {
			address,
			resolution: resolution.clone(),
		});
		BetAttempt::Finished(resolution)
	}

	async fn execute(
		&self,
		address: Address,
		request: BetRequest,
	) -> Result<TransactionOutcome, WalletError> {
		let nonce = self.wallet.get_transaction_count(address).await? + self.nonce_offset;

		let tx_hash = self
			.contract
			.submit_bet(BetSubmission {
				from: address,
				chosen_number: request.chosen_number,
				value: request.wager,
				nonce,
			})
			.await?;
		self.store
			.apply(SessionTransition::BetSubmitted { address, tx_hash });
		tracing::info!(
			address = %truncate_id(&address.to_string()),
			tx_hash = %truncate_id(&tx_hash.to_string()),
			nonce,
			"Bet submitted, waiting for receipt"
		);

		let receipt = self.contract.wait_for_receipt(tx_hash).await?;
		Ok(interpret_receipt(&receipt))
	}
}
