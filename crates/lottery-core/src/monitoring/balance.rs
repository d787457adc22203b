//! Periodic balance refresh for the connected account.
//!
//! Queries the balance right away and then on every interval tick until
//! stopped. Failed queries keep the previous balance.

use crate::state::{SessionStore, SessionTransition};
use lottery_types::{truncate_id, Address};
use lottery_wallet::WalletProvider;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub struct BalancePoller {
	wallet: Arc<dyn WalletProvider>,
	store: SessionStore,
	interval: Duration,
	/// The polled address and its polling task.
	task: Mutex<Option<(Address, JoinHandle<()>)>>,
}

impl BalancePoller {
	pub fn new(wallet: Arc<dyn WalletProvider>, store: SessionStore, interval: Duration) -> Self {
		Self {
			wallet,
			store,
			interval,
			task: Mutex::new(None),
		}
	}

	/// Starts polling `address`. Does nothing if already polling.
	pub async fn start(&self, address: Address) {
		let mut task = self.task.lock().await;
		if task.is_some() {
			tracing::debug!("Balance polling already running");
			return;
		}

		tracing::debug!(address = %truncate_id(&address.to_string()), "Starting balance polling");
		let handle = tokio::spawn(Self::polling_loop(
			self.wallet.clone(),
			self.store.clone(),
			address,
			self.interval,
		));
		*task = Some((address, handle));
	}

	/// Stops polling and waits for the polling task to end. Does nothing if
	/// not polling.
	pub async fn stop(&self) {
		let handle = self.task.lock().await.take();
		if let Some((_, handle)) = handle {
			handle.abort();
			if let Err(e) = handle.await {
				if !e.is_cancelled() {
					tracing::warn!("Balance polling task failed: {}", e);
				}
			}
			tracing::debug!("Stopped balance polling");
		}
	}

	pub async fn is_running(&self) -> bool {
		self.task.lock().await.is_some()
	}

	/// The address being polled, if polling.
	pub async fn polled_address(&self) -> Option<Address> {
		self.task.lock().await.as_ref().map(|(address, _)| *address)
	}

	async fn polling_loop(
		wallet: Arc<dyn WalletProvider>,
		store: SessionStore,
		address: Address,
		interval: Duration,
	) {
		let mut ticker = tokio::time::interval(interval);
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

		loop {
			ticker.tick().await;

			match wallet.get_balance(address).await {
				Ok(balance) => {
					store.apply(SessionTransition::BalanceUpdated { address, balance });
				}
				Err(e) => {
					tracing::warn!(
						address = %truncate_id(&address.to_string()),
						error = %e,
						"Failed to refresh balance"
					);
				}
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use lottery_types::U256;
	use lottery_wallet::implementations::mock::MockWallet;
	use lottery_wallet::WalletError;

	const INTERVAL: Duration = Duration::from_secs(5);

	async fn settle() {
		for _ in 0..10 {
			tokio::task::yield_now().await;
		}
	}

	fn connected_store(address: Address) -> SessionStore {
		let store = SessionStore::new();
		store.apply(SessionTransition::Connected(address));
		store
	}

	#[tokio::test(start_paused = true)]
	async fn test_polls_immediately_then_on_interval() {
		let address = Address::repeat_byte(0x01);
		let mock = Arc::new(MockWallet::new("1337").with_balance(address, U256::from(7u64)));
		let store = connected_store(address);
		let poller = BalancePoller::new(mock.clone(), store.clone(), INTERVAL);

		poller.start(address).await;
		settle().await;
		assert_eq!(mock.balance_queries(), 1);
		assert_eq!(store.snapshot().native_balance, Some(U256::from(7u64)));

		mock.set_balance(address, U256::from(9u64)).await;
		tokio::time::advance(INTERVAL).await;
		settle().await;
		assert_eq!(mock.balance_queries(), 2);
		assert_eq!(store.snapshot().native_balance, Some(U256::from(9u64)));

		poller.stop().await;
	}

	#[tokio::test(start_paused = true)]
	async fn test_start_and_stop_are_idempotent() {
		let address = Address::repeat_byte(0x01);
		let mock = Arc::new(MockWallet::new("1337"));
		let poller = BalancePoller::new(mock.clone(), connected_store(address), INTERVAL);

		poller.stop().await;
		assert!(!poller.is_running().await);

		poller.start(address).await;
		poller.start(address).await;
		settle().await;
		assert!(poller.is_running().await);
		assert_eq!(poller.polled_address().await, Some(address));
		assert_eq!(mock.balance_queries(), 1);

		poller.stop().await;
		poller.stop().await;
		assert!(!poller.is_running().await);
		assert_eq!(poller.polled_address().await, None);

		tokio::time::advance(INTERVAL * 3).await;
		settle().await;
		assert_eq!(mock.balance_queries(), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_failed_query_keeps_previous_balance() {
		let address = Address::repeat_byte(0x01);
		let mock = Arc::new(MockWallet::new("1337").with_balance(address, U256::from(3u64)));
		let store = connected_store(address);
		let poller = BalancePoller::new(mock.clone(), store.clone(), INTERVAL);

		poller.start(address).await;
		settle().await;

		mock.fail_balance(Some(WalletError::Network("unreachable".into())))
			.await;
		tokio::time::advance(INTERVAL).await;
		settle().await;

		assert_eq!(mock.balance_queries(), 2);
		assert_eq!(store.snapshot().native_balance, Some(U256::from(3u64)));
		assert_eq!(store.snapshot().transaction_error, None);

		poller.stop().await;
	}
}
