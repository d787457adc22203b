//! Scriptable wallet for tests.
//!
//! Every response can be set ahead of time, and every submitted bet is
//! recorded. Receipts can be held back so a test can observe the session
//! while a bet is pending.

use crate::{BetSubmission, LotteryContract, WalletError, WalletProvider};
use async_trait::async_trait;
use lottery_types::{Address, BetReceipt, LotteryEvent, TxHash, WalletNotification, U256};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, Semaphore};

#[derive(Default)]
struct MockState {
	accounts: Vec<Address>,
	accounts_error: Option<WalletError>,
	network_version: String,
	network_error: Option<WalletError>,
	balances: HashMap<Address, U256>,
	balance_error: Option<WalletError>,
	transaction_counts: HashMap<Address, u64>,
	total: U256,
	total_error: Option<WalletError>,
	submit_results: VecDeque<Result<TxHash, WalletError>>,
	submissions: Vec<BetSubmission>,
	receipt_success: bool,
	receipt_events: Vec<LotteryEvent>,
	receipt_error: Option<WalletError>,
}

pub struct MockWallet {
	state: Mutex<MockState>,
	notifications: broadcast::Sender<WalletNotification>,
	balance_queries: AtomicUsize,
	submitted: AtomicUsize,
	/// Permits released to `wait_for_receipt`, when receipts are held.
	receipt_gate: Option<Arc<Semaphore>>,
}

impl MockWallet {
	/// A wallet on `network_version` with no accounts and a successful,
	/// event-free receipt for every bet.
	pub fn new(network_version: impl Into<String>) -> Self {
		let (notifications, _) = broadcast::channel(16);
		Self {
			state: Mutex::new(MockState {
				network_version: network_version.into(),
				receipt_success: true,
				..Default::default()
			}),
			notifications,
			balance_queries: AtomicUsize::new(0),
			submitted: AtomicUsize::new(0),
			receipt_gate: None,
		}
	}

	pub fn with_accounts(mut self, accounts: Vec<Address>) -> Self {
		self.state.get_mut().accounts = accounts;
		self
	}

	pub fn with_balance(mut self, address: Address, balance: U256) -> Self {
		self.state.get_mut().balances.insert(address, balance);
		self
	}

	pub fn with_total(mut self, total: U256) -> Self {
		self.state.get_mut().total = total;
		self
	}

	pub fn with_transaction_count(mut self, address: Address, count: u64) -> Self {
		self.state.get_mut().transaction_counts.insert(address, count);
		self
	}

	pub fn with_receipt_events(mut self, events: Vec<LotteryEvent>) -> Self {
		self.state.get_mut().receipt_events = events;
		self
	}

	/// Makes `wait_for_receipt` block until [`MockWallet::release_receipt`].
	pub fn with_held_receipts(mut self) -> Self {
		self.receipt_gate = Some(Arc::new(Semaphore::new(0)));
		self
	}

	pub async fn set_accounts(&self, accounts: Vec<Address>) {
		self.state.lock().await.accounts = accounts;
	}

	pub async fn fail_accounts(&self, error: Option<WalletError>) {
		self.state.lock().await.accounts_error = error;
	}

	pub async fn set_network_version(&self, version: impl Into<String>) {
		self.state.lock().await.network_version = version.into();
	}

	pub async fn fail_network_version(&self, error: Option<WalletError>) {
		self.state.lock().await.network_error = error;
	}

	pub async fn set_balance(&self, address: Address, balance: U256) {
		self.state.lock().await.balances.insert(address, balance);
	}

	pub async fn fail_balance(&self, error: Option<WalletError>) {
		self.state.lock().await.balance_error = error;
	}

	pub async fn fail_total(&self, error: Option<WalletError>) {
		self.state.lock().await.total_error = error;
	}

	/// Queues the result of the next `submit_bet`. Without one, submissions
	/// succeed with a hash derived from their sequence number.
	pub async fn push_submit_result(&self, result: Result<TxHash, WalletError>) {
		self.state.lock().await.submit_results.push_back(result);
	}

	pub async fn set_receipt(&self, success: bool, events: Vec<LotteryEvent>) {
		let mut state = self.state.lock().await;
		state.receipt_success = success;
		state.receipt_events = events;
	}

	pub async fn fail_receipt(&self, error: Option<WalletError>) {
		self.state.lock().await.receipt_error = error;
	}

	/// Lets one held `wait_for_receipt` call complete.
	pub fn release_receipt(&self) {
		if let Some(gate) = &self.receipt_gate {
			gate.add_permits(1);
		}
	}

	/// Pushes a notification to every subscriber.
	pub fn notify(&self, notification: WalletNotification) {
		let _ = self.notifications.send(notification);
	}

	pub async fn submissions(&self) -> Vec<BetSubmission> {
		self.state.lock().await.submissions.clone()
	}

	pub fn balance_queries(&self) -> usize {
		self.balance_queries.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl WalletProvider for MockWallet {
	async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
		let state = self.state.lock().await;
		match &state.accounts_error {
			Some(error) => Err(error.clone()),
			None => Ok(state.accounts.clone()),
		}
	}

	async fn network_version(&self) -> Result<String, WalletError> {
		let state = self.state.lock().await;
		match &state.network_error {
			Some(error) => Err(error.clone()),
			None => Ok(state.network_version.clone()),
		}
	}

	async fn get_balance(&self, address: Address) -> Result<U256, WalletError> {
		self.balance_queries.fetch_add(1, Ordering::SeqCst);
		let state = self.state.lock().await;
		match &state.balance_error {
			Some(error) => Err(error.clone()),
			None => Ok(state.balances.get(&address).copied().unwrap_or_default()),
		}
	}

	async fn get_transaction_count(&self, address: Address) -> Result<u64, WalletError> {
		let state = self.state.lock().await;
		Ok(state
			.transaction_counts
			.get(&address)
			.copied()
			.unwrap_or_default())
	}

	fn subscribe(&self) -> broadcast::Receiver<WalletNotification> {
		self.notifications.subscribe()
	}
}

#[async_trait]
impl LotteryContract for MockWallet {
	async fn total(&self) -> Result<U256, WalletError> {
		let state = self.state.lock().await;
		match &state.total_error {
			Some(error) => Err(error.clone()),
			None => Ok(state.total),
		}
	}

	async fn submit_bet(&self, submission: BetSubmission) -> Result<TxHash, WalletError> {
		let sequence = self.submitted.fetch_add(1, Ordering::SeqCst) as u64 + 1;
		let mut state = self.state.lock().await;
		state.submissions.push(submission);
		match state.submit_results.pop_front() {
			Some(result) => result,
			None => Ok(TxHash::left_padding_from(&sequence.to_be_bytes())),
		}
	}

	async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<BetReceipt, WalletError> {
		if let Some(gate) = &self.receipt_gate {
			let permit = gate
				.acquire()
				.await
				.map_err(|e| WalletError::Network(e.to_string()))?;
			permit.forget();
		}

		let state = self.state.lock().await;
		if let Some(error) = &state.receipt_error {
			return Err(error.clone());
		}
		Ok(BetReceipt {
			tx_hash,
			block_number: 1,
			success: state.receipt_success,
			events: state.receipt_events.clone(),
		})
	}
}
