//! Wallet connection lifecycle.
//!
//! Owns the connected address and keeps it consistent with the wallet: the
//! address is only committed on the required network, account and network
//! switches reported by the wallet re-initialize or reset the session, and
//! balance polling runs exactly while an address is set.

use crate::classifier::ErrorClassifier;
use crate::monitoring::BalancePoller;
use crate::state::{SessionStore, SessionTransition};
use lottery_types::{truncate_id, Address, ClassifiedError, WalletNotification};
use lottery_wallet::{LotteryContract, WalletProvider};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum SessionError {
	#[error("Wallet request failed: {0}")]
	Wallet(ClassifiedError),
	#[error("Wallet disclosed no accounts")]
	NoAccounts,
}

/// Everything the notification listener needs, shared with the session.
#[derive(Clone)]
struct SessionContext {
	wallet: Arc<dyn WalletProvider>,
	contract: Arc<dyn LotteryContract>,
	store: SessionStore,
	poller: Arc<BalancePoller>,
	/// Serializes address changes together with the poller restart.
	transitions: Arc<Mutex<()>>,
}

impl SessionContext {
	/// Starts a fresh session for `address`.
	async fn initialize(&self, address: Address) {
		{
			let _guard = self.transitions.lock().await;
			self.poller.stop().await;
			self.store.apply(SessionTransition::Connected(address));
			self.poller.start(address).await;
		}

		match self.contract.total().await {
			Ok(total) => {
				self.store
					.apply(SessionTransition::JackpotLoaded { address, total });
			}
			Err(e) => tracing::warn!(error = %e, "Failed to load jackpot total"),
		}
	}

	async fn reset(&self) {
		self.replace(SessionTransition::Reset).await;
	}

	/// Stops polling and applies a transition that leaves no address.
	async fn replace(&self, transition: SessionTransition) {
		let _guard = self.transitions.lock().await;
		self.poller.stop().await;
		self.store.apply(transition);
	}

	async fn handle_notification(&self, notification: WalletNotification) {
		match notification {
			WalletNotification::AccountsChanged(Some(address)) => {
				tracing::info!(address = %truncate_id(&address.to_string()), "Account changed");
				self.initialize(address).await;
			}
			WalletNotification::AccountsChanged(None) => {
				tracing::info!("Account disconnected");
				self.reset().await;
			}
			WalletNotification::NetworkChanged(network_id) => {
				tracing::info!(network_id = %network_id, "Network changed");
				self.reset().await;
			}
		}
	}

	async fn listen(self, mut receiver: broadcast::Receiver<WalletNotification>) {
		loop {
			match receiver.recv().await {
				Ok(notification) => self.handle_notification(notification).await,
				Err(broadcast::error::RecvError::Lagged(skipped)) => {
					tracing::warn!(skipped, "Missed wallet notifications");
				}
				Err(broadcast::error::RecvError::Closed) => break,
			}
		}
	}
}

pub struct WalletSession {
	context: SessionContext,
	required_network_id: String,
	mismatch_message: String,
	listener: Mutex<Option<JoinHandle<()>>>,
}

impl WalletSession {
	pub fn new(
		wallet: Arc<dyn WalletProvider>,
		contract: Arc<dyn LotteryContract>,
		store: SessionStore,
		poller: Arc<BalancePoller>,
		required_network_id: impl Into<String>,
		mismatch_message: impl Into<String>,
	) -> Self {
		Self {
			context: SessionContext {
				wallet,
				contract,
				store,
				poller,
				transitions: Arc::new(Mutex::new(())),
			},
			required_network_id: required_network_id.into(),
			mismatch_message: mismatch_message.into(),
			listener: Mutex::new(None),
		}
	}

	/// Asks the wallet for an account and starts a session with it.
	///
	/// On the wrong network only the mismatch warning is recorded. A user
	/// rejection leaves the session untouched and is not an error. Wallet
	/// notifications are followed from the first successful connect on.
	#[instrument(skip_all, fields(required_network_id = %self.required_network_id))]
	pub async fn connect(&self) -> Result<(), SessionError> {
		let accounts = match self.context.wallet.request_accounts().await {
			Ok(accounts) => accounts,
			Err(e) => return Self::classified(ErrorClassifier::classify(&e)),
		};
		let address = accounts.first().copied().ok_or(SessionError::NoAccounts)?;

		let network_id = match self.context.wallet.network_version().await {
			Ok(network_id) => network_id,
			Err(e) => return Self::classified(ErrorClassifier::classify(&e)),
		};

		if network_id != self.required_network_id {
			tracing::warn!(network_id = %network_id, "Wallet is on the wrong network");
			self.context
				.replace(SessionTransition::NetworkMismatch(
					self.mismatch_message.clone(),
				))
				.await;
			return Ok(());
		}

		self.ensure_listener().await;
		self.context.initialize(address).await;
		tracing::info!(address = %truncate_id(&address.to_string()), "Connected");
		Ok(())
	}

	/// Stops polling and the notification listener, and clears the session.
	///
	/// Wallet permissions are left as they are.
	pub async fn disconnect(&self) {
		let listener = self.listener.lock().await.take();
		if let Some(handle) = listener {
			handle.abort();
			if let Err(e) = handle.await {
				if !e.is_cancelled() {
					tracing::warn!("Notification listener failed: {}", e);
				}
			}
		}
		self.context.reset().await;
	}

	pub fn store(&self) -> &SessionStore {
		&self.context.store
	}

	pub async fn is_listening(&self) -> bool {
		self.listener.lock().await.is_some()
	}

	async fn ensure_listener(&self) {
		let mut listener = self.listener.lock().await;
		if listener.is_none() {
			let receiver = self.context.wallet.subscribe();
			*listener = Some(tokio::spawn(self.context.clone().listen(receiver)));
		}
	}

	fn classified(error: ClassifiedError) -> Result<(), SessionError> {
		if error.is_silent() {
			return Ok(());
		}
		tracing::warn!(error = %error, "Wallet request failed");
		Err(SessionError::Wallet(error))
	}
}
