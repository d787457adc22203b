//! Session and transaction lifecycle for the lottery client.
//!
//! Wires the wallet session, balance poller and bet coordinator around one
//! shared session snapshot, and projects that snapshot onto a screen. A
//! client built without a wallet stays on the no-wallet screen and refuses
//! every operation.

use lottery_config::Config;
use lottery_types::{BetRequest, Session};
use lottery_wallet::{LotteryContract, WalletProvider};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

pub mod classifier;
pub mod handlers;
pub mod monitoring;
pub mod session;
pub mod state;
pub mod view;

pub use classifier::ErrorClassifier;
pub use handlers::{interpret_receipt, BetAttempt, SkipReason, TransactionCoordinator};
pub use monitoring::BalancePoller;
pub use session::{SessionError, WalletSession};
pub use state::{BetResolution, SessionStore, SessionTransition};
pub use view::{ActiveScreen, Screen, SessionView};

/// Errors returned by client operations.
#[derive(Debug, Error)]
pub enum ClientError {
	#[error("No wallet available")]
	NoWallet,
	#[error(transparent)]
	Session(#[from] SessionError),
}

/// Services that only exist when a wallet is available.
struct WalletServices {
	session: WalletSession,
	coordinator: TransactionCoordinator,
}

pub struct LotteryClient {
	config: Config,
	store: SessionStore,
	view: SessionView,
	services: Option<WalletServices>,
}

impl LotteryClient {
	/// Creates a client with no wallet provider.
	pub fn without_wallet(config: Config) -> Self {
		Self {
			view: SessionView::new(config.betting.wager_wei),
			store: SessionStore::new(),
			services: None,
			config,
		}
	}

	/// Creates a client on top of a wallet and the lottery contract.
	pub fn new(
		config: Config,
		wallet: Arc<dyn WalletProvider>,
		contract: Arc<dyn LotteryContract>,
	) -> Self {
		let store = SessionStore::new();
		let poller = Arc::new(BalancePoller::new(
			wallet.clone(),
			store.clone(),
			config.polling.balance_interval(),
		));
		let session = WalletSession::new(
			wallet.clone(),
			contract.clone(),
			store.clone(),
			poller,
			config.network.required_network_id.clone(),
			config.network.mismatch_message.clone(),
		);
		let coordinator =
			TransactionCoordinator::new(wallet, contract, store.clone(), config.betting.nonce_offset);

		Self {
			view: SessionView::new(config.betting.wager_wei),
			store,
			services: Some(WalletServices {
				session,
				coordinator,
			}),
			config,
		}
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn has_wallet(&self) -> bool {
		self.services.is_some()
	}

	pub async fn connect(&self) -> Result<(), ClientError> {
		let services = self.services()?;
		services.session.connect().await?;
		Ok(())
	}

	/// Bets the configured wager on `chosen_number`.
	pub async fn place_bet(&self, chosen_number: u32) -> Result<BetAttempt, ClientError> {
		let services = self.services()?;
		let request = BetRequest::new(chosen_number, self.config.betting.wager_wei);
		Ok(services.coordinator.place_bet(request).await)
	}

	pub fn dismiss_network_error(&self) {
		self.store.apply(SessionTransition::DismissNetworkError);
	}

	pub fn dismiss_transaction_error(&self) {
		self.store.apply(SessionTransition::DismissTransactionError);
	}

	pub fn dismiss_bet_result(&self) {
		self.store.apply(SessionTransition::DismissBetResult);
	}

	/// Current session snapshot.
	pub fn session(&self) -> Session {
		self.store.snapshot()
	}

	pub fn subscribe(&self) -> watch::Receiver<Session> {
		self.store.subscribe()
	}

	pub fn screen(&self) -> Screen {
		self.screen_for(&self.store.snapshot())
	}

	pub fn screen_for(&self, session: &Session) -> Screen {
		self.view.project(self.has_wallet(), session)
	}

	/// Stops background work. The wallet keeps its permissions.
	pub async fn shutdown(&self) {
		if let Some(services) = &self.services {
			services.session.disconnect().await;
		}
	}

	fn services(&self) -> Result<&WalletServices, ClientError> {
		self.services.as_ref().ok_or(ClientError::NoWallet)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use lottery_types::{Address, ClassifiedError, LotteryEvent, U256};
	use lottery_wallet::implementations::mock::MockWallet;
	use std::time::Duration;

	const CONFIG: &str = r#"
[client]
id = "test-client"

[network]
required_network_id = "1337"
rpc_url = "http://localhost:8545"
mismatch_message = "Switch to network 1337"

[contract]
address = "0x5fbdb2315678afecb367f032d93f642f64180aa3"

[betting]
wager_wei = "100"
"#;

	fn config() -> Config {
		CONFIG.parse().unwrap()
	}

	fn client(mock: &Arc<MockWallet>) -> LotteryClient {
		LotteryClient::new(config(), mock.clone(), mock.clone())
	}

	async fn wait_for_screen(client: &LotteryClient, mut predicate: impl FnMut(&Screen) -> bool) {
		let mut receiver = client.subscribe();
		tokio::time::timeout(
			Duration::from_secs(5),
			receiver.wait_for(|session| predicate(&client.screen_for(session))),
		)
		.await
		.unwrap()
		.unwrap();
	}

	#[tokio::test]
	async fn test_without_wallet() {
		let client = LotteryClient::without_wallet(config());

		assert_eq!(client.screen(), Screen::NoWallet);
		assert!(matches!(client.connect().await, Err(ClientError::NoWallet)));
		assert!(matches!(client.place_bet(1).await, Err(ClientError::NoWallet)));
	}

	#[tokio::test]
	async fn test_full_betting_round() {
		let account = Address::repeat_byte(0x01);
		let mock = Arc::new(
			MockWallet::new("1337")
				.with_accounts(vec![account])
				.with_balance(account, U256::from(1_000u64))
				.with_total(U256::from(5_000u64))
				.with_receipt_events(vec![LotteryEvent::Lost {
					lot_number: U256::from(17u64),
				}]),
		);
		let client = client(&mock);
		assert_eq!(client.screen(), Screen::ConnectPrompt { network_error: None });

		client.connect().await.unwrap();
		wait_for_screen(&client, |screen| matches!(screen, Screen::Active(_))).await;

		let attempt = client.place_bet(1234).await.unwrap();
		assert!(matches!(attempt, BetAttempt::Finished(_)));
		assert_eq!(mock.submissions().await[0].value, U256::from(100u64));

		let Screen::Active(active) = client.screen() else {
			panic!("expected active screen");
		};
		assert_eq!(active.jackpot, Some(U256::from(5_000u64)));
		assert!(active.bet_result.as_deref().unwrap().contains("17"));

		client.dismiss_bet_result();
		assert_eq!(client.session().bet_result, None);

		client.shutdown().await;
		assert_eq!(client.screen(), Screen::ConnectPrompt { network_error: None });
	}

	#[tokio::test]
	async fn test_low_balance_and_wrong_network() {
		let account = Address::repeat_byte(0x01);
		let mock = Arc::new(
			MockWallet::new("3")
				.with_accounts(vec![account])
				.with_balance(account, U256::from(10u64)),
		);
		let client = client(&mock);

		client.connect().await.unwrap();
		assert_eq!(
			client.screen(),
			Screen::ConnectPrompt {
				network_error: Some("Switch to network 1337".into())
			}
		);
		client.dismiss_network_error();
		assert_eq!(client.screen(), Screen::ConnectPrompt { network_error: None });

		mock.set_network_version("1337").await;
		client.connect().await.unwrap();
		wait_for_screen(&client, |screen| {
			matches!(screen, Screen::InsufficientFunds { address } if *address == account)
		})
		.await;

		client.shutdown().await;
	}

	#[tokio::test]
	async fn test_dismiss_transaction_error() {
		let account = Address::repeat_byte(0x01);
		let mock = Arc::new(
			MockWallet::new("1337")
				.with_accounts(vec![account])
				.with_balance(account, U256::from(1_000u64)),
		);
		mock.set_receipt(false, vec![]).await;
		let client = client(&mock);

		client.connect().await.unwrap();
		client.place_bet(42).await.unwrap();
		assert_eq!(
			client.session().transaction_error,
			Some(ClassifiedError::RpcFailure("Transaction failed".into()))
		);

		client.dismiss_transaction_error();
		assert_eq!(client.session().transaction_error, None);

		client.shutdown().await;
	}
}
