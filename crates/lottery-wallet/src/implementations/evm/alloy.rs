//! JSON-RPC wallet backed by the Alloy library.
//!
//! Talks to a node that manages the user's accounts itself, the way a browser
//! wallet does: accounts come from `eth_accounts` and bets go out through
//! `eth_sendTransaction`, so the node signs. Account and network switches are
//! detected by polling and pushed to subscribers.

use crate::{BetSubmission, LotteryContract, WalletError, WalletProvider};
use alloy_primitives::{Address, Log as PrimLog, LogData, TxHash, U256};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types::{Log, TransactionRequest};
use alloy_sol_types::{sol, SolCall, SolEvent};
use alloy_transport::TransportError;
use alloy_transport_http::Http;
use async_trait::async_trait;
use lottery_config::Config;
use lottery_types::{BetReceipt, LotteryEvent, WalletNotification};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

sol! {
	interface ILottery {
		function total() external view returns (uint256);
		function bet(uint256 number) external payable;

		event Win(uint256 lotNumber, string level, uint256 amount);
		event Lost(uint256 lotNumber);
	}
}

/// Capacity of the notification channel.
const NOTIFICATION_CAPACITY: usize = 32;

/// Alloy-based wallet and lottery contract.
pub struct AlloyWallet {
	provider: RootProvider<Http<reqwest::Client>>,
	/// Deployed lottery contract.
	contract: Address,
	/// Delay between receipt lookups while a bet is being mined.
	receipt_interval: Duration,
	notifications: broadcast::Sender<WalletNotification>,
	/// Task polling for account and network switches.
	watcher: JoinHandle<()>,
}

impl AlloyWallet {
	/// Creates a wallet against the given RPC endpoint.
	///
	/// Starts the change watcher immediately, so this must run inside a
	/// Tokio runtime.
	pub fn new(
		rpc_url: &str,
		contract: Address,
		receipt_interval: Duration,
		notification_interval: Duration,
	) -> Result<Self, WalletError> {
		let provider = RootProvider::new_http(
			rpc_url
				.parse()
				.map_err(|e| WalletError::Network(format!("Invalid RPC URL: {}", e)))?,
		);

		let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
		let watcher = tokio::spawn(Self::watch_changes(
			provider.clone(),
			notifications.clone(),
			notification_interval,
		));

		Ok(Self {
			provider,
			contract,
			receipt_interval,
			notifications,
			watcher,
		})
	}

	/// Polls accounts and network id, broadcasting every change.
	///
	/// The first successful read only records a baseline. Failed reads are
	/// skipped and retried on the next tick.
	async fn watch_changes(
		provider: RootProvider<Http<reqwest::Client>>,
		sender: broadcast::Sender<WalletNotification>,
		interval: Duration,
	) {
		let mut ticker = tokio::time::interval(interval);
		ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

		let mut last_account: Option<Option<Address>> = None;
		let mut last_network: Option<String> = None;

		loop {
			ticker.tick().await;

			match provider.get_accounts().await {
				Ok(accounts) => {
					let current = accounts.first().copied();
					if let Some(previous) = last_account {
						if previous != current {
							tracing::debug!(account = ?current, "Wallet account changed");
							let _ = sender.send(WalletNotification::AccountsChanged(current));
						}
					}
					last_account = Some(current);
				}
				Err(e) => tracing::debug!("Failed to poll accounts: {}", e),
			}

			match provider.get_net_version().await {
				Ok(version) => {
					let current = version.to_string();
					if let Some(previous) = &last_network {
						if *previous != current {
							tracing::debug!(network_id = %current, "Wallet network changed");
							let _ = sender.send(WalletNotification::NetworkChanged(current.clone()));
						}
					}
					last_network = Some(current);
				}
				Err(e) => tracing::debug!("Failed to poll network version: {}", e),
			}
		}
	}

	/// Decodes the lottery events emitted by the contract in `logs`.
	fn decode_events(&self, logs: &[Log]) -> Vec<LotteryEvent> {
		logs.iter()
			.filter(|log| log.address() == self.contract)
			.filter_map(|log| {
				let prim_log = PrimLog {
					address: log.address(),
					data: LogData::new_unchecked(log.topics().to_vec(), log.data().data.clone()),
				};

				if let Ok(lost) = ILottery::Lost::decode_log(&prim_log, true) {
					return Some(LotteryEvent::Lost {
						lot_number: lost.lotNumber,
					});
				}
				match ILottery::Win::decode_log(&prim_log, true) {
					Ok(win) => Some(LotteryEvent::Win {
						lot_number: win.lotNumber,
						level: win.level.clone(),
						amount: win.amount,
					}),
					Err(_) => None,
				}
			})
			.collect()
	}
}

impl Drop for AlloyWallet {
	fn drop(&mut self) {
		self.watcher.abort();
	}
}

/// Maps a transport failure, keeping the JSON-RPC error object when there is one.
fn map_rpc_error(context: &str, err: TransportError) -> WalletError {
	match err.as_error_resp() {
		Some(payload) => {
			let data_message = payload
				.data
				.as_ref()
				.and_then(|raw| serde_json::from_str::<serde_json::Value>(raw.get()).ok())
				.and_then(|value| {
					value
						.get("message")
						.and_then(|m| m.as_str())
						.map(str::to_string)
				});
			WalletError::Rpc {
				code: payload.code,
				message: payload.message.to_string(),
				data_message,
			}
		}
		None => WalletError::Network(format!("{}: {}", context, err)),
	}
}

#[async_trait]
impl WalletProvider for AlloyWallet {
	async fn request_accounts(&self) -> Result<Vec<Address>, WalletError> {
		self.provider
			.get_accounts()
			.await
			.map_err(|e| map_rpc_error("Failed to request accounts", e))
	}

	async fn network_version(&self) -> Result<String, WalletError> {
		let version = self
			.provider
			.get_net_version()
			.await
			.map_err(|e| map_rpc_error("Failed to get network version", e))?;
		Ok(version.to_string())
	}

	async fn get_balance(&self, address: Address) -> Result<U256, WalletError> {
		self.provider
			.get_balance(address)
			.await
			.map_err(|e| map_rpc_error("Failed to get balance", e))
	}

	async fn get_transaction_count(&self, address: Address) -> Result<u64, WalletError> {
		self.provider
			.get_transaction_count(address)
			.await
			.map_err(|e| map_rpc_error("Failed to get transaction count", e))
	}

	fn subscribe(&self) -> broadcast::Receiver<WalletNotification> {
		self.notifications.subscribe()
	}
}

#[async_trait]
impl LotteryContract for AlloyWallet {
	async fn total(&self) -> Result<U256, WalletError> {
		let call_data = ILottery::totalCall {}.abi_encode();
		let request = TransactionRequest::default()
			.to(self.contract)
			.input(call_data.into());

		let output = self
			.provider
			.call(&request)
			.await
			.map_err(|e| map_rpc_error("Failed to call total", e))?;

		let decoded = ILottery::totalCall::abi_decode_returns(&output, true)
			.map_err(|e| WalletError::Decode(format!("Failed to decode total: {}", e)))?;
		Ok(decoded._0)
	}

	async fn submit_bet(&self, submission: BetSubmission) -> Result<TxHash, WalletError> {
		let call_data = ILottery::betCall {
			number: U256::from(submission.chosen_number),
		}
		.abi_encode();

		let request = TransactionRequest::default()
			.from(submission.from)
			.to(self.contract)
			.value(submission.value)
			.nonce(submission.nonce)
			.input(call_data.into());

		// Sent unsigned, the node's wallet signs
		let pending_tx = self
			.provider
			.send_transaction(request)
			.await
			.map_err(|e| map_rpc_error("Failed to send transaction", e))?;

		let tx_hash = *pending_tx.tx_hash();
		tracing::info!(tx_hash = %tx_hash, nonce = submission.nonce, "Submitted bet");
		Ok(tx_hash)
	}

	async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<BetReceipt, WalletError> {
		loop {
			let receipt = match self.provider.get_transaction_receipt(tx_hash).await {
				Ok(Some(receipt)) => receipt,
				Ok(None) => {
					tokio::time::sleep(self.receipt_interval).await;
					continue;
				}
				Err(e) => return Err(map_rpc_error("Failed to get receipt", e)),
			};

			let events = self.decode_events(receipt.inner.logs());
			tracing::debug!(
				tx_hash = %tx_hash,
				events = events.len(),
				"Bet mined"
			);

			return Ok(BetReceipt {
				tx_hash: receipt.transaction_hash,
				block_number: receipt.block_number.unwrap_or(0),
				success: receipt.status(),
				events,
			});
		}
	}
}

/// Factory function to create an Alloy wallet from configuration.
pub fn create_wallet(config: &Config) -> Result<AlloyWallet, WalletError> {
	AlloyWallet::new(
		&config.network.rpc_url,
		config.contract.address,
		config.polling.receipt_interval(),
		config.polling.notification_interval(),
	)
}
