//! Wallet and contract capabilities for the lottery client.
//!
//! The client never talks to a node directly. It goes through two traits:
//! [`WalletProvider`] for account disclosure, balances, nonces and change
//! notifications, and [`LotteryContract`] for the deployed lottery. Signing
//! stays with whoever sits behind these traits.

use async_trait::async_trait;
use lottery_types::{Address, BetReceipt, TxHash, WalletNotification, U256};
use thiserror::Error;
use tokio::sync::broadcast;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
	#[cfg(any(test, feature = "testing"))]
	pub mod mock;
}

/// Error code wallets return when the user rejects a request (EIP-1193).
pub const USER_REJECTED_CODE: i64 = 4001;

/// Errors returned by wallet and contract capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
	/// Error object returned by the JSON-RPC endpoint.
	#[error("RPC error {code}: {message}")]
	Rpc {
		code: i64,
		message: String,
		/// `data.message` of the error object, when the node supplied one.
		data_message: Option<String>,
	},
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// A response could not be decoded.
	#[error("Decode error: {0}")]
	Decode(String),
}

impl WalletError {
	/// Whether the user declined the request in the wallet.
	pub fn is_user_rejection(&self) -> bool {
		matches!(self, WalletError::Rpc { code, .. } if *code == USER_REJECTED_CODE)
	}
}

/// A bet transaction ready to be sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetSubmission {
	/// Account paying the wager.
	pub from: Address,
	/// Number passed to `bet`.
	pub chosen_number: u32,
	/// Wager in wei.
	pub value: U256,
	/// Explicit nonce for the transaction.
	pub nonce: u64,
}

/// Account-level capability of the user's wallet.
#[async_trait]
pub trait WalletProvider: Send + Sync {
	/// Asks the wallet to disclose its accounts.
	///
	/// Suspends until the user approves or rejects. A rejection comes back as
	/// [`WalletError::Rpc`] with [`USER_REJECTED_CODE`].
	async fn request_accounts(&self) -> Result<Vec<Address>, WalletError>;

	/// Returns the id of the network the wallet is connected to.
	async fn network_version(&self) -> Result<String, WalletError>;

	/// Returns the native balance of `address` in wei.
	async fn get_balance(&self, address: Address) -> Result<U256, WalletError>;

	/// Returns the number of transactions sent from `address`.
	async fn get_transaction_count(&self, address: Address) -> Result<u64, WalletError>;

	/// Subscribes to account and network change notifications.
	fn subscribe(&self) -> broadcast::Receiver<WalletNotification>;
}

/// The deployed lottery contract.
#[async_trait]
pub trait LotteryContract: Send + Sync {
	/// Reads the current jackpot total.
	async fn total(&self) -> Result<U256, WalletError>;

	/// Sends a `bet` transaction and returns its hash once the wallet accepted it.
	async fn submit_bet(&self, submission: BetSubmission) -> Result<TxHash, WalletError>;

	/// Waits until the transaction is mined and returns its receipt.
	///
	/// No timeout is applied beyond the transport's own.
	async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<BetReceipt, WalletError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_user_rejection_detection() {
		let rejected = WalletError::Rpc {
			code: USER_REJECTED_CODE,
			message: "User denied transaction signature".to_string(),
			data_message: None,
		};
		assert!(rejected.is_user_rejection());

		let reverted = WalletError::Rpc {
			code: -32000,
			message: "execution reverted".to_string(),
			data_message: Some("revert: bet closed".to_string()),
		};
		assert!(!reverted.is_user_rejection());
		assert!(!WalletError::Network("timeout".to_string()).is_user_rejection());
	}
}
