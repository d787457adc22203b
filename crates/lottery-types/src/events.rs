//! Notifications pushed by the wallet provider.
//!
//! The provider reports account and network switches made outside the
//! client. The session reacts to them in arrival order.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletNotification {
	/// The selected account changed. `None` means the wallet no longer
	/// exposes any account to this client.
	AccountsChanged(Option<Address>),
	/// The wallet switched to another network.
	NetworkChanged(String),
}
