//! User-facing error classification.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failure after it has been sorted into what the user should see.
///
/// Every variant is recoverable. `UserCancelled` is never shown,
/// the others are dismissible banners.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ClassifiedError {
	/// The user rejected the request in the wallet.
	#[error("Request cancelled by user")]
	UserCancelled,
	/// The node or wallet failed the request.
	#[error("{0}")]
	RpcFailure(String),
	/// The wallet is connected to a network other than the required one.
	#[error("{0}")]
	NetworkMismatch(String),
}

impl ClassifiedError {
	/// Whether this error should be reported to the user at all.
	pub fn is_silent(&self) -> bool {
		matches!(self, ClassifiedError::UserCancelled)
	}
}
