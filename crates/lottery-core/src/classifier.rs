//! Sorting of wallet failures into what the user gets to see.

use lottery_types::ClassifiedError;
use lottery_wallet::WalletError;

pub struct ErrorClassifier;

impl ErrorClassifier {
	/// Classifies a failed wallet or contract request.
	///
	/// A user rejection becomes [`ClassifiedError::UserCancelled`]. Everything
	/// else is an [`ClassifiedError::RpcFailure`] carrying the node's
	/// `data.message` when present, else the plain message.
	/// `NetworkMismatch` is never produced here.
	pub fn classify(error: &WalletError) -> ClassifiedError {
		match error {
			WalletError::Rpc { .. } if error.is_user_rejection() => {
				tracing::debug!("Request rejected by user");
				ClassifiedError::UserCancelled
			}
			WalletError::Rpc {
				message,
				data_message,
				..
			} => ClassifiedError::RpcFailure(data_message.clone().unwrap_or_else(|| message.clone())),
			other => ClassifiedError::RpcFailure(other.to_string()),
		}
	}
}
