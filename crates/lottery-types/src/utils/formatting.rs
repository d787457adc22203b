//! Formatting of hashes and native amounts for logs and the console.

use alloy_primitives::U256;

/// Shortens a hex identifier (address or hash) to its first 8 characters.
///
/// The `0x` prefix counts toward the 8, so `0x5fbdb2315678...` becomes
/// `0x5fbdb2..`.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((cut, _)) => format!("{}..", &id[..cut]),
		None => id.to_string(),
	}
}

/// Renders a raw on-chain amount with `decimals` decimal places.
///
/// Trailing zeros of the fractional part are dropped, so one ether
/// (`10^18` wei at 18 decimals) renders as `"1"` and `1.5 * 10^18` as `"1.5"`.
pub fn format_token_amount(amount: U256, decimals: u8) -> String {
	if decimals == 0 {
		return amount.to_string();
	}

	let unit = U256::from(10u64).pow(U256::from(decimals));
	let integer_part = amount / unit;
	let fraction = (amount % unit).to_string();
	let fraction = format!("{:0>width$}", fraction, width = decimals as usize);
	let fraction = fraction.trim_end_matches('0');

	if fraction.is_empty() {
		integer_part.to_string()
	} else {
		format!("{}.{}", integer_part, fraction)
	}
}
