//! Configuration for the lottery client.
//!
//! Configuration is read from TOML. Values may reference environment
//! variables as `${VAR}` or `${VAR:-default}`, and a file may pull in other
//! files with `include = ["network.toml"]`. Each top-level section must be
//! unique across all included files.

mod loader;

use alloy_primitives::{Address, U256};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the lottery client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Identity of this client instance, used in logs.
	pub client: ClientConfig,
	/// Node endpoint and the network the client insists on.
	pub network: NetworkConfig,
	/// The deployed lottery contract.
	pub contract: ContractConfig,
	/// Wager and transaction parameters.
	#[serde(default)]
	pub betting: BettingConfig,
	/// Poll intervals for balance, wallet notifications and receipts.
	#[serde(default)]
	pub polling: PollingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
	pub id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// Network id the wallet must report before any contract call.
	/// Compared as a string against the provider's `net_version`.
	pub required_network_id: String,
	/// JSON-RPC endpoint of the wallet node.
	pub rpc_url: String,
	/// Message shown when the wallet is on another network.
	#[serde(default = "default_network_error_message")]
	pub mismatch_message: String,
}

fn default_network_error_message() -> String {
	"Please connect your wallet to Localhost:8545".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractConfig {
	/// Address of the lottery contract.
	pub address: Address,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BettingConfig {
	/// Value sent with every bet, in wei. Accepts decimal or 0x-hex strings.
	#[serde(default = "default_wager", deserialize_with = "deserialize_wei")]
	pub wager_wei: U256,
	/// Added to the account's transaction count to form the bet nonce.
	#[serde(default)]
	pub nonce_offset: u64,
	/// Symbol of the native currency.
	#[serde(default = "default_currency_symbol")]
	pub currency_symbol: String,
	/// Decimals of the native currency.
	#[serde(default = "default_decimals")]
	pub decimals: u8,
}

impl Default for BettingConfig {
	fn default() -> Self {
		Self {
			wager_wei: default_wager(),
			nonce_offset: 0,
			currency_symbol: default_currency_symbol(),
			decimals: default_decimals(),
		}
	}
}

/// One unit of native currency.
fn default_wager() -> U256 {
	U256::from(10u64).pow(U256::from(18u64))
}

fn default_currency_symbol() -> String {
	"ETH".to_string()
}

fn default_decimals() -> u8 {
	18
}

fn deserialize_wei<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;
	U256::from_str(raw.trim())
		.map_err(|e| serde::de::Error::custom(format!("invalid wei amount '{}': {}", raw, e)))
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
	/// Seconds between balance refreshes.
	#[serde(default = "default_balance_interval")]
	pub balance_interval_secs: u64,
	/// Seconds between checks for account or network switches.
	#[serde(default = "default_notification_interval")]
	pub notification_interval_secs: u64,
	/// Seconds between receipt lookups while a bet is pending.
	#[serde(default = "default_receipt_interval")]
	pub receipt_interval_secs: u64,
}

impl Default for PollingConfig {
	fn default() -> Self {
		Self {
			balance_interval_secs: default_balance_interval(),
			notification_interval_secs: default_notification_interval(),
			receipt_interval_secs: default_receipt_interval(),
		}
	}
}

impl PollingConfig {
	pub fn balance_interval(&self) -> Duration {
		Duration::from_secs(self.balance_interval_secs)
	}

	pub fn notification_interval(&self) -> Duration {
		Duration::from_secs(self.notification_interval_secs)
	}

	pub fn receipt_interval(&self) -> Duration {
		Duration::from_secs(self.receipt_interval_secs)
	}
}

fn default_balance_interval() -> u64 {
	5
}

fn default_notification_interval() -> u64 {
	2
}

fn default_receipt_interval() -> u64 {
	1
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match cap.get(2) {
				Some(default) => default.as_str().to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)))
				},
			},
		};

		result.push_str(&input[last..full_match.start()]);
		result.push_str(&value);
		last = full_match.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	/// Checks values serde cannot check on its own.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.client.id.is_empty() {
			return Err(ConfigError::Validation("Client ID cannot be empty".into()));
		}

		let network_id = &self.network.required_network_id;
		if network_id.is_empty() || !network_id.bytes().all(|b| b.is_ascii_digit()) {
			return Err(ConfigError::Validation(format!(
				"required_network_id must be a decimal network id, got '{}'",
				network_id
			)));
		}
		let rpc_url = &self.network.rpc_url;
		if !(rpc_url.starts_with("http://") || rpc_url.starts_with("https://")) {
			return Err(ConfigError::Validation(
				"RPC URL must start with http:// or https://".into(),
			));
		}

		if self.contract.address == Address::ZERO {
			return Err(ConfigError::Validation(
				"Contract address cannot be the zero address".into(),
			));
		}

		if self.betting.wager_wei.is_zero() {
			return Err(ConfigError::Validation(
				"wager_wei must be greater than 0".into(),
			));
		}

		let polling = &self.polling;
		if !(1..=300).contains(&polling.balance_interval_secs) {
			return Err(ConfigError::Validation(
				"balance_interval_secs must be between 1 and 300".into(),
			));
		}
		if !(1..=60).contains(&polling.notification_interval_secs) {
			return Err(ConfigError::Validation(
				"notification_interval_secs must be between 1 and 60".into(),
			));
		}
		if !(1..=60).contains(&polling.receipt_interval_secs) {
			return Err(ConfigError::Validation(
				"receipt_interval_secs must be between 1 and 60".into(),
			));
		}

		Ok(())
	}
}

/// Parses TOML, resolving environment variables, then validates.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const BASE_CONFIG: &str = r#"
[client]
id = "lottery-test"

[network]
required_network_id = "1337"
rpc_url = "http://localhost:8545"

[contract]
address = "0x5fbdb2315678afecb367f032d93f642f64180aa3"
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("LOTTERY_TEST_HOST", "localhost");
		std::env::set_var("LOTTERY_TEST_PORT", "8545");

		let input = "rpc_url = \"http://${LOTTERY_TEST_HOST}:${LOTTERY_TEST_PORT}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "rpc_url = \"http://localhost:8545\"");

		std::env::remove_var("LOTTERY_TEST_HOST");
		std::env::remove_var("LOTTERY_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default() {
		let input = "value = \"${LOTTERY_MISSING_VAR:-1337}\"";
		let result = resolve_env_vars(input).unwrap();
		assert_eq!(result, "value = \"1337\"");
	}

	#[test]
	fn test_missing_env_var_error() {
		let input = "value = \"${LOTTERY_MISSING_VAR}\"";
		let result = resolve_env_vars(input);
		assert!(result.is_err());
		assert!(result.unwrap_err().to_string().contains("LOTTERY_MISSING_VAR"));
	}

	#[test]
	fn test_defaults_applied() {
		let config: Config = BASE_CONFIG.parse().unwrap();

		assert_eq!(config.client.id, "lottery-test");
		assert_eq!(config.network.required_network_id, "1337");
		assert_eq!(config.betting.wager_wei, default_wager());
		assert_eq!(config.betting.nonce_offset, 0);
		assert_eq!(config.betting.currency_symbol, "ETH");
		assert_eq!(config.polling.balance_interval(), Duration::from_secs(5));
		assert_eq!(config.polling.notification_interval(), Duration::from_secs(2));
	}

	#[test]
	fn test_betting_overrides() {
		let config_str = format!(
			"{}\n[betting]\nwager_wei = \"2000000000000000000\"\nnonce_offset = 100\ncurrency_symbol = \"GO\"\n",
			BASE_CONFIG
		);
		let config: Config = config_str.parse().unwrap();

		assert_eq!(
			config.betting.wager_wei,
			U256::from(2_000_000_000_000_000_000u128)
		);
		assert_eq!(config.betting.nonce_offset, 100);
		assert_eq!(config.betting.currency_symbol, "GO");
	}

	#[test]
	fn test_config_with_env_vars() {
		std::env::set_var("LOTTERY_TEST_NETWORK_ID", "31337");

		let config_str = BASE_CONFIG.replace("\"1337\"", "\"${LOTTERY_TEST_NETWORK_ID}\"");
		let config: Config = config_str.parse().unwrap();
		assert_eq!(config.network.required_network_id, "31337");

		std::env::remove_var("LOTTERY_TEST_NETWORK_ID");
	}

	#[test]
	fn test_non_numeric_network_id_rejected() {
		let config_str = BASE_CONFIG.replace("\"1337\"", "\"localhost\"");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("required_network_id"));
	}

	#[test]
	fn test_zero_wager_rejected() {
		let config_str = format!("{}\n[betting]\nwager_wei = \"0\"\n", BASE_CONFIG);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("wager_wei must be greater than 0"));
	}

	#[test]
	fn test_invalid_wager_rejected() {
		let config_str = format!("{}\n[betting]\nwager_wei = \"one ether\"\n", BASE_CONFIG);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)));
	}

	#[test]
	fn test_poll_interval_bounds() {
		let config_str = format!("{}\n[polling]\nbalance_interval_secs = 0\n", BASE_CONFIG);
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("balance_interval_secs"));
	}

	#[test]
	fn test_rpc_url_scheme_rejected() {
		let config_str = BASE_CONFIG.replace("http://localhost:8545", "ws://localhost:8545");
		let err = Config::from_str(&config_str).unwrap_err();
		assert!(err.to_string().contains("RPC URL"));
	}
}
