//! Main entry point for the lottery client.
//!
//! Loads the configuration, connects to the wallet node and runs a text
//! console for connecting, betting and reading results.

use clap::Parser;
use lottery_config::Config;
use lottery_core::LotteryClient;
use lottery_wallet::implementations::evm::alloy::create_wallet;
use lottery_wallet::WalletProvider;
use std::path::PathBuf;
use std::sync::Arc;

mod console;

/// Command-line arguments for the lottery client.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/lottery.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.client.id);

	let client = Arc::new(build_client(config).await);
	console::run(Arc::clone(&client)).await?;

	client.shutdown().await;
	tracing::info!("Stopped lottery client");
	Ok(())
}

/// Builds the client, without a wallet when the node cannot be reached.
async fn build_client(config: Config) -> LotteryClient {
	let wallet = match create_wallet(&config) {
		Ok(wallet) => Arc::new(wallet),
		Err(e) => {
			tracing::warn!(error = %e, "Failed to create wallet");
			return LotteryClient::without_wallet(config);
		}
	};

	match wallet.network_version().await {
		Ok(network_id) => {
			tracing::info!(
				network_id = %network_id,
				rpc_url = %config.network.rpc_url,
				"Wallet node reachable"
			);
			LotteryClient::new(config, wallet.clone(), wallet)
		}
		Err(e) => {
			tracing::warn!(error = %e, "Wallet node unreachable");
			LotteryClient::without_wallet(config)
		}
	}
}
