//! Line console driving the lottery client.
//!
//! Reads commands from stdin and prints the current screen whenever the
//! session changes. Connect and bet run in the background so the pending
//! transaction stays visible while it is mined.

use lottery_config::BettingConfig;
use lottery_core::{LotteryClient, Screen};
use lottery_types::{format_token_amount, truncate_id, BetRequest, BetRequestError};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "Commands: connect | bet <number> | dismiss network|error|result | status | quit";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
	#[error("Unknown command '{0}'. {HELP}")]
	Unknown(String),
	#[error("Usage: dismiss network|error|result")]
	DismissTarget,
	#[error(transparent)]
	Bet(#[from] BetRequestError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissTarget {
	Network,
	Error,
	Result,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
	Connect,
	Bet(u32),
	Dismiss(DismissTarget),
	Status,
	Help,
	Quit,
}

impl Command {
	/// Parses one input line. Bet numbers are validated here, before the
	/// client ever sees them.
	pub fn parse(line: &str, betting: &BettingConfig) -> Result<Option<Self>, CommandError> {
		let mut words = line.split_whitespace();
		let Some(keyword) = words.next() else {
			return Ok(None);
		};
		let argument = words.collect::<Vec<_>>().join(" ");

		let command = match keyword.to_ascii_lowercase().as_str() {
			"connect" => Command::Connect,
			"bet" => {
				let request = BetRequest::parse(&argument, betting.wager_wei)?;
				Command::Bet(request.chosen_number)
			}
			"dismiss" => match argument.as_str() {
				"network" => Command::Dismiss(DismissTarget::Network),
				"error" => Command::Dismiss(DismissTarget::Error),
				"result" => Command::Dismiss(DismissTarget::Result),
				_ => return Err(CommandError::DismissTarget),
			},
			"status" => Command::Status,
			"help" => Command::Help,
			"quit" | "exit" => Command::Quit,
			other => return Err(CommandError::Unknown(other.to_string())),
		};
		Ok(Some(command))
	}
}

/// Renders a screen as console text.
pub fn render(screen: &Screen, betting: &BettingConfig) -> String {
	let amount = |value| {
		format!(
			"{} {}",
			format_token_amount(value, betting.decimals),
			betting.currency_symbol
		)
	};

	match screen {
		Screen::NoWallet => {
			"No wallet detected. Check that the RPC endpoint in the configuration is reachable."
				.to_string()
		}
		Screen::ConnectPrompt { network_error } => {
			let mut lines = vec!["Please connect to your wallet. Type `connect`.".to_string()];
			if let Some(message) = network_error {
				lines.push(format!("! {} (dismiss network)", message));
			}
			lines.join("\n")
		}
		Screen::Loading => "Loading balance...".to_string(),
		Screen::InsufficientFunds { address } => format!(
			"Welcome {}\nYou don't have enough {} to bet. At least {} is needed.",
			address,
			betting.currency_symbol,
			amount(betting.wager_wei)
		),
		Screen::Active(active) => {
			let mut lines = vec![
				format!("Welcome {}", active.address),
				format!("You have {}.", amount(active.balance)),
			];
			if let Some(jackpot) = active.jackpot {
				lines.push(format!("Jackpot: {}", amount(jackpot)));
			}
			if let Some(tx_hash) = active.pending_tx {
				lines.push(format!(
					"Waiting for transaction {} to be mined...",
					truncate_id(&tx_hash.to_string())
				));
			}
			if let Some(error) = &active.transaction_error {
				lines.push(format!("Error sending transaction: {} (dismiss error)", error));
			}
			if let Some(result) = &active.bet_result {
				lines.push(format!("{} (dismiss result)", result));
			}
			if active.pending_tx.is_none() {
				lines.push(format!(
					"Bet {} with `bet <number>`, a number from 1 to 9999.",
					amount(betting.wager_wei)
				));
			}
			lines.join("\n")
		}
	}
}

/// Runs the console until `quit`, end of input, or Ctrl+C.
pub async fn run(client: Arc<LotteryClient>) -> std::io::Result<()> {
	let betting = client.config().betting.clone();
	let mut session = client.subscribe();
	let mut lines = BufReader::new(tokio::io::stdin()).lines();

	println!("{}", render(&client.screen(), &betting));
	println!("{}", HELP);

	loop {
		tokio::select! {
			line = lines.next_line() => {
				let Some(line) = line? else {
					break;
				};
				match Command::parse(&line, &betting) {
					Ok(Some(Command::Quit)) => break,
					Ok(Some(command)) => execute(&client, command, &betting),
					Ok(None) => {}
					Err(e) => println!("{}", e),
				}
			}
			changed = session.changed() => {
				if changed.is_err() {
					break;
				}
				let snapshot = session.borrow_and_update().clone();
				println!("{}", render(&client.screen_for(&snapshot), &betting));
			}
			_ = tokio::signal::ctrl_c() => {
				tracing::info!("Received Ctrl+C");
				break;
			}
		}
	}

	Ok(())
}

fn execute(client: &Arc<LotteryClient>, command: Command, betting: &BettingConfig) {
	match command {
		Command::Connect => {
			let client = Arc::clone(client);
			tokio::spawn(async move {
				if let Err(e) = client.connect().await {
					println!("{}", e);
				}
			});
		}
		Command::Bet(chosen_number) => {
			let client = Arc::clone(client);
			tokio::spawn(async move {
				match client.place_bet(chosen_number).await {
					Ok(attempt) => tracing::debug!(?attempt, "Bet attempt finished"),
					Err(e) => println!("{}", e),
				}
			});
		}
		Command::Dismiss(DismissTarget::Network) => client.dismiss_network_error(),
		Command::Dismiss(DismissTarget::Error) => client.dismiss_transaction_error(),
		Command::Dismiss(DismissTarget::Result) => client.dismiss_bet_result(),
		Command::Status => println!("{}", render(&client.screen(), betting)),
		Command::Help => println!("{}", HELP),
		Command::Quit => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use lottery_core::ActiveScreen;
	use lottery_types::{Address, ClassifiedError, TxHash, U256};

	fn betting() -> BettingConfig {
		BettingConfig::default()
	}

	#[test]
	fn test_parse_commands() {
		let betting = betting();
		assert_eq!(Command::parse("  ", &betting), Ok(None));
		assert_eq!(Command::parse("connect", &betting), Ok(Some(Command::Connect)));
		assert_eq!(Command::parse("BET 42", &betting), Ok(Some(Command::Bet(42))));
		assert_eq!(
			Command::parse("dismiss result", &betting),
			Ok(Some(Command::Dismiss(DismissTarget::Result)))
		);
		assert_eq!(Command::parse("exit", &betting), Ok(Some(Command::Quit)));
	}

	#[test]
	fn test_parse_rejects_bad_input() {
		let betting = betting();
		assert_eq!(
			Command::parse("bet 12345", &betting),
			Err(CommandError::Bet(BetRequestError::OutOfRange))
		);
		assert_eq!(
			Command::parse("bet", &betting),
			Err(CommandError::Bet(BetRequestError::Empty))
		);
		assert_eq!(
			Command::parse("dismiss everything", &betting),
			Err(CommandError::DismissTarget)
		);
		assert!(matches!(
			Command::parse("withdraw", &betting),
			Err(CommandError::Unknown(_))
		));
	}

	#[test]
	fn test_render_active_screen() {
		let one_ether = U256::from(10u64).pow(U256::from(18u64));
		let screen = Screen::Active(ActiveScreen {
			address: Address::repeat_byte(0x01),
			balance: one_ether * U256::from(3u64),
			jackpot: Some(one_ether * U256::from(500u64)),
			pending_tx: Some(TxHash::repeat_byte(0xab)),
			transaction_error: Some(ClassifiedError::RpcFailure("nonce too low".into())),
			bet_result: None,
		});

		let text = render(&screen, &betting());
		assert!(text.contains("ETH"));
		assert!(text.contains("Waiting for transaction 0xababab.."));
		assert!(text.contains("nonce too low"));
		assert!(!text.contains("bet <number>"));
	}

	#[test]
	fn test_render_connect_prompt_warning() {
		let screen = Screen::ConnectPrompt {
			network_error: Some("Please connect your wallet to Localhost:8545".into()),
		};
		let text = render(&screen, &betting());
		assert!(text.contains("connect"));
		assert!(text.contains("Localhost:8545"));
	}
}
