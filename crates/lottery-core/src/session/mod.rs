pub mod wallet;

pub use wallet::{SessionError, WalletSession};
