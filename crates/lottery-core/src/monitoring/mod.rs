pub mod balance;

pub use balance::BalancePoller;
