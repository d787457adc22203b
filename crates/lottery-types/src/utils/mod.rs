//! Display helpers shared by logging and the console.

pub mod formatting;

pub use formatting::{format_token_amount, truncate_id};
