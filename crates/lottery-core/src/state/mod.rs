pub mod session;

pub use session::{apply, BetResolution, SessionStore, SessionTransition};
