//! Discord chat transport.
//!
//! Talks to the Discord REST API (v10) with a bot token. Only the calls the
//! notifier needs are implemented: channel lookup and message
//! create/fetch/delete.

pub mod api;
pub mod transport;

pub use transport::{DiscordTransport, MAX_RATE_LIMIT_RETRIES};
