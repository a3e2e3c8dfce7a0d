//! Chat transport capability.
//!
//! The notifier only needs four operations from a chat platform: resolve a
//! destination, create a message, fetch a message, delete a message. Each
//! platform (Discord today) implements [`ChatTransport`].

pub mod error;
pub mod memory;
pub mod transport;

pub use {
    error::{Error, Result},
    memory::MemoryTransport,
    transport::{ChatTransport, Deletion, Destination, Embed, PostedMessage, RichContent},
};
